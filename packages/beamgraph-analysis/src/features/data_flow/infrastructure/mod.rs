//! Data flow infrastructure

pub mod errors;
pub mod ssa_builder;

pub use errors::{DfgError, DfgResult};
pub use ssa_builder::SsaBuilder;
