//! Flow graph infrastructure

pub mod builder;
pub mod complexity;
pub mod errors;

pub use builder::CfgBuilder;
pub use errors::{FlowGraphError, FlowGraphResult};
