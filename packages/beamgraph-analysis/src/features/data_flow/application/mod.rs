//! Data flow application layer

mod build_dfg;

pub use build_dfg::{BuildDfgUseCase, DefaultDfgBuilder};
