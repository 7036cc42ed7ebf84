//! CPG ports

mod cpg_builder;

pub use cpg_builder::CpgBuilder;
