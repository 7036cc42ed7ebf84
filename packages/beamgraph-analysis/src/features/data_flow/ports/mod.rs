//! Data flow ports

mod dfg_builder;

pub use dfg_builder::DfgBuilder;
