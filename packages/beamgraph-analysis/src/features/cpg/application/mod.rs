//! CPG application layer

mod build_cpg;

pub use build_cpg::{BuildCpgUseCase, DefaultCpgBuilder};
