//! Code property graph unification
//!
//! Merges one function's AST, CFG and DFG into a single cross-referenced
//! graph: one physical entity, three graph views, explicitly linked.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use application::BuildCpgUseCase;
pub use domain::{
    CodePropertyGraph, CpgEdge, CpgEdgeType, CpgIndex, CpgNode, CpgNodeId, CpgNodeType, CpgStats,
    DfgRef, Representations, SourceGraph,
};
pub use infrastructure::{CpgError, CpgResult, CpgUnifier};
pub use ports::CpgBuilder;
