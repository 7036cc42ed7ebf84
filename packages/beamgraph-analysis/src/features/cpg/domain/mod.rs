//! CPG domain models

mod cpg;
mod index;

pub use cpg::{
    CodePropertyGraph, CpgEdge, CpgEdgeType, CpgNode, CpgNodeId, CpgNodeType, CpgStats, DfgRef,
    Representations, SourceGraph,
};
pub use index::CpgIndex;
