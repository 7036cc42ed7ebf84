//! Flow graph domain models

mod graph;
mod metrics;

pub use graph::{
    CfgEdge, CfgEdgeKind, CfgNode, CfgNodeId, CfgNodeKind, ControlFlowGraph, DecisionKind,
    FlowGraphStats,
};
pub use metrics::ComplexityMetrics;
