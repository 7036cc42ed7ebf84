//! Control-flow graph construction
//!
//! AST → CFG with typed, probability-weighted edges and decision-point-based
//! complexity metrics.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use application::BuildFlowGraphUseCase;
pub use domain::{
    CfgEdge, CfgEdgeKind, CfgNode, CfgNodeId, CfgNodeKind, ComplexityMetrics, ControlFlowGraph,
    DecisionKind, FlowGraphStats,
};
pub use infrastructure::{CfgBuilder, FlowGraphError, FlowGraphResult};
pub use ports::FlowGraphBuilder;
