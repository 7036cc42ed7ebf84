use crate::shared::models::AstNode;

use super::super::domain::ControlFlowGraph;
use super::super::infrastructure::FlowGraphResult;

/// Seam for CFG construction, so orchestration code depends on the port
/// rather than a concrete builder.
pub trait FlowGraphBuilder: Send + Sync {
    fn build_cfg(&self, function: &AstNode) -> FlowGraphResult<ControlFlowGraph>;
}
