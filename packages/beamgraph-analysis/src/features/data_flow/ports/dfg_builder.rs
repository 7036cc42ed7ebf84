use crate::shared::models::AstNode;

use super::super::domain::DataFlowGraph;
use super::super::infrastructure::DfgResult;

/// Seam for SSA-form DFG construction.
pub trait DfgBuilder: Send + Sync {
    fn build_dfg(&self, function: &AstNode) -> DfgResult<DataFlowGraph>;
}
