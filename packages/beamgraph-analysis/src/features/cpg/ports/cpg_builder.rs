use crate::features::data_flow::domain::DataFlowGraph;
use crate::features::flow_graph::domain::ControlFlowGraph;
use crate::shared::models::AstNode;

use super::super::domain::CodePropertyGraph;
use super::super::infrastructure::CpgResult;

/// Seam for graph unification.
pub trait CpgBuilder: Send + Sync {
    fn unify(
        &self,
        function: &AstNode,
        cfg: &ControlFlowGraph,
        dfg: &DataFlowGraph,
    ) -> CpgResult<CodePropertyGraph>;
}
