use crate::features::data_flow::domain::DataFlowGraph;
use crate::features::data_flow::infrastructure::SsaBuilder;
use crate::features::flow_graph::domain::ControlFlowGraph;
use crate::features::flow_graph::infrastructure::CfgBuilder;
use crate::shared::models::AstNode;

use super::super::domain::CodePropertyGraph;
use super::super::infrastructure::{CpgResult, CpgUnifier};
use super::super::ports::CpgBuilder;

/// Default port implementation backed by [`CpgUnifier`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCpgBuilder;

impl CpgBuilder for DefaultCpgBuilder {
    fn unify(
        &self,
        function: &AstNode,
        cfg: &ControlFlowGraph,
        dfg: &DataFlowGraph,
    ) -> CpgResult<CodePropertyGraph> {
        CpgUnifier::unify(function, cfg, dfg)
    }
}

/// Run both sub-builders and unify, wrapping either failure in a tagged
/// CPG error.
pub struct BuildCpgUseCase<B: CpgBuilder> {
    builder: B,
}

impl<B: CpgBuilder> BuildCpgUseCase<B> {
    pub fn new(builder: B) -> Self {
        Self { builder }
    }

    pub fn execute(&self, function: &AstNode) -> CpgResult<CodePropertyGraph> {
        let cfg = CfgBuilder::build(function)?;
        let dfg = SsaBuilder::build(function)?;
        self.builder.unify(function, &cfg, &dfg)
    }
}

impl Default for BuildCpgUseCase<DefaultCpgBuilder> {
    fn default() -> Self {
        Self::new(DefaultCpgBuilder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::cpg::infrastructure::CpgError;
    use crate::shared::models::{AstKind, Span};

    #[test]
    fn test_use_case_runs_both_builders_and_unifies() {
        let mut f = AstNode::new(AstKind::FunctionDef, Span::new(1, 0, 3, 0))
            .with_name("id")
            .with_children(vec![
                AstNode::new(AstKind::Parameter, Span::line(1)).with_name("x"),
                AstNode::block(vec![AstNode::ident("x", 2)], 2),
            ]);
        f.assign_ids();
        let cpg = BuildCpgUseCase::default().execute(&f).unwrap();
        assert!(!cpg.nodes.is_empty());
    }

    #[test]
    fn test_sub_builder_failure_is_wrapped() {
        let mut not_a_function = AstNode::ident("x", 1);
        not_a_function.assign_ids();
        let err = BuildCpgUseCase::default()
            .execute(&not_a_function)
            .unwrap_err();
        assert!(matches!(err, CpgError::FlowGraph(_)));
    }
}
