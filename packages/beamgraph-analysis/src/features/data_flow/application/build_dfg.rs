use crate::shared::models::AstNode;

use super::super::domain::DataFlowGraph;
use super::super::infrastructure::{DfgResult, SsaBuilder};
use super::super::ports::DfgBuilder;

/// Default port implementation backed by [`SsaBuilder`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDfgBuilder;

impl DfgBuilder for DefaultDfgBuilder {
    fn build_dfg(&self, function: &AstNode) -> DfgResult<DataFlowGraph> {
        SsaBuilder::build(function)
    }
}

pub struct BuildDfgUseCase<B: DfgBuilder> {
    builder: B,
}

impl<B: DfgBuilder> BuildDfgUseCase<B> {
    pub fn new(builder: B) -> Self {
        Self { builder }
    }

    pub fn execute(&self, function: &AstNode) -> DfgResult<DataFlowGraph> {
        self.builder.build_dfg(function)
    }
}

impl Default for BuildDfgUseCase<DefaultDfgBuilder> {
    fn default() -> Self {
        Self::new(DefaultDfgBuilder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{AstKind, Span};

    #[test]
    fn test_use_case_builds_through_port() {
        let mut f = AstNode::new(AstKind::FunctionDef, Span::new(1, 0, 3, 0))
            .with_name("id")
            .with_children(vec![
                AstNode::new(AstKind::Parameter, Span::line(1)).with_name("x"),
                AstNode::block(vec![AstNode::ident("x", 2)], 2),
            ]);
        f.assign_ids();
        let dfg = BuildDfgUseCase::default().execute(&f).unwrap();
        assert_eq!(dfg.versions.len(), 1);
        assert_eq!(dfg.uses.len(), 1);
    }
}
