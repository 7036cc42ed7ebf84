use crate::shared::models::AstNode;

use super::super::domain::ControlFlowGraph;
use super::super::infrastructure::{CfgBuilder, FlowGraphResult};
use super::super::ports::FlowGraphBuilder;

/// Default port implementation backed by [`CfgBuilder`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFlowGraphBuilder;

impl FlowGraphBuilder for DefaultFlowGraphBuilder {
    fn build_cfg(&self, function: &AstNode) -> FlowGraphResult<ControlFlowGraph> {
        CfgBuilder::build(function)
    }
}

pub struct BuildFlowGraphUseCase<B: FlowGraphBuilder> {
    builder: B,
}

impl<B: FlowGraphBuilder> BuildFlowGraphUseCase<B> {
    pub fn new(builder: B) -> Self {
        Self { builder }
    }

    pub fn execute(&self, function: &AstNode) -> FlowGraphResult<ControlFlowGraph> {
        self.builder.build_cfg(function)
    }
}

impl Default for BuildFlowGraphUseCase<DefaultFlowGraphBuilder> {
    fn default() -> Self {
        Self::new(DefaultFlowGraphBuilder)
    }
}
