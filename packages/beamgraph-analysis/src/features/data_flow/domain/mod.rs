//! Data flow domain models

mod dfg;
mod scope;

pub use dfg::{
    DataFlowEdge, DataFlowGraph, DefId, Definition, DefinitionKind, DfgDiagnostic, FlowKind,
    PhiNode, PhiSource, SsaStats, Use, UseId, UseKind, VariableVersion, VersionId,
};
pub use scope::{Scope, ScopeId, ScopeKind, ScopeTree};
