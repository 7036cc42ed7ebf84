//! Data-flow graph construction in SSA form
//!
//! Every binding allocates a fresh variable version; phi nodes are
//! synthesized at control-merge points so def-use chains stay precise
//! across branches.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use application::BuildDfgUseCase;
pub use domain::{
    DataFlowEdge, DataFlowGraph, DefId, Definition, DefinitionKind, DfgDiagnostic, FlowKind,
    PhiNode, PhiSource, Scope, ScopeId, ScopeKind, ScopeTree, SsaStats, Use, UseId, UseKind,
    VariableVersion, VersionId,
};
pub use infrastructure::{DfgError, DfgResult, SsaBuilder};
pub use ports::DfgBuilder;
