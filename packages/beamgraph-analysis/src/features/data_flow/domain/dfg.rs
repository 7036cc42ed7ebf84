/*
 * DFG (Data Flow Graph) Domain Model, SSA form
 *
 * Versions, definitions, uses, def-use edges and phi nodes for one
 * function.
 *
 * Invariants:
 * - Each (name, version) pair is assigned by at most one Definition;
 *   textual rebinding allocates a new version instead of mutating
 * - A phi node exists wherever >= 2 live, distinct versions of a name
 *   reach a control-merge point
 */

use crate::shared::models::AstNodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::scope::{ScopeId, ScopeTree};

/// Variable version identifier (arena index)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct VersionId(pub u32);

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v:{}", self.0)
    }
}

/// Definition identifier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct DefId(pub u32);

/// Use identifier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct UseId(pub u32);

/// One static-assignment instance of a source-level variable name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableVersion {
    pub id: VersionId,
    pub name: String,
    pub version: u32,
    /// Owning scope; every use site is in this scope or a descendant
    pub scope: ScopeId,
    pub is_parameter: bool,
    pub is_captured: bool,
}

impl VariableVersion {
    /// SSA display name, e.g. `x_2`
    pub fn ssa_name(&self) -> String {
        format!("{}_{}", self.name, self.version)
    }
}

/// What produced a binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefinitionKind {
    Assignment,
    Parameter,
    PatternMatch,
    ComprehensionBinding,
    ExceptionBinding,
    ReceiveBinding,
}

impl DefinitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefinitionKind::Assignment => "assignment",
            DefinitionKind::Parameter => "parameter",
            DefinitionKind::PatternMatch => "pattern_match",
            DefinitionKind::ComprehensionBinding => "comprehension_binding",
            DefinitionKind::ExceptionBinding => "exception_binding",
            DefinitionKind::ReceiveBinding => "receive_binding",
        }
    }
}

/// A binding event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Definition {
    pub id: DefId,
    pub variable: VersionId,
    pub ast_node: AstNodeId,
    pub kind: DefinitionKind,
    pub scope: ScopeId,
    /// Definitions of the same name that were live when this one was made
    pub reaching_definitions: Vec<DefId>,
}

/// How a variable is read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UseKind {
    Read,
    Pattern,
    Guard,
    CallArgument,
    PipeStage,
    MessagePayload,
    ClosureCapture,
}

impl UseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UseKind::Read => "read",
            UseKind::Pattern => "pattern",
            UseKind::Guard => "guard",
            UseKind::CallArgument => "call_argument",
            UseKind::PipeStage => "pipe_stage",
            UseKind::MessagePayload => "message_payload",
            UseKind::ClosureCapture => "closure_capture",
        }
    }
}

/// A read event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Use {
    pub id: UseId,
    pub variable: VersionId,
    pub ast_node: AstNodeId,
    pub kind: UseKind,
    pub scope: ScopeId,
    /// The definition whose value this use observes; `None` for uses of a
    /// phi-merged or undefined version
    pub reaching_definition: Option<DefId>,
}

/// How a value flows from a definition to a use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowKind {
    Direct,
    Conditional,
    PatternMatch,
    PipelineStage,
    ReturnValue,
    ClosureCapture,
    MessagePass,
    Destructure,
}

impl FlowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowKind::Direct => "direct",
            FlowKind::Conditional => "conditional",
            FlowKind::PatternMatch => "pattern_match",
            FlowKind::PipelineStage => "pipeline_stage",
            FlowKind::ReturnValue => "return_value",
            FlowKind::ClosureCapture => "closure_capture",
            FlowKind::MessagePass => "message_pass",
            FlowKind::Destructure => "destructure",
        }
    }
}

/// Def-use edge with the transformation applied along the way (for
/// pipeline stages, the stage function)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataFlowEdge {
    pub def: DefId,
    pub use_site: UseId,
    pub kind: FlowKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transformation: Option<String>,
}

/// One incoming branch of a phi node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhiSource {
    pub version: VersionId,
    /// Which branch this version arrives from (clause pattern / condition)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// "The version observed after the merge is one of these, selected by
/// which incoming branch executed."
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhiNode {
    pub target: VersionId,
    pub sources: Vec<PhiSource>,
    pub merge_node: AstNodeId,
}

/// Analyzed-program defect surfaced by the builder. These are output data,
/// not analysis errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DfgDiagnostic {
    UndefinedVariable {
        name: String,
        ast_node: AstNodeId,
        line: u32,
    },
}

/// One function's data flow graph in SSA form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataFlowGraph {
    pub function: String,
    pub versions: Vec<VariableVersion>,
    pub definitions: Vec<Definition>,
    pub uses: Vec<Use>,
    pub edges: Vec<DataFlowEdge>,
    pub phi_nodes: Vec<PhiNode>,
    pub scopes: ScopeTree,
    pub diagnostics: Vec<DfgDiagnostic>,
}

impl DataFlowGraph {
    pub fn version(&self, id: VersionId) -> Option<&VariableVersion> {
        self.versions.get(id.0 as usize)
    }

    pub fn definition(&self, id: DefId) -> Option<&Definition> {
        self.definitions.get(id.0 as usize)
    }

    /// The definition assigning a version, if any (phi targets and
    /// undefined versions have none)
    pub fn definition_of(&self, version: VersionId) -> Option<&Definition> {
        self.definitions.iter().find(|d| d.variable == version)
    }

    pub fn uses_of(&self, version: VersionId) -> impl Iterator<Item = &Use> {
        self.uses.iter().filter(move |u| u.variable == version)
    }

    /// Versions of a source-level name, in allocation order
    pub fn versions_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a VariableVersion> {
        self.versions.iter().filter(move |v| v.name == name)
    }

    pub fn phi_for(&self, version: VersionId) -> Option<&PhiNode> {
        self.phi_nodes.iter().find(|p| p.target == version)
    }

    pub fn stats(&self) -> SsaStats {
        SsaStats {
            version_count: self.versions.len(),
            definition_count: self.definitions.len(),
            use_count: self.uses.len(),
            edge_count: self.edges.len(),
            phi_count: self.phi_nodes.len(),
            scope_count: self.scopes.len(),
            diagnostic_count: self.diagnostics.len(),
        }
    }
}

/// SSA construction statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SsaStats {
    pub version_count: usize,
    pub definition_count: usize,
    pub use_count: usize,
    pub edge_count: usize,
    pub phi_count: usize,
    pub scope_count: usize,
    pub diagnostic_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssa_name() {
        let v = VariableVersion {
            id: VersionId(0),
            name: "total".to_string(),
            version: 2,
            scope: ScopeId(0),
            is_parameter: false,
            is_captured: false,
        };
        assert_eq!(v.ssa_name(), "total_2");
    }

    #[test]
    fn test_flow_kind_as_str() {
        assert_eq!(FlowKind::PipelineStage.as_str(), "pipeline_stage");
        assert_eq!(FlowKind::MessagePass.as_str(), "message_pass");
    }
}
