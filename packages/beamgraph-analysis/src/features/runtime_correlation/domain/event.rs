/*
 * Runtime events and their resolved static contexts
 *
 * An execution event arrives with at least module/function/arity; the
 * correlator resolves it to an AST context and, on enhancement, attaches
 * structural and data-flow information drawn from the static graphs.
 */

use crate::shared::models::AstNodeId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One captured execution event from the live runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeEvent {
    pub module: String,
    pub function: String,
    pub arity: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ast_node_id: Option<AstNodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// Variable name → observed value snapshot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_us: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl RuntimeEvent {
    pub fn new(module: impl Into<String>, function: impl Into<String>, arity: usize) -> Self {
        Self {
            module: module.into(),
            function: function.into(),
            arity,
            ast_node_id: None,
            line: None,
            variables: None,
            duration_us: None,
            correlation_id: None,
        }
    }

    pub fn at_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    pub fn at_node(mut self, node: AstNodeId) -> Self {
        self.ast_node_id = Some(node);
        self
    }

    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = Some(variables);
        self
    }

    pub fn with_duration_us(mut self, duration_us: u64) -> Self {
        self.duration_us = Some(duration_us);
        self
    }

    /// Synthesized resolution-cache key
    pub fn key(&self) -> String {
        format!(
            "{}.{}/{}@{}:{}",
            self.module,
            self.function,
            self.arity,
            self.ast_node_id.map(|n| n.0 as i64).unwrap_or(-1),
            self.line.map(|l| l as i64).unwrap_or(-1),
        )
    }

    /// `module.function` path for breakpoint filtering
    pub fn path(&self) -> String {
        format!("{}.{}", self.module, self.function)
    }
}

/// Static context an event resolved to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AstContext {
    pub module: String,
    pub function: String,
    pub arity: usize,
    /// Provided by the event or synthesized from its line
    pub ast_node_id: AstNodeId,
    pub line: u32,
    /// Control point executing at this event, when one maps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cfg_node: Option<crate::features::flow_graph::domain::CfgNodeId>,
    /// Enclosing lexical scope ordinal from the CFG
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<u32>,
}

/// Structural view of the event's position in the source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuralInfo {
    pub ast_kind: String,
    pub nesting_depth: u32,
    /// Nearest enclosing clause construct, when inside one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern_context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_flow_position: Option<String>,
}

/// Data-flow view: what is defined, used and depended on at this point
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataFlowInfo {
    pub definitions: Vec<String>,
    pub uses: Vec<String>,
    pub dependencies: Vec<String>,
}

/// Event with its resolved context and enrichment attached; events that
/// could not be resolved pass through with everything unset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancedEvent {
    pub event: RuntimeEvent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<AstContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structural: Option<StructuralInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_flow: Option<DataFlowInfo>,
}

impl EnhancedEvent {
    /// Degraded record for an event with no resolvable context
    pub fn pass_through(event: RuntimeEvent) -> Self {
        Self {
            event,
            context: None,
            structural: None,
            data_flow: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.context.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_key_includes_location() {
        let bare = RuntimeEvent::new("Shop", "checkout", 2);
        let located = RuntimeEvent::new("Shop", "checkout", 2).at_line(14);
        assert_ne!(bare.key(), located.key());
        assert!(bare.key().starts_with("Shop.checkout/2"));
    }

    #[test]
    fn test_pass_through_is_unresolved() {
        let enhanced = EnhancedEvent::pass_through(RuntimeEvent::new("M", "f", 0));
        assert!(!enhanced.is_resolved());
    }
}
