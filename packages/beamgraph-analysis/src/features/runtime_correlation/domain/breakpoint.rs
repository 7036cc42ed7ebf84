/*
 * Debugging primitives
 *
 * Structural breakpoints fire on an AST-pattern match along a path;
 * data-flow breakpoints fire when a named variable's flow satisfies the
 * given kinds along a path; semantic watchpoints accumulate a variable's
 * value history through a set of flow kinds within a scope.
 *
 * Specifications are validated at registration: a breakpoint without its
 * defining field is rejected.
 */

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::features::data_flow::domain::FlowKind;
use crate::features::patterns::domain::AstTemplate;

/// Registration request for a structural breakpoint
#[derive(Debug, Clone, Default)]
pub struct StructuralBreakpointSpec {
    /// Required; registration fails without it
    pub pattern: Option<AstTemplate>,
    /// Optional `module.function` path filter
    pub path: Option<String>,
}

/// Registration request for a data-flow breakpoint
#[derive(Debug, Clone, Default)]
pub struct DataFlowBreakpointSpec {
    /// Required; registration fails without it
    pub variable: Option<String>,
    /// Flow kinds that satisfy the breakpoint; empty means any
    pub flow_kinds: Vec<FlowKind>,
    pub path: Option<String>,
}

/// Registration request for a semantic watchpoint
#[derive(Debug, Clone, Default)]
pub struct WatchpointSpec {
    /// Required; registration fails without it
    pub variable: Option<String>,
    pub flow_kinds: Vec<FlowKind>,
    /// Optional `module` or `module.function` scope filter
    pub scope: Option<String>,
}

/// Registered structural breakpoint
#[derive(Debug, Clone)]
pub struct StructuralBreakpoint {
    pub id: Uuid,
    pub pattern: AstTemplate,
    pub path: Option<String>,
    pub enabled: bool,
}

/// Registered data-flow breakpoint
#[derive(Debug, Clone)]
pub struct DataFlowBreakpoint {
    pub id: Uuid,
    pub variable: String,
    pub flow_kinds: Vec<FlowKind>,
    pub path: Option<String>,
    pub enabled: bool,
}

/// Registered semantic watchpoint
#[derive(Debug, Clone)]
pub struct SemanticWatchpoint {
    pub id: Uuid,
    pub variable: String,
    pub flow_kinds: Vec<FlowKind>,
    pub scope: Option<String>,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakpointKind {
    Structural,
    DataFlow,
}

impl BreakpointKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakpointKind::Structural => "structural",
            BreakpointKind::DataFlow => "data_flow",
        }
    }
}

/// Notification emitted when a breakpoint fires
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakpointHit {
    pub breakpoint_id: Uuid,
    pub kind: BreakpointKind,
    pub event_key: String,
    pub line: u32,
    pub reason: String,
}
