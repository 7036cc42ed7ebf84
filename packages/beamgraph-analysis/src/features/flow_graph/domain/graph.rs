/*
 * CFG (Control Flow Graph) Domain Model
 *
 * Nodes are control points, edges are possible execution transitions.
 *
 * Invariants:
 * - Exactly one entry node, one or more exit nodes
 * - Every decision point has >= 2 outgoing edges
 * - Edge probabilities are independent estimates in [0, 1], not a distribution
 */

use crate::shared::models::AstNodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::metrics::ComplexityMetrics;

/// Stable CFG node identifier (arena index within one function's graph)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct CfgNodeId(pub u32);

impl fmt::Display for CfgNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cfg:{}", self.0)
    }
}

/// Which construct a decision point came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecisionKind {
    Case,
    If,
    Cond,
    Try,
    Receive,
    Guard,
}

impl DecisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionKind::Case => "case",
            DecisionKind::If => "if",
            DecisionKind::Cond => "cond",
            DecisionKind::Try => "try",
            DecisionKind::Receive => "receive",
            DecisionKind::Guard => "guard",
        }
    }
}

/// CFG node kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CfgNodeKind {
    Entry,
    Exit,
    DecisionPoint(DecisionKind),
    MergePoint,
    Statement,
}

impl CfgNodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CfgNodeKind::Entry => "ENTRY",
            CfgNodeKind::Exit => "EXIT",
            CfgNodeKind::DecisionPoint(_) => "DECISION",
            CfgNodeKind::MergePoint => "MERGE",
            CfgNodeKind::Statement => "STATEMENT",
        }
    }

    pub fn is_decision(&self) -> bool {
        matches!(self, CfgNodeKind::DecisionPoint(_))
    }
}

/// CFG node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CfgNode {
    pub id: CfgNodeId,
    pub kind: CfgNodeKind,
    /// Source AST node this control point represents
    pub ast_node: AstNodeId,
    pub line: u32,
    /// Enclosing lexical scope ordinal (function body = 0, clause bodies nest)
    pub scope: u32,
    pub predecessors: Vec<CfgNodeId>,
    pub successors: Vec<CfgNodeId>,
}

/// CFG edge kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CfgEdgeKind {
    Sequential,
    PatternMatch,
    PatternNoMatch,
    ConditionalTrue,
    ConditionalFalse,
    Exception,
}

impl CfgEdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CfgEdgeKind::Sequential => "SEQUENTIAL",
            CfgEdgeKind::PatternMatch => "PATTERN_MATCH",
            CfgEdgeKind::PatternNoMatch => "PATTERN_NO_MATCH",
            CfgEdgeKind::ConditionalTrue => "TRUE",
            CfgEdgeKind::ConditionalFalse => "FALSE",
            CfgEdgeKind::Exception => "EXCEPTION",
        }
    }
}

/// CFG edge with optional guard expression and flow probability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CfgEdge {
    pub from: CfgNodeId,
    pub to: CfgNodeId,
    pub kind: CfgEdgeKind,
    /// Guard or condition expression, rendered as compact source text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guard: Option<String>,
    /// Independent flow probability estimate in [0, 1]
    pub probability: f64,
}

/// One function's control flow graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlFlowGraph {
    pub function: String,
    pub arity: usize,
    pub entry: CfgNodeId,
    pub exits: Vec<CfgNodeId>,
    pub nodes: Vec<CfgNode>,
    pub edges: Vec<CfgEdge>,
    pub metrics: ComplexityMetrics,
}

impl ControlFlowGraph {
    pub fn node(&self, id: CfgNodeId) -> Option<&CfgNode> {
        self.nodes.get(id.0 as usize)
    }

    /// All decision-point nodes
    pub fn decision_points(&self) -> impl Iterator<Item = &CfgNode> {
        self.nodes.iter().filter(|n| n.kind.is_decision())
    }

    /// Outgoing edges of a node
    pub fn edges_from(&self, id: CfgNodeId) -> impl Iterator<Item = &CfgEdge> {
        self.edges.iter().filter(move |e| e.from == id)
    }

    pub fn stats(&self) -> FlowGraphStats {
        FlowGraphStats {
            node_count: self.nodes.len(),
            edge_count: self.edges.len(),
            decision_points: self.decision_points().count(),
            exit_count: self.exits.len(),
        }
    }
}

/// Flow graph statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowGraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub decision_points: usize,
    pub exit_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_kind_as_str() {
        assert_eq!(CfgEdgeKind::PatternMatch.as_str(), "PATTERN_MATCH");
        assert_eq!(CfgEdgeKind::Exception.as_str(), "EXCEPTION");
    }

    #[test]
    fn test_decision_detection() {
        assert!(CfgNodeKind::DecisionPoint(DecisionKind::Case).is_decision());
        assert!(!CfgNodeKind::MergePoint.is_decision());
    }
}
