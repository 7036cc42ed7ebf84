/*
 * CPG (Code Property Graph) Domain Model
 *
 * A merged arena of nodes drawn from three source graphs. Each merged node
 * keeps its originating representation; cross-graph edges use types
 * distinct from the structural/control/data types inherited from AST, CFG
 * and DFG.
 *
 * Guarantees:
 * - Every CFG node and every DFG definition/use has exactly one
 *   corresponding CPG node
 * - No CPG node drops its originating metadata
 */

use crate::features::data_flow::domain::{DefId, FlowKind, UseId};
use crate::features::flow_graph::domain::{CfgEdgeKind, CfgNodeId};
use crate::shared::models::AstNodeId;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Merged node identifier (arena index)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct CpgNodeId(pub u32);

impl fmt::Display for CpgNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cpg:{}", self.0)
    }
}

/// Originating graph of a node or edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceGraph {
    Ast,
    Cfg,
    Dfg,
}

impl SourceGraph {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceGraph::Ast => "ast",
            SourceGraph::Cfg => "cfg",
            SourceGraph::Dfg => "dfg",
        }
    }
}

/// Unified node type vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CpgNodeType {
    Entry,
    Exit,
    ControlFlowNode,
    DecisionPoint,
    MergePoint,
    VariableDefinition,
    VariableUse,
    PhiNode,
}

impl CpgNodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CpgNodeType::Entry => "entry",
            CpgNodeType::Exit => "exit",
            CpgNodeType::ControlFlowNode => "control_flow_node",
            CpgNodeType::DecisionPoint => "decision_point",
            CpgNodeType::MergePoint => "merge_point",
            CpgNodeType::VariableDefinition => "variable_definition",
            CpgNodeType::VariableUse => "variable_use",
            CpgNodeType::PhiNode => "phi_node",
        }
    }
}

/// DFG-side reference carried by a merged node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DfgRef {
    Definition(DefId),
    Use(UseId),
    /// Index into the DFG's phi-node list
    Phi(u32),
}

/// Original-graph representations of one merged node, keyed by source graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Representations {
    pub ast: Option<AstNodeId>,
    pub cfg: Option<CfgNodeId>,
    pub dfg: Option<DfgRef>,
}

/// Merged CPG node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpgNode {
    pub id: CpgNodeId,
    pub node_type: CpgNodeType,
    pub line: u32,
    /// Variable name for definition/use/phi nodes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub representations: Representations,
    /// Open property bag (ssa name, kinds, probabilities, scope ordinals)
    pub properties: AHashMap<String, Value>,
    /// relationship-kind → related merged nodes (both directions recorded)
    pub relationships: AHashMap<String, Vec<CpgNodeId>>,
}

/// Unified edge type: structural/control/data types inherited from the
/// source graphs, plus the cross-graph types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpgEdgeType {
    Control(CfgEdgeKind),
    Data(FlowKind),
    CorrespondsTo,
    Influences,
    Alias,
}

impl CpgEdgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CpgEdgeType::Control(kind) => kind.as_str(),
            CpgEdgeType::Data(kind) => kind.as_str(),
            CpgEdgeType::CorrespondsTo => "corresponds_to",
            CpgEdgeType::Influences => "influences",
            CpgEdgeType::Alias => "alias",
        }
    }

    /// Cross-graph edges link views of one entity; they are synthesized by
    /// the unifier, not inherited from a source graph
    pub fn is_cross_graph(&self) -> bool {
        matches!(
            self,
            CpgEdgeType::CorrespondsTo | CpgEdgeType::Influences | CpgEdgeType::Alias
        )
    }
}

/// Merged CPG edge, tagged with the graph it came from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpgEdge {
    pub from: CpgNodeId,
    pub to: CpgNodeId,
    pub edge_type: CpgEdgeType,
    pub source_graph: SourceGraph,
    pub properties: AHashMap<String, Value>,
}

/// One function's unified graph with its query indexes and the side tables
/// mapping original-graph-local ids to merged ids
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodePropertyGraph {
    pub function: String,
    pub nodes: Vec<CpgNode>,
    pub edges: Vec<CpgEdge>,
    /// CFG node id → merged id (dense, index = original id)
    pub cfg_to_cpg: Vec<CpgNodeId>,
    /// Definition id → merged id
    pub def_to_cpg: Vec<CpgNodeId>,
    /// Use id → merged id
    pub use_to_cpg: Vec<CpgNodeId>,
    /// Phi index → merged id
    pub phi_to_cpg: Vec<CpgNodeId>,
    pub index: super::index::CpgIndex,
}

impl CodePropertyGraph {
    pub fn node(&self, id: CpgNodeId) -> Option<&CpgNode> {
        self.nodes.get(id.0 as usize)
    }

    pub fn cpg_of_cfg(&self, id: CfgNodeId) -> Option<CpgNodeId> {
        self.cfg_to_cpg.get(id.0 as usize).copied()
    }

    pub fn cpg_of_def(&self, id: DefId) -> Option<CpgNodeId> {
        self.def_to_cpg.get(id.0 as usize).copied()
    }

    pub fn cpg_of_use(&self, id: UseId) -> Option<CpgNodeId> {
        self.use_to_cpg.get(id.0 as usize).copied()
    }

    pub fn nodes_of_type(&self, node_type: CpgNodeType) -> impl Iterator<Item = &CpgNode> {
        self.index
            .nodes_by_type
            .get(node_type.as_str())
            .into_iter()
            .flatten()
            .filter_map(|id| self.node(*id))
    }

    pub fn nodes_at_line(&self, line: u32) -> impl Iterator<Item = &CpgNode> {
        self.index
            .nodes_by_line
            .get(&line)
            .into_iter()
            .flatten()
            .filter_map(|id| self.node(*id))
    }

    pub fn nodes_for_variable(&self, name: &str) -> impl Iterator<Item = &CpgNode> {
        self.index
            .nodes_by_variable
            .get(name)
            .into_iter()
            .flatten()
            .filter_map(|id| self.node(*id))
    }

    pub fn edges_of_type(&self, edge_type: CpgEdgeType) -> impl Iterator<Item = &CpgEdge> {
        self.index
            .edges_by_type
            .get(edge_type.as_str())
            .into_iter()
            .flatten()
            .filter_map(|i| self.edges.get(*i))
    }

    pub fn stats(&self) -> CpgStats {
        CpgStats {
            node_count: self.nodes.len(),
            edge_count: self.edges.len(),
            cross_graph_edges: self
                .edges
                .iter()
                .filter(|e| e.edge_type.is_cross_graph())
                .count(),
            control_edges: self
                .edges
                .iter()
                .filter(|e| matches!(e.edge_type, CpgEdgeType::Control(_)))
                .count(),
            data_edges: self
                .edges
                .iter()
                .filter(|e| matches!(e.edge_type, CpgEdgeType::Data(_)))
                .count(),
        }
    }
}

/// CPG summary statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpgStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub cross_graph_edges: usize,
    pub control_edges: usize,
    pub data_edges: usize,
}
