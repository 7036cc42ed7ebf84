/*
 * CPG Query Indexes
 *
 * Lookup tables built once at unification time: nodes by type, by source
 * line, by variable name; edges grouped by type and by source graph.
 */

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use super::cpg::{CpgEdge, CpgNode, CpgNodeId};

/// Query indexes over one function's CPG
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CpgIndex {
    pub nodes_by_type: AHashMap<String, Vec<CpgNodeId>>,
    pub nodes_by_line: AHashMap<u32, Vec<CpgNodeId>>,
    pub nodes_by_variable: AHashMap<String, Vec<CpgNodeId>>,
    /// Edge positions in the graph's edge table, by edge type
    pub edges_by_type: AHashMap<String, Vec<usize>>,
    /// Edge positions, by originating graph
    pub edges_by_source_graph: AHashMap<String, Vec<usize>>,
}

impl CpgIndex {
    /// Build all indexes in one pass over nodes and edges
    pub fn build(nodes: &[CpgNode], edges: &[CpgEdge]) -> Self {
        let mut index = CpgIndex::default();

        for node in nodes {
            index
                .nodes_by_type
                .entry(node.node_type.as_str().to_string())
                .or_default()
                .push(node.id);
            index.nodes_by_line.entry(node.line).or_default().push(node.id);
            if let Some(name) = &node.name {
                index
                    .nodes_by_variable
                    .entry(name.clone())
                    .or_default()
                    .push(node.id);
            }
        }

        for (i, edge) in edges.iter().enumerate() {
            index
                .edges_by_type
                .entry(edge.edge_type.as_str().to_string())
                .or_default()
                .push(i);
            index
                .edges_by_source_graph
                .entry(edge.source_graph.as_str().to_string())
                .or_default()
                .push(i);
        }

        index
    }
}
