/*
 * CPG Unifier
 *
 * Steps:
 * 1. One merged node per CFG node and per DFG definition/use/phi, each
 *    tagged with its originating representation
 * 2. CFG and DFG edges translated into merged edges carrying a
 *    source-graph tag
 * 3. Cross-graph edges synthesized: corresponds_to (a DFG event and the
 *    CFG control point executing it), influences (a guard use and its
 *    decision point), alias (a phi target and its source definitions)
 * 4. Query indexes built over the final node/edge tables
 *
 * Correspondence is anchored through the AST: every DFG event's AST node
 * is owned by the nearest enclosing AST node that materialized as a CFG
 * control point.
 */

use ahash::{AHashMap, AHashSet};
use serde_json::json;
use tracing::debug;

use crate::features::data_flow::domain::DataFlowGraph;
use crate::features::flow_graph::domain::{CfgNodeKind, ControlFlowGraph};
use crate::shared::models::{AstNode, AstNodeId};

use super::super::domain::{
    CodePropertyGraph, CpgEdge, CpgEdgeType, CpgIndex, CpgNode, CpgNodeId, CpgNodeType, DfgRef,
    Representations, SourceGraph,
};
use super::errors::{CpgError, CpgResult};

pub struct CpgUnifier;

impl CpgUnifier {
    /// Merge one function's AST, CFG and DFG into a code property graph
    pub fn unify(
        function: &AstNode,
        cfg: &ControlFlowGraph,
        dfg: &DataFlowGraph,
    ) -> CpgResult<CodePropertyGraph> {
        debug!(function = %cfg.function, "unifying CPG");

        let mut nodes: Vec<CpgNode> = Vec::new();
        let mut edges: Vec<CpgEdge> = Vec::new();

        // Line lookup for DFG events, which reference AST leaves
        let line_of = |ast_id: AstNodeId| function.find(ast_id).map(|n| n.line()).unwrap_or(0);

        // Step 1a: CFG nodes
        let mut cfg_to_cpg = Vec::with_capacity(cfg.nodes.len());
        for cfg_node in &cfg.nodes {
            let node_type = match cfg_node.kind {
                CfgNodeKind::Entry => CpgNodeType::Entry,
                CfgNodeKind::Exit => CpgNodeType::Exit,
                CfgNodeKind::DecisionPoint(_) => CpgNodeType::DecisionPoint,
                CfgNodeKind::MergePoint => CpgNodeType::MergePoint,
                CfgNodeKind::Statement => CpgNodeType::ControlFlowNode,
            };
            let mut properties = AHashMap::new();
            properties.insert("cfg_kind".to_string(), json!(cfg_node.kind.as_str()));
            properties.insert("scope".to_string(), json!(cfg_node.scope));
            if let CfgNodeKind::DecisionPoint(kind) = cfg_node.kind {
                properties.insert("decision_kind".to_string(), json!(kind.as_str()));
            }

            let id = CpgNodeId(nodes.len() as u32);
            nodes.push(CpgNode {
                id,
                node_type,
                line: cfg_node.line,
                name: None,
                representations: Representations {
                    ast: Some(cfg_node.ast_node),
                    cfg: Some(cfg_node.id),
                    dfg: None,
                },
                properties,
                relationships: AHashMap::new(),
            });
            cfg_to_cpg.push(id);
        }

        // Step 1b: DFG definitions, uses and phi nodes
        let mut def_to_cpg = Vec::with_capacity(dfg.definitions.len());
        for def in &dfg.definitions {
            let version = dfg.version(def.variable).ok_or_else(|| CpgError::Inconsistent {
                reason: format!("definition {:?} references unknown version", def.id),
            })?;
            let mut properties = AHashMap::new();
            properties.insert("ssa_name".to_string(), json!(version.ssa_name()));
            properties.insert("version".to_string(), json!(version.version));
            properties.insert("definition_kind".to_string(), json!(def.kind.as_str()));
            properties.insert("scope".to_string(), json!(def.scope.0));
            if version.is_parameter {
                properties.insert("parameter".to_string(), json!(true));
            }

            let id = CpgNodeId(nodes.len() as u32);
            nodes.push(CpgNode {
                id,
                node_type: CpgNodeType::VariableDefinition,
                line: line_of(def.ast_node),
                name: Some(version.name.clone()),
                representations: Representations {
                    ast: Some(def.ast_node),
                    cfg: None,
                    dfg: Some(DfgRef::Definition(def.id)),
                },
                properties,
                relationships: AHashMap::new(),
            });
            def_to_cpg.push(id);
        }

        let mut use_to_cpg = Vec::with_capacity(dfg.uses.len());
        for use_site in &dfg.uses {
            let version = dfg
                .version(use_site.variable)
                .ok_or_else(|| CpgError::Inconsistent {
                    reason: format!("use {:?} references unknown version", use_site.id),
                })?;
            let mut properties = AHashMap::new();
            properties.insert("ssa_name".to_string(), json!(version.ssa_name()));
            properties.insert("use_kind".to_string(), json!(use_site.kind.as_str()));
            properties.insert("scope".to_string(), json!(use_site.scope.0));

            let id = CpgNodeId(nodes.len() as u32);
            nodes.push(CpgNode {
                id,
                node_type: CpgNodeType::VariableUse,
                line: line_of(use_site.ast_node),
                name: Some(version.name.clone()),
                representations: Representations {
                    ast: Some(use_site.ast_node),
                    cfg: None,
                    dfg: Some(DfgRef::Use(use_site.id)),
                },
                properties,
                relationships: AHashMap::new(),
            });
            use_to_cpg.push(id);
        }

        let mut phi_to_cpg = Vec::with_capacity(dfg.phi_nodes.len());
        for (i, phi) in dfg.phi_nodes.iter().enumerate() {
            let version = dfg.version(phi.target).ok_or_else(|| CpgError::Inconsistent {
                reason: format!("phi {} references unknown version", i),
            })?;
            let mut properties = AHashMap::new();
            properties.insert("ssa_name".to_string(), json!(version.ssa_name()));
            properties.insert("source_count".to_string(), json!(phi.sources.len()));

            let id = CpgNodeId(nodes.len() as u32);
            nodes.push(CpgNode {
                id,
                node_type: CpgNodeType::PhiNode,
                line: line_of(phi.merge_node),
                name: Some(version.name.clone()),
                representations: Representations {
                    ast: Some(phi.merge_node),
                    cfg: None,
                    dfg: Some(DfgRef::Phi(i as u32)),
                },
                properties,
                relationships: AHashMap::new(),
            });
            phi_to_cpg.push(id);
        }

        // Step 2a: CFG edges
        for edge in &cfg.edges {
            let from = *cfg_to_cpg
                .get(edge.from.0 as usize)
                .ok_or_else(|| CpgError::Inconsistent {
                    reason: format!("CFG edge from unknown node {}", edge.from),
                })?;
            let to = *cfg_to_cpg
                .get(edge.to.0 as usize)
                .ok_or_else(|| CpgError::Inconsistent {
                    reason: format!("CFG edge to unknown node {}", edge.to),
                })?;
            let mut properties = AHashMap::new();
            properties.insert("probability".to_string(), json!(edge.probability));
            if let Some(guard) = &edge.guard {
                properties.insert("guard".to_string(), json!(guard));
            }
            edges.push(CpgEdge {
                from,
                to,
                edge_type: CpgEdgeType::Control(edge.kind),
                source_graph: SourceGraph::Cfg,
                properties,
            });
        }

        // Step 2b: DFG def-use edges
        for edge in &dfg.edges {
            let from = *def_to_cpg
                .get(edge.def.0 as usize)
                .ok_or_else(|| CpgError::Inconsistent {
                    reason: format!("data edge from unknown definition {:?}", edge.def),
                })?;
            let to = *use_to_cpg
                .get(edge.use_site.0 as usize)
                .ok_or_else(|| CpgError::Inconsistent {
                    reason: format!("data edge to unknown use {:?}", edge.use_site),
                })?;
            let mut properties = AHashMap::new();
            if let Some(t) = &edge.transformation {
                properties.insert("transformation".to_string(), json!(t));
            }
            edges.push(CpgEdge {
                from,
                to,
                edge_type: CpgEdgeType::Data(edge.kind),
                source_graph: SourceGraph::Dfg,
                properties,
            });
            relate(&mut nodes, from, "flows_to", to);
            relate(&mut nodes, to, "flows_from", from);
        }

        // Step 3: cross-graph edges, anchored through the AST
        let cfg_ast_ids: AHashSet<AstNodeId> = cfg.nodes.iter().map(|n| n.ast_node).collect();
        let owner_map = build_owner_map(function, &cfg_ast_ids);
        // First CFG node per AST id (the decision precedes its merge node)
        let mut cfg_by_ast: AHashMap<AstNodeId, CpgNodeId> = AHashMap::new();
        for cfg_node in &cfg.nodes {
            cfg_by_ast
                .entry(cfg_node.ast_node)
                .or_insert(cfg_to_cpg[cfg_node.id.0 as usize]);
        }

        let dfg_origin: Vec<CpgNodeId> = def_to_cpg
            .iter()
            .chain(use_to_cpg.iter())
            .chain(phi_to_cpg.iter())
            .copied()
            .collect();
        let mut cross: Vec<(CpgNodeId, CpgNodeId, CpgEdgeType)> = Vec::new();
        for &id in &dfg_origin {
            let ast_id = match nodes[id.0 as usize].representations.ast {
                Some(ast_id) => ast_id,
                None => continue,
            };
            if let Some(control) = owner_map.get(&ast_id).and_then(|o| cfg_by_ast.get(o)) {
                cross.push((id, *control, CpgEdgeType::CorrespondsTo));
            }
        }

        // A guard use influences the decision point that evaluates it
        for (use_site, &use_cpg) in dfg.uses.iter().zip(use_to_cpg.iter()) {
            if use_site.kind != crate::features::data_flow::domain::UseKind::Guard {
                continue;
            }
            if let Some(control) = owner_map
                .get(&use_site.ast_node)
                .and_then(|o| cfg_by_ast.get(o))
            {
                let is_decision =
                    nodes[control.0 as usize].node_type == CpgNodeType::DecisionPoint;
                if is_decision {
                    cross.push((use_cpg, *control, CpgEdgeType::Influences));
                }
            }
        }

        // A phi target aliases each version it merges
        for (phi, &phi_cpg) in dfg.phi_nodes.iter().zip(phi_to_cpg.iter()) {
            for source in &phi.sources {
                let source_cpg = dfg
                    .definition_of(source.version)
                    .map(|d| def_to_cpg[d.id.0 as usize])
                    .or_else(|| {
                        dfg.phi_nodes
                            .iter()
                            .position(|p| p.target == source.version)
                            .map(|i| phi_to_cpg[i])
                    });
                if let Some(source_cpg) = source_cpg {
                    cross.push((phi_cpg, source_cpg, CpgEdgeType::Alias));
                }
            }
        }

        for (from, to, edge_type) in cross {
            relate(&mut nodes, from, edge_type.as_str(), to);
            relate(&mut nodes, to, edge_type.as_str(), from);
            edges.push(CpgEdge {
                from,
                to,
                edge_type,
                source_graph: SourceGraph::Ast,
                properties: AHashMap::new(),
            });
        }

        // Step 4: query indexes
        let index = CpgIndex::build(&nodes, &edges);

        debug!(
            function = %cfg.function,
            nodes = nodes.len(),
            edges = edges.len(),
            "CPG complete"
        );

        Ok(CodePropertyGraph {
            function: cfg.function.clone(),
            nodes,
            edges,
            cfg_to_cpg,
            def_to_cpg,
            use_to_cpg,
            phi_to_cpg,
            index,
        })
    }
}

fn relate(nodes: &mut [CpgNode], from: CpgNodeId, kind: &str, to: CpgNodeId) {
    nodes[from.0 as usize]
        .relationships
        .entry(kind.to_string())
        .or_default()
        .push(to);
}

/// Map every AST node to the nearest enclosing AST node that materialized
/// as a CFG control point
fn build_owner_map(
    root: &AstNode,
    cfg_ast_ids: &AHashSet<AstNodeId>,
) -> AHashMap<AstNodeId, AstNodeId> {
    fn walk(
        node: &AstNode,
        current: Option<AstNodeId>,
        cfg_ast_ids: &AHashSet<AstNodeId>,
        map: &mut AHashMap<AstNodeId, AstNodeId>,
    ) {
        let here = if cfg_ast_ids.contains(&node.id) {
            Some(node.id)
        } else {
            current
        };
        if let Some(owner) = here {
            map.insert(node.id, owner);
        }
        for child in &node.children {
            walk(child, here, cfg_ast_ids, map);
        }
    }
    let mut map = AHashMap::new();
    walk(root, None, cfg_ast_ids, &mut map);
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::data_flow::infrastructure::SsaBuilder;
    use crate::features::flow_graph::infrastructure::CfgBuilder;
    use crate::shared::models::{AstKind, Span};
    use serde_json::json;

    fn branchy_function() -> AstNode {
        // f(flag) = (x = 0; case flag do 1 -> x = 1; _ -> x = 2 end; x)
        let case_node = AstNode::new(AstKind::Case, Span::new(3, 0, 6, 0)).with_children(vec![
            AstNode::ident("flag", 3),
            AstNode::new(AstKind::CaseClause, Span::line(4)).with_children(vec![
                AstNode::literal(json!(1), 4),
                AstNode::block(
                    vec![AstNode::assign(
                        AstNode::ident("x", 4),
                        AstNode::literal(json!(1), 4),
                        4,
                    )],
                    4,
                ),
            ]),
            AstNode::new(AstKind::CaseClause, Span::line(5)).with_children(vec![
                AstNode::new(AstKind::Wildcard, Span::line(5)),
                AstNode::block(
                    vec![AstNode::assign(
                        AstNode::ident("x", 5),
                        AstNode::literal(json!(2), 5),
                        5,
                    )],
                    5,
                ),
            ]),
        ]);
        let mut f = AstNode::new(AstKind::FunctionDef, Span::new(1, 0, 8, 0))
            .with_name("f")
            .with_children(vec![
                AstNode::new(AstKind::Parameter, Span::line(1)).with_name("flag"),
                AstNode::block(
                    vec![
                        AstNode::assign(
                            AstNode::ident("x", 2),
                            AstNode::literal(json!(0), 2),
                            2,
                        ),
                        case_node,
                        AstNode::ident("x", 7),
                    ],
                    2,
                ),
            ]);
        f.assign_ids();
        f
    }

    fn build_cpg() -> (CodePropertyGraph, ControlFlowGraph, DataFlowGraph) {
        let f = branchy_function();
        let cfg = CfgBuilder::build(&f).unwrap();
        let dfg = SsaBuilder::build(&f).unwrap();
        let cpg = CpgUnifier::unify(&f, &cfg, &dfg).unwrap();
        (cpg, cfg, dfg)
    }

    #[test]
    fn test_every_cfg_node_has_exactly_one_cpg_node() {
        let (cpg, cfg, _) = build_cpg();
        assert_eq!(cpg.cfg_to_cpg.len(), cfg.nodes.len());
        let distinct: std::collections::HashSet<_> = cpg.cfg_to_cpg.iter().collect();
        assert_eq!(distinct.len(), cfg.nodes.len());
        for (cfg_node, cpg_id) in cfg.nodes.iter().zip(cpg.cfg_to_cpg.iter()) {
            let node = cpg.node(*cpg_id).unwrap();
            assert_eq!(node.representations.cfg, Some(cfg_node.id));
        }
    }

    #[test]
    fn test_every_def_and_use_has_exactly_one_cpg_node() {
        let (cpg, _, dfg) = build_cpg();
        assert_eq!(cpg.def_to_cpg.len(), dfg.definitions.len());
        assert_eq!(cpg.use_to_cpg.len(), dfg.uses.len());
        let mut all: Vec<CpgNodeId> = cpg.def_to_cpg.clone();
        all.extend(&cpg.use_to_cpg);
        let distinct: std::collections::HashSet<_> = all.iter().collect();
        assert_eq!(distinct.len(), all.len());
    }

    #[test]
    fn test_edges_carry_source_graph_tags() {
        let (cpg, cfg, dfg) = build_cpg();
        let control = cpg.index.edges_by_source_graph.get("cfg").unwrap();
        assert_eq!(control.len(), cfg.edges.len());
        let data = cpg.index.edges_by_source_graph.get("dfg").unwrap();
        assert_eq!(data.len(), dfg.edges.len());
    }

    #[test]
    fn test_cross_graph_correspondence() {
        let (cpg, _, _) = build_cpg();
        let corresponds: Vec<_> = cpg.edges_of_type(CpgEdgeType::CorrespondsTo).collect();
        assert!(
            !corresponds.is_empty(),
            "DFG events correspond to CFG control points"
        );
        // Every correspondence links a DFG-origin node to a CFG-origin node
        for edge in corresponds {
            let from = cpg.node(edge.from).unwrap();
            let to = cpg.node(edge.to).unwrap();
            assert!(from.representations.dfg.is_some());
            assert!(to.representations.cfg.is_some());
        }
    }

    #[test]
    fn test_phi_alias_edges() {
        let (cpg, _, dfg) = build_cpg();
        assert_eq!(dfg.phi_nodes.len(), 1);
        let aliases: Vec<_> = cpg.edges_of_type(CpgEdgeType::Alias).collect();
        assert_eq!(aliases.len(), 2, "one alias per phi source");
    }

    #[test]
    fn test_variable_index() {
        let (cpg, _, _) = build_cpg();
        let x_nodes: Vec<_> = cpg.nodes_for_variable("x").collect();
        assert!(x_nodes.len() >= 3, "defs, uses and phi of x are indexed");
        assert!(cpg.nodes_for_variable("nope").next().is_none());
    }

    #[test]
    fn test_line_index() {
        let (cpg, _, _) = build_cpg();
        assert!(cpg.nodes_at_line(2).next().is_some());
    }
}
