/*
 * CFG Builder
 *
 * Recursive AST descent producing one function's control flow graph.
 *
 * Lowering rules:
 * - Sequence blocks chain statement nodes in textual order
 * - case/receive: one decision node dispatching all clauses, unless clauses
 *   carry guards, in which case the guards lower to a decision chain
 *   (match edge into the clause body, no-match edge to the next clause)
 * - if: one decision node with true/false edges
 * - cond: one decision node with one conditional edge per clause
 * - try: one decision node, sequential edge into the body, exception edges
 *   into each catch clause, optional after-block joining all paths
 * - raise: statement node wired straight to the exit node
 * - pipelines and calls lower to plain statement nodes; their significance
 *   is data flow, not control flow
 *
 * Branch exits re-join at a synthesized merge-point node. A clause whose
 * every path terminates contributes to essential complexity instead of
 * merging.
 */

use tracing::debug;

use crate::shared::models::{AstKind, AstNode};

use super::super::domain::{
    CfgEdge, CfgEdgeKind, CfgNode, CfgNodeId, CfgNodeKind, ControlFlowGraph, DecisionKind,
};
use super::complexity;
use super::errors::{FlowGraphError, FlowGraphResult};

/// Probability estimates per edge role. Independent estimates, not a
/// distribution over a node's out-edges.
const PROB_SEQUENTIAL: f64 = 1.0;
const PROB_GUARD_MATCH: f64 = 0.5;
const PROB_EXCEPTION: f64 = 0.15;
const PROB_MATCH_FAILURE: f64 = 0.05;

/// An edge waiting for its target node
#[derive(Debug, Clone)]
struct Incoming {
    from: CfgNodeId,
    kind: CfgEdgeKind,
    guard: Option<String>,
    probability: f64,
}

impl Incoming {
    fn seq(from: CfgNodeId) -> Self {
        Self {
            from,
            kind: CfgEdgeKind::Sequential,
            guard: None,
            probability: PROB_SEQUENTIAL,
        }
    }
}

/// Dangling edges out of the most recently lowered construct
type Frontier = Vec<Incoming>;

/// Clause children decomposed: [pattern, Guard?, Block]
struct ClauseParts<'a> {
    pattern: &'a AstNode,
    guard: Option<&'a AstNode>,
    body: &'a AstNode,
}

fn clause_parts<'a>(construct: &str, clause: &'a AstNode) -> FlowGraphResult<ClauseParts<'a>> {
    let malformed = |reason: &str| FlowGraphError::MalformedClause {
        construct: construct.to_string(),
        ast_node: clause.id,
        reason: reason.to_string(),
    };
    let pattern = clause.children.first().ok_or_else(|| malformed("no pattern"))?;
    let body = clause
        .children
        .last()
        .filter(|n| n.kind == AstKind::Block)
        .ok_or_else(|| malformed("no body block"))?;
    let guard = clause
        .children
        .iter()
        .find(|n| n.kind == AstKind::Guard);
    Ok(ClauseParts {
        pattern,
        guard,
        body,
    })
}

/// Compact source rendering of an expression, used for edge guards
fn expr_text(node: &AstNode) -> String {
    match node.kind {
        AstKind::Identifier | AstKind::Parameter => {
            node.name.clone().unwrap_or_else(|| "_".to_string())
        }
        AstKind::Wildcard => "_".to_string(),
        AstKind::Literal => node
            .value
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "nil".to_string()),
        AstKind::Call => format!("{}(...)", node.name.as_deref().unwrap_or("fn")),
        AstKind::BinaryOp => {
            let op = node.name.as_deref().unwrap_or("?");
            match node.children.as_slice() {
                [lhs, rhs] => format!("{} {} {}", expr_text(lhs), op, expr_text(rhs)),
                _ => op.to_string(),
            }
        }
        AstKind::Guard => node
            .children
            .first()
            .map(expr_text)
            .unwrap_or_else(|| "true".to_string()),
        AstKind::TuplePattern => "{...}".to_string(),
        AstKind::ListPattern => "[...]".to_string(),
        AstKind::MapPattern => "%{...}".to_string(),
        _ => node.kind.as_str().to_string(),
    }
}

/// CFG builder: immutable AST in, value-like graph out.
///
/// All mutable state is local to one `build` call; sibling-function builds
/// share nothing and can run in parallel.
pub struct CfgBuilder {
    nodes: Vec<CfgNode>,
    edges: Vec<CfgEdge>,
    exit: CfgNodeId,
    scope: u32,
    next_scope: u32,
    /// current branching nesting depth during descent
    depth: u32,
    cognitive: u32,
    /// decision points with a terminating (non-merging) branch
    essential_increments: u32,
}

impl CfgBuilder {
    fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            exit: CfgNodeId(0),
            scope: 0,
            next_scope: 1,
            depth: 0,
            cognitive: 0,
            essential_increments: 0,
        }
    }

    /// Build the CFG for one function definition
    pub fn build(function: &AstNode) -> FlowGraphResult<ControlFlowGraph> {
        if function.kind != AstKind::FunctionDef {
            return Err(FlowGraphError::NotAFunction {
                kind: function.kind.as_str().to_string(),
            });
        }
        let name = function.name.clone().unwrap_or_else(|| "anonymous".into());
        let body = function
            .children
            .last()
            .filter(|n| n.kind == AstKind::Block)
            .ok_or_else(|| FlowGraphError::MissingBody {
                function: name.clone(),
            })?;

        debug!(function = %name, "building CFG");

        let mut b = CfgBuilder::new();
        let entry = b.add_node(CfgNodeKind::Entry, function);
        let exit = b.add_node(CfgNodeKind::Exit, function);
        b.exit = exit;

        let frontier = b.lower_block(body, vec![Incoming::seq(entry)])?;
        b.attach(frontier, exit);

        let metrics = complexity::compute_metrics(
            function,
            &b.nodes,
            entry,
            b.cognitive,
            b.essential_increments,
        );

        debug!(
            function = %name,
            nodes = b.nodes.len(),
            cyclomatic = metrics.cyclomatic,
            "CFG complete"
        );

        Ok(ControlFlowGraph {
            function: name,
            arity: function.arity(),
            entry,
            exits: vec![exit],
            nodes: b.nodes,
            edges: b.edges,
            metrics,
        })
    }

    fn add_node(&mut self, kind: CfgNodeKind, ast: &AstNode) -> CfgNodeId {
        let id = CfgNodeId(self.nodes.len() as u32);
        self.nodes.push(CfgNode {
            id,
            kind,
            ast_node: ast.id,
            line: ast.line(),
            scope: self.scope,
            predecessors: Vec::new(),
            successors: Vec::new(),
        });
        id
    }

    fn add_edge(
        &mut self,
        from: CfgNodeId,
        to: CfgNodeId,
        kind: CfgEdgeKind,
        guard: Option<String>,
        probability: f64,
    ) {
        self.nodes[from.0 as usize].successors.push(to);
        self.nodes[to.0 as usize].predecessors.push(from);
        self.edges.push(CfgEdge {
            from,
            to,
            kind,
            guard,
            probability,
        });
    }

    fn attach(&mut self, frontier: Frontier, to: CfgNodeId) {
        for inc in frontier {
            self.add_edge(inc.from, to, inc.kind, inc.guard, inc.probability);
        }
    }

    /// Record a decision node's contribution to cognitive complexity:
    /// fixed per-kind weight plus the nesting-depth penalty.
    fn note_decision(&mut self, kind: DecisionKind) {
        self.cognitive += complexity::decision_weight(kind) + self.depth.saturating_sub(1);
    }

    fn lower_block(&mut self, block: &AstNode, mut frontier: Frontier) -> FlowGraphResult<Frontier> {
        for stmt in &block.children {
            frontier = self.lower_stmt(stmt, frontier)?;
        }
        Ok(frontier)
    }

    fn lower_stmt(&mut self, node: &AstNode, frontier: Frontier) -> FlowGraphResult<Frontier> {
        match node.kind {
            AstKind::Block => self.lower_block(node, frontier),
            AstKind::Case => {
                if node.children.len() < 2 {
                    return Err(FlowGraphError::MalformedClause {
                        construct: "case".to_string(),
                        ast_node: node.id,
                        reason: "case needs a subject and at least one clause".to_string(),
                    });
                }
                let clauses: Vec<&AstNode> = node.children[1..].iter().collect();
                self.lower_clause_construct(node, DecisionKind::Case, &clauses, frontier)
            }
            AstKind::Receive => {
                let clauses: Vec<&AstNode> = node.children.iter().collect();
                if clauses.is_empty() {
                    return Err(FlowGraphError::MalformedClause {
                        construct: "receive".to_string(),
                        ast_node: node.id,
                        reason: "receive needs at least one clause".to_string(),
                    });
                }
                self.lower_clause_construct(node, DecisionKind::Receive, &clauses, frontier)
            }
            AstKind::If => self.lower_if(node, frontier),
            AstKind::Cond => self.lower_cond(node, frontier),
            AstKind::Try => self.lower_try(node, frontier),
            AstKind::Raise => {
                let id = self.add_node(CfgNodeKind::Statement, node);
                self.attach(frontier, id);
                self.add_edge(id, self.exit, CfgEdgeKind::Exception, None, PROB_SEQUENTIAL);
                Ok(vec![])
            }
            // Expressions are single control points; calls and pipelines get
            // their structure from the data-flow graph, not the CFG.
            AstKind::Assign
            | AstKind::Call
            | AstKind::Pipe
            | AstKind::BinaryOp
            | AstKind::Identifier
            | AstKind::Literal
            | AstKind::Wildcard
            | AstKind::Closure
            | AstKind::Comprehension
            | AstKind::TuplePattern
            | AstKind::ListPattern
            | AstKind::MapPattern => {
                let id = self.add_node(CfgNodeKind::Statement, node);
                self.attach(frontier, id);
                Ok(vec![Incoming::seq(id)])
            }
            AstKind::Module
            | AstKind::FunctionDef
            | AstKind::Parameter
            | AstKind::CaseClause
            | AstKind::CondClause
            | AstKind::CatchClause
            | AstKind::AfterBlock
            | AstKind::ReceiveClause
            | AstKind::ComprehensionBinding
            | AstKind::Guard => Err(FlowGraphError::UnsupportedShape {
                kind: node.kind.as_str().to_string(),
                ast_node: node.id,
            }),
        }
    }

    /// Lower a clause body in its own lexical scope
    fn lower_clause_body(
        &mut self,
        body: &AstNode,
        incoming: Frontier,
    ) -> FlowGraphResult<Frontier> {
        let saved = self.scope;
        self.scope = self.next_scope;
        self.next_scope += 1;
        let out = self.lower_block(body, incoming);
        self.scope = saved;
        out
    }

    /// case / receive lowering.
    ///
    /// An unguarded construct is a single decision point no matter how many
    /// clauses it has. Guards each become their own decision point: a
    /// guarded clause list lowers to a chain where every guard's no-match
    /// edge falls through to the next clause.
    fn lower_clause_construct(
        &mut self,
        node: &AstNode,
        kind: DecisionKind,
        clauses: &[&AstNode],
        frontier: Frontier,
    ) -> FlowGraphResult<Frontier> {
        let construct = kind.as_str();
        self.depth += 1;
        let entry_prob = 1.0 / clauses.len() as f64;
        let mut exits: Frontier = Vec::new();
        let mut terminated = false;

        let guarded = clauses
            .iter()
            .filter(|c| c.children.iter().any(|n| n.kind == AstKind::Guard))
            .count();
        let unguarded = clauses.len() - guarded;

        if guarded == 0 || unguarded >= 2 {
            // Pattern dispatch needs its own decision node
            let d = self.add_node(CfgNodeKind::DecisionPoint(kind), node);
            self.attach(frontier, d);
            self.note_decision(kind);

            for clause in clauses {
                let parts = clause_parts(construct, clause)?;
                let mut incoming = vec![Incoming {
                    from: d,
                    kind: CfgEdgeKind::PatternMatch,
                    guard: Some(expr_text(parts.pattern)),
                    probability: entry_prob,
                }];
                if let Some(g) = parts.guard {
                    let gn = self.add_node(CfgNodeKind::DecisionPoint(DecisionKind::Guard), g);
                    self.attach(incoming, gn);
                    self.note_decision(DecisionKind::Guard);
                    exits.push(Incoming {
                        from: gn,
                        kind: CfgEdgeKind::PatternNoMatch,
                        guard: None,
                        probability: PROB_GUARD_MATCH,
                    });
                    incoming = vec![Incoming {
                        from: gn,
                        kind: CfgEdgeKind::PatternMatch,
                        guard: Some(expr_text(g)),
                        probability: PROB_GUARD_MATCH,
                    }];
                }
                let f = self.lower_clause_body(parts.body, incoming)?;
                if f.is_empty() {
                    terminated = true;
                }
                exits.extend(f);
            }

            // A single-clause dispatch still branches: the failed match
            // raises, keeping the >= 2 out-edge decision invariant.
            if clauses.len() == 1 {
                self.add_edge(
                    d,
                    self.exit,
                    CfgEdgeKind::Exception,
                    None,
                    PROB_MATCH_FAILURE,
                );
            }
        } else {
            // Guard chain: each guard is the decision point for its clause
            let mut chain = frontier;
            for clause in clauses {
                let parts = clause_parts(construct, clause)?;
                match parts.guard {
                    Some(g) => {
                        let gn = self.add_node(CfgNodeKind::DecisionPoint(DecisionKind::Guard), g);
                        self.attach(std::mem::take(&mut chain), gn);
                        self.note_decision(DecisionKind::Guard);
                        let incoming = vec![Incoming {
                            from: gn,
                            kind: CfgEdgeKind::PatternMatch,
                            guard: Some(expr_text(g)),
                            probability: PROB_GUARD_MATCH,
                        }];
                        let f = self.lower_clause_body(parts.body, incoming)?;
                        if f.is_empty() {
                            terminated = true;
                        }
                        exits.extend(f);
                        chain = vec![Incoming {
                            from: gn,
                            kind: CfgEdgeKind::PatternNoMatch,
                            guard: None,
                            probability: PROB_GUARD_MATCH,
                        }];
                    }
                    None => {
                        // Fall-through clause, reached when every guard failed
                        let f = self.lower_clause_body(parts.body, std::mem::take(&mut chain))?;
                        if f.is_empty() {
                            terminated = true;
                        }
                        exits.extend(f);
                    }
                }
            }
            // No fall-through clause consumed the last no-match path
            exits.extend(chain);
        }

        if terminated {
            self.essential_increments += 1;
        }
        let out = self.merge(node, exits);
        self.depth -= 1;
        Ok(out)
    }

    fn lower_if(&mut self, node: &AstNode, frontier: Frontier) -> FlowGraphResult<Frontier> {
        let (cond, then_block) = match node.children.as_slice() {
            [cond, then_block, ..] if then_block.kind == AstKind::Block => (cond, then_block),
            _ => {
                return Err(FlowGraphError::MalformedClause {
                    construct: "if".to_string(),
                    ast_node: node.id,
                    reason: "if needs a condition and a then-block".to_string(),
                })
            }
        };
        let else_block = node.children.get(2).filter(|n| n.kind == AstKind::Block);

        self.depth += 1;
        let d = self.add_node(CfgNodeKind::DecisionPoint(DecisionKind::If), node);
        self.attach(frontier, d);
        self.note_decision(DecisionKind::If);

        let mut exits: Frontier = Vec::new();
        let mut terminated = false;

        let then_f = self.lower_clause_body(
            then_block,
            vec![Incoming {
                from: d,
                kind: CfgEdgeKind::ConditionalTrue,
                guard: Some(expr_text(cond)),
                probability: PROB_GUARD_MATCH,
            }],
        )?;
        if then_f.is_empty() {
            terminated = true;
        }
        exits.extend(then_f);

        let else_incoming = Incoming {
            from: d,
            kind: CfgEdgeKind::ConditionalFalse,
            guard: None,
            probability: PROB_GUARD_MATCH,
        };
        match else_block {
            Some(block) => {
                let else_f = self.lower_clause_body(block, vec![else_incoming])?;
                if else_f.is_empty() {
                    terminated = true;
                }
                exits.extend(else_f);
            }
            None => exits.push(else_incoming),
        }

        if terminated {
            self.essential_increments += 1;
        }
        let out = self.merge(node, exits);
        self.depth -= 1;
        Ok(out)
    }

    fn lower_cond(&mut self, node: &AstNode, frontier: Frontier) -> FlowGraphResult<Frontier> {
        if node.children.is_empty() {
            return Err(FlowGraphError::MalformedClause {
                construct: "cond".to_string(),
                ast_node: node.id,
                reason: "cond needs at least one clause".to_string(),
            });
        }
        self.depth += 1;
        let d = self.add_node(CfgNodeKind::DecisionPoint(DecisionKind::Cond), node);
        self.attach(frontier, d);
        self.note_decision(DecisionKind::Cond);

        let entry_prob = 1.0 / node.children.len() as f64;
        let mut exits: Frontier = Vec::new();
        let mut terminated = false;

        for clause in &node.children {
            let (cond, body) = match (clause.kind, clause.children.as_slice()) {
                (AstKind::CondClause, [cond, body]) if body.kind == AstKind::Block => (cond, body),
                _ => {
                    return Err(FlowGraphError::MalformedClause {
                        construct: "cond".to_string(),
                        ast_node: clause.id,
                        reason: "cond clause needs a condition and a body block".to_string(),
                    })
                }
            };
            let f = self.lower_clause_body(
                body,
                vec![Incoming {
                    from: d,
                    kind: CfgEdgeKind::ConditionalTrue,
                    guard: Some(expr_text(cond)),
                    probability: entry_prob,
                }],
            )?;
            if f.is_empty() {
                terminated = true;
            }
            exits.extend(f);
        }

        // All conditions false raises, keeping the decision branching
        if node.children.len() == 1 {
            self.add_edge(
                d,
                self.exit,
                CfgEdgeKind::Exception,
                None,
                PROB_MATCH_FAILURE,
            );
        }

        if terminated {
            self.essential_increments += 1;
        }
        let out = self.merge(node, exits);
        self.depth -= 1;
        Ok(out)
    }

    fn lower_try(&mut self, node: &AstNode, frontier: Frontier) -> FlowGraphResult<Frontier> {
        let body = node
            .children
            .first()
            .filter(|n| n.kind == AstKind::Block)
            .ok_or_else(|| FlowGraphError::MalformedClause {
                construct: "try".to_string(),
                ast_node: node.id,
                reason: "try needs a body block".to_string(),
            })?;
        let catches: Vec<&AstNode> = node
            .children
            .iter()
            .filter(|n| n.kind == AstKind::CatchClause)
            .collect();
        let after = node
            .children
            .iter()
            .find(|n| n.kind == AstKind::AfterBlock)
            .and_then(|a| a.children.first());

        self.depth += 1;
        let d = self.add_node(CfgNodeKind::DecisionPoint(DecisionKind::Try), node);
        self.attach(frontier, d);
        self.note_decision(DecisionKind::Try);

        let mut exits: Frontier = Vec::new();
        let mut terminated = false;

        let body_f = self.lower_clause_body(body, vec![Incoming::seq(d)])?;
        if body_f.is_empty() {
            terminated = true;
        }
        exits.extend(body_f);

        for clause in &catches {
            let parts = clause_parts("catch", clause)?;
            let mut incoming = vec![Incoming {
                from: d,
                kind: CfgEdgeKind::Exception,
                guard: Some(expr_text(parts.pattern)),
                probability: PROB_EXCEPTION,
            }];
            if let Some(g) = parts.guard {
                let gn = self.add_node(CfgNodeKind::DecisionPoint(DecisionKind::Guard), g);
                self.attach(incoming, gn);
                self.note_decision(DecisionKind::Guard);
                exits.push(Incoming {
                    from: gn,
                    kind: CfgEdgeKind::PatternNoMatch,
                    guard: None,
                    probability: PROB_GUARD_MATCH,
                });
                incoming = vec![Incoming {
                    from: gn,
                    kind: CfgEdgeKind::PatternMatch,
                    guard: Some(expr_text(g)),
                    probability: PROB_GUARD_MATCH,
                }];
            }
            let f = self.lower_clause_body(parts.body, incoming)?;
            if f.is_empty() {
                terminated = true;
            }
            exits.extend(f);
        }

        // Uncaught exceptions leave through the exit node
        if catches.is_empty() {
            self.add_edge(d, self.exit, CfgEdgeKind::Exception, None, PROB_EXCEPTION);
        }

        if terminated {
            self.essential_increments += 1;
        }

        // An after-block runs on every path and acts as the merge
        let out = match after {
            Some(after_body) if !exits.is_empty() => self.lower_block(after_body, exits)?,
            _ => self.merge(node, exits),
        };
        self.depth -= 1;
        Ok(out)
    }

    /// Join branch exits at a merge-point node; an empty exit set means all
    /// branches terminated and the continuation is unreachable.
    fn merge(&mut self, construct: &AstNode, exits: Frontier) -> Frontier {
        if exits.is_empty() {
            return vec![];
        }
        let m = self.add_node(CfgNodeKind::MergePoint, construct);
        self.attach(exits, m);
        vec![Incoming::seq(m)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::Span;
    use serde_json::json;

    fn function(name: &str, params: &[&str], body: Vec<AstNode>) -> AstNode {
        let mut children: Vec<AstNode> = params
            .iter()
            .map(|p| AstNode::new(AstKind::Parameter, Span::line(1)).with_name(*p))
            .collect();
        children.push(AstNode::block(body, 2));
        let mut f = AstNode::new(AstKind::FunctionDef, Span::new(1, 0, 20, 0))
            .with_name(name)
            .with_children(children);
        f.assign_ids();
        f
    }

    fn case_clause(pattern: AstNode, guard: Option<AstNode>, body: Vec<AstNode>, line: u32) -> AstNode {
        let mut children = vec![pattern];
        if let Some(g) = guard {
            children.push(AstNode::new(AstKind::Guard, Span::line(line)).with_children(vec![g]));
        }
        children.push(AstNode::block(body, line));
        AstNode::new(AstKind::CaseClause, Span::line(line)).with_children(children)
    }

    #[test]
    fn test_straight_line_function() {
        // f(a, b) = (r = a + b; r)
        let f = function(
            "f",
            &["a", "b"],
            vec![
                AstNode::assign(
                    AstNode::ident("r", 2),
                    AstNode::new(AstKind::BinaryOp, Span::line(2))
                        .with_name("+")
                        .with_children(vec![AstNode::ident("a", 2), AstNode::ident("b", 2)]),
                    2,
                ),
                AstNode::ident("r", 3),
            ],
        );
        let cfg = CfgBuilder::build(&f).unwrap();

        assert_eq!(cfg.metrics.cyclomatic, 1, "no decision points");
        assert_eq!(cfg.exits.len(), 1);
        let entries = cfg
            .nodes
            .iter()
            .filter(|n| n.kind == CfgNodeKind::Entry)
            .count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_unguarded_case_is_one_decision_point() {
        // A 4-clause case contributes 1 to the decision-point count, not 4
        let clauses: Vec<AstNode> = (0..4)
            .map(|i| {
                case_clause(
                    AstNode::literal(json!(i), 3 + i),
                    None,
                    vec![AstNode::call("handle", vec![], 3 + i)],
                    3 + i,
                )
            })
            .collect();
        let mut case_children = vec![AstNode::ident("x", 2)];
        case_children.extend(clauses);
        let f = function(
            "dispatch",
            &["x"],
            vec![AstNode::new(AstKind::Case, Span::new(2, 0, 8, 0)).with_children(case_children)],
        );
        let cfg = CfgBuilder::build(&f).unwrap();

        assert_eq!(cfg.decision_points().count(), 1);
        assert_eq!(cfg.metrics.cyclomatic, 2);
        // The one decision point emits one edge per clause
        let d = cfg.decision_points().next().unwrap();
        assert_eq!(d.successors.len(), 4);
    }

    #[test]
    fn test_guarded_case_counts_guards() {
        // 3-clause case, guards on the first two clauses, catch-all third:
        // decision-point count 2, cyclomatic 3
        let clauses = vec![
            case_clause(
                AstNode::ident("x", 3),
                Some(AstNode::call("is_integer", vec![AstNode::ident("x", 3)], 3)),
                vec![AstNode::assign(
                    AstNode::ident("n", 3),
                    AstNode::ident("x", 3),
                    3,
                )],
                3,
            ),
            case_clause(
                AstNode::ident("x", 4),
                Some(AstNode::call("is_binary", vec![AstNode::ident("x", 4)], 4)),
                vec![AstNode::assign(
                    AstNode::ident("s", 4),
                    AstNode::ident("x", 4),
                    4,
                )],
                4,
            ),
            case_clause(
                AstNode::new(AstKind::Wildcard, Span::line(5)),
                None,
                vec![AstNode::assign(
                    AstNode::ident("other", 5),
                    AstNode::literal(json!(null), 5),
                    5,
                )],
                5,
            ),
        ];
        let mut case_children = vec![AstNode::ident("x", 2)];
        case_children.extend(clauses);
        let f = function(
            "classify",
            &["x"],
            vec![AstNode::new(AstKind::Case, Span::new(2, 0, 6, 0)).with_children(case_children)],
        );
        let cfg = CfgBuilder::build(&f).unwrap();

        assert_eq!(cfg.decision_points().count(), 2, "one per guard");
        assert_eq!(cfg.metrics.cyclomatic, 3);
    }

    #[test]
    fn test_if_else_merges() {
        let if_node = AstNode::new(AstKind::If, Span::new(2, 0, 6, 0)).with_children(vec![
            AstNode::call("valid?", vec![AstNode::ident("x", 2)], 2),
            AstNode::block(vec![AstNode::call("accept", vec![], 3)], 3),
            AstNode::block(vec![AstNode::call("reject", vec![], 5)], 5),
        ]);
        let f = function("check", &["x"], vec![if_node, AstNode::ident("x", 7)]);
        let cfg = CfgBuilder::build(&f).unwrap();

        assert_eq!(cfg.metrics.cyclomatic, 2);
        let merges = cfg
            .nodes
            .iter()
            .filter(|n| n.kind == CfgNodeKind::MergePoint)
            .count();
        assert_eq!(merges, 1);
        // True edge carries the condition text
        let true_edge = cfg
            .edges
            .iter()
            .find(|e| e.kind == CfgEdgeKind::ConditionalTrue)
            .unwrap();
        assert_eq!(true_edge.guard.as_deref(), Some("valid?(...)"));
    }

    #[test]
    fn test_decision_points_have_two_or_more_out_edges() {
        let clauses = vec![case_clause(
            AstNode::literal(json!("ok"), 3),
            None,
            vec![AstNode::ident("x", 3)],
            3,
        )];
        let mut case_children = vec![AstNode::ident("x", 2)];
        case_children.extend(clauses);
        let f = function(
            "single",
            &["x"],
            vec![AstNode::new(AstKind::Case, Span::new(2, 0, 4, 0)).with_children(case_children)],
        );
        let cfg = CfgBuilder::build(&f).unwrap();
        for d in cfg.decision_points() {
            assert!(
                d.successors.len() >= 2,
                "decision {} has {} out-edges",
                d.id,
                d.successors.len()
            );
        }
    }

    #[test]
    fn test_unreachable_after_raise() {
        let f = function(
            "fail",
            &[],
            vec![
                AstNode::new(AstKind::Raise, Span::line(2))
                    .with_children(vec![AstNode::literal(json!("boom"), 2)]),
                AstNode::call("never", vec![], 3),
            ],
        );
        let cfg = CfgBuilder::build(&f).unwrap();
        assert_eq!(cfg.metrics.unreachable_nodes, 1);
    }

    #[test]
    fn test_malformed_input_is_tagged_error() {
        let mut not_a_function = AstNode::ident("x", 1);
        not_a_function.assign_ids();
        let err = CfgBuilder::build(&not_a_function).unwrap_err();
        assert!(matches!(err, FlowGraphError::NotAFunction { .. }));

        let mut no_body = AstNode::new(AstKind::FunctionDef, Span::line(1)).with_name("f");
        no_body.assign_ids();
        let err = CfgBuilder::build(&no_body).unwrap_err();
        assert!(matches!(err, FlowGraphError::MissingBody { .. }));
    }

    #[test]
    fn test_cognitive_nesting_penalty() {
        // An if nested inside a case clause weighs more than a top-level if
        let nested_if = AstNode::new(AstKind::If, Span::new(4, 0, 5, 0)).with_children(vec![
            AstNode::ident("y", 4),
            AstNode::block(vec![AstNode::call("deep", vec![], 4)], 4),
        ]);
        let clauses = vec![
            case_clause(AstNode::literal(json!(1), 3), None, vec![nested_if], 3),
            case_clause(
                AstNode::new(AstKind::Wildcard, Span::line(6)),
                None,
                vec![AstNode::ident("x", 6)],
                6,
            ),
        ];
        let mut case_children = vec![AstNode::ident("x", 2)];
        case_children.extend(clauses);
        let nested = function(
            "nested",
            &["x", "y"],
            vec![AstNode::new(AstKind::Case, Span::new(2, 0, 7, 0)).with_children(case_children)],
        );
        let flat_if = AstNode::new(AstKind::If, Span::new(2, 0, 3, 0)).with_children(vec![
            AstNode::ident("y", 2),
            AstNode::block(vec![AstNode::call("shallow", vec![], 2)], 2),
        ]);
        let flat = function("flat", &["y"], vec![flat_if]);

        let nested_cfg = CfgBuilder::build(&nested).unwrap();
        let flat_cfg = CfgBuilder::build(&flat).unwrap();
        assert!(nested_cfg.metrics.cognitive > flat_cfg.metrics.cognitive);
    }
}
