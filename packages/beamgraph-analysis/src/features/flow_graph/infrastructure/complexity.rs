/*
 * Complexity metric computation
 *
 * Cyclomatic complexity counts decision-point NODES, not decision edges:
 * a multi-clause dispatch is one source of branching regardless of how many
 * edges it emits. Cognitive complexity is accumulated during lowering
 * (per-kind weight + nesting penalty); this module finishes the remaining
 * metrics from the final graph and the source AST.
 */

use crate::shared::models::{AstKind, AstNode};

use super::super::domain::{CfgNode, CfgNodeId, ComplexityMetrics, DecisionKind};

/// Fixed cognitive weight per decision kind
pub(crate) fn decision_weight(kind: DecisionKind) -> u32 {
    match kind {
        DecisionKind::Case => 1,
        DecisionKind::If => 1,
        DecisionKind::Cond => 1,
        DecisionKind::Guard => 1,
        DecisionKind::Receive => 2,
        DecisionKind::Try => 2,
    }
}

/// Finish the metrics record for one function
pub(crate) fn compute_metrics(
    function: &AstNode,
    nodes: &[CfgNode],
    entry: CfgNodeId,
    cognitive: u32,
    essential_increments: u32,
) -> ComplexityMetrics {
    let decision_points = nodes.iter().filter(|n| n.kind.is_decision()).count() as u32;
    let cyclomatic = decision_points + 1;
    let nesting_depth = function.max_nesting_depth();
    let maintainability =
        ComplexityMetrics::maintainability_score(cyclomatic, cognitive, nesting_depth);

    ComplexityMetrics {
        cyclomatic,
        cognitive,
        essential: 1 + essential_increments,
        pattern_match_count: count_pattern_matches(function),
        guard_count: count_guards(function),
        max_pipeline_length: function.max_pipeline_length(),
        nesting_depth,
        unreachable_nodes: count_unreachable(nodes, entry),
        maintainability,
    }
}

/// Nodes with no path from entry (BFS over successor lists)
pub fn count_unreachable(nodes: &[CfgNode], entry: CfgNodeId) -> u32 {
    let mut visited = vec![false; nodes.len()];
    let mut queue = std::collections::VecDeque::new();
    visited[entry.0 as usize] = true;
    queue.push_back(entry);
    while let Some(id) = queue.pop_front() {
        for &succ in &nodes[id.0 as usize].successors {
            if !visited[succ.0 as usize] {
                visited[succ.0 as usize] = true;
                queue.push_back(succ);
            }
        }
    }
    visited.iter().filter(|v| !**v).count() as u32
}

/// Pattern-bearing clauses plus destructuring bindings
fn count_pattern_matches(function: &AstNode) -> u32 {
    function
        .walk()
        .filter(|n| match n.kind {
            AstKind::CaseClause | AstKind::ReceiveClause | AstKind::CatchClause => true,
            AstKind::Assign | AstKind::ComprehensionBinding => n
                .children
                .first()
                .map(|p| {
                    matches!(
                        p.kind,
                        AstKind::TuplePattern | AstKind::ListPattern | AstKind::MapPattern
                    )
                })
                .unwrap_or(false),
            _ => false,
        })
        .count() as u32
}

fn count_guards(function: &AstNode) -> u32 {
    function
        .walk()
        .filter(|n| n.kind == AstKind::Guard)
        .count() as u32
}
