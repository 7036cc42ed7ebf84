/*
 * Complexity Metrics
 *
 * Cyclomatic complexity is decision-POINT based: one multi-clause decision
 * point contributes 1 regardless of how many edges it emits. A guarded
 * clause chain contributes one decision point per guard.
 */

use serde::{Deserialize, Serialize};

/// Per-function complexity metrics derived from the CFG and AST
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ComplexityMetrics {
    /// decision-point count + 1
    pub cyclomatic: u32,
    /// sum over decision points of per-kind weight + nesting-depth penalty
    pub cognitive: u32,
    /// 1 + decision points with a non-merging (terminating) branch
    pub essential: u32,
    pub pattern_match_count: u32,
    pub guard_count: u32,
    pub max_pipeline_length: u32,
    pub nesting_depth: u32,
    /// nodes with no path from entry
    pub unreachable_nodes: u32,
    /// decreases with cyclomatic/cognitive complexity and nesting, in [0, 100]
    pub maintainability: f64,
}

impl ComplexityMetrics {
    /// Maintainability score: starts at 100, penalized by complexity and
    /// nesting, clamped to [0, 100].
    pub fn maintainability_score(cyclomatic: u32, cognitive: u32, nesting_depth: u32) -> f64 {
        let raw = 100.0 - 2.0 * cyclomatic as f64 - cognitive as f64 - 3.0 * nesting_depth as f64;
        raw.clamp(0.0, 100.0)
    }
}
