/*
 * Execution traces
 *
 * An ordered event batch enhanced and aggregated: chronological AST-node
 * flow, per-variable value histories, structural pattern frequencies, and
 * per-node performance figures.
 */

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::shared::models::AstNodeId;

use super::event::EnhancedEvent;

/// One observed value of a variable during a trace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableObservation {
    /// Position in the event batch
    pub sequence: usize,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

/// Aggregated timing for one AST node across a trace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodePerformance {
    pub call_count: u64,
    pub total_duration_us: u64,
    pub avg_duration_us: f64,
    pub min_duration_us: u64,
    pub max_duration_us: u64,
    /// Cyclomatic complexity of the enclosing function
    pub complexity: u32,
    /// Average duration divided by complexity; high values point at slow
    /// simple code
    pub duration_complexity_ratio: f64,
}

impl NodePerformance {
    pub fn observe(&mut self, duration_us: u64) {
        self.call_count += 1;
        self.total_duration_us += duration_us;
        self.min_duration_us = self.min_duration_us.min(duration_us);
        self.max_duration_us = self.max_duration_us.max(duration_us);
        self.avg_duration_us = self.total_duration_us as f64 / self.call_count as f64;
        self.duration_complexity_ratio = if self.complexity > 0 {
            self.avg_duration_us / self.complexity as f64
        } else {
            self.avg_duration_us
        };
    }

    pub fn first(duration_us: u64, complexity: u32) -> Self {
        let mut perf = Self {
            call_count: 0,
            total_duration_us: 0,
            avg_duration_us: 0.0,
            min_duration_us: u64::MAX,
            max_duration_us: 0,
            complexity,
            duration_complexity_ratio: 0.0,
        };
        perf.observe(duration_us);
        perf
    }
}

/// Fully derived trace over one event batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionTrace {
    pub id: String,
    pub events: Vec<EnhancedEvent>,
    /// Chronological AST-node flow over the resolved events
    pub ast_flow: Vec<AstNodeId>,
    /// Variable name → observed value history
    pub variable_histories: AHashMap<String, Vec<VariableObservation>>,
    /// Structural pattern (AST kind) → occurrence count
    pub pattern_frequencies: AHashMap<String, usize>,
    /// Per-AST-node timing aggregates
    pub performance: AHashMap<AstNodeId, NodePerformance>,
}

impl ExecutionTrace {
    pub fn resolved_count(&self) -> usize {
        self.events.iter().filter(|e| e.is_resolved()).count()
    }

    pub fn unresolved_count(&self) -> usize {
        self.events.len() - self.resolved_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_performance_aggregation() {
        let mut perf = NodePerformance::first(100, 5);
        perf.observe(300);
        assert_eq!(perf.call_count, 2);
        assert_eq!(perf.min_duration_us, 100);
        assert_eq!(perf.max_duration_us, 300);
        assert!((perf.avg_duration_us - 200.0).abs() < 1e-9);
        assert!((perf.duration_complexity_ratio - 40.0).abs() < 1e-9);
    }
}
