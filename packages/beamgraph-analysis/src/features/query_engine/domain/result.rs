/*
 * Query results and execution metadata
 *
 * Every result is annotated with its execution time, cache-hit flag,
 * applied optimization hints and a coarse performance grade.
 */

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One result row: field name → value
pub type Row = serde_json::Map<String, Value>;

/// Coarse latency grade against two configured thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerformanceGrade {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl PerformanceGrade {
    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceGrade::Excellent => "excellent",
            PerformanceGrade::Good => "good",
            PerformanceGrade::Fair => "fair",
            PerformanceGrade::Poor => "poor",
        }
    }

    /// Grade an execution time: excellent under the first threshold, good
    /// under the second, fair within an order of magnitude, else poor
    pub fn from_millis(elapsed_ms: f64, excellent_ms: f64, good_ms: f64) -> Self {
        if elapsed_ms <= excellent_ms {
            PerformanceGrade::Excellent
        } else if elapsed_ms <= good_ms {
            PerformanceGrade::Good
        } else if elapsed_ms <= good_ms * 10.0 {
            PerformanceGrade::Fair
        } else {
            PerformanceGrade::Poor
        }
    }
}

/// Execution metadata attached to every result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMetadata {
    pub execution_time_ms: f64,
    pub cache_hit: bool,
    pub optimization_hints: Vec<String>,
    pub performance_score: PerformanceGrade,
    pub estimated_cost: f64,
}

/// Query result: data rows plus metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOutput {
    pub data: Vec<Row>,
    pub metadata: QueryMetadata,
}
