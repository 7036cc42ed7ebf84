//! Error types for beamgraph-analysis
//!
//! Every feature carries its own tagged error; this unifies them for the
//! pipeline and for callers that work across features.

use thiserror::Error;

use crate::features::cache::CacheError;
use crate::features::cpg::infrastructure::CpgError;
use crate::features::data_flow::infrastructure::DfgError;
use crate::features::flow_graph::infrastructure::FlowGraphError;
use crate::features::patterns::infrastructure::PatternError;
use crate::features::query_engine::infrastructure::QueryError;
use crate::features::runtime_correlation::infrastructure::CorrelationError;

/// Unified error type for cross-feature operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    FlowGraph(#[from] FlowGraphError),

    #[error(transparent)]
    DataFlow(#[from] DfgError),

    #[error(transparent)]
    Cpg(#[from] CpgError),

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Correlation(#[from] CorrelationError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Orchestration-level failure (bad batch input, worker pool)
    #[error("pipeline error: {reason}")]
    Pipeline { reason: String },
}

/// Result type alias for cross-feature operations
pub type Result<T> = std::result::Result<T, AnalysisError>;
