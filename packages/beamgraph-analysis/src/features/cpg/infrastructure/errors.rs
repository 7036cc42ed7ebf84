/*
 * CPG Error Types
 *
 * The unifier wraps failures from the sub-builders; a failure unifying one
 * function never takes down a batch.
 */

use crate::features::data_flow::infrastructure::DfgError;
use crate::features::flow_graph::infrastructure::FlowGraphError;
use thiserror::Error;

/// CPG build error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CpgError {
    /// Control-flow construction failed
    #[error("control-flow build failed: {0}")]
    FlowGraph(#[from] FlowGraphError),

    /// Data-flow construction failed
    #[error("data-flow build failed: {0}")]
    DataFlow(#[from] DfgError),

    /// Source graphs reference entities that do not exist
    #[error("inconsistent source graphs: {reason}")]
    Inconsistent { reason: String },
}

pub type CpgResult<T> = Result<T, CpgError>;
