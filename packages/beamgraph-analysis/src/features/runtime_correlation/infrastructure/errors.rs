/*
 * Correlation Error Types
 *
 * Resolution failures are specific tagged errors; absence of data and
 * failure-to-resolve are distinguishable outcomes.
 */

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CorrelationError {
    /// No analysis stored for this module
    #[error("module `{module}` not found")]
    ModuleNotFound { module: String },

    /// Module analyzed, but no such function/arity
    #[error("function `{module}.{function}/{arity}` not found")]
    FunctionNotFound {
        module: String,
        function: String,
        arity: usize,
    },

    /// Structural breakpoint registered without a pattern
    #[error("invalid pattern: structural breakpoint needs a pattern")]
    InvalidPattern,

    /// Data-flow breakpoint or watchpoint registered without a variable
    #[error("invalid variable: specification needs a variable name")]
    InvalidVariable,

    /// No breakpoint/watchpoint under this id
    #[error("unknown breakpoint {id}")]
    UnknownBreakpoint { id: Uuid },
}

pub type CorrelationResult<T> = Result<T, CorrelationError>;
