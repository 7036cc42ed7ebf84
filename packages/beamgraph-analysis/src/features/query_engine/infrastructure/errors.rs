/*
 * Query Error Types
 *
 * Specification errors are rejected at validation time before any work.
 * Unsupported relations return an explicit not-implemented error, never an
 * empty success.
 */

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// Relation exists in the vocabulary but is served elsewhere
    #[error("relation `{relation}` is not implemented by the query engine")]
    NotImplemented { relation: String },

    /// Condition tree is malformed
    #[error("invalid condition: {reason}")]
    InvalidCondition { reason: String },

    /// `matches` operand is not a valid regular expression
    #[error("invalid regex pattern `{pattern}`")]
    InvalidRegex { pattern: String },

    /// Comparison references an empty field name
    #[error("condition field name is empty")]
    EmptyField,

    /// Execution passed its deadline; the call is retryable
    #[error("query timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },
}

pub type QueryResult<T> = Result<T, QueryError>;
