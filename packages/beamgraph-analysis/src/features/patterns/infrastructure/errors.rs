/*
 * Pattern Error Types
 *
 * Malformed specifications fail fast at validation time with a specific
 * error; they never silently match nothing.
 */

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PatternError {
    /// Confidence threshold outside [0, 1]
    #[error("confidence threshold {value} outside [0, 1]")]
    InvalidThreshold { value: f64 },

    /// Structural match requested without a template
    #[error("structural pattern specification has no template")]
    MissingTemplate,

    /// No pattern registered under this name
    #[error("unknown pattern `{name}`")]
    UnknownPattern { name: String },

    /// Definition registered without any predicate rules
    #[error("pattern `{name}` has no rules")]
    EmptyRules { name: String },

    /// Definition shape is otherwise invalid
    #[error("invalid pattern specification: {reason}")]
    InvalidSpec { reason: String },
}

pub type PatternResult<T> = Result<T, PatternError>;
