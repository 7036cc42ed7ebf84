/*
 * Flow Graph Error Types
 *
 * Malformed input is caught at the builder boundary and returned as a tagged
 * error wrapping the cause; it never propagates as a panic.
 */

use crate::shared::models::AstNodeId;
use thiserror::Error;

/// CFG construction error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlowGraphError {
    /// Root node is not a function definition
    #[error("expected a function definition, got `{kind}`")]
    NotAFunction { kind: String },

    /// Function definition has no body block
    #[error("function `{function}` has no body block")]
    MissingBody { function: String },

    /// AST node kind is not valid in this position
    #[error("unsupported AST shape `{kind}` at node {ast_node}")]
    UnsupportedShape { kind: String, ast_node: AstNodeId },

    /// Clause construct missing its required children
    #[error("malformed `{construct}` clause at node {ast_node}: {reason}")]
    MalformedClause {
        construct: String,
        ast_node: AstNodeId,
        reason: String,
    },
}

pub type FlowGraphResult<T> = Result<T, FlowGraphError>;
