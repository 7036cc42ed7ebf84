/*
 * DFG Error Types
 *
 * Malformed AST shapes abort the build with a tagged error. Defects of the
 * analyzed program (use of an unbound name) are diagnostics on the result,
 * not errors.
 */

use crate::shared::models::AstNodeId;
use thiserror::Error;

/// SSA/DFG construction error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DfgError {
    /// Root node is not a function definition
    #[error("expected a function definition, got `{kind}`")]
    NotAFunction { kind: String },

    /// Function definition has no body block
    #[error("function `{function}` has no body block")]
    MissingBody { function: String },

    /// Pattern position holds a non-pattern node
    #[error("malformed pattern at node {ast_node}: {reason}")]
    MalformedPattern { ast_node: AstNodeId, reason: String },

    /// AST node kind is not valid in this position
    #[error("unsupported AST shape `{kind}` at node {ast_node}")]
    UnsupportedShape { kind: String, ast_node: AstNodeId },
}

pub type DfgResult<T> = Result<T, DfgError>;
