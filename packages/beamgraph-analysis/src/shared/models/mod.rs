//! Shared models
//!
//! The AST node model is the single input shape every builder consumes.
//! It is produced by the external front-end parser and is immutable once
//! handed to the analysis pipeline.

mod ast;
mod span;

pub use ast::{AstKind, AstNode, AstNodeId};
pub use span::{Location, Span};

// Re-export serde_json::Value for convenience (used by AST payloads,
// query rows and pattern metadata)
pub use serde_json::Value;
