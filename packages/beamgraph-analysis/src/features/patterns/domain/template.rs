/*
 * Structural AST templates
 *
 * A template mirrors the AST shape with holes: every constraint left as
 * `None` matches anything. `call("f", 2)` is the template for any call
 * shaped like `f(_, _)`.
 */

use crate::shared::models::{AstKind, AstNode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AstTemplate {
    /// Required node kind; `None` matches any kind
    pub kind: Option<AstKind>,
    /// Required name payload (identifier/callee/operator)
    pub name: Option<String>,
    /// Required child shapes, positionally; `None` matches any children
    pub children: Option<Vec<AstTemplate>>,
}

impl AstTemplate {
    /// Matches any node
    pub fn any() -> Self {
        Self::default()
    }

    pub fn of_kind(kind: AstKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn named(kind: AstKind, name: impl Into<String>) -> Self {
        Self {
            kind: Some(kind),
            name: Some(name.into()),
            children: None,
        }
    }

    /// Any call to `name` with exactly `arity` arguments
    pub fn call(name: impl Into<String>, arity: usize) -> Self {
        Self {
            kind: Some(AstKind::Call),
            name: Some(name.into()),
            children: Some(vec![AstTemplate::any(); arity]),
        }
    }

    pub fn with_children(mut self, children: Vec<AstTemplate>) -> Self {
        self.children = Some(children);
        self
    }

    /// Structural match against one node (children positional, exact count)
    pub fn matches(&self, node: &AstNode) -> bool {
        if let Some(kind) = self.kind {
            if node.kind != kind {
                return false;
            }
        }
        if let Some(name) = &self.name {
            if node.name.as_deref() != Some(name.as_str()) {
                return false;
            }
        }
        if let Some(children) = &self.children {
            if node.children.len() != children.len() {
                return false;
            }
            for (template, child) in children.iter().zip(&node.children) {
                if !template.matches(child) {
                    return false;
                }
            }
        }
        true
    }

    /// All subtree roots under `root` matching this template
    pub fn find_matches<'a>(&self, root: &'a AstNode) -> Vec<&'a AstNode> {
        root.walk().filter(|n| self.matches(n)).collect()
    }
}
