/*
 * Hierarchical variable scopes
 *
 * Invariants:
 * - A version's owning scope is an ancestor-or-self of every scope that
 *   uses it
 * - Pattern-match bindings in one branch never leak into a sibling
 *   branch's scope
 */

use crate::shared::models::AstNodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::dfg::VersionId;

/// Scope identifier (arena index within one function's scope tree)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct ScopeId(pub u32);

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope:{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScopeKind {
    Module,
    Function,
    CaseClause,
    IfBranch,
    TryBlock,
    CatchClause,
    Comprehension,
    ReceiveClause,
    Closure,
}

impl ScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Module => "module",
            ScopeKind::Function => "function",
            ScopeKind::CaseClause => "case_clause",
            ScopeKind::IfBranch => "if_branch",
            ScopeKind::TryBlock => "try_block",
            ScopeKind::CatchClause => "catch_clause",
            ScopeKind::Comprehension => "comprehension",
            ScopeKind::ReceiveClause => "receive_clause",
            ScopeKind::Closure => "closure",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    /// Versions owned by this scope
    pub variables: Vec<VersionId>,
    /// AST node this scope was entered at
    pub entry: AstNodeId,
}

/// Arena of scopes rooted at the function scope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    /// Create a tree with its root function scope
    pub fn new(entry: AstNodeId) -> Self {
        Self {
            scopes: vec![Scope {
                id: ScopeId(0),
                kind: ScopeKind::Function,
                parent: None,
                children: Vec::new(),
                variables: Vec::new(),
                entry,
            }],
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn push(&mut self, kind: ScopeKind, parent: ScopeId, entry: AstNodeId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            id,
            kind,
            parent: Some(parent),
            children: Vec::new(),
            variables: Vec::new(),
            entry,
        });
        self.scopes[parent.0 as usize].children.push(id);
        id
    }

    pub fn get(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.0 as usize)
    }

    pub fn add_variable(&mut self, scope: ScopeId, version: VersionId) {
        self.scopes[scope.0 as usize].variables.push(version);
    }

    /// True if `ancestor` is `scope` itself or one of its ancestors
    pub fn is_ancestor_or_self(&self, ancestor: ScopeId, scope: ScopeId) -> bool {
        let mut current = Some(scope);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.scopes[id.0 as usize].parent;
        }
        false
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scope> {
        self.scopes.iter()
    }
}
