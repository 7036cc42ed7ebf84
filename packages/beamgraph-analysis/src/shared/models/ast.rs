/*
 * AST Node Model
 *
 * Input shape for all builders. The front-end parser produces one tree per
 * module; every node carries a stable id, a kind tag, a source span, and
 * language-specific payload (identifier name, literal value, operator).
 *
 * Child layout per kind (positional, fixed):
 * - Module:               [FunctionDef...]
 * - FunctionDef:          [Parameter..., Block]          (name = function name)
 * - Block:                [statement...]
 * - Assign:               [pattern, rhs]                 (match operator)
 * - Case:                 [subject, CaseClause...]
 * - CaseClause:           [pattern, Guard?, Block]
 * - If:                   [condition, Block, Block?]     (then, optional else)
 * - Cond:                 [CondClause...]
 * - CondClause:           [condition, Block]
 * - Try:                  [Block, CatchClause..., AfterBlock?]
 * - CatchClause:          [pattern, Guard?, Block]
 * - AfterBlock:           [Block]
 * - Receive:              [ReceiveClause...]
 * - ReceiveClause:        [pattern, Guard?, Block]
 * - Guard:                [expression]
 * - Pipe:                 [lhs, rhs]                     (left-associative chain)
 * - Call:                 [argument...]                  (name = callee)
 * - Closure:              [Parameter..., Block]
 * - Comprehension:        [ComprehensionBinding..., Block]
 * - ComprehensionBinding: [pattern, source]
 * - TuplePattern/ListPattern/MapPattern: [element pattern...]
 * - BinaryOp:             [lhs, rhs]                     (name = operator)
 * - Raise:                [argument?]
 * - Identifier/Parameter: leaf                           (name = variable name)
 * - Literal:              leaf                           (value = payload)
 * - Wildcard:             leaf
 */

use super::span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable AST node identifier (pre-order arena index within one module tree)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct AstNodeId(pub u32);

impl fmt::Display for AstNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ast:{}", self.0)
    }
}

/// Closed AST node kind vocabulary
///
/// One variant per source construct; all dispatch over node shape is an
/// exhaustive match on this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AstKind {
    Module,
    FunctionDef,
    Parameter,
    Block,
    Assign,
    Case,
    CaseClause,
    If,
    Cond,
    CondClause,
    Try,
    CatchClause,
    AfterBlock,
    Receive,
    ReceiveClause,
    Guard,
    Pipe,
    Call,
    Closure,
    Comprehension,
    ComprehensionBinding,
    TuplePattern,
    ListPattern,
    MapPattern,
    BinaryOp,
    Raise,
    Identifier,
    Literal,
    Wildcard,
}

impl AstKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AstKind::Module => "module",
            AstKind::FunctionDef => "function_def",
            AstKind::Parameter => "parameter",
            AstKind::Block => "block",
            AstKind::Assign => "assign",
            AstKind::Case => "case",
            AstKind::CaseClause => "case_clause",
            AstKind::If => "if",
            AstKind::Cond => "cond",
            AstKind::CondClause => "cond_clause",
            AstKind::Try => "try",
            AstKind::CatchClause => "catch_clause",
            AstKind::AfterBlock => "after_block",
            AstKind::Receive => "receive",
            AstKind::ReceiveClause => "receive_clause",
            AstKind::Guard => "guard",
            AstKind::Pipe => "pipe",
            AstKind::Call => "call",
            AstKind::Closure => "closure",
            AstKind::Comprehension => "comprehension",
            AstKind::ComprehensionBinding => "comprehension_binding",
            AstKind::TuplePattern => "tuple_pattern",
            AstKind::ListPattern => "list_pattern",
            AstKind::MapPattern => "map_pattern",
            AstKind::BinaryOp => "binary_op",
            AstKind::Raise => "raise",
            AstKind::Identifier => "identifier",
            AstKind::Literal => "literal",
            AstKind::Wildcard => "wildcard",
        }
    }

    /// Branching constructs: each one is a decision point for control flow
    pub fn is_branching(&self) -> bool {
        matches!(
            self,
            AstKind::Case | AstKind::If | AstKind::Cond | AstKind::Try | AstKind::Receive
        )
    }

    /// Pattern-position kinds (left-hand side of a binding)
    pub fn is_pattern(&self) -> bool {
        matches!(
            self,
            AstKind::Identifier
                | AstKind::Wildcard
                | AstKind::Literal
                | AstKind::TuplePattern
                | AstKind::ListPattern
                | AstKind::MapPattern
        )
    }
}

/// One node of the module AST
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AstNode {
    pub id: AstNodeId,
    pub kind: AstKind,
    pub span: Span,
    /// Identifier / callee / operator name, per kind
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Literal payload, per kind
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    pub children: Vec<AstNode>,
}

impl AstNode {
    pub fn new(kind: AstKind, span: Span) -> Self {
        Self {
            id: AstNodeId(0),
            kind,
            span,
            name: None,
            value: None,
            children: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_value(mut self, value: serde_json::Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_children(mut self, children: Vec<AstNode>) -> Self {
        self.children = children;
        self
    }

    /// Identifier leaf
    pub fn ident(name: impl Into<String>, line: u32) -> Self {
        Self::new(AstKind::Identifier, Span::line(line)).with_name(name)
    }

    /// Literal leaf
    pub fn literal(value: serde_json::Value, line: u32) -> Self {
        Self::new(AstKind::Literal, Span::line(line)).with_value(value)
    }

    /// Call expression
    pub fn call(name: impl Into<String>, args: Vec<AstNode>, line: u32) -> Self {
        Self::new(AstKind::Call, Span::line(line))
            .with_name(name)
            .with_children(args)
    }

    /// Match-operator binding: `pattern = rhs`
    pub fn assign(pattern: AstNode, rhs: AstNode, line: u32) -> Self {
        Self::new(AstKind::Assign, Span::line(line)).with_children(vec![pattern, rhs])
    }

    pub fn block(statements: Vec<AstNode>, line: u32) -> Self {
        Self::new(AstKind::Block, Span::line(line)).with_children(statements)
    }

    pub fn line(&self) -> u32 {
        self.span.start_line
    }

    /// Function arity (number of Parameter children); 0 for non-functions
    pub fn arity(&self) -> usize {
        self.children
            .iter()
            .filter(|c| c.kind == AstKind::Parameter)
            .count()
    }

    /// Assign pre-order ids to the whole tree, returning the node count
    ///
    /// The front-end parser normally numbers nodes itself; this exists for
    /// trees assembled programmatically (tests, synthesized contexts).
    pub fn assign_ids(&mut self) -> u32 {
        fn walk(node: &mut AstNode, next: &mut u32) {
            node.id = AstNodeId(*next);
            *next += 1;
            for child in &mut node.children {
                walk(child, next);
            }
        }
        let mut next = 0;
        walk(self, &mut next);
        next
    }

    /// Pre-order iterator over the subtree rooted at this node
    pub fn walk(&self) -> AstWalk<'_> {
        AstWalk { stack: vec![self] }
    }

    /// Find a node by id in this subtree
    pub fn find(&self, id: AstNodeId) -> Option<&AstNode> {
        self.walk().find(|n| n.id == id)
    }

    /// Find the innermost node covering the given line
    pub fn find_at_line(&self, line: u32) -> Option<&AstNode> {
        let mut best: Option<&AstNode> = None;
        for node in self.walk() {
            if node.span.contains_line(line) {
                let better = match best {
                    Some(prev) => node.span.line_count() <= prev.span.line_count(),
                    None => true,
                };
                if better {
                    best = Some(node);
                }
            }
        }
        best
    }

    /// Depth of the deepest branching construct below this node
    pub fn max_nesting_depth(&self) -> u32 {
        fn depth(node: &AstNode, current: u32) -> u32 {
            let here = if node.kind.is_branching() {
                current + 1
            } else {
                current
            };
            node.children
                .iter()
                .map(|c| depth(c, here))
                .max()
                .unwrap_or(here)
        }
        depth(self, 0)
    }

    /// Length of the longest pipeline chain below this node
    ///
    /// A `Pipe` node chains left-associatively, so `a |> f() |> g()` is
    /// Pipe(Pipe(a, f), g) and has chain length 3.
    pub fn max_pipeline_length(&self) -> u32 {
        fn chain_len(node: &AstNode) -> u32 {
            if node.kind == AstKind::Pipe {
                // lhs continues the chain, rhs is one stage
                1 + node.children.first().map(chain_len).unwrap_or(0)
            } else {
                1
            }
        }
        let mut max = 0;
        for node in self.walk() {
            if node.kind == AstKind::Pipe {
                max = max.max(chain_len(node));
            }
        }
        max
    }
}

/// Pre-order AST traversal
pub struct AstWalk<'a> {
    stack: Vec<&'a AstNode>,
}

impl<'a> Iterator for AstWalk<'a> {
    type Item = &'a AstNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // Push in reverse so children come out in textual order
        for child in node.children.iter().rev() {
            self.stack.push(child);
        }
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_function() -> AstNode {
        // f(a, b) = (r = a + b; r)
        let body = AstNode::block(
            vec![
                AstNode::assign(
                    AstNode::ident("r", 2),
                    AstNode::new(AstKind::BinaryOp, Span::line(2))
                        .with_name("+")
                        .with_children(vec![AstNode::ident("a", 2), AstNode::ident("b", 2)]),
                    2,
                ),
                AstNode::ident("r", 3),
            ],
            2,
        );
        let mut f = AstNode::new(AstKind::FunctionDef, Span::new(1, 0, 3, 0))
            .with_name("f")
            .with_children(vec![
                AstNode::new(AstKind::Parameter, Span::line(1)).with_name("a"),
                AstNode::new(AstKind::Parameter, Span::line(1)).with_name("b"),
                body,
            ]);
        f.assign_ids();
        f
    }

    #[test]
    fn test_assign_ids_preorder() {
        let f = sample_function();
        assert_eq!(f.id, AstNodeId(0));
        let ids: Vec<u32> = f.walk().map(|n| n.id.0).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted, "pre-order walk yields ascending ids");
    }

    #[test]
    fn test_arity() {
        let f = sample_function();
        assert_eq!(f.arity(), 2);
    }

    #[test]
    fn test_find_at_line_picks_innermost() {
        let f = sample_function();
        let node = f.find_at_line(3).unwrap();
        assert_eq!(node.kind, AstKind::Identifier);
        assert_eq!(node.name.as_deref(), Some("r"));
    }

    #[test]
    fn test_pipeline_chain_length() {
        // a |> f() |> g()
        let mut pipe = AstNode::new(AstKind::Pipe, Span::line(1)).with_children(vec![
            AstNode::new(AstKind::Pipe, Span::line(1)).with_children(vec![
                AstNode::ident("a", 1),
                AstNode::call("f", vec![], 1),
            ]),
            AstNode::call("g", vec![], 1),
        ]);
        pipe.assign_ids();
        assert_eq!(pipe.max_pipeline_length(), 3);
    }

    #[test]
    fn test_literal_payload_roundtrip() {
        let lit = AstNode::literal(json!({"atom": "ok"}), 5);
        let serialized = serde_json::to_string(&lit).unwrap();
        let back: AstNode = serde_json::from_str(&serialized).unwrap();
        assert_eq!(back, lit);
    }
}
