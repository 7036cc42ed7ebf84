/*
 * Query Plan Domain Model
 *
 * Declarative specification: select / from / where / order / limit /
 * offset, with the where-clause as a boolean tree of field comparisons.
 *
 * Plan lifecycle: built -> validated -> cost-estimated -> conditions
 * reordered by selectivity -> executed or served from cache.
 */

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ops::{BitAnd, BitOr, Not};

/// Queryable relations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relation {
    Functions,
    Modules,
    Patterns,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::Functions => "functions",
            Relation::Modules => "modules",
            Relation::Patterns => "patterns",
        }
    }
}

/// Comparison operators, from most to least selective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    In,
    NotIn,
    Contains,
    Matches,
    SimilarTo,
}

impl CompareOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Gt => "gt",
            CompareOp::Lt => "lt",
            CompareOp::Gte => "gte",
            CompareOp::Lte => "lte",
            CompareOp::In => "in",
            CompareOp::NotIn => "not_in",
            CompareOp::Contains => "contains",
            CompareOp::Matches => "matches",
            CompareOp::SimilarTo => "similar_to",
        }
    }

    /// Fixed selectivity score: lower filters more rows (equality is the
    /// most selective, similarity the least)
    pub fn selectivity(&self) -> f64 {
        match self {
            CompareOp::Eq => 0.1,
            CompareOp::In => 0.2,
            CompareOp::Gt | CompareOp::Lt | CompareOp::Gte | CompareOp::Lte => 0.3,
            CompareOp::Contains => 0.5,
            CompareOp::NotIn => 0.6,
            CompareOp::Ne => 0.7,
            CompareOp::Matches => 0.8,
            CompareOp::SimilarTo => 0.9,
        }
    }

    /// Semantically expensive operators carry extra cost weight
    pub fn cost_weight(&self) -> f64 {
        match self {
            CompareOp::Matches => 10.0,
            CompareOp::SimilarTo => 15.0,
            _ => 0.0,
        }
    }
}

/// Boolean condition tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    Compare {
        field: String,
        op: CompareOp,
        value: Value,
    },
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn compare(field: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Condition::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Total comparison count in this tree
    pub fn comparison_count(&self) -> usize {
        match self {
            Condition::Compare { .. } => 1,
            Condition::And(items) | Condition::Or(items) => {
                items.iter().map(|c| c.comparison_count()).sum()
            }
            Condition::Not(inner) => inner.comparison_count(),
        }
    }

    /// Fields referenced anywhere in the tree
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Condition::Compare { field, .. } => vec![field.as_str()],
            Condition::And(items) | Condition::Or(items) => {
                items.iter().flat_map(|c| c.fields()).collect()
            }
            Condition::Not(inner) => inner.fields(),
        }
    }

    /// Best-case selectivity of this subtree (used for reordering)
    pub fn selectivity(&self) -> f64 {
        match self {
            Condition::Compare { op, .. } => op.selectivity(),
            Condition::And(items) => items
                .iter()
                .map(|c| c.selectivity())
                .fold(1.0, f64::min),
            Condition::Or(items) => items
                .iter()
                .map(|c| c.selectivity())
                .fold(0.0, f64::max),
            Condition::Not(inner) => 1.0 - inner.selectivity(),
        }
    }
}

impl BitAnd for Condition {
    type Output = Condition;

    /// `a & b` composes conditions conjunctively, flattening nested ANDs
    fn bitand(self, rhs: Condition) -> Condition {
        match (self, rhs) {
            (Condition::And(mut left), Condition::And(right)) => {
                left.extend(right);
                Condition::And(left)
            }
            (Condition::And(mut left), rhs) => {
                left.push(rhs);
                Condition::And(left)
            }
            (lhs, Condition::And(mut right)) => {
                right.insert(0, lhs);
                Condition::And(right)
            }
            (lhs, rhs) => Condition::And(vec![lhs, rhs]),
        }
    }
}

impl BitOr for Condition {
    type Output = Condition;

    /// `a | b` composes disjunctively, flattening nested ORs
    fn bitor(self, rhs: Condition) -> Condition {
        match (self, rhs) {
            (Condition::Or(mut left), Condition::Or(right)) => {
                left.extend(right);
                Condition::Or(left)
            }
            (Condition::Or(mut left), rhs) => {
                left.push(rhs);
                Condition::Or(left)
            }
            (lhs, Condition::Or(mut right)) => {
                right.insert(0, lhs);
                Condition::Or(right)
            }
            (lhs, rhs) => Condition::Or(vec![lhs, rhs]),
        }
    }
}

impl Not for Condition {
    type Output = Condition;

    fn not(self) -> Condition {
        Condition::Not(Box::new(self))
    }
}

/// Fluent condition factory: `Cond::field("complexity").gt(15)`
pub struct Cond;

impl Cond {
    pub fn field(name: impl Into<String>) -> FieldRef {
        FieldRef(name.into())
    }
}

pub struct FieldRef(String);

macro_rules! comparison {
    ($method:ident, $op:expr) => {
        pub fn $method(self, value: impl Into<Value>) -> Condition {
            Condition::compare(self.0, $op, value)
        }
    };
}

impl FieldRef {
    comparison!(eq, CompareOp::Eq);
    comparison!(ne, CompareOp::Ne);
    comparison!(gt, CompareOp::Gt);
    comparison!(lt, CompareOp::Lt);
    comparison!(gte, CompareOp::Gte);
    comparison!(lte, CompareOp::Lte);
    comparison!(contains, CompareOp::Contains);
    comparison!(matches, CompareOp::Matches);
    comparison!(similar_to, CompareOp::SimilarTo);

    pub fn is_in(self, values: Vec<Value>) -> Condition {
        Condition::compare(self.0, CompareOp::In, Value::Array(values))
    }

    pub fn not_in(self, values: Vec<Value>) -> Condition {
        Condition::compare(self.0, CompareOp::NotIn, Value::Array(values))
    }
}

/// Field projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Selection {
    All,
    Fields(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Declarative query specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub select: Selection,
    pub from: Relation,
    pub where_clause: Option<Condition>,
    pub order_by: Option<(String, SortDirection)>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl QuerySpec {
    pub fn from_relation(from: Relation) -> Self {
        Self {
            select: Selection::All,
            from,
            where_clause: None,
            order_by: None,
            limit: None,
            offset: None,
        }
    }

    pub fn select(mut self, fields: Vec<impl Into<String>>) -> Self {
        self.select = Selection::Fields(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.where_clause = Some(match self.where_clause.take() {
            Some(existing) => existing & condition,
            None => condition,
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Validated, optimized plan ready for execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPlan {
    /// Normalized spec with conditions reordered by selectivity
    pub spec: QuerySpec,
    pub estimated_cost: f64,
    /// md5 of the normalized spec, used as the result-cache key
    pub cache_key: String,
    pub optimization_hints: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fluent_composition() {
        let cond = Cond::field("complexity").gt(15) & Cond::field("module").eq("Payments");
        match &cond {
            Condition::And(items) => assert_eq!(items.len(), 2),
            other => panic!("expected And, got {:?}", other),
        }
        assert_eq!(cond.comparison_count(), 2);
    }

    #[test]
    fn test_and_flattening() {
        let cond = Cond::field("a").eq(1) & Cond::field("b").eq(2) & Cond::field("c").eq(3);
        match cond {
            Condition::And(items) => assert_eq!(items.len(), 3),
            other => panic!("expected flat And, got {:?}", other),
        }
    }

    #[test]
    fn test_negation() {
        let cond = !Cond::field("name").eq("init");
        assert!(matches!(cond, Condition::Not(_)));
    }

    #[test]
    fn test_selectivity_ordering() {
        assert!(CompareOp::Eq.selectivity() < CompareOp::Gt.selectivity());
        assert!(CompareOp::Matches.selectivity() < CompareOp::SimilarTo.selectivity());
    }

    #[test]
    fn test_spec_builder() {
        let spec = QuerySpec::from_relation(Relation::Functions)
            .filter(Cond::field("complexity").gt(15))
            .order_by("complexity", SortDirection::Desc)
            .limit(20);
        assert_eq!(spec.from, Relation::Functions);
        assert_eq!(spec.limit, Some(20));
        assert!(spec.where_clause.is_some());
    }

    #[test]
    fn test_spec_serialization_is_stable() {
        let spec = QuerySpec::from_relation(Relation::Functions)
            .filter(Cond::field("complexity").gt(json!(15)));
        let a = serde_json::to_string(&spec).unwrap();
        let b = serde_json::to_string(&spec.clone()).unwrap();
        assert_eq!(a, b);
    }
}
