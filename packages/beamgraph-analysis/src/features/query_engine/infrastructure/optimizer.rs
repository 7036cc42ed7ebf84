/*
 * Query validation and optimization
 *
 * Pipeline: normalize -> validate -> estimate cost -> reorder conditions
 * by selectivity -> attach human-readable optimization hints. The cache
 * key is the md5 digest of the normalized plan, so equivalent queries hit
 * the same cache slot.
 */

use regex::Regex;
use serde_json::Value;

use super::super::domain::{CompareOp, Condition, QueryPlan, QuerySpec, Relation};
use super::errors::{QueryError, QueryResult};

/// Base scan cost per relation
fn relation_cost(relation: Relation) -> f64 {
    match relation {
        Relation::Modules => 5.0,
        Relation::Functions => 10.0,
        Relation::Patterns => 50.0,
    }
}

const CONDITION_COST: f64 = 2.0;
const ORDER_COST: f64 = 5.0;
/// Above this cost an unlimited query gets a "add a limit" hint
const COST_HINT_THRESHOLD: f64 = 50.0;
/// At this many comparisons the plan gets an indexing hint
const INDEX_HINT_CONDITIONS: usize = 3;

/// Validate, reorder and cost a spec, producing an executable plan
pub fn optimize(spec: QuerySpec) -> QueryResult<QueryPlan> {
    validate(&spec)?;

    let mut spec = spec;
    if let Some(condition) = spec.where_clause.take() {
        spec.where_clause = Some(reorder(condition));
    }

    let estimated_cost = estimate_cost(&spec);
    let optimization_hints = hints(&spec, estimated_cost);
    let cache_key = cache_key(&spec);

    Ok(QueryPlan {
        spec,
        estimated_cost,
        cache_key,
        optimization_hints,
    })
}

/// Reject malformed specifications before any work is attempted
pub fn validate(spec: &QuerySpec) -> QueryResult<()> {
    if let Some(condition) = &spec.where_clause {
        validate_condition(condition)?;
    }
    if let Some((field, _)) = &spec.order_by {
        if field.trim().is_empty() {
            return Err(QueryError::EmptyField);
        }
    }
    Ok(())
}

fn validate_condition(condition: &Condition) -> QueryResult<()> {
    match condition {
        Condition::Compare { field, op, value } => {
            if field.trim().is_empty() {
                return Err(QueryError::EmptyField);
            }
            match op {
                CompareOp::In | CompareOp::NotIn => {
                    if !value.is_array() {
                        return Err(QueryError::InvalidCondition {
                            reason: format!("`{}` needs an array operand", op.as_str()),
                        });
                    }
                }
                CompareOp::Matches => {
                    let pattern = value.as_str().ok_or_else(|| QueryError::InvalidCondition {
                        reason: "`matches` needs a string operand".to_string(),
                    })?;
                    Regex::new(pattern).map_err(|_| QueryError::InvalidRegex {
                        pattern: pattern.to_string(),
                    })?;
                }
                CompareOp::SimilarTo => {
                    if !value.is_string() {
                        return Err(QueryError::InvalidCondition {
                            reason: "`similar_to` needs a string operand".to_string(),
                        });
                    }
                }
                _ => {}
            }
            Ok(())
        }
        Condition::And(items) | Condition::Or(items) => {
            if items.is_empty() {
                return Err(QueryError::InvalidCondition {
                    reason: "empty boolean group".to_string(),
                });
            }
            for item in items {
                validate_condition(item)?;
            }
            Ok(())
        }
        Condition::Not(inner) => validate_condition(inner),
    }
}

/// Sort sibling conditions so the most selective run first
fn reorder(condition: Condition) -> Condition {
    match condition {
        Condition::And(items) => {
            let mut items: Vec<Condition> = items.into_iter().map(reorder).collect();
            items.sort_by(|a, b| {
                a.selectivity()
                    .partial_cmp(&b.selectivity())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            Condition::And(items)
        }
        Condition::Or(items) => {
            let mut items: Vec<Condition> = items.into_iter().map(reorder).collect();
            items.sort_by(|a, b| {
                a.selectivity()
                    .partial_cmp(&b.selectivity())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            Condition::Or(items)
        }
        Condition::Not(inner) => Condition::Not(Box::new(reorder(*inner))),
        leaf => leaf,
    }
}

fn estimate_cost(spec: &QuerySpec) -> f64 {
    let mut cost = relation_cost(spec.from);
    if let Some(condition) = &spec.where_clause {
        cost += condition.comparison_count() as f64 * CONDITION_COST;
        cost += operator_cost(condition);
    }
    if spec.order_by.is_some() {
        cost += ORDER_COST;
    }
    cost
}

fn operator_cost(condition: &Condition) -> f64 {
    match condition {
        Condition::Compare { op, .. } => op.cost_weight(),
        Condition::And(items) | Condition::Or(items) => items.iter().map(operator_cost).sum(),
        Condition::Not(inner) => operator_cost(inner),
    }
}

fn hints(spec: &QuerySpec, estimated_cost: f64) -> Vec<String> {
    let mut hints = Vec::new();
    if estimated_cost > COST_HINT_THRESHOLD && spec.limit.is_none() {
        hints.push(format!(
            "estimated cost {:.0} with no limit; add a limit to bound the scan",
            estimated_cost
        ));
    }
    if let Some(condition) = &spec.where_clause {
        if condition.comparison_count() >= INDEX_HINT_CONDITIONS {
            let mut fields = condition.fields();
            fields.sort_unstable();
            fields.dedup();
            hints.push(format!(
                "{} conditions on {}; consider indexing",
                condition.comparison_count(),
                fields.join(", ")
            ));
        }
    }
    hints
}

/// Content-addressed key: md5 over the normalized plan
fn cache_key(spec: &QuerySpec) -> String {
    let serialized = serde_json::to_string(spec).unwrap_or_default();
    format!("{:x}", md5::compute(serialized.as_bytes()))
}

/// Numeric helper shared with the executor
pub(crate) fn as_number(value: &Value) -> Option<f64> {
    value.as_f64()
}
