/*
 * Query Executor
 *
 * Execution order is fixed: cache check -> scan -> filter -> order ->
 * offset/limit -> field projection -> cache fill. Timeouts are cooperative
 * deadlines checked during the scan and surface as a retryable error.
 */

use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::features::cache::{AnalysisCaches, CacheKind};

use super::super::domain::{
    CompareOp, Condition, PerformanceGrade, QueryMetadata, QueryOutput, QueryPlan, QuerySpec,
    Relation, Row, Selection, SortDirection,
};
use super::errors::{QueryError, QueryResult};
use super::optimizer::{self, as_number};

/// Relation data source; the repository implements this
pub trait RelationProvider: Send + Sync {
    fn functions(&self) -> Vec<Row>;
    fn modules(&self) -> Vec<Row>;
}

impl<P: RelationProvider> RelationProvider for Arc<P> {
    fn functions(&self) -> Vec<Row> {
        (**self).functions()
    }

    fn modules(&self) -> Vec<Row> {
        (**self).modules()
    }
}

/// Latency thresholds, similarity bound and deadline
#[derive(Debug, Clone)]
pub struct QueryEngineConfig {
    pub excellent_ms: f64,
    pub good_ms: f64,
    pub similarity_bound: f64,
    pub timeout: Duration,
}

impl Default for QueryEngineConfig {
    fn default() -> Self {
        Self {
            excellent_ms: 10.0,
            good_ms: 100.0,
            similarity_bound: 0.8,
            timeout: Duration::from_secs(5),
        }
    }
}

pub struct QueryEngine<P: RelationProvider> {
    provider: P,
    caches: Arc<AnalysisCaches>,
    config: QueryEngineConfig,
}

impl<P: RelationProvider> QueryEngine<P> {
    pub fn new(provider: P, caches: Arc<AnalysisCaches>) -> Self {
        Self::with_config(provider, caches, QueryEngineConfig::default())
    }

    pub fn with_config(provider: P, caches: Arc<AnalysisCaches>, config: QueryEngineConfig) -> Self {
        Self {
            provider,
            caches,
            config,
        }
    }

    /// Validate and optimize without executing
    pub fn plan(&self, spec: QuerySpec) -> QueryResult<QueryPlan> {
        optimizer::optimize(spec)
    }

    /// Full pipeline: plan, cache check, scan, filter, order, page, project
    pub fn execute(&self, spec: QuerySpec) -> QueryResult<QueryOutput> {
        let plan = self.plan(spec)?;
        let start = Instant::now();

        if let Some(cached) = self.caches.get(CacheKind::QueryResult, &plan.cache_key) {
            if let Some(rows) = rows_from_value(cached) {
                debug!(key = %plan.cache_key, "query served from cache");
                return Ok(self.annotate(rows, &plan, start, true));
            }
        }

        let rows = match plan.spec.from {
            Relation::Functions => self.provider.functions(),
            Relation::Modules => self.provider.modules(),
            // Pattern queries are the pattern matcher's job; absence of
            // support is an explicit error, not an empty success
            Relation::Patterns => {
                return Err(QueryError::NotImplemented {
                    relation: Relation::Patterns.as_str().to_string(),
                })
            }
        };

        let deadline = start + self.config.timeout;
        let mut filtered = Vec::new();
        for row in rows {
            if Instant::now() >= deadline {
                return Err(QueryError::Timeout {
                    elapsed_ms: start.elapsed().as_millis() as u64,
                });
            }
            let keep = match &plan.spec.where_clause {
                Some(condition) => self.eval(condition, &row),
                None => true,
            };
            if keep {
                filtered.push(row);
            }
        }

        if let Some((field, direction)) = &plan.spec.order_by {
            filtered.sort_by(|a, b| {
                let ordering = compare_values(a.get(field), b.get(field));
                match direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        let offset = plan.spec.offset.unwrap_or(0);
        let mut paged: Vec<Row> = filtered.into_iter().skip(offset).collect();
        if let Some(limit) = plan.spec.limit {
            paged.truncate(limit);
        }

        let projected: Vec<Row> = match &plan.spec.select {
            Selection::All => paged,
            Selection::Fields(fields) => paged
                .into_iter()
                .map(|row| {
                    fields
                        .iter()
                        .filter_map(|f| row.get(f).map(|v| (f.clone(), v.clone())))
                        .collect()
                })
                .collect(),
        };

        self.caches.put(
            CacheKind::QueryResult,
            plan.cache_key.clone(),
            Value::Array(projected.iter().cloned().map(Value::Object).collect()),
        );

        Ok(self.annotate(projected, &plan, start, false))
    }

    fn annotate(
        &self,
        data: Vec<Row>,
        plan: &QueryPlan,
        start: Instant,
        cache_hit: bool,
    ) -> QueryOutput {
        let execution_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        QueryOutput {
            data,
            metadata: QueryMetadata {
                execution_time_ms,
                cache_hit,
                optimization_hints: plan.optimization_hints.clone(),
                performance_score: PerformanceGrade::from_millis(
                    execution_time_ms,
                    self.config.excellent_ms,
                    self.config.good_ms,
                ),
                estimated_cost: plan.estimated_cost,
            },
        }
    }

    fn eval(&self, condition: &Condition, row: &Row) -> bool {
        match condition {
            Condition::And(items) => items.iter().all(|c| self.eval(c, row)),
            Condition::Or(items) => items.iter().any(|c| self.eval(c, row)),
            Condition::Not(inner) => !self.eval(inner, row),
            Condition::Compare { field, op, value } => {
                let actual = match row.get(field) {
                    Some(actual) => actual,
                    None => return false,
                };
                self.compare(actual, *op, value)
            }
        }
    }

    fn compare(&self, actual: &Value, op: CompareOp, operand: &Value) -> bool {
        match op {
            CompareOp::Eq => values_equal(actual, operand),
            CompareOp::Ne => !values_equal(actual, operand),
            CompareOp::Gt => numeric(actual, operand, |a, b| a > b),
            CompareOp::Lt => numeric(actual, operand, |a, b| a < b),
            CompareOp::Gte => numeric(actual, operand, |a, b| a >= b),
            CompareOp::Lte => numeric(actual, operand, |a, b| a <= b),
            CompareOp::In => operand
                .as_array()
                .map(|items| items.iter().any(|v| values_equal(actual, v)))
                .unwrap_or(false),
            CompareOp::NotIn => operand
                .as_array()
                .map(|items| !items.iter().any(|v| values_equal(actual, v)))
                .unwrap_or(false),
            CompareOp::Contains => match (actual, operand) {
                (Value::String(haystack), Value::String(needle)) => haystack.contains(needle),
                (Value::Array(items), needle) => items.iter().any(|v| values_equal(v, needle)),
                _ => false,
            },
            // Operand validated as a compilable regex at plan time
            CompareOp::Matches => match (actual.as_str(), operand.as_str()) {
                (Some(text), Some(pattern)) => Regex::new(pattern)
                    .map(|re| re.is_match(text))
                    .unwrap_or(false),
                _ => false,
            },
            CompareOp::SimilarTo => match (actual.as_str(), operand.as_str()) {
                (Some(a), Some(b)) => similarity(a, b) >= self.config.similarity_bound,
                _ => false,
            },
        }
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => (x - y).abs() < f64::EPSILON,
        _ => a == b,
    }
}

fn numeric(a: &Value, b: &Value, cmp: fn(f64, f64) -> bool) -> bool {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => cmp(x, y),
        _ => false,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => a
                .as_str()
                .unwrap_or_default()
                .cmp(b.as_str().unwrap_or_default()),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn rows_from_value(value: Value) -> Option<Vec<Row>> {
    let items = match value {
        Value::Array(items) => items,
        _ => return None,
    };
    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Object(row) => rows.push(row),
            _ => return None,
        }
    }
    Some(rows)
}

/// Normalized Levenshtein similarity in [0, 1]
fn similarity(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let longest = a_chars.len().max(b_chars.len());
    if longest == 0 {
        return 1.0;
    }
    let distance = levenshtein(&a_chars, &b_chars);
    1.0 - distance as f64 / longest as f64
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];
    for (i, &ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::query_engine::domain::Cond;
    use serde_json::json;

    struct MockProvider {
        functions: Vec<Row>,
    }

    impl MockProvider {
        fn empty() -> Self {
            Self {
                functions: Vec::new(),
            }
        }

        fn sample() -> Self {
            let rows = vec![
                json!({"module": "Payments", "name": "charge", "complexity": 18, "line": 10}),
                json!({"module": "Payments", "name": "refund", "complexity": 4, "line": 40}),
                json!({"module": "Accounts", "name": "create", "complexity": 22, "line": 5}),
            ];
            Self {
                functions: rows
                    .into_iter()
                    .map(|v| v.as_object().cloned().unwrap_or_default())
                    .collect(),
            }
        }
    }

    impl RelationProvider for MockProvider {
        fn functions(&self) -> Vec<Row> {
            self.functions.clone()
        }

        fn modules(&self) -> Vec<Row> {
            Vec::new()
        }
    }

    fn engine(provider: MockProvider) -> QueryEngine<MockProvider> {
        QueryEngine::new(provider, Arc::new(AnalysisCaches::default()))
    }

    #[test]
    fn test_empty_relation_first_call_then_cache_hit() {
        let engine = engine(MockProvider::empty());
        let spec = QuerySpec::from_relation(Relation::Functions)
            .filter(Cond::field("complexity").gt(15))
            .limit(20);

        let first = engine.execute(spec.clone()).unwrap();
        assert!(first.data.is_empty());
        assert!(!first.metadata.cache_hit);
        assert_eq!(
            first.metadata.performance_score,
            PerformanceGrade::Excellent
        );

        let second = engine.execute(spec).unwrap();
        assert!(second.data.is_empty());
        assert!(second.metadata.cache_hit);
    }

    #[test]
    fn test_query_idempotence() {
        let engine = engine(MockProvider::sample());
        let spec = QuerySpec::from_relation(Relation::Functions)
            .filter(Cond::field("complexity").gt(15))
            .order_by("complexity", SortDirection::Desc);

        let first = engine.execute(spec.clone()).unwrap();
        let second = engine.execute(spec).unwrap();
        assert_eq!(first.data, second.data);
        assert!(second.metadata.cache_hit);
    }

    #[test]
    fn test_filter_order_limit_projection() {
        let engine = engine(MockProvider::sample());
        let spec = QuerySpec::from_relation(Relation::Functions)
            .filter(Cond::field("complexity").gt(10))
            .order_by("complexity", SortDirection::Desc)
            .limit(1)
            .select(vec!["name"]);

        let output = engine.execute(spec).unwrap();
        assert_eq!(output.data.len(), 1);
        assert_eq!(output.data[0].get("name"), Some(&json!("create")));
        assert!(output.data[0].get("module").is_none(), "projected away");
    }

    #[test]
    fn test_offset_pagination() {
        let engine = engine(MockProvider::sample());
        let spec = QuerySpec::from_relation(Relation::Functions)
            .order_by("line", SortDirection::Asc)
            .offset(1)
            .limit(1);
        let output = engine.execute(spec).unwrap();
        assert_eq!(output.data.len(), 1);
        assert_eq!(output.data[0].get("name"), Some(&json!("charge")));
    }

    #[test]
    fn test_patterns_relation_not_implemented() {
        let engine = engine(MockProvider::empty());
        let err = engine
            .execute(QuerySpec::from_relation(Relation::Patterns))
            .unwrap_err();
        assert!(matches!(err, QueryError::NotImplemented { relation } if relation == "patterns"));
    }

    #[test]
    fn test_matches_operator() {
        let engine = engine(MockProvider::sample());
        let spec = QuerySpec::from_relation(Relation::Functions)
            .filter(Cond::field("name").matches("^c"));
        let output = engine.execute(spec).unwrap();
        assert_eq!(output.data.len(), 2, "charge and create");
    }

    #[test]
    fn test_similar_to_operator() {
        let engine = engine(MockProvider::sample());
        let spec = QuerySpec::from_relation(Relation::Functions)
            .filter(Cond::field("name").similar_to("charges"));
        let output = engine.execute(spec).unwrap();
        assert_eq!(output.data.len(), 1);
        assert_eq!(output.data[0].get("name"), Some(&json!("charge")));
    }

    #[test]
    fn test_in_operator() {
        let engine = engine(MockProvider::sample());
        let spec = QuerySpec::from_relation(Relation::Functions)
            .filter(Cond::field("module").is_in(vec![json!("Accounts")]));
        let output = engine.execute(spec).unwrap();
        assert_eq!(output.data.len(), 1);
    }

    #[test]
    fn test_similarity_metric() {
        assert!((similarity("abc", "abc") - 1.0).abs() < 1e-9);
        assert!(similarity("abc", "xyz") < 0.2);
        assert!(similarity("charge", "charges") > 0.8);
    }
}
