//! Declarative query engine
//!
//! Plans are validated, cost-estimated and selectivity-reordered before
//! execution; results are served from a content-addressed cache when the
//! same normalized plan repeats.

pub mod domain;
pub mod infrastructure;

pub use domain::{
    CompareOp, Cond, Condition, PerformanceGrade, QueryMetadata, QueryOutput, QueryPlan,
    QuerySpec, Relation, Row, Selection, SortDirection,
};
pub use infrastructure::{
    optimizer, QueryEngine, QueryEngineConfig, QueryError, QueryResult, RelationProvider,
};
