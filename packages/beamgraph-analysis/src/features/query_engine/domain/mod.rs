//! Query domain models

mod plan;
mod result;

pub use plan::{
    Cond, CompareOp, Condition, FieldRef, QueryPlan, QuerySpec, Relation, Selection, SortDirection,
};
pub use result::{PerformanceGrade, QueryMetadata, QueryOutput, Row};
