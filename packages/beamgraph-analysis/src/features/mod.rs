//! Feature modules (vertical slices)
//!
//! Dependency order: flow_graph and data_flow consume only the AST and are
//! independent of each other; cpg consumes both; patterns and query_engine
//! consume cpg-bearing analysis records; runtime_correlation consumes the
//! analysis repository plus an external event stream.

pub mod flow_graph;

pub mod data_flow;

pub mod cpg;

pub mod cache;

pub mod patterns;

pub mod query_engine;

pub mod runtime_correlation;
