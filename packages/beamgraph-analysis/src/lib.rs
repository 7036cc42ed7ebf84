/*
 * beamgraph-analysis - Program Analysis Engine
 *
 * Feature-First Architecture:
 * - shared/      : Common models (AstNode, Span)
 * - features/    : Vertical slices (flow_graph → data_flow → cpg →
 *                  patterns / query_engine / runtime_correlation, cache)
 * - pipeline/    : Orchestration (per-function analysis, module batches,
 *                  repository)
 *
 * The engine turns a parsed AST into a family of derived graphs - CFG,
 * SSA-form DFG and the unifying code property graph - then supports
 * pattern detection, cost-optimized queries and correlation of graph
 * nodes with live execution events. Per-function analysis is pure and
 * stateless; long-lived state (caches, pattern library, breakpoint
 * registries) lives in owned coordinators injected into consumers.
 */

#![allow(clippy::new_without_default)]
#![allow(clippy::len_without_is_empty)]

/// Shared models
pub mod shared;

/// Feature modules
pub mod features;

/// Pipeline orchestration
pub mod pipeline;

/// Error types
pub mod errors;

pub use errors::{AnalysisError, Result};

// Convenience re-exports of the main entry points
pub use features::cache::{AnalysisCaches, CacheConfig, CacheKind, MemoryPressureLevel};
pub use features::cpg::{CodePropertyGraph, CpgUnifier};
pub use features::data_flow::{DataFlowGraph, SsaBuilder};
pub use features::flow_graph::{CfgBuilder, ComplexityMetrics, ControlFlowGraph};
pub use features::patterns::{PatternLibrary, PatternMatcher};
pub use features::query_engine::{QueryEngine, QuerySpec};
pub use features::runtime_correlation::RuntimeCorrelator;
pub use pipeline::{AnalysisPipeline, AnalysisRepository, FunctionAnalysis, ModuleAnalysis};
pub use shared::models::{AstKind, AstNode, AstNodeId, Span};
