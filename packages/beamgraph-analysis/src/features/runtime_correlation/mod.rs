//! Runtime correlation
//!
//! Maps live execution events onto static graph nodes: context resolution
//! with a TTL'd cache, event enhancement, execution-trace building, and
//! the three debugging primitives (structural breakpoints, data-flow
//! breakpoints, semantic watchpoints).

pub mod domain;
pub mod infrastructure;

pub use domain::{
    AstContext, BreakpointHit, BreakpointKind, DataFlowBreakpoint, DataFlowBreakpointSpec,
    DataFlowInfo, EnhancedEvent, ExecutionTrace, NodePerformance, RuntimeEvent, SemanticWatchpoint,
    StructuralBreakpoint, StructuralBreakpointSpec, StructuralInfo, VariableObservation,
    WatchpointSpec,
};
pub use infrastructure::{
    BreakpointRegistry, CorrelationError, CorrelationResult, CorrelatorConfig, CorrelatorStats,
    RuntimeCorrelator,
};
