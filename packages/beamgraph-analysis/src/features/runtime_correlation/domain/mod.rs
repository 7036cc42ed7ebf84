//! Runtime correlation domain models

mod breakpoint;
mod event;
mod trace;

pub use breakpoint::{
    BreakpointHit, BreakpointKind, DataFlowBreakpoint, DataFlowBreakpointSpec, SemanticWatchpoint,
    StructuralBreakpoint, StructuralBreakpointSpec, WatchpointSpec,
};
pub use event::{AstContext, DataFlowInfo, EnhancedEvent, RuntimeEvent, StructuralInfo};
pub use trace::{ExecutionTrace, NodePerformance, VariableObservation};
