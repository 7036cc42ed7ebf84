/*
 * Breakpoint / Watchpoint Registry
 *
 * Owned, explicitly-lifetimed coordinator: lookups are concurrent reads,
 * registration and removal are serialized writes. Specifications are
 * validated here, before any entry is stored, so an invalid breakpoint
 * never appears in listings.
 */

use ahash::AHashMap;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use super::super::domain::{
    DataFlowBreakpoint, DataFlowBreakpointSpec, SemanticWatchpoint, StructuralBreakpoint,
    StructuralBreakpointSpec, VariableObservation, WatchpointSpec,
};
use super::errors::{CorrelationError, CorrelationResult};

/// Watchpoint plus its accumulated value history
pub(crate) struct WatchpointState {
    pub watchpoint: SemanticWatchpoint,
    pub history: Vec<VariableObservation>,
}

#[derive(Default)]
pub struct BreakpointRegistry {
    structural: RwLock<AHashMap<Uuid, StructuralBreakpoint>>,
    data_flow: RwLock<AHashMap<Uuid, DataFlowBreakpoint>>,
    watchpoints: RwLock<AHashMap<Uuid, WatchpointState>>,
}

impl BreakpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_structural(
        &self,
        spec: StructuralBreakpointSpec,
    ) -> CorrelationResult<Uuid> {
        let pattern = spec.pattern.ok_or(CorrelationError::InvalidPattern)?;
        let id = Uuid::new_v4();
        debug!(%id, "registering structural breakpoint");
        self.structural.write().insert(
            id,
            StructuralBreakpoint {
                id,
                pattern,
                path: spec.path,
                enabled: true,
            },
        );
        Ok(id)
    }

    pub fn register_data_flow(&self, spec: DataFlowBreakpointSpec) -> CorrelationResult<Uuid> {
        let variable = spec
            .variable
            .filter(|v| !v.trim().is_empty())
            .ok_or(CorrelationError::InvalidVariable)?;
        let id = Uuid::new_v4();
        debug!(%id, %variable, "registering data-flow breakpoint");
        self.data_flow.write().insert(
            id,
            DataFlowBreakpoint {
                id,
                variable,
                flow_kinds: spec.flow_kinds,
                path: spec.path,
                enabled: true,
            },
        );
        Ok(id)
    }

    pub fn register_watchpoint(&self, spec: WatchpointSpec) -> CorrelationResult<Uuid> {
        let variable = spec
            .variable
            .filter(|v| !v.trim().is_empty())
            .ok_or(CorrelationError::InvalidVariable)?;
        let id = Uuid::new_v4();
        debug!(%id, %variable, "registering watchpoint");
        self.watchpoints.write().insert(
            id,
            WatchpointState {
                watchpoint: SemanticWatchpoint {
                    id,
                    variable,
                    flow_kinds: spec.flow_kinds,
                    scope: spec.scope,
                    enabled: true,
                },
                history: Vec::new(),
            },
        );
        Ok(id)
    }

    pub fn remove(&self, id: Uuid) -> CorrelationResult<()> {
        let removed = self.structural.write().remove(&id).is_some()
            || self.data_flow.write().remove(&id).is_some()
            || self.watchpoints.write().remove(&id).is_some();
        if removed {
            Ok(())
        } else {
            Err(CorrelationError::UnknownBreakpoint { id })
        }
    }

    pub fn structural_breakpoints(&self) -> Vec<StructuralBreakpoint> {
        self.structural.read().values().cloned().collect()
    }

    pub fn data_flow_breakpoints(&self) -> Vec<DataFlowBreakpoint> {
        self.data_flow.read().values().cloned().collect()
    }

    pub fn watchpoints(&self) -> Vec<SemanticWatchpoint> {
        self.watchpoints
            .read()
            .values()
            .map(|s| s.watchpoint.clone())
            .collect()
    }

    /// Accumulated value history of one watchpoint
    pub fn watchpoint_history(&self, id: Uuid) -> CorrelationResult<Vec<VariableObservation>> {
        self.watchpoints
            .read()
            .get(&id)
            .map(|s| s.history.clone())
            .ok_or(CorrelationError::UnknownBreakpoint { id })
    }

    /// Append an observation to every watchpoint tracking this variable in
    /// this scope
    pub(crate) fn record_observation(
        &self,
        variable: &str,
        scope_path: &str,
        sequence: usize,
        line: Option<u32>,
        value: &Value,
    ) {
        let mut watchpoints = self.watchpoints.write();
        for state in watchpoints.values_mut() {
            let w = &state.watchpoint;
            if !w.enabled || w.variable != variable {
                continue;
            }
            if let Some(scope) = &w.scope {
                if !scope_path.starts_with(scope.as_str()) {
                    continue;
                }
            }
            state.history.push(VariableObservation {
                sequence,
                value: value.clone(),
                line,
            });
        }
    }

    pub fn len(&self) -> usize {
        self.structural.read().len() + self.data_flow.read().len() + self.watchpoints.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::patterns::domain::AstTemplate;

    #[test]
    fn test_structural_without_pattern_rejected() {
        let registry = BreakpointRegistry::new();
        let err = registry
            .register_structural(StructuralBreakpointSpec::default())
            .unwrap_err();
        assert_eq!(err, CorrelationError::InvalidPattern);
        assert!(registry.structural_breakpoints().is_empty());
    }

    #[test]
    fn test_data_flow_without_variable_rejected() {
        let registry = BreakpointRegistry::new();
        let err = registry
            .register_data_flow(DataFlowBreakpointSpec::default())
            .unwrap_err();
        assert_eq!(err, CorrelationError::InvalidVariable);
    }

    #[test]
    fn test_register_and_list() {
        let registry = BreakpointRegistry::new();
        let id = registry
            .register_structural(StructuralBreakpointSpec {
                pattern: Some(AstTemplate::call("query", 1)),
                path: None,
            })
            .unwrap();
        let listed = registry.structural_breakpoints();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, id);
    }

    #[test]
    fn test_remove_unknown_is_error() {
        let registry = BreakpointRegistry::new();
        assert!(matches!(
            registry.remove(Uuid::new_v4()),
            Err(CorrelationError::UnknownBreakpoint { .. })
        ));
    }
}
