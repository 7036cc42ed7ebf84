/*
 * Analysis repository
 *
 * Read-optimized store of completed module analyses, shared by the pattern
 * matcher, query engine and runtime correlator. Lookups are concurrent;
 * inserts go through the concurrent map's per-shard serialization.
 */

use dashmap::DashMap;
use serde_json::json;
use std::sync::Arc;

use crate::features::query_engine::infrastructure::RelationProvider;
use crate::features::query_engine::Row;

use super::analyze::{FunctionAnalysis, ModuleAnalysis};

#[derive(Default)]
pub struct AnalysisRepository {
    modules: DashMap<String, Arc<ModuleAnalysis>>,
}

impl AnalysisRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, analysis: ModuleAnalysis) -> Arc<ModuleAnalysis> {
        let arc = Arc::new(analysis);
        self.modules.insert(arc.name.clone(), Arc::clone(&arc));
        arc
    }

    pub fn module(&self, name: &str) -> Option<Arc<ModuleAnalysis>> {
        self.modules.get(name).map(|m| Arc::clone(m.value()))
    }

    pub fn module_names(&self) -> Vec<String> {
        self.modules.iter().map(|m| m.key().clone()).collect()
    }

    pub fn modules(&self) -> Vec<Arc<ModuleAnalysis>> {
        self.modules.iter().map(|m| Arc::clone(m.value())).collect()
    }

    pub fn remove(&self, name: &str) -> Option<Arc<ModuleAnalysis>> {
        self.modules.remove(name).map(|(_, m)| m)
    }

    /// Look up one function across a module
    pub fn function(
        &self,
        module: &str,
        name: &str,
        arity: usize,
    ) -> Option<(Arc<ModuleAnalysis>, usize)> {
        let module = self.module(module)?;
        let index = module
            .functions
            .iter()
            .position(|f| f.name == name && f.arity == arity)?;
        Some((module, index))
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Total function count across all modules
    pub fn function_count(&self) -> usize {
        self.modules.iter().map(|m| m.functions.len()).sum()
    }

    /// Iterate all analyzed functions as (module, function) pairs
    pub fn for_each_function<F: FnMut(&ModuleAnalysis, &FunctionAnalysis)>(&self, mut f: F) {
        for module in self.modules.iter() {
            for function in &module.functions {
                f(module.value(), function);
            }
        }
    }
}

/// Rows exposed to the query engine's `functions` and `modules` relations
impl RelationProvider for AnalysisRepository {
    fn functions(&self) -> Vec<Row> {
        let mut rows = Vec::with_capacity(self.function_count());
        self.for_each_function(|module, function| {
            let m = &function.cfg.metrics;
            let row = json!({
                "module": module.name,
                "name": function.name,
                "arity": function.arity,
                "line": function.line,
                "complexity": m.cyclomatic,
                "cognitive": m.cognitive,
                "nesting_depth": m.nesting_depth,
                "maintainability": m.maintainability,
                "pattern_matches": m.pattern_match_count,
                "guards": m.guard_count,
            });
            if let serde_json::Value::Object(row) = row {
                rows.push(row);
            }
        });
        rows
    }

    fn modules(&self) -> Vec<Row> {
        self.modules()
            .into_iter()
            .filter_map(|module| {
                let function_count = module.functions.len();
                let total = module.total_cyclomatic();
                let avg = if function_count > 0 {
                    total as f64 / function_count as f64
                } else {
                    0.0
                };
                let row = json!({
                    "name": module.name,
                    "function_count": function_count,
                    "failure_count": module.failures.len(),
                    "total_complexity": total,
                    "avg_complexity": avg,
                });
                match row {
                    serde_json::Value::Object(row) => Some(row),
                    _ => None,
                }
            })
            .collect()
    }
}
