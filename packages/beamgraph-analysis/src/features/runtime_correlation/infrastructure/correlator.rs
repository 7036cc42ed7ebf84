/*
 * Runtime Correlator
 *
 * Resolves execution events to static AST contexts (cached per
 * synthesized key with a TTL; a hit short-circuits full re-resolution),
 * enhances events with structural and data-flow information, builds
 * execution traces, and evaluates breakpoints/watchpoints against
 * enhanced events.
 */

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

use crate::features::flow_graph::domain::CfgNodeKind;
use crate::pipeline::{AnalysisRepository, FunctionAnalysis};
use crate::shared::models::{AstKind, AstNode, AstNodeId};

use super::super::domain::{
    AstContext, BreakpointHit, BreakpointKind, DataFlowInfo, EnhancedEvent, ExecutionTrace,
    NodePerformance, RuntimeEvent, StructuralInfo, VariableObservation,
};
use super::breakpoints::BreakpointRegistry;
use super::errors::{CorrelationError, CorrelationResult};

#[derive(Debug, Clone)]
pub struct CorrelatorConfig {
    pub resolution_cache_capacity: usize,
    pub resolution_ttl: Duration,
}

impl Default for CorrelatorConfig {
    fn default() -> Self {
        Self {
            resolution_cache_capacity: 256,
            resolution_ttl: Duration::from_secs(60),
        }
    }
}

struct CachedResolution {
    context: Arc<AstContext>,
    cached_at: Instant,
}

/// Correlator statistics
#[derive(Debug, Clone, Copy)]
pub struct CorrelatorStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub registered_breakpoints: usize,
}

pub struct RuntimeCorrelator {
    repository: Arc<AnalysisRepository>,
    registry: BreakpointRegistry,
    resolution_cache: Mutex<LruCache<String, CachedResolution>>,
    config: CorrelatorConfig,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

impl RuntimeCorrelator {
    pub fn new(repository: Arc<AnalysisRepository>) -> Self {
        Self::with_config(repository, CorrelatorConfig::default())
    }

    pub fn with_config(repository: Arc<AnalysisRepository>, config: CorrelatorConfig) -> Self {
        let capacity = NonZeroUsize::new(config.resolution_cache_capacity.max(1))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            repository,
            registry: BreakpointRegistry::new(),
            resolution_cache: Mutex::new(LruCache::new(capacity)),
            config,
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
        }
    }

    pub fn registry(&self) -> &BreakpointRegistry {
        &self.registry
    }

    pub fn stats(&self) -> CorrelatorStats {
        CorrelatorStats {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            registered_breakpoints: self.registry.len(),
        }
    }

    /// Resolve an event to its AST context, serving repeats from the
    /// TTL'd resolution cache.
    pub fn resolve_context(&self, event: &RuntimeEvent) -> CorrelationResult<Arc<AstContext>> {
        let key = event.key();
        {
            let mut cache = self.resolution_cache.lock();
            let expired = match cache.peek(&key) {
                Some(entry) => entry.cached_at.elapsed() > self.config.resolution_ttl,
                None => false,
            };
            if expired {
                cache.pop(&key);
            } else if let Some(entry) = cache.get(&key) {
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Arc::clone(&entry.context));
            }
        }
        self.cache_misses.fetch_add(1, Ordering::Relaxed);

        let function = self.lookup_function(event)?;

        // Provided node id wins when it exists in this function's tree;
        // otherwise synthesize from the line, falling back to the head
        let ast_node_id = event
            .ast_node_id
            .filter(|id| function.ast.find(*id).is_some())
            .or_else(|| {
                event
                    .line
                    .and_then(|line| function.ast.find_at_line(line))
                    .map(|n| n.id)
            })
            .unwrap_or(function.ast.id);
        let line = event
            .line
            .or_else(|| function.ast.find(ast_node_id).map(|n| n.line()))
            .unwrap_or(function.line);

        let cfg_node = function
            .cfg
            .nodes
            .iter()
            .find(|n| n.ast_node == ast_node_id)
            .or_else(|| function.cfg.nodes.iter().find(|n| n.line == line));

        let context = Arc::new(AstContext {
            module: event.module.clone(),
            function: event.function.clone(),
            arity: event.arity,
            ast_node_id,
            line,
            cfg_node: cfg_node.map(|n| n.id),
            scope: cfg_node.map(|n| n.scope),
        });

        debug!(key = %key, line, "resolved event context");
        self.resolution_cache.lock().put(
            key,
            CachedResolution {
                context: Arc::clone(&context),
                cached_at: Instant::now(),
            },
        );
        Ok(context)
    }

    /// Resolve and attach structural + data-flow information
    pub fn enhance(&self, event: &RuntimeEvent) -> CorrelationResult<EnhancedEvent> {
        let context = self.resolve_context(event)?;
        let function = self.lookup_function(event)?;

        let structural = function.ast.find(context.ast_node_id).map(|node| {
            let (nesting_depth, pattern_context) =
                depth_and_clause(&function.ast, context.ast_node_id);
            StructuralInfo {
                ast_kind: node.kind.as_str().to_string(),
                nesting_depth,
                pattern_context: pattern_context.map(str::to_string),
                control_flow_position: context
                    .cfg_node
                    .and_then(|id| function.cfg.node(id))
                    .map(|n| position_name(n.kind).to_string()),
            }
        });

        let data_flow = Some(data_flow_at(&function, context.line));

        Ok(EnhancedEvent {
            event: event.clone(),
            context: Some((*context).clone()),
            structural,
            data_flow,
        })
    }

    /// Enhance an ordered event batch and derive trace aggregates. Events
    /// lacking a resolvable context degrade to pass-through records.
    pub fn build_trace(&self, events: Vec<RuntimeEvent>) -> ExecutionTrace {
        let mut trace = ExecutionTrace {
            id: Uuid::new_v4().to_string(),
            events: Vec::with_capacity(events.len()),
            ast_flow: Vec::new(),
            variable_histories: Default::default(),
            pattern_frequencies: Default::default(),
            performance: Default::default(),
        };

        for (sequence, event) in events.into_iter().enumerate() {
            let enhanced = match self.enhance(&event) {
                Ok(enhanced) => enhanced,
                Err(_) => EnhancedEvent::pass_through(event),
            };

            self.track_watchpoints(&enhanced, sequence);

            if let Some(context) = &enhanced.context {
                trace.ast_flow.push(context.ast_node_id);

                if let Some(duration) = enhanced.event.duration_us {
                    let complexity = self
                        .lookup_function(&enhanced.event)
                        .map(|f| f.cfg.metrics.cyclomatic)
                        .unwrap_or(0);
                    trace
                        .performance
                        .entry(context.ast_node_id)
                        .and_modify(|perf| perf.observe(duration))
                        .or_insert_with(|| NodePerformance::first(duration, complexity));
                }
            }

            if let Some(structural) = &enhanced.structural {
                *trace
                    .pattern_frequencies
                    .entry(structural.ast_kind.clone())
                    .or_insert(0) += 1;
            }

            if let Some(variables) = &enhanced.event.variables {
                for (name, value) in variables {
                    trace
                        .variable_histories
                        .entry(name.clone())
                        .or_default()
                        .push(VariableObservation {
                            sequence,
                            value: value.clone(),
                            line: enhanced.event.line,
                        });
                }
            }

            trace.events.push(enhanced);
        }

        trace
    }

    /// Evaluate all registered breakpoints against one enhanced event
    pub fn check_breakpoints(&self, enhanced: &EnhancedEvent) -> Vec<BreakpointHit> {
        let context = match &enhanced.context {
            Some(context) => context,
            None => return Vec::new(),
        };
        let function = match self.lookup_function(&enhanced.event) {
            Ok(function) => function,
            Err(_) => return Vec::new(),
        };
        let event_path = enhanced.event.path();
        let mut hits = Vec::new();

        if let Some(node) = function.ast.find(context.ast_node_id) {
            // The resolved node may be a leaf inside the construct the
            // pattern describes; check its ancestors as well as its subtree
            let ancestors = ancestor_chain(&function.ast, context.ast_node_id);
            for bp in self.registry.structural_breakpoints() {
                if !bp.enabled || !path_matches(&bp.path, &event_path) {
                    continue;
                }
                if node.walk().any(|n| bp.pattern.matches(n))
                    || ancestors.iter().any(|n| bp.pattern.matches(n))
                {
                    hits.push(BreakpointHit {
                        breakpoint_id: bp.id,
                        kind: BreakpointKind::Structural,
                        event_key: enhanced.event.key(),
                        line: context.line,
                        reason: "structural pattern matched".to_string(),
                    });
                }
            }
        }

        for bp in self.registry.data_flow_breakpoints() {
            if !bp.enabled || !path_matches(&bp.path, &event_path) {
                continue;
            }
            if variable_flows(&function, context.line, &bp.variable, &bp.flow_kinds) {
                hits.push(BreakpointHit {
                    breakpoint_id: bp.id,
                    kind: BreakpointKind::DataFlow,
                    event_key: enhanced.event.key(),
                    line: context.line,
                    reason: format!("variable `{}` flow condition satisfied", bp.variable),
                });
            }
        }

        hits
    }

    fn track_watchpoints(&self, enhanced: &EnhancedEvent, sequence: usize) {
        let variables = match &enhanced.event.variables {
            Some(variables) => variables,
            None => return,
        };
        let scope_path = enhanced.event.path();
        for (name, value) in variables {
            self.registry
                .record_observation(name, &scope_path, sequence, enhanced.event.line, value);
        }
    }

    fn lookup_function(&self, event: &RuntimeEvent) -> CorrelationResult<FunctionAnalysis> {
        let module = self.repository.module(&event.module).ok_or_else(|| {
            CorrelationError::ModuleNotFound {
                module: event.module.clone(),
            }
        })?;
        module
            .function(&event.function, event.arity)
            .cloned()
            .ok_or_else(|| CorrelationError::FunctionNotFound {
                module: event.module.clone(),
                function: event.function.clone(),
                arity: event.arity,
            })
    }
}

fn path_matches(filter: &Option<String>, event_path: &str) -> bool {
    match filter {
        Some(prefix) => event_path.starts_with(prefix.as_str()),
        None => true,
    }
}

fn position_name(kind: CfgNodeKind) -> &'static str {
    match kind {
        CfgNodeKind::Entry => "entry",
        CfgNodeKind::Exit => "exit",
        CfgNodeKind::DecisionPoint(_) => "decision_point",
        CfgNodeKind::MergePoint => "merge_point",
        CfgNodeKind::Statement => "statement",
    }
}

/// Nodes on the path from `root` down to (excluding) the target node
fn ancestor_chain<'a>(root: &'a AstNode, target: AstNodeId) -> Vec<&'a AstNode> {
    fn walk<'a>(node: &'a AstNode, target: AstNodeId, path: &mut Vec<&'a AstNode>) -> bool {
        if node.id == target {
            return true;
        }
        path.push(node);
        for child in &node.children {
            if walk(child, target, path) {
                return true;
            }
        }
        path.pop();
        false
    }
    let mut path = Vec::new();
    if walk(root, target, &mut path) {
        path
    } else {
        Vec::new()
    }
}

/// Branching depth at a node and its nearest enclosing clause construct
fn depth_and_clause(root: &AstNode, target: AstNodeId) -> (u32, Option<&'static str>) {
    fn walk(
        node: &AstNode,
        target: AstNodeId,
        depth: u32,
        clause: Option<&'static str>,
    ) -> Option<(u32, Option<&'static str>)> {
        let clause = match node.kind {
            AstKind::CaseClause
            | AstKind::ReceiveClause
            | AstKind::CatchClause
            | AstKind::CondClause => Some(node.kind.as_str()),
            _ => clause,
        };
        let depth = if node.kind.is_branching() {
            depth + 1
        } else {
            depth
        };
        if node.id == target {
            return Some((depth, clause));
        }
        for child in &node.children {
            if let Some(found) = walk(child, target, depth, clause) {
                return Some(found);
            }
        }
        None
    }
    walk(root, target, 0, None).unwrap_or((0, None))
}

/// Definitions, uses and their dependencies visible at one line
fn data_flow_at(function: &FunctionAnalysis, line: u32) -> DataFlowInfo {
    let dfg = &function.dfg;
    let line_of = |ast_id: AstNodeId| function.ast.find(ast_id).map(|n| n.line());

    let mut info = DataFlowInfo::default();
    for def in &dfg.definitions {
        if line_of(def.ast_node) == Some(line) {
            if let Some(version) = dfg.version(def.variable) {
                info.definitions.push(version.ssa_name());
            }
        }
    }
    for use_site in &dfg.uses {
        if line_of(use_site.ast_node) == Some(line) {
            if let Some(version) = dfg.version(use_site.variable) {
                info.uses.push(version.ssa_name());
            }
            if let Some(def_id) = use_site.reaching_definition {
                if let Some(def) = dfg.definition(def_id) {
                    if let Some(version) = dfg.version(def.variable) {
                        info.dependencies.push(version.ssa_name());
                    }
                }
            }
        }
    }
    info.dependencies.sort();
    info.dependencies.dedup();
    info
}

/// True when the named variable has a use at this line whose def-use edge
/// kind is in the given set (empty set = any flow)
fn variable_flows(
    function: &FunctionAnalysis,
    line: u32,
    variable: &str,
    flow_kinds: &[crate::features::data_flow::domain::FlowKind],
) -> bool {
    let dfg = &function.dfg;
    let line_of = |ast_id: AstNodeId| function.ast.find(ast_id).map(|n| n.line());

    dfg.uses.iter().any(|use_site| {
        if line_of(use_site.ast_node) != Some(line) {
            return false;
        }
        let matches_name = dfg
            .version(use_site.variable)
            .map(|v| v.name == variable)
            .unwrap_or(false);
        if !matches_name {
            return false;
        }
        if flow_kinds.is_empty() {
            return true;
        }
        dfg.edges
            .iter()
            .any(|e| e.use_site == use_site.id && flow_kinds.contains(&e.kind))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::data_flow::domain::FlowKind;
    use crate::features::patterns::domain::AstTemplate;
    use crate::features::runtime_correlation::domain::{
        DataFlowBreakpointSpec, StructuralBreakpointSpec, WatchpointSpec,
    };
    use crate::pipeline::AnalysisPipeline;
    use crate::shared::models::Span;
    use serde_json::json;

    fn seeded_repository() -> Arc<AnalysisRepository> {
        // Shop.checkout(total) = (tax = compute_tax(total); total |> apply(tax))
        let body = AstNode::block(
            vec![
                AstNode::assign(
                    AstNode::ident("tax", 3),
                    AstNode::call("compute_tax", vec![AstNode::ident("total", 3)], 3),
                    3,
                ),
                AstNode::new(AstKind::Pipe, Span::line(4)).with_children(vec![
                    AstNode::ident("total", 4),
                    AstNode::call("apply", vec![AstNode::ident("tax", 4)], 4),
                ]),
            ],
            3,
        );
        let checkout = AstNode::new(AstKind::FunctionDef, Span::new(2, 0, 5, 0))
            .with_name("checkout")
            .with_children(vec![
                AstNode::new(AstKind::Parameter, Span::line(2)).with_name("total"),
                body,
            ]);
        let mut module = AstNode::new(AstKind::Module, Span::new(1, 0, 6, 0))
            .with_name("Shop")
            .with_children(vec![checkout]);
        module.assign_ids();

        let analysis = AnalysisPipeline::default().analyze_module(&module).unwrap();
        let repository = Arc::new(AnalysisRepository::new());
        repository.insert(analysis);
        repository
    }

    fn correlator() -> RuntimeCorrelator {
        RuntimeCorrelator::new(seeded_repository())
    }

    #[test]
    fn test_resolution_and_cache_hit() {
        let correlator = correlator();
        let event = RuntimeEvent::new("Shop", "checkout", 1).at_line(3);

        let first = correlator.resolve_context(&event).unwrap();
        assert_eq!(first.line, 3);
        assert_eq!(correlator.stats().cache_misses, 1);

        let second = correlator.resolve_context(&event).unwrap();
        assert_eq!(second.ast_node_id, first.ast_node_id);
        assert_eq!(correlator.stats().cache_hits, 1);
    }

    #[test]
    fn test_module_not_found() {
        let correlator = correlator();
        let err = correlator
            .resolve_context(&RuntimeEvent::new("Nope", "f", 0))
            .unwrap_err();
        assert!(matches!(err, CorrelationError::ModuleNotFound { .. }));
    }

    #[test]
    fn test_function_not_found() {
        let correlator = correlator();
        let err = correlator
            .resolve_context(&RuntimeEvent::new("Shop", "refund", 1))
            .unwrap_err();
        assert!(matches!(
            err,
            CorrelationError::FunctionNotFound { arity: 1, .. }
        ));
    }

    #[test]
    fn test_enhancement_attaches_views() {
        let correlator = correlator();
        let enhanced = correlator
            .enhance(&RuntimeEvent::new("Shop", "checkout", 1).at_line(3))
            .unwrap();

        assert!(enhanced.is_resolved());
        let data_flow = enhanced.data_flow.unwrap();
        assert!(data_flow.definitions.contains(&"tax_0".to_string()));
        assert!(data_flow.uses.contains(&"total_0".to_string()));
        assert!(enhanced.structural.is_some());
    }

    #[test]
    fn test_trace_degrades_gracefully() {
        let correlator = correlator();
        let events = vec![
            RuntimeEvent::new("Shop", "checkout", 1)
                .at_line(3)
                .with_duration_us(120),
            RuntimeEvent::new("Ghost", "vanish", 0),
            RuntimeEvent::new("Shop", "checkout", 1)
                .at_line(3)
                .with_duration_us(80),
        ];
        let trace = correlator.build_trace(events);

        assert_eq!(trace.events.len(), 3);
        assert_eq!(trace.resolved_count(), 2);
        assert_eq!(trace.unresolved_count(), 1);
        assert_eq!(trace.ast_flow.len(), 2);

        let perf = trace.performance.values().next().unwrap();
        assert_eq!(perf.call_count, 2);
        assert_eq!(perf.min_duration_us, 80);
        assert_eq!(perf.max_duration_us, 120);
    }

    #[test]
    fn test_variable_history() {
        let correlator = correlator();
        let mut vars = serde_json::Map::new();
        vars.insert("total".to_string(), json!(100));
        let events = vec![
            RuntimeEvent::new("Shop", "checkout", 1)
                .at_line(3)
                .with_variables(vars.clone()),
            RuntimeEvent::new("Shop", "checkout", 1).at_line(4).with_variables({
                let mut v = serde_json::Map::new();
                v.insert("total".to_string(), json!(108));
                v
            }),
        ];
        let trace = correlator.build_trace(events);
        let history = trace.variable_histories.get("total").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].value, json!(100));
        assert_eq!(history[1].value, json!(108));
    }

    #[test]
    fn test_structural_breakpoint_fires() {
        let correlator = correlator();
        correlator
            .registry()
            .register_structural(StructuralBreakpointSpec {
                pattern: Some(AstTemplate::call("compute_tax", 1)),
                path: Some("Shop".to_string()),
            })
            .unwrap();

        let enhanced = correlator
            .enhance(&RuntimeEvent::new("Shop", "checkout", 1).at_line(3))
            .unwrap();
        let hits = correlator.check_breakpoints(&enhanced);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind, BreakpointKind::Structural);
    }

    #[test]
    fn test_data_flow_breakpoint_on_pipeline_stage() {
        let correlator = correlator();
        correlator
            .registry()
            .register_data_flow(DataFlowBreakpointSpec {
                variable: Some("total".to_string()),
                flow_kinds: vec![FlowKind::PipelineStage],
                path: None,
            })
            .unwrap();

        let at_pipe = correlator
            .enhance(&RuntimeEvent::new("Shop", "checkout", 1).at_line(4))
            .unwrap();
        assert_eq!(correlator.check_breakpoints(&at_pipe).len(), 1);

        let at_assign = correlator
            .enhance(&RuntimeEvent::new("Shop", "checkout", 1).at_line(3))
            .unwrap();
        assert!(correlator.check_breakpoints(&at_assign).is_empty());
    }

    #[test]
    fn test_watchpoint_accumulates_history() {
        let correlator = correlator();
        let id = correlator
            .registry()
            .register_watchpoint(WatchpointSpec {
                variable: Some("total".to_string()),
                flow_kinds: vec![],
                scope: Some("Shop".to_string()),
            })
            .unwrap();

        let mut vars = serde_json::Map::new();
        vars.insert("total".to_string(), json!(100));
        correlator.build_trace(vec![
            RuntimeEvent::new("Shop", "checkout", 1)
                .at_line(3)
                .with_variables(vars),
        ]);

        let history = correlator.registry().watchpoint_history(id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].value, json!(100));
    }
}
