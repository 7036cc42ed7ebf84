/*
 * Pattern Library
 *
 * Registry of named pattern definitions behind a read/write lock: reads
 * are concurrent, registration is serialized. Pre-seeded with the built-in
 * process patterns and anti-patterns; extensible at runtime by registering
 * new (name -> definition) pairs.
 */

use ahash::AHashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::pipeline::{FunctionAnalysis, ModuleAnalysis};
use crate::shared::models::{AstKind, AstNode};

use super::super::domain::{PatternDefinition, PatternKind, PatternRule, PatternScope, Severity};
use super::errors::{PatternError, PatternResult};

static QUERY_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(query|select|fetch|find|get)").expect("static regex"));
static ITERATION_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(map|each|reduce|filter|flat_map)$").expect("static regex"));
static SUPERVISION_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(supervise|start_child|child_spec)$").expect("static regex"));
static REGISTRATION_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(register|whereis)$").expect("static regex"));

pub struct PatternLibrary {
    patterns: RwLock<AHashMap<String, Arc<PatternDefinition>>>,
}

impl PatternLibrary {
    pub fn new() -> Self {
        Self {
            patterns: RwLock::new(AHashMap::new()),
        }
    }

    /// Library pre-seeded with the built-in pattern set
    pub fn with_builtins() -> Self {
        let library = Self::new();
        for definition in builtin_definitions() {
            // Built-ins are well-formed by construction
            let _ = library.register(definition);
        }
        library
    }

    /// Validate and register a definition; replaces an existing name.
    pub fn register(&self, definition: PatternDefinition) -> PatternResult<()> {
        if definition.name.trim().is_empty() {
            return Err(PatternError::InvalidSpec {
                reason: "pattern name is empty".to_string(),
            });
        }
        if definition.rules.is_empty() {
            return Err(PatternError::EmptyRules {
                name: definition.name,
            });
        }
        if definition.rules.iter().any(|r| r.weight <= 0.0) {
            return Err(PatternError::InvalidSpec {
                reason: format!("pattern `{}` has a non-positive rule weight", definition.name),
            });
        }
        debug!(pattern = %definition.name, "registering pattern");
        self.patterns
            .write()
            .insert(definition.name.clone(), Arc::new(definition));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<PatternDefinition>> {
        self.patterns.read().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.patterns.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn of_kind(&self, kind: PatternKind) -> Vec<Arc<PatternDefinition>> {
        let mut definitions: Vec<Arc<PatternDefinition>> = self
            .patterns
            .read()
            .values()
            .filter(|d| d.kind == kind)
            .cloned()
            .collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    pub fn len(&self) -> usize {
        self.patterns.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.read().is_empty()
    }
}

impl Default for PatternLibrary {
    fn default() -> Self {
        Self::with_builtins()
    }
}

// ----------------------------------------------------------------------
// Built-in definitions
// ----------------------------------------------------------------------

fn builtin_definitions() -> Vec<PatternDefinition> {
    vec![
        server_process(),
        supervisor_process(),
        singleton(),
        n_plus_one_query(),
        god_function(),
        deep_nesting(),
        injection_vulnerability(),
    ]
}

fn server_process() -> PatternDefinition {
    PatternDefinition {
        name: "server_process".to_string(),
        kind: PatternKind::Behavioral,
        scope: PatternScope::Module,
        description: "Long-lived server process with an init/handle lifecycle".to_string(),
        severity: Severity::Info,
        suggestions: vec![
            "Document the messages this process accepts".to_string(),
            "Prefer the standard server behaviour over a hand-rolled loop".to_string(),
        ],
        rules: vec![
            PatternRule::new("has_init", 1.0, |ctx| {
                module_has_function(ctx.module, "init")
            }),
            PatternRule::new("has_message_handlers", 1.0, |ctx| {
                module_has_function(ctx.module, "handle_call")
                    || module_has_function(ctx.module, "handle_cast")
                    || module_has_function(ctx.module, "handle_info")
            }),
            PatternRule::new("has_receive_loop", 1.0, |ctx| {
                ctx.module
                    .functions
                    .iter()
                    .any(|f| contains_kind(f, AstKind::Receive))
            }),
        ],
        metadata: json!({"family": "process"}),
    }
}

fn supervisor_process() -> PatternDefinition {
    PatternDefinition {
        name: "supervisor_process".to_string(),
        kind: PatternKind::Behavioral,
        scope: PatternScope::Module,
        description: "Supervisor process starting and restarting child processes".to_string(),
        severity: Severity::Info,
        suggestions: vec!["Review the restart strategy for each child".to_string()],
        rules: vec![
            PatternRule::new("has_start_link", 1.0, |ctx| {
                module_has_function(ctx.module, "start_link")
            }),
            PatternRule::new("has_init", 1.0, |ctx| {
                module_has_function(ctx.module, "init")
            }),
            PatternRule::new("supervises_children", 1.0, |ctx| {
                ctx.module
                    .functions
                    .iter()
                    .any(|f| contains_call(f, &SUPERVISION_CALL))
            }),
        ],
        metadata: json!({"family": "process"}),
    }
}

fn singleton() -> PatternDefinition {
    PatternDefinition {
        name: "singleton".to_string(),
        kind: PatternKind::AntiPattern,
        scope: PatternScope::Module,
        description: "Process registered under a single global name".to_string(),
        severity: Severity::Warning,
        suggestions: vec![
            "Pass the process reference explicitly instead of a global name".to_string(),
            "Consider a registry keyed by caller if multiple instances are possible".to_string(),
        ],
        rules: vec![
            PatternRule::new("has_start_link", 1.0, |ctx| {
                module_has_function(ctx.module, "start_link")
            }),
            PatternRule::new("registers_global_name", 1.0, |ctx| {
                ctx.module
                    .functions
                    .iter()
                    .any(|f| contains_call(f, &REGISTRATION_CALL))
            }),
        ],
        metadata: json!({"family": "anti"}),
    }
}

fn n_plus_one_query() -> PatternDefinition {
    PatternDefinition {
        name: "n_plus_one_query".to_string(),
        kind: PatternKind::AntiPattern,
        scope: PatternScope::Function,
        description: "Query issued once per element of an enumeration".to_string(),
        severity: Severity::Error,
        suggestions: vec![
            "Batch the lookups into one query before the loop".to_string(),
            "Preload the association instead of fetching per element".to_string(),
        ],
        rules: vec![
            PatternRule::new("has_enumeration", 1.0, |ctx| {
                ctx.function.map(has_enumeration).unwrap_or(false)
            }),
            PatternRule::new("query_inside_enumeration", 2.0, |ctx| {
                ctx.function.map(query_inside_enumeration).unwrap_or(false)
            }),
        ],
        metadata: json!({"family": "performance"}),
    }
}

fn god_function() -> PatternDefinition {
    PatternDefinition {
        name: "god_function".to_string(),
        kind: PatternKind::AntiPattern,
        scope: PatternScope::Function,
        description: "Function doing too much: high complexity, long body, many variables"
            .to_string(),
        severity: Severity::Warning,
        suggestions: vec![
            "Extract each decision cluster into its own function".to_string(),
            "Split by the distinct responsibilities the branches represent".to_string(),
        ],
        rules: vec![
            PatternRule::new("high_cyclomatic", 3.0, |ctx| {
                ctx.function
                    .map(|f| f.cfg.metrics.cyclomatic > 15)
                    .unwrap_or(false)
            }),
            PatternRule::new("long_body", 1.0, |ctx| {
                ctx.function
                    .map(|f| f.ast.span.line_count() > 50)
                    .unwrap_or(false)
            }),
            PatternRule::new("many_variables", 1.0, |ctx| {
                ctx.function
                    .map(|f| f.dfg.versions.len() > 25)
                    .unwrap_or(false)
            }),
        ],
        metadata: json!({"family": "complexity"}),
    }
}

fn deep_nesting() -> PatternDefinition {
    PatternDefinition {
        name: "deep_nesting".to_string(),
        kind: PatternKind::AntiPattern,
        scope: PatternScope::Function,
        description: "Branching nested four levels or deeper".to_string(),
        severity: Severity::Warning,
        suggestions: vec![
            "Flatten with early returns or clause heads".to_string(),
            "Extract the inner levels into helper functions".to_string(),
        ],
        rules: vec![PatternRule::new("nesting_depth", 1.0, |ctx| {
            ctx.function
                .map(|f| f.cfg.metrics.nesting_depth >= 4)
                .unwrap_or(false)
        })],
        metadata: json!({"family": "complexity"}),
    }
}

fn injection_vulnerability() -> PatternDefinition {
    PatternDefinition {
        name: "injection_vulnerability".to_string(),
        kind: PatternKind::AntiPattern,
        scope: PatternScope::Function,
        description: "Query built from concatenated or interpolated input".to_string(),
        severity: Severity::Critical,
        suggestions: vec![
            "Use parameterized queries instead of string construction".to_string(),
            "Validate and escape any value that reaches the query text".to_string(),
        ],
        rules: vec![
            PatternRule::new("dynamic_query_construction", 2.0, |ctx| {
                ctx.function
                    .map(|f| query_call_with(f, |arg| concatenates(arg) || interpolates(arg)))
                    .unwrap_or(false)
            }),
            PatternRule::new("query_sink_present", 1.0, |ctx| {
                ctx.function
                    .map(|f| contains_call(f, &QUERY_CALL))
                    .unwrap_or(false)
            }),
        ],
        metadata: json!({"family": "security"}),
    }
}

// ----------------------------------------------------------------------
// Predicate helpers
// ----------------------------------------------------------------------

fn module_has_function(module: &ModuleAnalysis, name: &str) -> bool {
    module.functions.iter().any(|f| f.name == name)
}

fn contains_kind(function: &FunctionAnalysis, kind: AstKind) -> bool {
    function.ast.walk().any(|n| n.kind == kind)
}

fn contains_call(function: &FunctionAnalysis, pattern: &Regex) -> bool {
    function.ast.walk().any(|n| is_call_matching(n, pattern))
}

fn is_call_matching(node: &AstNode, pattern: &Regex) -> bool {
    node.kind == AstKind::Call
        && node
            .name
            .as_deref()
            .map(|name| pattern.is_match(name))
            .unwrap_or(false)
}

/// Comprehension, or an iteration call taking a closure
fn enumeration_roots(function: &FunctionAnalysis) -> Vec<&AstNode> {
    function
        .ast
        .walk()
        .filter(|n| {
            n.kind == AstKind::Comprehension
                || (is_call_matching(n, &ITERATION_CALL)
                    && n.children.iter().any(|c| c.kind == AstKind::Closure))
        })
        .collect()
}

fn has_enumeration(function: &FunctionAnalysis) -> bool {
    !enumeration_roots(function).is_empty()
}

fn query_inside_enumeration(function: &FunctionAnalysis) -> bool {
    enumeration_roots(function)
        .iter()
        .any(|root| root.walk().skip(1).any(|n| is_call_matching(n, &QUERY_CALL)))
}

/// Query-shaped call with an argument satisfying `pred` somewhere below it
fn query_call_with(function: &FunctionAnalysis, pred: fn(&AstNode) -> bool) -> bool {
    function
        .ast
        .walk()
        .filter(|n| is_call_matching(n, &QUERY_CALL))
        .any(|call| call.children.iter().any(|arg| arg.walk().any(pred)))
}

fn concatenates(node: &AstNode) -> bool {
    node.kind == AstKind::BinaryOp && node.name.as_deref() == Some("<>")
}

fn interpolates(node: &AstNode) -> bool {
    node.kind == AstKind::Literal
        && node
            .value
            .as_ref()
            .and_then(|v| v.as_str())
            .map(|s| s.contains("#{"))
            .unwrap_or(false)
}
