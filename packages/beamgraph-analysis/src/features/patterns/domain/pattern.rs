/*
 * Pattern Domain Model
 *
 * A pattern definition is plain data: a list of independent predicate
 * rules plus its severity/suggestion metadata. Confidence is the weighted
 * fraction of satisfied rules, so the matcher's dispatch never changes
 * when new patterns are registered.
 */

use crate::pipeline::{FunctionAnalysis, ModuleAnalysis};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use super::template::AstTemplate;

/// Default confidence threshold for all match families
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternKind {
    Structural,
    Behavioral,
    AntiPattern,
}

impl PatternKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::Structural => "structural",
            PatternKind::Behavioral => "behavioral",
            PatternKind::AntiPattern => "anti_pattern",
        }
    }
}

/// Whether a definition is evaluated once per module or once per function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternScope {
    Module,
    Function,
}

/// Evaluation context handed to every predicate
pub struct PatternContext<'a> {
    pub module: &'a ModuleAnalysis,
    /// Set for function-scoped definitions
    pub function: Option<&'a FunctionAnalysis>,
}

/// One independent predicate with its contribution weight
pub struct PatternRule {
    pub name: String,
    pub weight: f64,
    pub check: Arc<dyn Fn(&PatternContext<'_>) -> bool + Send + Sync>,
}

impl PatternRule {
    pub fn new(
        name: impl Into<String>,
        weight: f64,
        check: impl Fn(&PatternContext<'_>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            weight,
            check: Arc::new(check),
        }
    }
}

impl fmt::Debug for PatternRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternRule")
            .field("name", &self.name)
            .field("weight", &self.weight)
            .finish()
    }
}

/// Registered pattern: predicates + fixed description/severity/suggestions
#[derive(Debug)]
pub struct PatternDefinition {
    pub name: String,
    pub kind: PatternKind,
    pub scope: PatternScope,
    pub description: String,
    pub severity: Severity,
    pub suggestions: Vec<String>,
    pub rules: Vec<PatternRule>,
    pub metadata: Value,
}

impl PatternDefinition {
    /// Weighted fraction of satisfied rules, in [0, 1]
    pub fn confidence(&self, ctx: &PatternContext<'_>) -> f64 {
        let total: f64 = self.rules.iter().map(|r| r.weight).sum();
        if total <= 0.0 {
            return 0.0;
        }
        let satisfied: f64 = self
            .rules
            .iter()
            .filter(|r| (r.check)(ctx))
            .map(|r| r.weight)
            .sum();
        satisfied / total
    }
}

/// Caller-supplied match request
#[derive(Debug, Clone)]
pub struct PatternSpec {
    pub kind: PatternKind,
    pub template: Option<AstTemplate>,
    pub confidence_threshold: f64,
    pub bind_variables: bool,
    pub context_sensitive: bool,
}

impl Default for PatternSpec {
    fn default() -> Self {
        Self {
            kind: PatternKind::Structural,
            template: None,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            bind_variables: false,
            context_sensitive: false,
        }
    }
}

/// Where a match was found
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchLocation {
    pub module: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    pub line: u32,
}

/// One reported match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternMatch {
    pub pattern: String,
    pub kind: PatternKind,
    pub confidence: f64,
    pub location: MatchLocation,
    pub severity: Severity,
    pub suggestions: Vec<String>,
    pub metadata: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn empty_module() -> ModuleAnalysis {
        ModuleAnalysis {
            name: "M".to_string(),
            functions: Vec::new(),
            failures: Vec::new(),
            skipped: Vec::new(),
        }
    }

    #[test]
    fn test_confidence_weighted_fraction() {
        let def = PatternDefinition {
            name: "p".to_string(),
            kind: PatternKind::Behavioral,
            scope: PatternScope::Module,
            description: String::new(),
            severity: Severity::Info,
            suggestions: Vec::new(),
            rules: vec![
                PatternRule::new("yes", 3.0, |_| true),
                PatternRule::new("no", 1.0, |_| false),
            ],
            metadata: json!({}),
        };
        let module = empty_module();
        let ctx = PatternContext {
            module: &module,
            function: None,
        };
        assert!((def.confidence(&ctx) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::Error);
        assert!(Severity::Warning > Severity::Info);
    }
}
