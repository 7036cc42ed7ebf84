/*
 * Pattern Matcher
 *
 * Evaluates library definitions and structural templates against analyzed
 * modules. Every call validates its specification first (fail fast), then
 * returns only matches at or above the confidence threshold.
 */

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::pipeline::ModuleAnalysis;
use crate::shared::models::AstKind;

use super::super::domain::{
    MatchLocation, PatternContext, PatternDefinition, PatternKind, PatternMatch, PatternScope,
    PatternSpec,
};
use super::errors::{PatternError, PatternResult};
use super::library::PatternLibrary;
use serde_json::json;

/// Project-wide sweep outcome; modules not reached before the deadline are
/// listed instead of failing the sweep
#[derive(Debug, Clone)]
pub struct SweepResult {
    pub matches: Vec<PatternMatch>,
    pub timed_out: Vec<String>,
}

pub struct PatternMatcher {
    library: Arc<PatternLibrary>,
}

impl PatternMatcher {
    pub fn new(library: Arc<PatternLibrary>) -> Self {
        Self { library }
    }

    pub fn library(&self) -> &PatternLibrary {
        &self.library
    }

    fn validate_threshold(threshold: f64) -> PatternResult<()> {
        if !(0.0..=1.0).contains(&threshold) || threshold.is_nan() {
            return Err(PatternError::InvalidThreshold { value: threshold });
        }
        Ok(())
    }

    /// Structural template matching over every function's AST
    pub fn match_structural(
        &self,
        module: &ModuleAnalysis,
        spec: &PatternSpec,
    ) -> PatternResult<Vec<PatternMatch>> {
        Self::validate_threshold(spec.confidence_threshold)?;
        let template = spec.template.as_ref().ok_or(PatternError::MissingTemplate)?;

        let mut matches = Vec::new();
        for function in &module.functions {
            for node in template.find_matches(&function.ast) {
                // An exact structural match is certain
                let confidence = 1.0;
                if confidence < spec.confidence_threshold {
                    continue;
                }
                let metadata = if spec.bind_variables {
                    let bound: Vec<&str> = node
                        .walk()
                        .filter(|n| n.kind == AstKind::Identifier)
                        .filter_map(|n| n.name.as_deref())
                        .collect();
                    json!({"bound_variables": bound})
                } else {
                    json!({})
                };
                matches.push(PatternMatch {
                    pattern: "structural".to_string(),
                    kind: PatternKind::Structural,
                    confidence,
                    location: MatchLocation {
                        module: module.name.clone(),
                        function: Some(function.name.clone()),
                        line: node.line(),
                    },
                    severity: super::super::domain::Severity::Info,
                    suggestions: Vec::new(),
                    metadata,
                });
            }
        }
        Ok(matches)
    }

    /// All behavioral library patterns at or above the threshold
    pub fn match_behavioral(
        &self,
        module: &ModuleAnalysis,
        confidence_threshold: f64,
    ) -> PatternResult<Vec<PatternMatch>> {
        self.match_kind(module, PatternKind::Behavioral, confidence_threshold)
    }

    /// All anti-pattern library patterns at or above the threshold
    pub fn match_anti_patterns(
        &self,
        module: &ModuleAnalysis,
        confidence_threshold: f64,
    ) -> PatternResult<Vec<PatternMatch>> {
        self.match_kind(module, PatternKind::AntiPattern, confidence_threshold)
    }

    /// One named library pattern
    pub fn match_named(
        &self,
        module: &ModuleAnalysis,
        name: &str,
        confidence_threshold: f64,
    ) -> PatternResult<Vec<PatternMatch>> {
        Self::validate_threshold(confidence_threshold)?;
        let definition = self
            .library
            .get(name)
            .ok_or_else(|| PatternError::UnknownPattern {
                name: name.to_string(),
            })?;
        Ok(self.evaluate(&definition, module, confidence_threshold))
    }

    fn match_kind(
        &self,
        module: &ModuleAnalysis,
        kind: PatternKind,
        confidence_threshold: f64,
    ) -> PatternResult<Vec<PatternMatch>> {
        Self::validate_threshold(confidence_threshold)?;
        let mut matches = Vec::new();
        for definition in self.library.of_kind(kind) {
            matches.extend(self.evaluate(&definition, module, confidence_threshold));
        }
        debug!(
            module = %module.name,
            kind = kind.as_str(),
            matches = matches.len(),
            "pattern match"
        );
        Ok(matches)
    }

    fn evaluate(
        &self,
        definition: &PatternDefinition,
        module: &ModuleAnalysis,
        confidence_threshold: f64,
    ) -> Vec<PatternMatch> {
        let mut matches = Vec::new();
        match definition.scope {
            PatternScope::Module => {
                let ctx = PatternContext {
                    module,
                    function: None,
                };
                let confidence = definition.confidence(&ctx);
                if confidence >= confidence_threshold {
                    matches.push(self.to_match(definition, module, None, confidence));
                }
            }
            PatternScope::Function => {
                for function in &module.functions {
                    let ctx = PatternContext {
                        module,
                        function: Some(function),
                    };
                    let confidence = definition.confidence(&ctx);
                    if confidence >= confidence_threshold {
                        matches.push(self.to_match(
                            definition,
                            module,
                            Some(function.name.clone()),
                            confidence,
                        ));
                    }
                }
            }
        }
        matches
    }

    fn to_match(
        &self,
        definition: &PatternDefinition,
        module: &ModuleAnalysis,
        function: Option<String>,
        confidence: f64,
    ) -> PatternMatch {
        let line = function
            .as_deref()
            .and_then(|name| module.function_named(name))
            .map(|f| f.line)
            .unwrap_or(1);
        PatternMatch {
            pattern: definition.name.clone(),
            kind: definition.kind,
            confidence,
            location: MatchLocation {
                module: module.name.clone(),
                function,
                line,
            },
            severity: definition.severity,
            suggestions: definition.suggestions.clone(),
            metadata: definition.metadata.clone(),
        }
    }

    /// Project-wide sweep with a cooperative deadline: modules not reached
    /// in time are reported, not silently dropped.
    pub fn sweep(
        &self,
        modules: &[Arc<ModuleAnalysis>],
        confidence_threshold: f64,
        timeout: Duration,
    ) -> PatternResult<SweepResult> {
        Self::validate_threshold(confidence_threshold)?;
        let deadline = Instant::now() + timeout;
        let mut matches = Vec::new();
        let mut timed_out = Vec::new();

        for module in modules {
            if Instant::now() >= deadline {
                timed_out.push(module.name.clone());
                continue;
            }
            matches.extend(self.match_behavioral(module, confidence_threshold)?);
            matches.extend(self.match_anti_patterns(module, confidence_threshold)?);
        }
        Ok(SweepResult { matches, timed_out })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::patterns::domain::{AstTemplate, Severity};
    use crate::pipeline::AnalysisPipeline;
    use crate::shared::models::{AstNode, Span};
    use serde_json::json;

    fn analyze(module: AstNode) -> ModuleAnalysis {
        AnalysisPipeline::default().analyze_module(&module).unwrap()
    }

    fn simple_function(name: &str, body: Vec<AstNode>, span: Span) -> AstNode {
        AstNode::new(AstKind::FunctionDef, span)
            .with_name(name)
            .with_children(vec![AstNode::block(body, span.start_line + 1)])
    }

    fn module_with(functions: Vec<AstNode>) -> AstNode {
        let mut module = AstNode::new(AstKind::Module, Span::new(1, 0, 99, 0))
            .with_name("Sample")
            .with_children(functions);
        module.assign_ids();
        module
    }

    fn matcher() -> PatternMatcher {
        PatternMatcher::new(Arc::new(PatternLibrary::with_builtins()))
    }

    #[test]
    fn test_invalid_threshold_fails_fast() {
        let module = analyze(module_with(vec![]));
        let err = matcher().match_behavioral(&module, 1.5).unwrap_err();
        assert!(matches!(err, PatternError::InvalidThreshold { value } if value == 1.5));
    }

    #[test]
    fn test_structural_without_template_fails_fast() {
        let module = analyze(module_with(vec![]));
        let err = matcher()
            .match_structural(&module, &PatternSpec::default())
            .unwrap_err();
        assert_eq!(err, PatternError::MissingTemplate);
    }

    #[test]
    fn test_unknown_pattern() {
        let module = analyze(module_with(vec![]));
        let err = matcher().match_named(&module, "nope", 0.7).unwrap_err();
        assert!(matches!(err, PatternError::UnknownPattern { .. }));
    }

    #[test]
    fn test_structural_template_match() {
        let f = simple_function(
            "run",
            vec![AstNode::call(
                "query",
                vec![AstNode::ident("conn", 3), AstNode::ident("sql", 3)],
                3,
            )],
            Span::new(2, 0, 4, 0),
        );
        let module = analyze(module_with(vec![f]));
        let spec = PatternSpec {
            template: Some(AstTemplate::call("query", 2)),
            bind_variables: true,
            ..PatternSpec::default()
        };
        let matches = matcher().match_structural(&module, &spec).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].location.function.as_deref(), Some("run"));
        assert_eq!(
            matches[0].metadata["bound_variables"],
            json!(["conn", "sql"])
        );
    }

    #[test]
    fn test_singleton_anti_pattern() {
        let start_link = simple_function(
            "start_link",
            vec![AstNode::call(
                "register",
                vec![AstNode::literal(json!("global_name"), 3)],
                3,
            )],
            Span::new(2, 0, 4, 0),
        );
        let module = analyze(module_with(vec![start_link]));
        let matches = matcher().match_anti_patterns(&module, 0.7).unwrap();
        let singleton = matches.iter().find(|m| m.pattern == "singleton").unwrap();
        assert_eq!(singleton.severity, Severity::Warning);
        assert!((singleton.confidence - 1.0).abs() < 1e-9);
        assert!(!singleton.suggestions.is_empty());
    }

    #[test]
    fn test_deep_nesting_anti_pattern() {
        // Four nested ifs
        let mut inner = AstNode::call("work", vec![], 6);
        for line in (2..6).rev() {
            inner = AstNode::new(AstKind::If, Span::new(line, 0, 7, 0)).with_children(vec![
                AstNode::ident("flag", line),
                AstNode::block(vec![inner], line + 1),
            ]);
        }
        let f = simple_function("nested", vec![inner], Span::new(2, 0, 8, 0));
        let module = analyze(module_with(vec![f]));
        let matches = matcher()
            .match_named(&module, "deep_nesting", 0.7)
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].location.function.as_deref(), Some("nested"));
    }

    #[test]
    fn test_injection_vulnerability() {
        let concat = AstNode::new(AstKind::BinaryOp, Span::line(3))
            .with_name("<>")
            .with_children(vec![
                AstNode::literal(json!("SELECT * FROM users WHERE name = "), 3),
                AstNode::ident("input", 3),
            ]);
        let f = simple_function(
            "lookup",
            vec![AstNode::call("query", vec![concat], 3)],
            Span::new(2, 0, 4, 0),
        );
        let module = analyze(module_with(vec![f]));
        let matches = matcher()
            .match_named(&module, "injection_vulnerability", 0.7)
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].severity, Severity::Critical);
    }

    #[test]
    fn test_n_plus_one_query() {
        // Enum.map(users, fn u -> fetch(u) end)
        let closure = AstNode::new(AstKind::Closure, Span::line(3)).with_children(vec![
            AstNode::new(AstKind::Parameter, Span::line(3)).with_name("u"),
            AstNode::block(
                vec![AstNode::call("fetch", vec![AstNode::ident("u", 3)], 3)],
                3,
            ),
        ]);
        let f = simple_function(
            "load_all",
            vec![AstNode::call(
                "map",
                vec![AstNode::ident("users", 3), closure],
                3,
            )],
            Span::new(2, 0, 4, 0),
        );
        let module = analyze(module_with(vec![f]));
        let matches = matcher()
            .match_named(&module, "n_plus_one_query", 0.7)
            .unwrap();
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn test_below_threshold_filtered() {
        // start_link alone is half the singleton evidence
        let f = simple_function(
            "start_link",
            vec![AstNode::call("init", vec![], 3)],
            Span::new(2, 0, 4, 0),
        );
        let module = analyze(module_with(vec![f]));
        let matches = matcher().match_named(&module, "singleton", 0.7).unwrap();
        assert!(matches.is_empty());
        let loose = matcher().match_named(&module, "singleton", 0.5).unwrap();
        assert_eq!(loose.len(), 1);
    }

    #[test]
    fn test_runtime_registration_extends_library() {
        use crate::features::patterns::domain::{PatternDefinition, PatternRule, PatternScope};
        let library = Arc::new(PatternLibrary::with_builtins());
        library
            .register(PatternDefinition {
                name: "always_matches".to_string(),
                kind: PatternKind::Behavioral,
                scope: PatternScope::Module,
                description: "test pattern".to_string(),
                severity: Severity::Info,
                suggestions: Vec::new(),
                rules: vec![PatternRule::new("tautology", 1.0, |_| true)],
                metadata: json!({}),
            })
            .unwrap();
        let matcher = PatternMatcher::new(library);
        let module = analyze(module_with(vec![]));
        let matches = matcher.match_named(&module, "always_matches", 0.7).unwrap();
        assert_eq!(matches.len(), 1);
    }
}
