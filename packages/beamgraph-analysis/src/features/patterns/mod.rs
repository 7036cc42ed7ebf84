//! Pattern detection
//!
//! Three match families over analyzed modules: structural AST templates,
//! behavioral patterns and anti-patterns. Every match carries a confidence
//! score, a severity and remediation suggestions; the library is
//! extensible at runtime.

pub mod domain;
pub mod infrastructure;

pub use domain::{
    AstTemplate, MatchLocation, PatternContext, PatternDefinition, PatternKind, PatternMatch,
    PatternRule, PatternScope, PatternSpec, Severity, DEFAULT_CONFIDENCE_THRESHOLD,
};
pub use infrastructure::{PatternError, PatternLibrary, PatternMatcher, PatternResult, SweepResult};
