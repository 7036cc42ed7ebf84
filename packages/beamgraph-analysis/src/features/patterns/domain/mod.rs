//! Pattern domain models

mod pattern;
mod template;

pub use pattern::{
    MatchLocation, PatternContext, PatternDefinition, PatternKind, PatternMatch, PatternRule,
    PatternScope, PatternSpec, Severity, DEFAULT_CONFIDENCE_THRESHOLD,
};
pub use template::AstTemplate;
