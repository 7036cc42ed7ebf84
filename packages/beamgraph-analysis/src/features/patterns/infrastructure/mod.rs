//! Pattern infrastructure

pub mod errors;
pub mod library;
pub mod matcher;

pub use errors::{PatternError, PatternResult};
pub use library::PatternLibrary;
pub use matcher::{PatternMatcher, SweepResult};
