//! Analysis orchestration
//!
//! Per-function analysis is pure and stateless; module batches run in
//! parallel over a bounded worker pool with per-function error isolation
//! and partial results on timeout.

mod analyze;
mod repository;

pub use analyze::{
    AnalysisFailure, AnalysisPipeline, FunctionAnalysis, ModuleAnalysis, PipelineConfig,
};
pub use repository::AnalysisRepository;
