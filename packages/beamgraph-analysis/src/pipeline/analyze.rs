/*
 * Analysis pipeline
 *
 * AST → {CFG, DFG} → CPG for one function; embarrassingly-parallel fan-out
 * for a module. A failure analyzing one function never prevents analysis
 * of its siblings; functions reached after the batch deadline are reported
 * as skipped rather than failing the whole batch.
 */

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::errors::{AnalysisError, Result};
use crate::features::cpg::domain::CodePropertyGraph;
use crate::features::cpg::infrastructure::CpgUnifier;
use crate::features::data_flow::domain::DataFlowGraph;
use crate::features::data_flow::infrastructure::SsaBuilder;
use crate::features::flow_graph::domain::ControlFlowGraph;
use crate::features::flow_graph::infrastructure::CfgBuilder;
use crate::shared::models::{AstKind, AstNode};

/// Worker pool and deadline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_workers: usize,
    pub batch_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_workers: num_cpus::get(),
            batch_timeout: Duration::from_secs(30),
        }
    }
}

/// Joined analysis record for one function: the AST plus all three derived
/// graphs. This is what the pattern matcher, query engine and correlator
/// consume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionAnalysis {
    pub module: String,
    pub name: String,
    pub arity: usize,
    pub line: u32,
    pub ast: AstNode,
    pub cfg: ControlFlowGraph,
    pub dfg: DataFlowGraph,
    pub cpg: CodePropertyGraph,
}

impl FunctionAnalysis {
    /// Canonical `module.function/arity` key
    pub fn key(&self) -> String {
        format!("{}.{}/{}", self.module, self.name, self.arity)
    }
}

/// One function that could not be analyzed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisFailure {
    pub function: String,
    pub error: String,
}

/// Batch result for one module, with per-function failures isolated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleAnalysis {
    pub name: String,
    pub functions: Vec<FunctionAnalysis>,
    pub failures: Vec<AnalysisFailure>,
    /// Functions not reached before the batch deadline (partial result)
    pub skipped: Vec<String>,
}

impl ModuleAnalysis {
    pub fn function(&self, name: &str, arity: usize) -> Option<&FunctionAnalysis> {
        self.functions
            .iter()
            .find(|f| f.name == name && f.arity == arity)
    }

    /// Any-arity lookup, first match in source order
    pub fn function_named(&self, name: &str) -> Option<&FunctionAnalysis> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn total_cyclomatic(&self) -> u32 {
        self.functions.iter().map(|f| f.cfg.metrics.cyclomatic).sum()
    }
}

/// Stateless per-invocation pipeline
pub struct AnalysisPipeline {
    config: PipelineConfig,
}

impl AnalysisPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Analyze one function: CFG and DFG from the AST, then the unified CPG
    pub fn analyze_function(&self, module: &str, function: &AstNode) -> Result<FunctionAnalysis> {
        let cfg = CfgBuilder::build(function)?;
        let dfg = SsaBuilder::build(function)?;
        let cpg = CpgUnifier::unify(function, &cfg, &dfg)?;
        Ok(FunctionAnalysis {
            module: module.to_string(),
            name: cfg.function.clone(),
            arity: cfg.arity,
            line: function.line(),
            ast: function.clone(),
            cfg,
            dfg,
            cpg,
        })
    }

    /// Analyze a whole module in parallel. Sibling functions share no
    /// state; each failure stays local to its function.
    pub fn analyze_module(&self, module: &AstNode) -> Result<ModuleAnalysis> {
        if module.kind != AstKind::Module {
            return Err(AnalysisError::Pipeline {
                reason: format!("expected a module, got `{}`", module.kind.as_str()),
            });
        }
        let module_name = module.name.clone().unwrap_or_else(|| "unknown".into());
        let functions: Vec<&AstNode> = module
            .children
            .iter()
            .filter(|c| c.kind == AstKind::FunctionDef)
            .collect();
        let deadline = Instant::now() + self.config.batch_timeout;

        debug!(module = %module_name, functions = functions.len(), "analyzing module");

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.max_workers.max(1))
            .build()
            .map_err(|e| AnalysisError::Pipeline {
                reason: format!("worker pool: {}", e),
            })?;

        enum Outcome {
            Ok(Box<FunctionAnalysis>),
            Failed(AnalysisFailure),
            Skipped(String),
        }

        let outcomes: Vec<Outcome> = pool.install(|| {
            functions
                .par_iter()
                .map(|function| {
                    let fname = function.name.clone().unwrap_or_else(|| "anonymous".into());
                    if Instant::now() >= deadline {
                        return Outcome::Skipped(fname);
                    }
                    match self.analyze_function(&module_name, function) {
                        Ok(analysis) => Outcome::Ok(Box::new(analysis)),
                        Err(error) => Outcome::Failed(AnalysisFailure {
                            function: fname,
                            error: error.to_string(),
                        }),
                    }
                })
                .collect()
        });

        let mut result = ModuleAnalysis {
            name: module_name.clone(),
            functions: Vec::new(),
            failures: Vec::new(),
            skipped: Vec::new(),
        };
        for outcome in outcomes {
            match outcome {
                Outcome::Ok(analysis) => result.functions.push(*analysis),
                Outcome::Failed(failure) => result.failures.push(failure),
                Outcome::Skipped(name) => result.skipped.push(name),
            }
        }

        if !result.failures.is_empty() {
            warn!(
                module = %module_name,
                failed = result.failures.len(),
                "some functions failed analysis"
            );
        }
        Ok(result)
    }
}

impl Default for AnalysisPipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::Span;
    use serde_json::json;

    fn small_module() -> AstNode {
        let good = AstNode::new(AstKind::FunctionDef, Span::new(2, 0, 4, 0))
            .with_name("add")
            .with_children(vec![
                AstNode::new(AstKind::Parameter, Span::line(2)).with_name("a"),
                AstNode::new(AstKind::Parameter, Span::line(2)).with_name("b"),
                AstNode::block(
                    vec![AstNode::new(AstKind::BinaryOp, Span::line(3))
                        .with_name("+")
                        .with_children(vec![AstNode::ident("a", 3), AstNode::ident("b", 3)])],
                    3,
                ),
            ]);
        // Function with no body block: fails CFG construction
        let bad = AstNode::new(AstKind::FunctionDef, Span::line(6)).with_name("broken");
        let mut module = AstNode::new(AstKind::Module, Span::new(1, 0, 8, 0))
            .with_name("Calc")
            .with_children(vec![good, bad]);
        module.assign_ids();
        module
    }

    #[test]
    fn test_module_analysis_isolates_failures() {
        let pipeline = AnalysisPipeline::default();
        let result = pipeline.analyze_module(&small_module()).unwrap();

        assert_eq!(result.functions.len(), 1);
        assert_eq!(result.functions[0].name, "add");
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].function, "broken");
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn test_function_analysis_key() {
        let pipeline = AnalysisPipeline::default();
        let module = small_module();
        let add = &module.children[0];
        let analysis = pipeline.analyze_function("Calc", add).unwrap();
        assert_eq!(analysis.key(), "Calc.add/2");
        assert_eq!(analysis.cfg.metrics.cyclomatic, 1);
    }

    #[test]
    fn test_deadline_yields_partial_results() {
        let pipeline = AnalysisPipeline::new(PipelineConfig {
            max_workers: 2,
            batch_timeout: Duration::from_secs(0),
        });
        let result = pipeline.analyze_module(&small_module()).unwrap();
        assert_eq!(result.skipped.len(), 2, "deadline already passed");
        assert!(result.functions.is_empty());
    }

    #[test]
    fn test_non_module_rejected() {
        let pipeline = AnalysisPipeline::default();
        let mut not_module = AstNode::ident("x", 1);
        not_module.assign_ids();
        assert!(matches!(
            pipeline.analyze_module(&not_module),
            Err(AnalysisError::Pipeline { .. })
        ));
    }

    #[test]
    fn test_module_serialization_roundtrip() {
        let pipeline = AnalysisPipeline::default();
        let result = pipeline.analyze_module(&small_module()).unwrap();
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["name"], json!("Calc"));
        let back: ModuleAnalysis = serde_json::from_value(value).unwrap();
        assert_eq!(back.functions.len(), 1);
    }
}
