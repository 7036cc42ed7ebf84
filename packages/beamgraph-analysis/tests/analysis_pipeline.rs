//! End-to-end pipeline scenarios: AST in, all three graphs out.

use beamgraph_analysis::features::cpg::CpgNodeType;
use beamgraph_analysis::features::data_flow::{DfgDiagnostic, FlowKind};
use beamgraph_analysis::pipeline::AnalysisPipeline;
use beamgraph_analysis::{AstKind, AstNode, Span};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

fn function(name: &str, params: &[&str], body: Vec<AstNode>) -> AstNode {
    let mut children: Vec<AstNode> = params
        .iter()
        .map(|p| AstNode::new(AstKind::Parameter, Span::line(1)).with_name(*p))
        .collect();
    children.push(AstNode::block(body, 2));
    AstNode::new(AstKind::FunctionDef, Span::new(1, 0, 20, 0))
        .with_name(name)
        .with_children(children)
}

fn analyze(function_ast: AstNode) -> beamgraph_analysis::FunctionAnalysis {
    let mut module = AstNode::new(AstKind::Module, Span::new(1, 0, 30, 0))
        .with_name("Test")
        .with_children(vec![function_ast]);
    module.assign_ids();
    let result = AnalysisPipeline::default().analyze_module(&module).unwrap();
    assert!(result.failures.is_empty(), "{:?}", result.failures);
    result.functions.into_iter().next().unwrap()
}

fn guard_clause(
    pattern: AstNode,
    guard: Option<AstNode>,
    body: Vec<AstNode>,
    line: u32,
) -> AstNode {
    let mut children = vec![pattern];
    if let Some(g) = guard {
        children.push(AstNode::new(AstKind::Guard, Span::line(line)).with_children(vec![g]));
    }
    children.push(AstNode::block(body, line));
    AstNode::new(AstKind::CaseClause, Span::line(line)).with_children(children)
}

#[test]
fn straight_line_function_scenario() {
    // f(a, b) = (r = a + b; r)
    let f = function(
        "f",
        &["a", "b"],
        vec![
            AstNode::assign(
                AstNode::ident("r", 2),
                AstNode::new(AstKind::BinaryOp, Span::line(2))
                    .with_name("+")
                    .with_children(vec![AstNode::ident("a", 2), AstNode::ident("b", 2)]),
                2,
            ),
            AstNode::ident("r", 3),
        ],
    );
    let analysis = analyze(f);

    // CFG: cyclomatic 1, one entry, one exit
    assert_eq!(analysis.cfg.metrics.cyclomatic, 1);
    assert_eq!(analysis.cfg.exits.len(), 1);

    // DFG: versions a_0, b_0, r_0; one definition for r_0 and one use of
    // r_0 in the return
    let ssa_names: Vec<String> = analysis.dfg.versions.iter().map(|v| v.ssa_name()).collect();
    assert_eq!(ssa_names, vec!["a_0", "b_0", "r_0"]);

    let r0 = analysis.dfg.versions_of("r").next().unwrap().id;
    assert_eq!(
        analysis
            .dfg
            .definitions
            .iter()
            .filter(|d| d.variable == r0)
            .count(),
        1
    );
    let r_uses: Vec<_> = analysis.dfg.uses_of(r0).collect();
    assert_eq!(r_uses.len(), 1);
    let return_edge = analysis
        .dfg
        .edges
        .iter()
        .find(|e| e.use_site == r_uses[0].id)
        .unwrap();
    assert_eq!(return_edge.kind, FlowKind::ReturnValue);

    // Stats agree with the tables they summarize
    let ssa_stats = analysis.dfg.stats();
    assert_eq!(ssa_stats.version_count, 3);
    assert_eq!(ssa_stats.phi_count, 0);
    let cfg_stats = analysis.cfg.stats();
    assert_eq!(cfg_stats.decision_points, 0);
    let cpg_stats = analysis.cpg.stats();
    assert_eq!(cpg_stats.node_count, analysis.cpg.nodes.len());
}

#[test]
fn guarded_case_scenario() {
    // Three clauses on x, guards on the first two, each clause binding a
    // differently-named result variable, and x itself rebound per clause.
    let clauses = vec![
        guard_clause(
            AstNode::ident("x", 3),
            Some(AstNode::call("is_integer", vec![AstNode::ident("x", 3)], 3)),
            vec![
                AstNode::assign(AstNode::ident("n", 3), AstNode::ident("x", 3), 3),
                AstNode::assign(AstNode::ident("x", 3), AstNode::literal(json!(1), 3), 3),
            ],
            3,
        ),
        guard_clause(
            AstNode::ident("x", 4),
            Some(AstNode::call("is_binary", vec![AstNode::ident("x", 4)], 4)),
            vec![
                AstNode::assign(AstNode::ident("s", 4), AstNode::ident("x", 4), 4),
                AstNode::assign(AstNode::ident("x", 4), AstNode::literal(json!(2), 4), 4),
            ],
            4,
        ),
        guard_clause(
            AstNode::new(AstKind::Wildcard, Span::line(5)),
            None,
            vec![
                AstNode::assign(AstNode::ident("other", 5), AstNode::literal(json!(0), 5), 5),
                AstNode::assign(AstNode::ident("x", 5), AstNode::literal(json!(3), 5), 5),
            ],
            5,
        ),
    ];
    let mut case_children = vec![AstNode::ident("x", 2)];
    case_children.extend(clauses);
    let f = function(
        "classify",
        &["x"],
        vec![
            AstNode::new(AstKind::Case, Span::new(2, 0, 6, 0)).with_children(case_children),
            AstNode::ident("x", 7),
        ],
    );
    let analysis = analyze(f);

    // Cyclomatic 3: decision-point count 2 from the two guards, plus 1 -
    // not derived from raw edge count
    assert_eq!(analysis.cfg.metrics.cyclomatic, 3);
    assert_eq!(analysis.cfg.metrics.guard_count, 2);

    // Branches rebind x, so a phi for x must exist at the merge
    let phi = analysis
        .dfg
        .phi_nodes
        .iter()
        .find(|p| analysis.dfg.version(p.target).unwrap().name == "x")
        .expect("phi node for x");
    assert_eq!(phi.sources.len(), 3);
}

#[test]
fn cpg_node_coverage_property() {
    let clauses = vec![
        guard_clause(
            AstNode::literal(json!(1), 3),
            None,
            vec![AstNode::assign(
                AstNode::ident("y", 3),
                AstNode::literal(json!(10), 3),
                3,
            )],
            3,
        ),
        guard_clause(
            AstNode::new(AstKind::Wildcard, Span::line(4)),
            None,
            vec![AstNode::call("log", vec![AstNode::ident("x", 4)], 4)],
            4,
        ),
    ];
    let mut case_children = vec![AstNode::ident("x", 2)];
    case_children.extend(clauses);
    let f = function(
        "covered",
        &["x"],
        vec![AstNode::new(AstKind::Case, Span::new(2, 0, 5, 0)).with_children(case_children)],
    );
    let analysis = analyze(f);

    // Exactly one CPG node per CFG node, carrying that representation
    assert_eq!(analysis.cpg.cfg_to_cpg.len(), analysis.cfg.nodes.len());
    for (cfg_node, cpg_id) in analysis.cfg.nodes.iter().zip(&analysis.cpg.cfg_to_cpg) {
        let merged = analysis.cpg.node(*cpg_id).unwrap();
        assert_eq!(merged.representations.cfg, Some(cfg_node.id));
    }

    // Exactly one CPG node per definition and per use
    assert_eq!(analysis.cpg.def_to_cpg.len(), analysis.dfg.definitions.len());
    assert_eq!(analysis.cpg.use_to_cpg.len(), analysis.dfg.uses.len());
    for (def, cpg_id) in analysis.dfg.definitions.iter().zip(&analysis.cpg.def_to_cpg) {
        let merged = analysis.cpg.node(*cpg_id).unwrap();
        assert_eq!(
            merged.node_type,
            CpgNodeType::VariableDefinition,
            "definition {:?}",
            def.id
        );
    }
}

#[test]
fn scope_containment_property() {
    let clauses = vec![
        guard_clause(
            AstNode::ident("v", 3),
            None,
            vec![AstNode::call("use_it", vec![AstNode::ident("v", 3)], 3)],
            3,
        ),
        guard_clause(
            AstNode::new(AstKind::Wildcard, Span::line(4)),
            None,
            vec![AstNode::ident("x", 4)],
            4,
        ),
    ];
    let mut case_children = vec![AstNode::ident("x", 2)];
    case_children.extend(clauses);
    let f = function(
        "scoped",
        &["x"],
        vec![
            AstNode::new(AstKind::Case, Span::new(2, 0, 5, 0)).with_children(case_children),
            // v was clause-local; this reference is the program's defect
            AstNode::ident("v", 6),
        ],
    );
    let analysis = analyze(f);

    for use_site in &analysis.dfg.uses {
        let version = analysis.dfg.version(use_site.variable).unwrap();
        assert!(
            analysis
                .dfg
                .scopes
                .is_ancestor_or_self(version.scope, use_site.scope),
            "use of {} escapes its owning scope",
            version.ssa_name()
        );
    }

    // The sibling-scope reference surfaced as a diagnostic, not an error
    assert!(analysis
        .dfg
        .diagnostics
        .iter()
        .any(|d| matches!(d, DfgDiagnostic::UndefinedVariable { name, .. } if name == "v")));
}

proptest! {
    /// SSA uniqueness: however a chain of rebindings is shaped, every
    /// (name, version) pair has at most one definition.
    #[test]
    fn ssa_uniqueness_over_rebinding_chains(assignments in prop::collection::vec(0usize..3, 1..20)) {
        let names = ["x", "y", "z"];
        let body: Vec<AstNode> = assignments
            .iter()
            .enumerate()
            .map(|(i, &target)| {
                let line = 2 + i as u32;
                let source = names[(target + 1) % names.len()];
                AstNode::assign(
                    AstNode::ident(names[target], line),
                    AstNode::ident(source, line),
                    line,
                )
            })
            .collect();
        let f = function("churn", &["x", "y", "z"], body);
        let analysis = analyze(f);

        let mut seen = std::collections::HashSet::new();
        for def in &analysis.dfg.definitions {
            let version = analysis.dfg.version(def.variable).unwrap();
            prop_assert!(
                seen.insert((version.name.clone(), version.version)),
                "duplicate definition for {}",
                version.ssa_name()
            );
        }
        // Versions of each name are consecutive from zero
        for name in names {
            let versions: Vec<u32> = analysis.dfg.versions_of(name).map(|v| v.version).collect();
            let expected: Vec<u32> = (0..versions.len() as u32).collect();
            prop_assert_eq!(versions, expected);
        }
    }
}
