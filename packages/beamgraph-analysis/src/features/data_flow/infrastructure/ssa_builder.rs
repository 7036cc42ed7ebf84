/*
 * SSA-form DFG Builder
 *
 * Builder state threaded through a recursive AST descent:
 * - env: live version per source-level name
 * - counters: next version number per name
 * - scope stack: clause bodies get child scopes, so branch-local bindings
 *   never leak into siblings
 *
 * Binding order is load-bearing: the right-hand side of a binding is
 * processed BEFORE the left-hand pattern allocates new versions, because a
 * rebound name may appear, shadowed, on the right-hand side and must
 * resolve to the prior version.
 *
 * At a control merge, every name that was live before the construct and
 * carries >= 2 distinct versions across the incoming branches gets a phi
 * node recording which version each branch contributes.
 */

use ahash::{AHashMap, AHashSet};
use tracing::debug;

use crate::shared::models::{AstKind, AstNode, AstNodeId};

use super::super::domain::{
    DataFlowEdge, DataFlowGraph, DefId, Definition, DefinitionKind, DfgDiagnostic, FlowKind,
    PhiNode, PhiSource, ScopeId, ScopeKind, ScopeTree, Use, UseId, UseKind, VariableVersion,
    VersionId,
};
use super::errors::{DfgError, DfgResult};

/// Where a read occurs; decides its use-kind and flow-kind
#[derive(Debug, Clone)]
enum Ctx {
    Read,
    Return,
    CallArg,
    Guard,
    PipeStage(String),
    Message,
}

/// Compact pattern/condition rendering for phi-source labels
fn label_text(node: &AstNode) -> String {
    match node.kind {
        AstKind::Identifier | AstKind::Parameter => {
            node.name.clone().unwrap_or_else(|| "_".to_string())
        }
        AstKind::Wildcard => "_".to_string(),
        AstKind::Literal => node
            .value
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "nil".to_string()),
        AstKind::Call => format!("{}(...)", node.name.as_deref().unwrap_or("fn")),
        AstKind::TuplePattern => "{...}".to_string(),
        AstKind::ListPattern => "[...]".to_string(),
        AstKind::MapPattern => "%{...}".to_string(),
        _ => node.kind.as_str().to_string(),
    }
}

/// SSA builder: one instance per `build` call, no shared state between
/// sibling functions.
pub struct SsaBuilder {
    versions: Vec<VariableVersion>,
    definitions: Vec<Definition>,
    uses: Vec<Use>,
    edges: Vec<DataFlowEdge>,
    phi_nodes: Vec<PhiNode>,
    scopes: ScopeTree,
    diagnostics: Vec<DfgDiagnostic>,

    /// live version per name
    env: AHashMap<String, VersionId>,
    /// next version number per name
    counters: AHashMap<String, u32>,
    /// defining record per version (phi targets have none)
    def_by_version: AHashMap<VersionId, DefId>,
    scope_stack: Vec<ScopeId>,
    /// innermost enclosing closure scopes
    closure_stack: Vec<ScopeId>,
    /// versions defined through a compound (destructuring) pattern
    destructured: AHashSet<VersionId>,
}

impl SsaBuilder {
    /// Build the SSA-form DFG for one function definition
    pub fn build(function: &AstNode) -> DfgResult<DataFlowGraph> {
        if function.kind != AstKind::FunctionDef {
            return Err(DfgError::NotAFunction {
                kind: function.kind.as_str().to_string(),
            });
        }
        let name = function.name.clone().unwrap_or_else(|| "anonymous".into());
        let body = function
            .children
            .last()
            .filter(|n| n.kind == AstKind::Block)
            .ok_or_else(|| DfgError::MissingBody {
                function: name.clone(),
            })?;

        debug!(function = %name, "building SSA DFG");

        let mut b = SsaBuilder {
            versions: Vec::new(),
            definitions: Vec::new(),
            uses: Vec::new(),
            edges: Vec::new(),
            phi_nodes: Vec::new(),
            scopes: ScopeTree::new(function.id),
            diagnostics: Vec::new(),
            env: AHashMap::new(),
            counters: AHashMap::new(),
            def_by_version: AHashMap::new(),
            scope_stack: Vec::new(),
            closure_stack: Vec::new(),
            destructured: AHashSet::new(),
        };
        b.scope_stack.push(b.scopes.root());

        // Parameters are version-0 definitions registered before the body
        for param in function
            .children
            .iter()
            .filter(|c| c.kind == AstKind::Parameter)
        {
            if let Some(pname) = &param.name {
                b.define(pname.clone(), param.id, DefinitionKind::Parameter, true, false);
            }
        }

        b.visit_block(body, true)?;

        debug!(
            function = %name,
            versions = b.versions.len(),
            phis = b.phi_nodes.len(),
            "SSA DFG complete"
        );

        Ok(DataFlowGraph {
            function: name,
            versions: b.versions,
            definitions: b.definitions,
            uses: b.uses,
            edges: b.edges,
            phi_nodes: b.phi_nodes,
            scopes: b.scopes,
            diagnostics: b.diagnostics,
        })
    }

    fn current_scope(&self) -> ScopeId {
        *self.scope_stack.last().expect("scope stack never empty")
    }

    fn new_version(&mut self, name: &str, is_parameter: bool) -> VersionId {
        let version = {
            let counter = self.counters.entry(name.to_string()).or_insert(0);
            let current = *counter;
            *counter += 1;
            current
        };
        let scope = self.current_scope();
        let id = VersionId(self.versions.len() as u32);
        self.versions.push(VariableVersion {
            id,
            name: name.to_string(),
            version,
            scope,
            is_parameter,
            is_captured: false,
        });
        self.scopes.add_variable(scope, id);
        id
    }

    fn define(
        &mut self,
        name: String,
        ast_node: AstNodeId,
        kind: DefinitionKind,
        is_parameter: bool,
        in_compound: bool,
    ) -> VersionId {
        // The previous live version's definition is what reaches this one
        let reaching: Vec<DefId> = self
            .env
            .get(&name)
            .and_then(|v| self.def_by_version.get(v))
            .copied()
            .into_iter()
            .collect();

        let version = self.new_version(&name, is_parameter);
        let def_id = DefId(self.definitions.len() as u32);
        self.definitions.push(Definition {
            id: def_id,
            variable: version,
            ast_node,
            kind,
            scope: self.current_scope(),
            reaching_definitions: reaching,
        });
        self.def_by_version.insert(version, def_id);
        if in_compound {
            self.destructured.insert(version);
        }
        self.env.insert(name, version);
        version
    }

    /// Record a read of `name`, resolving it against the live environment.
    ///
    /// Unresolvable names become an undefined-variable diagnostic plus a
    /// dangling version, so the rest of the build continues.
    fn record_use(&mut self, name: &str, node: &AstNode, ctx: &Ctx) {
        let version = match self.env.get(name).copied() {
            Some(v) => v,
            None => {
                self.diagnostics.push(DfgDiagnostic::UndefinedVariable {
                    name: name.to_string(),
                    ast_node: node.id,
                    line: node.line(),
                });
                self.new_version(name, false)
            }
        };

        let (mut use_kind, mut flow, transformation) = match ctx {
            Ctx::Read => (UseKind::Read, None, None),
            Ctx::Return => (UseKind::Read, Some(FlowKind::ReturnValue), None),
            Ctx::CallArg => (UseKind::CallArgument, Some(FlowKind::Direct), None),
            Ctx::Guard => (UseKind::Guard, Some(FlowKind::Conditional), None),
            Ctx::PipeStage(stage) => (
                UseKind::PipeStage,
                Some(FlowKind::PipelineStage),
                Some(stage.clone()),
            ),
            Ctx::Message => (UseKind::MessagePayload, Some(FlowKind::MessagePass), None),
        };

        // Reading a version owned outside the enclosing closure is a capture
        if let Some(&closure_scope) = self.closure_stack.last() {
            let owner = self.versions[version.0 as usize].scope;
            if !self.scopes.is_ancestor_or_self(closure_scope, owner) {
                use_kind = UseKind::ClosureCapture;
                flow = Some(FlowKind::ClosureCapture);
                self.versions[version.0 as usize].is_captured = true;
            }
        }

        let reaching = self.def_by_version.get(&version).copied();
        let use_id = UseId(self.uses.len() as u32);
        self.uses.push(Use {
            id: use_id,
            variable: version,
            ast_node: node.id,
            kind: use_kind,
            scope: self.current_scope(),
            reaching_definition: reaching,
        });

        match reaching {
            Some(def_id) => {
                let kind = flow.unwrap_or_else(|| self.default_flow(version));
                self.edges.push(DataFlowEdge {
                    def: def_id,
                    use_site: use_id,
                    kind,
                    transformation,
                });
            }
            None => {
                // Phi-merged value: the use conditionally observes each
                // source's definition
                if let Some(phi) = self.phi_nodes.iter().find(|p| p.target == version) {
                    let source_defs: Vec<DefId> = phi
                        .sources
                        .iter()
                        .filter_map(|s| self.def_by_version.get(&s.version).copied())
                        .collect();
                    for def_id in source_defs {
                        self.edges.push(DataFlowEdge {
                            def: def_id,
                            use_site: use_id,
                            kind: FlowKind::Conditional,
                            transformation: transformation.clone(),
                        });
                    }
                }
            }
        }
    }

    /// Flow kind for a plain read, derived from how the value was defined
    fn default_flow(&self, version: VersionId) -> FlowKind {
        if self.destructured.contains(&version) {
            return FlowKind::Destructure;
        }
        match self
            .def_by_version
            .get(&version)
            .map(|d| self.definitions[d.0 as usize].kind)
        {
            Some(DefinitionKind::ReceiveBinding) => FlowKind::MessagePass,
            Some(DefinitionKind::PatternMatch) => FlowKind::PatternMatch,
            _ => FlowKind::Direct,
        }
    }

    // ------------------------------------------------------------------
    // Statement / expression descent
    // ------------------------------------------------------------------

    fn visit_block(&mut self, block: &AstNode, return_position: bool) -> DfgResult<()> {
        let last = block.children.len().saturating_sub(1);
        for (i, stmt) in block.children.iter().enumerate() {
            self.visit_stmt(stmt, return_position && i == last)?;
        }
        Ok(())
    }

    fn visit_stmt(&mut self, node: &AstNode, return_position: bool) -> DfgResult<()> {
        match node.kind {
            AstKind::Block => self.visit_block(node, return_position),
            AstKind::Assign => self.visit_assign(node),
            AstKind::Case => self.visit_case(node, return_position),
            AstKind::If => self.visit_if(node, return_position),
            AstKind::Cond => self.visit_cond(node, return_position),
            AstKind::Try => self.visit_try(node, return_position),
            AstKind::Receive => self.visit_receive(node, return_position),
            AstKind::Module | AstKind::FunctionDef | AstKind::Parameter => {
                Err(DfgError::UnsupportedShape {
                    kind: node.kind.as_str().to_string(),
                    ast_node: node.id,
                })
            }
            _ => {
                let ctx = if return_position { Ctx::Return } else { Ctx::Read };
                self.visit_expr(node, &ctx)
            }
        }
    }

    fn visit_expr(&mut self, node: &AstNode, ctx: &Ctx) -> DfgResult<()> {
        match node.kind {
            AstKind::Identifier => {
                if let Some(name) = &node.name {
                    self.record_use(name, node, ctx);
                }
                Ok(())
            }
            AstKind::Literal | AstKind::Wildcard => Ok(()),
            AstKind::BinaryOp => {
                for child in &node.children {
                    self.visit_expr(child, ctx)?;
                }
                Ok(())
            }
            AstKind::Call => {
                // Message sends carry their payload arguments; calls inside
                // a guard keep the guard context for their operands
                let is_send = node.name.as_deref() == Some("send");
                for (i, arg) in node.children.iter().enumerate() {
                    let arg_ctx = match ctx {
                        Ctx::Guard => Ctx::Guard,
                        _ if is_send && i > 0 => Ctx::Message,
                        _ => Ctx::CallArg,
                    };
                    self.visit_expr(arg, &arg_ctx)?;
                }
                Ok(())
            }
            AstKind::Pipe => {
                let (lhs, rhs) = match node.children.as_slice() {
                    [lhs, rhs] => (lhs, rhs),
                    _ => {
                        return Err(DfgError::UnsupportedShape {
                            kind: "pipe".to_string(),
                            ast_node: node.id,
                        })
                    }
                };
                let stage = rhs.name.clone().unwrap_or_else(|| "stage".to_string());
                self.visit_expr(lhs, &Ctx::PipeStage(stage))?;
                if rhs.kind == AstKind::Call {
                    for arg in &rhs.children {
                        self.visit_expr(arg, &Ctx::CallArg)?;
                    }
                    Ok(())
                } else {
                    self.visit_expr(rhs, &Ctx::Read)
                }
            }
            AstKind::Assign => self.visit_assign(node),
            AstKind::Closure => self.visit_closure(node),
            AstKind::Comprehension => self.visit_comprehension(node),
            AstKind::Raise => {
                for child in &node.children {
                    self.visit_expr(child, &Ctx::Read)?;
                }
                Ok(())
            }
            AstKind::Guard => {
                for child in &node.children {
                    self.visit_expr(child, &Ctx::Guard)?;
                }
                Ok(())
            }
            // Constructor expressions read their elements
            AstKind::TuplePattern | AstKind::ListPattern | AstKind::MapPattern => {
                for child in &node.children {
                    self.visit_expr(child, ctx)?;
                }
                Ok(())
            }
            AstKind::Case => self.visit_case(node, false),
            AstKind::If => self.visit_if(node, false),
            AstKind::Cond => self.visit_cond(node, false),
            AstKind::Try => self.visit_try(node, false),
            AstKind::Receive => self.visit_receive(node, false),
            AstKind::Block => self.visit_block(node, false),
            AstKind::Module
            | AstKind::FunctionDef
            | AstKind::Parameter
            | AstKind::CaseClause
            | AstKind::CondClause
            | AstKind::CatchClause
            | AstKind::AfterBlock
            | AstKind::ReceiveClause
            | AstKind::ComprehensionBinding => Err(DfgError::UnsupportedShape {
                kind: node.kind.as_str().to_string(),
                ast_node: node.id,
            }),
        }
    }

    /// `pattern = rhs`: RHS first, then the pattern allocates new versions
    fn visit_assign(&mut self, node: &AstNode) -> DfgResult<()> {
        let (pattern, rhs) = match node.children.as_slice() {
            [pattern, rhs] => (pattern, rhs),
            _ => {
                return Err(DfgError::MalformedPattern {
                    ast_node: node.id,
                    reason: "assignment needs a pattern and a value".to_string(),
                })
            }
        };
        self.visit_expr(rhs, &Ctx::Read)?;
        self.bind_pattern(pattern, DefinitionKind::Assignment, false)
    }

    /// Allocate a version for every name bound by a pattern.
    ///
    /// Compound patterns recurse element-wise; each sub-pattern allocates
    /// its own version. A `^`-prefixed identifier is a pin: it reads the
    /// existing version instead of binding.
    fn bind_pattern(
        &mut self,
        pattern: &AstNode,
        kind: DefinitionKind,
        in_compound: bool,
    ) -> DfgResult<()> {
        match pattern.kind {
            AstKind::Identifier => {
                if let Some(name) = &pattern.name {
                    if let Some(pinned) = name.strip_prefix('^') {
                        self.record_use(pinned, pattern, &Ctx::Read);
                        let last = self.uses.last_mut().expect("use just recorded");
                        last.kind = UseKind::Pattern;
                    } else {
                        let kind = if in_compound && kind == DefinitionKind::Assignment {
                            DefinitionKind::PatternMatch
                        } else {
                            kind
                        };
                        self.define(name.clone(), pattern.id, kind, false, in_compound);
                    }
                }
                Ok(())
            }
            AstKind::Wildcard | AstKind::Literal => Ok(()),
            AstKind::TuplePattern | AstKind::ListPattern | AstKind::MapPattern => {
                for child in &pattern.children {
                    self.bind_pattern(child, kind, true)?;
                }
                Ok(())
            }
            _ => Err(DfgError::MalformedPattern {
                ast_node: pattern.id,
                reason: format!("`{}` is not a pattern", pattern.kind.as_str()),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Branching constructs: clause-local scopes + phi at the merge
    // ------------------------------------------------------------------

    /// Run `f` inside a fresh child scope, returning the clause-final
    /// environment (restricted later to pre-construct names).
    fn in_scope<F>(&mut self, kind: ScopeKind, entry: AstNodeId, f: F) -> DfgResult<AHashMap<String, VersionId>>
    where
        F: FnOnce(&mut Self) -> DfgResult<()>,
    {
        let scope = self.scopes.push(kind, self.current_scope(), entry);
        self.scope_stack.push(scope);
        let result = f(self);
        self.scope_stack.pop();
        result?;
        Ok(self.env.clone())
    }

    fn visit_case(&mut self, node: &AstNode, return_position: bool) -> DfgResult<()> {
        let subject = node.children.first().ok_or_else(|| DfgError::MalformedPattern {
            ast_node: node.id,
            reason: "case needs a subject".to_string(),
        })?;
        self.visit_expr(subject, &Ctx::Read)?;

        let base = self.env.clone();
        let mut branches: Vec<(AHashMap<String, VersionId>, String)> = Vec::new();

        for clause in &node.children[1..] {
            self.env = base.clone();
            let label = clause
                .children
                .first()
                .map(label_text)
                .unwrap_or_else(|| "_".to_string());
            let final_env = self.in_scope(ScopeKind::CaseClause, clause.id, |b| {
                b.visit_clause(clause, DefinitionKind::PatternMatch, return_position)
            })?;
            branches.push((final_env, label));
        }

        self.env = base.clone();
        self.merge_branches(&base, branches, node.id);
        Ok(())
    }

    fn visit_receive(&mut self, node: &AstNode, return_position: bool) -> DfgResult<()> {
        let base = self.env.clone();
        let mut branches: Vec<(AHashMap<String, VersionId>, String)> = Vec::new();

        for clause in &node.children {
            self.env = base.clone();
            let label = clause
                .children
                .first()
                .map(label_text)
                .unwrap_or_else(|| "_".to_string());
            let final_env = self.in_scope(ScopeKind::ReceiveClause, clause.id, |b| {
                b.visit_clause(clause, DefinitionKind::ReceiveBinding, return_position)
            })?;
            branches.push((final_env, label));
        }

        self.env = base.clone();
        self.merge_branches(&base, branches, node.id);
        Ok(())
    }

    /// Shared clause shape: [pattern, Guard?, Block]
    fn visit_clause(
        &mut self,
        clause: &AstNode,
        bind_kind: DefinitionKind,
        return_position: bool,
    ) -> DfgResult<()> {
        let pattern = clause.children.first().ok_or_else(|| DfgError::MalformedPattern {
            ast_node: clause.id,
            reason: "clause needs a pattern".to_string(),
        })?;
        self.bind_pattern(pattern, bind_kind, false)?;
        if let Some(guard) = clause.children.iter().find(|n| n.kind == AstKind::Guard) {
            self.visit_expr(guard, &Ctx::Guard)?;
        }
        if let Some(body) = clause.children.last().filter(|n| n.kind == AstKind::Block) {
            self.visit_block(body, return_position)?;
        }
        Ok(())
    }

    fn visit_if(&mut self, node: &AstNode, return_position: bool) -> DfgResult<()> {
        let cond = node.children.first().ok_or_else(|| DfgError::MalformedPattern {
            ast_node: node.id,
            reason: "if needs a condition".to_string(),
        })?;
        self.visit_expr(cond, &Ctx::Guard)?;

        let base = self.env.clone();
        let mut branches: Vec<(AHashMap<String, VersionId>, String)> = Vec::new();

        if let Some(then_block) = node.children.get(1).filter(|n| n.kind == AstKind::Block) {
            self.env = base.clone();
            let final_env = self.in_scope(ScopeKind::IfBranch, then_block.id, |b| {
                b.visit_block(then_block, return_position)
            })?;
            branches.push((final_env, "true".to_string()));
        }
        match node.children.get(2).filter(|n| n.kind == AstKind::Block) {
            Some(else_block) => {
                self.env = base.clone();
                let final_env = self.in_scope(ScopeKind::IfBranch, else_block.id, |b| {
                    b.visit_block(else_block, return_position)
                })?;
                branches.push((final_env, "false".to_string()));
            }
            None => branches.push((base.clone(), "false".to_string())),
        }

        self.env = base.clone();
        self.merge_branches(&base, branches, node.id);
        Ok(())
    }

    fn visit_cond(&mut self, node: &AstNode, return_position: bool) -> DfgResult<()> {
        let base = self.env.clone();
        let mut branches: Vec<(AHashMap<String, VersionId>, String)> = Vec::new();

        for clause in &node.children {
            let (cond, body) = match (clause.kind, clause.children.as_slice()) {
                (AstKind::CondClause, [cond, body]) if body.kind == AstKind::Block => (cond, body),
                _ => {
                    return Err(DfgError::UnsupportedShape {
                        kind: clause.kind.as_str().to_string(),
                        ast_node: clause.id,
                    })
                }
            };
            self.env = base.clone();
            let label = label_text(cond);
            self.visit_expr(cond, &Ctx::Guard)?;
            let final_env = self.in_scope(ScopeKind::IfBranch, body.id, |b| {
                b.visit_block(body, return_position)
            })?;
            branches.push((final_env, label));
        }

        self.env = base.clone();
        self.merge_branches(&base, branches, node.id);
        Ok(())
    }

    fn visit_try(&mut self, node: &AstNode, return_position: bool) -> DfgResult<()> {
        let body = node
            .children
            .first()
            .filter(|n| n.kind == AstKind::Block)
            .ok_or_else(|| DfgError::MalformedPattern {
                ast_node: node.id,
                reason: "try needs a body block".to_string(),
            })?;

        let base = self.env.clone();
        let mut branches: Vec<(AHashMap<String, VersionId>, String)> = Vec::new();

        self.env = base.clone();
        let body_env = self.in_scope(ScopeKind::TryBlock, body.id, |b| {
            b.visit_block(body, return_position)
        })?;
        branches.push((body_env, "body".to_string()));

        for clause in node
            .children
            .iter()
            .filter(|n| n.kind == AstKind::CatchClause)
        {
            self.env = base.clone();
            let label = clause
                .children
                .first()
                .map(label_text)
                .unwrap_or_else(|| "_".to_string());
            let final_env = self.in_scope(ScopeKind::CatchClause, clause.id, |b| {
                b.visit_clause(clause, DefinitionKind::ExceptionBinding, return_position)
            })?;
            branches.push((final_env, label));
        }

        self.env = base.clone();
        self.merge_branches(&base, branches, node.id);

        // After-block runs on all paths, in the surrounding scope
        if let Some(after) = node
            .children
            .iter()
            .find(|n| n.kind == AstKind::AfterBlock)
            .and_then(|a| a.children.first())
        {
            self.visit_block(after, false)?;
        }
        Ok(())
    }

    fn visit_closure(&mut self, node: &AstNode) -> DfgResult<()> {
        // Bindings inside the closure never escape it
        let saved_env = self.env.clone();
        let scope = self
            .scopes
            .push(ScopeKind::Closure, self.current_scope(), node.id);
        self.scope_stack.push(scope);
        self.closure_stack.push(scope);

        let mut result = Ok(());
        for param in node.children.iter().filter(|c| c.kind == AstKind::Parameter) {
            if let Some(pname) = &param.name {
                self.define(pname.clone(), param.id, DefinitionKind::Parameter, true, false);
            }
        }
        if let Some(body) = node.children.last().filter(|n| n.kind == AstKind::Block) {
            result = self.visit_block(body, false);
        }

        self.closure_stack.pop();
        self.scope_stack.pop();
        self.env = saved_env;
        result
    }

    fn visit_comprehension(&mut self, node: &AstNode) -> DfgResult<()> {
        // Generator bindings are local to the comprehension
        let saved_env = self.env.clone();
        let scope = self
            .scopes
            .push(ScopeKind::Comprehension, self.current_scope(), node.id);
        self.scope_stack.push(scope);

        let mut result = Ok(());
        for child in &node.children {
            match child.kind {
                AstKind::ComprehensionBinding => {
                    result = (|| {
                        let (pattern, source) = match child.children.as_slice() {
                            [pattern, source] => (pattern, source),
                            _ => {
                                return Err(DfgError::MalformedPattern {
                                    ast_node: child.id,
                                    reason: "generator needs a pattern and a source".to_string(),
                                })
                            }
                        };
                        self.visit_expr(source, &Ctx::Read)?;
                        self.bind_pattern(pattern, DefinitionKind::ComprehensionBinding, false)
                    })();
                }
                AstKind::Block => result = self.visit_block(child, false),
                _ => result = self.visit_expr(child, &Ctx::Read),
            }
            if result.is_err() {
                break;
            }
        }

        self.scope_stack.pop();
        self.env = saved_env;
        result
    }

    /// Phi synthesis: one phi per name live before the construct that has
    /// >= 2 distinct versions across incoming branches.
    fn merge_branches(
        &mut self,
        base: &AHashMap<String, VersionId>,
        branches: Vec<(AHashMap<String, VersionId>, String)>,
        merge_node: AstNodeId,
    ) {
        if branches.is_empty() {
            return;
        }
        let mut names: Vec<&String> = base.keys().collect();
        names.sort();

        for name in names {
            let base_version = base[name];
            let incoming: Vec<(VersionId, String)> = branches
                .iter()
                .map(|(env, label)| {
                    (
                        env.get(name).copied().unwrap_or(base_version),
                        label.clone(),
                    )
                })
                .collect();
            let distinct: AHashSet<VersionId> = incoming.iter().map(|(v, _)| *v).collect();

            if distinct.len() >= 2 {
                let target = self.new_version(name, false);
                self.phi_nodes.push(PhiNode {
                    target,
                    sources: incoming
                        .into_iter()
                        .map(|(version, label)| PhiSource {
                            version,
                            condition: Some(label),
                        })
                        .collect(),
                    merge_node,
                });
                self.env.insert(name.clone(), target);
            } else {
                self.env.insert(name.clone(), incoming[0].0);
            }
        }
    }
}
