//! Per-function verification driver and the program-level entry points.

use crate::config::VerifierConfig;
use crate::context::{instantiation_trail, ProgramContext};
use crate::diagnostic::Diagnostic;
use crate::error::VerifyError;
use crate::scope::{ScopeStack, Variable, VariableOrigin};
use log::debug;
use rg_graph::{GraphState, LinkError, NodeId, NodeKind, NodeRole, ReferencesGraph};
use rg_intern::{Interner, Symbol};
use rg_notation::{ParamReference, ResolvedSignature, TagShape};
use rg_ops::{Block, FunctionDef, FunctionKind, Program, Type};
use rg_span::{FileId, FileSpan, Span};
use rustc_hash::{FxHashMap, FxHashSet};

/// Result of verification: every diagnostic, or nothing.
pub type VerifyResult<T> = Result<T, Vec<Diagnostic>>;

/// Outcome of verifying a program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Diagnostics in function order; composite declaration errors first
    pub diagnostics: Vec<Diagnostic>,
    /// Number of function bodies verified
    pub functions_verified: usize,
}

impl VerifyReport {
    /// Whether no diagnostic was produced.
    pub fn is_ok(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Whether some diagnostic has `kind`.
    pub fn has(&self, kind: rg_ops::ErrorKind) -> bool {
        self.diagnostics.iter().any(|diagnostic| diagnostic.kind() == kind)
    }

    /// Converts into a result.
    ///
    /// # Errors
    ///
    /// All diagnostics, if there are any.
    pub fn into_result(self) -> VerifyResult<()> {
        if self.diagnostics.is_empty() {
            Ok(())
        } else {
            Err(self.diagnostics)
        }
    }
}

/// Reference-safety verifier.
///
/// Every function body is verified independently on a fresh
/// [`ReferencesGraph`].
#[derive(Debug, Clone, Default)]
pub struct Verifier {
    config: VerifierConfig,
    file: FileId,
}

impl Verifier {
    /// Verifier with the given configuration.
    pub fn new(config: VerifierConfig) -> Self {
        Self {
            config,
            file: FileId::default(),
        }
    }

    /// Sets the file that spans refer to.
    #[must_use]
    pub fn with_file(mut self, file: FileId) -> Self {
        self.file = file;
        self
    }

    /// Configuration in use.
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Verifies every function with a body.
    pub fn verify_program(&self, program: &Program) -> VerifyReport {
        let ctx = ProgramContext::new(program, self.file);
        let mut report = VerifyReport {
            diagnostics: ctx.composite_errors.clone(),
            functions_verified: 0,
        };
        for func in &program.functions {
            report
                .diagnostics
                .extend(ctx.signature_errors(&func.name).iter().cloned());
            if let Some(body) = &func.body {
                report.diagnostics.extend(self.verify_body(&ctx, func, body));
                report.functions_verified += 1;
            }
        }
        debug!(
            "verified {} functions: {} diagnostics",
            report.functions_verified,
            report.diagnostics.len()
        );
        report
    }

    /// Verifies the function called `name`, including the notation it
    /// depends on.
    ///
    /// # Errors
    ///
    /// Every diagnostic found, or `NameNotFound` for an unknown function.
    pub fn verify_function(&self, program: &Program, name: &str) -> VerifyResult<()> {
        let ctx = ProgramContext::new(program, self.file);
        let Some(func) = program.function(name) else {
            return Err(vec![Diagnostic::new(VerifyError::NameNotFound {
                what: "function",
                name: name.to_string(),
                span: FileSpan::new(self.file, Span::default()),
            })]);
        };
        let mut diagnostics = ctx.composite_errors.clone();
        diagnostics.extend(ctx.signature_errors(name).iter().cloned());
        if let Some(body) = &func.body {
            diagnostics.extend(self.verify_body(&ctx, func, body));
        }
        if diagnostics.is_empty() {
            Ok(())
        } else {
            Err(diagnostics)
        }
    }

    fn verify_body(&self, ctx: &ProgramContext<'_>, func: &FunctionDef, body: &Block) -> Vec<Diagnostic> {
        let Some(sig) = ctx.signature(&func.name) else {
            return Vec::new();
        };
        let mut verifier = FunctionVerifier::new(ctx, &self.config, func, sig.clone());
        verifier.run(body);
        let trail = instantiation_trail(func);
        verifier
            .errors
            .into_iter()
            .map(|error| {
                Diagnostic::new(error)
                    .in_function(func.name.clone())
                    .with_trail(trail.clone())
            })
            .collect()
    }
}

/// Verifies every function of `program`.
pub fn verify_program(program: &Program, config: &VerifierConfig) -> VerifyReport {
    Verifier::new(config.clone()).verify_program(program)
}

/// Verifies one function of `program`.
///
/// # Errors
///
/// Every diagnostic found.
pub fn verify_function(program: &Program, name: &str, config: &VerifierConfig) -> VerifyResult<()> {
    Verifier::new(config.clone()).verify_function(program, name)
}

/// Result of evaluating an expression.
#[derive(Clone, Debug)]
pub(crate) struct Operand {
    pub node: NodeId,
    /// Value type, or pointee type when `node` is a reference
    pub ty: Type,
    /// Whether the operand may be written or mutably referenced
    pub mutable: bool,
    /// Immediate value destroyed at the end of the statement
    pub temporary: bool,
}

/// An enclosing loop.
#[derive(Debug)]
pub(crate) struct LoopFrame {
    pub scope_depth: usize,
    pub breaks: Vec<GraphState>,
    pub continues: Vec<GraphState>,
}

/// Inner reference node of a by-reference parameter's storage.
#[derive(Debug, Clone)]
pub(crate) struct ParamInner {
    pub param: usize,
    pub tag: usize,
    pub node: NodeId,
}

/// State of one function verification.
pub(crate) struct FunctionVerifier<'a, 'p> {
    pub ctx: &'a ProgramContext<'p>,
    pub config: &'a VerifierConfig,
    pub func: &'a FunctionDef,
    pub sig: ResolvedSignature,
    pub names: Interner,
    pub graph: ReferencesGraph,
    pub scopes: ScopeStack,
    pub globals: FxHashMap<Symbol, Variable>,
    /// Temporaries of the statements being verified
    pub temporaries: Vec<NodeId>,
    pub loops: Vec<LoopFrame>,
    pub reachable: bool,
    /// Storage outside the function, by the parameter reference it stands for
    pub arg_nodes: FxHashMap<NodeId, ParamReference>,
    pub param_inner: Vec<ParamInner>,
    /// First parameter of a destructor
    pub destructor_self: Option<NodeId>,
    errors: Vec<VerifyError>,
    seen: FxHashSet<VerifyError>,
}

impl<'a, 'p> FunctionVerifier<'a, 'p> {
    pub fn new(
        ctx: &'a ProgramContext<'p>,
        config: &'a VerifierConfig,
        func: &'a FunctionDef,
        sig: ResolvedSignature,
    ) -> Self {
        Self {
            ctx,
            config,
            func,
            sig,
            names: Interner::new(),
            graph: ReferencesGraph::new(),
            scopes: ScopeStack::default(),
            globals: FxHashMap::default(),
            temporaries: Vec::new(),
            loops: Vec::new(),
            reachable: true,
            arg_nodes: FxHashMap::default(),
            param_inner: Vec::new(),
            destructor_self: None,
            errors: Vec::new(),
            seen: FxHashSet::default(),
        }
    }

    pub fn run(&mut self, body: &Block) {
        debug!("verifying function `{}`", self.func.name);
        self.declare_globals();
        self.scopes.push();
        self.declare_params();

        self.verify_block(body);

        if self.reachable {
            let end = Span::new(body.span.end, body.span.end);
            self.check_pollution_before_return(end);
            self.unwind_scopes(0, end);
        }
        debug!(
            "finished `{}`: {} nodes alive, {} errors",
            self.func.name,
            self.graph.state().len(),
            self.errors.len()
        );
    }

    fn declare_globals(&mut self) {
        let program = self.ctx.program;
        for global in &program.globals {
            let node = self.new_value_node(&global.name, &global.ty, NodeRole::Global);
            let name = self.names.intern(&global.name);
            self.globals.insert(
                name,
                Variable {
                    node,
                    ty: global.ty.clone(),
                    mutable: global.mutable,
                    origin: VariableOrigin::Global,
                },
            );
        }
    }

    fn declare_params(&mut self) {
        let params = self.sig.params.clone();
        for (index, param) in params.iter().enumerate() {
            let variable = match param.passing.reference() {
                Some(mutability) => {
                    let storage =
                        self.new_value_node(&format!("*{}", param.name), &param.ty, NodeRole::Argument);
                    self.arg_nodes.insert(storage, ParamReference::reference(index));
                    self.add_arg_referents(index, &param.name, storage, true);
                    let node = self.graph.add_node(
                        self.names.intern(&param.name),
                        NodeKind::reference(mutability.is_mut()),
                        NodeRole::Variable,
                    );
                    let inner = self.graph.node(storage).inner.clone();
                    self.graph.share_inner_nodes(node, inner);
                    self.graph.add_link(storage, node);
                    Variable {
                        node,
                        ty: param.ty.clone(),
                        mutable: mutability.is_mut(),
                        origin: VariableOrigin::Parameter,
                    }
                }
                None => {
                    let node = self.new_value_node(&param.name, &param.ty, NodeRole::Variable);
                    self.add_arg_referents(index, &param.name, node, false);
                    Variable {
                        node,
                        ty: param.ty.clone(),
                        mutable: param.mutable,
                        origin: VariableOrigin::Parameter,
                    }
                }
            };
            if index == 0 && self.func.kind == FunctionKind::Destructor {
                self.destructor_self = Some(variable.node);
            }
            let name = self.names.intern(&param.name);
            self.scopes.declare(name, variable);
        }
    }

    /// Gives each inner node of a parameter the outside storage it refers to.
    fn add_arg_referents(&mut self, index: usize, param: &str, node: NodeId, by_reference: bool) {
        let inner = self.graph.node(node).inner.clone();
        for (tag, inner_node) in inner.into_iter().enumerate() {
            let referent = self.graph.add_node(
                self.names.intern(&format!("{param}'{tag}")),
                NodeKind::Value,
                NodeRole::Argument,
            );
            self.graph.add_link(referent, inner_node);
            self.arg_nodes.insert(referent, ParamReference::inner(index, tag));
            for second in self.graph.node(inner_node).inner.clone() {
                let source = self.graph.add_node(
                    self.names.intern(&format!("{param}'{tag}'")),
                    NodeKind::Value,
                    NodeRole::Argument,
                );
                self.graph.add_link(source, second);
            }
            if by_reference {
                self.param_inner.push(ParamInner {
                    param: index,
                    tag,
                    node: inner_node,
                });
            }
        }
    }

    pub fn file_span(&self, span: Span) -> FileSpan {
        FileSpan::new(self.ctx.file, span)
    }

    /// Records an error; identical errors are kept once.
    pub fn report(&mut self, error: VerifyError) {
        if self
            .config
            .error_limit
            .is_some_and(|limit| self.errors.len() >= limit)
        {
            return;
        }
        if self.seen.insert(error.clone()) {
            debug!("{}: {error}", self.func.name);
            self.errors.push(error);
        }
    }

    /// Name of `node` for messages. Inner reference nodes are named after
    /// the storage holding them.
    pub fn node_name(&self, node: NodeId) -> String {
        let target = if self.graph.node(node).role == NodeRole::InnerReference {
            self.graph.root(node)
        } else {
            node
        };
        self.names.resolve(self.graph.node(target).name)
    }

    pub fn inner(&self, node: NodeId) -> Vec<NodeId> {
        self.graph.node(node).inner.clone()
    }

    /// Creates value storage with one inner reference node per tag of `ty`.
    pub fn new_value_node(&mut self, name: &str, ty: &Type, role: NodeRole) -> NodeId {
        let node = self
            .graph
            .add_node(self.names.intern(name), NodeKind::Value, role);
        let tags = self.ctx.types.tags(ty);
        self.add_inner_nodes(node, name, &tags);
        node
    }

    /// Adds owned inner nodes for `tags`, with second-order nodes where needed.
    pub fn add_inner_nodes(&mut self, owner: NodeId, name: &str, tags: &[TagShape]) {
        for (index, shape) in tags.iter().enumerate() {
            let inner = self.graph.add_inner_node(
                owner,
                self.names.intern(&format!("{name}'{index}")),
                NodeKind::reference(shape.mutability.is_mut()),
            );
            if let Some(second) = shape.second_order {
                self.graph.add_inner_node(
                    inner,
                    self.names.intern(&format!("{name}'{index}'")),
                    NodeKind::reference(second.is_mut()),
                );
            }
        }
    }

    /// Value temporary destroyed at the end of the statement.
    pub fn new_temporary(&mut self, ty: Type) -> Operand {
        let node = self.new_value_node("temporary", &ty, NodeRole::Temporary);
        self.temporaries.push(node);
        Operand {
            node,
            ty,
            mutable: true,
            temporary: true,
        }
    }

    /// Reference to `target` sharing its inner nodes.
    pub fn new_reference(
        &mut self,
        name: &str,
        target: NodeId,
        mutable: bool,
        role: NodeRole,
        span: Span,
    ) -> NodeId {
        let node = self
            .graph
            .add_node(self.names.intern(name), NodeKind::reference(mutable), role);
        let inner = self.inner(target);
        self.graph.share_inner_nodes(node, inner);
        self.try_link(target, node, span);
        node
    }

    pub fn link_error(&self, error: LinkError, span: Span) -> VerifyError {
        let name = self.node_name(error.node());
        let span = self.file_span(span);
        match error {
            LinkError::ReferenceProtection(_) => VerifyError::ReferenceProtection { name, span },
            LinkError::MutableReferencesLoop(_) => VerifyError::MutableReferencesLoop { name, span },
        }
    }

    pub fn try_link(&mut self, from: NodeId, to: NodeId, span: Span) {
        if let Err(error) = self.graph.try_add_link(from, to) {
            let error = self.link_error(error, span);
            self.report(error);
        }
    }

    /// Reading requires that nothing mutably references the node.
    pub fn check_read(&mut self, node: NodeId, span: Span) {
        if self.graph.has_outgoing_mutable_links(node) {
            let name = self.node_name(node);
            self.report(VerifyError::ReferenceProtection {
                name,
                span: self.file_span(span),
            });
        }
    }

    /// Pairs of inner nodes, following second-order nodes.
    pub fn inner_pairs(&self, from: &[NodeId], to: &[NodeId]) -> Vec<(NodeId, NodeId)> {
        let mut pairs = Vec::new();
        for (&src, &dst) in from.iter().zip(to) {
            pairs.push((src, dst));
            pairs.extend(self.inner(src).into_iter().zip(self.inner(dst)));
        }
        pairs
    }

    /// Makes `targets` reference what the inner nodes of `op` reference.
    ///
    /// Temporaries hand their links over; places are read and referenced.
    pub fn pass_inner(&mut self, op: &Operand, targets: &[NodeId], span: Span) {
        let source = self.inner(op.node);
        let pairs = self.inner_pairs(&source, targets);
        if op.temporary {
            for (src, dst) in pairs {
                self.graph.add_link(src, dst);
            }
        } else {
            self.check_read(op.node, span);
            for (src, dst) in pairs {
                self.try_link(src, dst, span);
            }
        }
    }

    /// Destroys `node`, which must not be referenced any more if it holds a
    /// value.
    pub fn destroy_node(&mut self, node: NodeId, span: Span) {
        if !self.graph.contains(node) {
            return;
        }
        if self.graph.node(node).kind == NodeKind::Value && self.graph.has_outgoing_links(node) {
            let name = self.node_name(node);
            self.report(VerifyError::DestroyedVariableStillHasReferences {
                name,
                span: self.file_span(span),
            });
        }
        self.graph.remove_node(node);
    }

    /// Destroys temporaries created since `mark`, newest first.
    pub fn destroy_temporaries(&mut self, mark: usize, span: Span) {
        let temporaries: Vec<_> = self.temporaries.drain(mark.min(self.temporaries.len())..).collect();
        for node in temporaries.into_iter().rev() {
            self.destroy_node(node, span);
        }
    }

    /// Destroys variables and temporaries of scopes at `depth` and deeper
    /// without popping them.
    pub fn unwind_scopes(&mut self, depth: usize, span: Span) {
        let nodes: Vec<NodeId> = self
            .scopes
            .scopes_from(depth)
            .flat_map(|scope| {
                scope
                    .variables
                    .iter()
                    .rev()
                    .map(|(_, variable)| variable.node)
                    .chain(scope.temporaries.iter().rev().copied())
            })
            .collect();
        for node in nodes {
            self.destroy_node(node, span);
        }
    }

    /// Looks up a local variable, then a global.
    pub fn lookup(&self, name: &str) -> Option<Variable> {
        let symbol = self.names.get(name)?;
        self.scopes
            .lookup(symbol)
            .or_else(|| self.globals.get(&symbol))
            .cloned()
    }

    /// Declares a local variable in the innermost scope.
    pub fn declare(&mut self, name: &str, variable: Variable) {
        let symbol = self.names.intern(name);
        self.scopes.declare(symbol, variable);
    }
}
