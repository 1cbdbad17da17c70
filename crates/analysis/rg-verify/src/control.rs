//! Statements: bindings, assignment, branches and loops.

use crate::error::VerifyError;
use crate::scope::{Variable, VariableOrigin};
use crate::verifier::{FunctionVerifier, LoopFrame, Operand};
use log::{debug, warn};
use rg_graph::{GraphState, LoopViolation, NodeId, NodeKind, NodeRole};
use rg_notation::FieldLayout;
use rg_ops::{Binding, Block, Expr, ExprKind, IfBranch, Mutability, Name, Stmt, StmtKind, Type};
use rg_span::Span;

impl FunctionVerifier<'_, '_> {
    /// Verifies a block in its own scope. Variables are destroyed at the end
    /// of the block if it is reachable.
    pub(crate) fn verify_block(&mut self, block: &Block) {
        self.scopes.push();
        let depth = self.scopes.depth();
        for stmt in &block.stmts {
            if !self.reachable {
                if self.config.report_unreachable_code {
                    self.report(VerifyError::UnreachableCode {
                        span: self.file_span(stmt.span),
                    });
                }
                break;
            }
            self.verify_stmt(stmt);
        }
        if self.reachable {
            let end = Span::new(block.span.end, block.span.end);
            self.unwind_scopes(depth.saturating_sub(1), end);
        }
        self.scopes.pop();
    }

    fn verify_stmt(&mut self, stmt: &Stmt) {
        let mark = self.temporaries.len();
        let span = stmt.span;
        match &stmt.kind {
            StmtKind::Let {
                name,
                binding,
                ty,
                init,
            } => {
                let value = match init {
                    Some(init) => self.eval(init),
                    None => None,
                };
                self.bind(name, *binding, ty.as_ref(), value, init.is_some(), span);
            }
            StmtKind::Decompose { names, init } => self.verify_decompose(names, init),
            StmtKind::Expr(expr) => {
                self.eval(expr);
            }
            StmtKind::Assign { dst, src } => self.verify_assign(dst, src, span),
            StmtKind::CompoundAssign { dst, src } => self.verify_compound_assign(dst, src, span),
            StmtKind::Block(block) => self.verify_block(block),
            StmtKind::If {
                branches,
                else_block,
            } => self.verify_if(branches, else_block.as_ref(), span),
            StmtKind::While { cond, body } => self.verify_loop(Some(cond), body, span),
            StmtKind::Loop { body } => self.verify_loop(None, body, span),
            StmtKind::Break => self.verify_jump(true, span),
            StmtKind::Continue => self.verify_jump(false, span),
            StmtKind::Return(value) => self.verify_return(value.as_ref(), span),
            StmtKind::Yield(value) => {
                if let Some(value) = self.eval(value) {
                    self.check_return_value(&value, span);
                }
                self.check_pollution_before_return(span);
            }
            StmtKind::Halt => self.reachable = false,
            StmtKind::With {
                name,
                binding,
                expr,
                body,
            } => self.verify_with(name, *binding, expr, body, span),
        }
        if self.reachable {
            self.destroy_temporaries(mark, span);
        } else {
            self.temporaries.truncate(mark);
        }
    }

    /// Declares `name` bound to `value`. A failed initializer still declares
    /// the name, unlinked, so later uses resolve.
    fn bind(
        &mut self,
        name: &Name,
        binding: Binding,
        ty: Option<&Type>,
        value: Option<Operand>,
        initialized: bool,
        span: Span,
    ) {
        match binding {
            Binding::Value { mutable } => {
                let var_ty = ty
                    .cloned()
                    .or_else(|| value.as_ref().map(|value| value.ty.clone()))
                    .unwrap_or_default();
                let node = self.new_value_node(name, &var_ty, NodeRole::Variable);
                if let Some(value) = &value {
                    let targets = self.inner(node);
                    self.pass_inner(value, &targets, span);
                }
                self.declare(
                    name,
                    Variable {
                        node,
                        ty: var_ty,
                        mutable,
                        origin: VariableOrigin::Local,
                    },
                );
            }
            Binding::RefMut | Binding::RefImut => {
                let mutable = binding == Binding::RefMut;
                if !initialized {
                    self.report(VerifyError::ExpectedReferenceValue {
                        span: self.file_span(span),
                    });
                }
                let variable = match value {
                    Some(value) => {
                        if mutable && !value.mutable {
                            self.report(VerifyError::ExpectedReferenceValue {
                                span: self.file_span(span),
                            });
                        }
                        let node =
                            self.new_reference(name, value.node, mutable, NodeRole::Variable, span);
                        // The temporary dies with the statement; its inner
                        // nodes live on with the binding.
                        if self.graph.node(value.node).role == NodeRole::Temporary {
                            self.graph.adopt_inner_nodes(value.node, node);
                        }
                        Variable {
                            node,
                            ty: value.ty,
                            mutable,
                            origin: VariableOrigin::Local,
                        }
                    }
                    None => Variable {
                        node: self.graph.add_node(
                            self.names.intern(name),
                            NodeKind::reference(mutable),
                            NodeRole::Variable,
                        ),
                        ty: ty.cloned().unwrap_or_default(),
                        mutable,
                        origin: VariableOrigin::Local,
                    },
                };
                self.declare(name, variable);
            }
        }
    }

    /// Splits an immediate value into immutable variables, one per field or
    /// element.
    fn verify_decompose(&mut self, names: &[Name], init: &Expr) {
        let Some(value) = self.eval(init) else {
            return;
        };
        if !value.temporary {
            self.report(VerifyError::ImmediateValueExpected {
                span: self.file_span(init.span),
            });
        }
        let ctx = self.ctx;
        let source = self.inner(value.node);
        let slice = |offset: usize, count: usize| {
            source
                .get(offset..offset + count)
                .map(<[_]>::to_vec)
                .unwrap_or_default()
        };
        // Reference fields carry their mutability
        let parts: Vec<(Type, Vec<NodeId>, Option<Mutability>)> = match &value.ty {
            Type::Tuple(elements) => elements
                .iter()
                .enumerate()
                .map(|(index, element)| {
                    let offset = ctx.types.tuple_tag_offset(elements, index);
                    let count = ctx.types.tags(element).len();
                    (element.clone(), slice(offset, count), None)
                })
                .collect(),
            Type::Array { element, .. } => names
                .iter()
                .map(|_| (element.as_ref().clone(), source.clone(), None))
                .collect(),
            Type::Composite(type_name) => match ctx.types.layout(type_name) {
                Some(layout) => layout
                    .fields
                    .iter()
                    .map(|field| match &field.layout {
                        FieldLayout::Value { inner_tags } => (
                            field.ty.clone(),
                            inner_tags
                                .iter()
                                .filter_map(|tag| source.get(*tag).copied())
                                .collect(),
                            None,
                        ),
                        FieldLayout::Reference { mutability, tag } => {
                            (field.ty.clone(), slice(*tag, 1), Some(*mutability))
                        }
                    })
                    .collect(),
                None => Vec::new(),
            },
            _ => Vec::new(),
        };

        for (name, (ty, inner, reference)) in names.iter().zip(parts) {
            let node = match reference {
                None => {
                    let node = self.new_value_node(name, &ty, NodeRole::Variable);
                    let pairs = self.inner_pairs(&inner, &self.inner(node));
                    for (src, dst) in pairs {
                        self.decompose_link(value.temporary, src, dst, init.span);
                    }
                    node
                }
                Some(mutability) => {
                    let node = self.graph.add_node(
                        self.names.intern(name),
                        NodeKind::reference(mutability.is_mut()),
                        NodeRole::Variable,
                    );
                    if let Some(&holder) = inner.first() {
                        let shared = self.inner(holder);
                        self.graph.share_inner_nodes(node, shared);
                        self.decompose_link(value.temporary, holder, node, init.span);
                    }
                    node
                }
            };
            self.declare(
                name,
                Variable {
                    node,
                    ty,
                    mutable: reference.is_some_and(Mutability::is_mut),
                    origin: VariableOrigin::Local,
                },
            );
        }
    }

    fn decompose_link(&mut self, temporary: bool, src: NodeId, dst: NodeId, span: Span) {
        if temporary {
            self.graph.add_link(src, dst);
        } else {
            self.try_link(src, dst, span);
        }
    }

    fn verify_assign(&mut self, dst: &Expr, src: &Expr, span: Span) {
        let Some(value) = self.eval(src) else {
            return;
        };
        // Assigning a moved variable brings it back to life.
        if let ExprKind::Name(name) = &dst.kind {
            if let Some(variable) = self.lookup(name) {
                if variable.origin != VariableOrigin::Global
                    && self.graph.node(variable.node).kind == NodeKind::Value
                    && self.graph.is_moved(variable.node)
                {
                    if !variable.mutable {
                        self.report(VerifyError::ExpectedReferenceValue {
                            span: self.file_span(dst.span),
                        });
                    }
                    self.graph.reinitialize(variable.node);
                    let place = Operand {
                        node: variable.node,
                        ty: variable.ty,
                        mutable: variable.mutable,
                        temporary: false,
                    };
                    self.store(&value, &place, span);
                    return;
                }
            }
        }
        let Some(place) = self.eval(dst) else {
            return;
        };
        self.check_write(&place, dst.span);
        self.store(&value, &place, span);
    }

    fn verify_compound_assign(&mut self, dst: &Expr, src: &Expr, span: Span) {
        let Some(place) = self.eval(dst) else {
            return;
        };
        if place.ty == Type::Scalar {
            let Some(value) = self.eval(src) else {
                return;
            };
            self.check_write(&place, dst.span);
            self.check_read(value.node, src.span);
            return;
        }

        // The destination stays mutably borrowed while the operand is computed.
        let lock = self.graph.add_node(
            self.names.intern("lock"),
            NodeKind::reference(true),
            NodeRole::Temporary,
        );
        self.try_link(place.node, lock, dst.span);
        let value = self.eval(src);
        if let Some(value) = &value {
            if !value.temporary {
                self.check_read(value.node, src.span);
            }
        }
        self.graph.remove_node(lock);
        let Some(value) = value else {
            return;
        };
        self.check_write(&place, dst.span);
        self.store(&value, &place, span);
    }

    fn check_write(&mut self, place: &Operand, span: Span) {
        if place.temporary || !place.mutable {
            self.report(VerifyError::ExpectedReferenceValue {
                span: self.file_span(span),
            });
        }
        if self.graph.has_outgoing_links(place.node) {
            let name = self.node_name(place.node);
            self.report(VerifyError::ReferenceProtection {
                name,
                span: self.file_span(span),
            });
        }
    }

    /// Stores `value` into `place`: the storage behind `place` may now point
    /// to whatever `value` points to.
    fn store(&mut self, value: &Operand, place: &Operand, span: Span) {
        if !value.temporary {
            self.check_read(value.node, span);
        }
        let source = self.inner(value.node);
        let targets = self.inner(place.node);

        let global = self
            .graph
            .accessible_variable_nodes(place.node)
            .into_iter()
            .find(|node| self.graph.node(*node).role == NodeRole::Global);
        if let Some(global) = global {
            let local = source.iter().any(|inner| {
                self.graph
                    .accessible_variable_nodes(*inner)
                    .iter()
                    .any(|node| self.graph.node(*node).role != NodeRole::Global)
            });
            if local {
                let name = self.node_name(global);
                self.report(VerifyError::UnallowedReferencePollution {
                    name,
                    span: self.file_span(span),
                });
            }
        }

        for (&src, &dst) in source.iter().zip(&targets) {
            for error in self.graph.try_add_link_to_accessible_variable_inner_nodes(src, dst) {
                let error = self.link_error(error, span);
                self.report(error);
            }
            let second_order: Vec<_> = self.inner(src).into_iter().zip(self.inner(dst)).collect();
            for (src, dst) in second_order {
                self.try_link(src, dst, span);
            }
        }
    }

    fn verify_with(&mut self, name: &Name, binding: Binding, expr: &Expr, body: &Block, span: Span) {
        self.scopes.push();
        let depth = self.scopes.depth();
        let mark = self.temporaries.len();
        let value = self.eval(expr);
        self.bind(name, binding, None, value, true, span);
        let temporaries = self.temporaries.split_off(mark);
        self.scopes.adopt_temporaries(temporaries);
        self.verify_block(body);
        if self.reachable {
            let end = Span::new(body.span.end, body.span.end);
            self.unwind_scopes(depth.saturating_sub(1), end);
        }
        self.scopes.pop();
    }

    /// Evaluates a condition; its temporaries die before the branch runs.
    fn eval_condition(&mut self, cond: &Expr) {
        let mark = self.temporaries.len();
        if let Some(value) = self.eval(cond) {
            self.check_read(value.node, cond.span);
        }
        self.destroy_temporaries(mark, cond.span);
    }

    fn verify_if(&mut self, branches: &[IfBranch], else_block: Option<&Block>, span: Span) {
        let mut ends = Vec::new();
        for branch in branches {
            self.eval_condition(&branch.cond);
            let after_cond = self.graph.snapshot();
            self.verify_block(&branch.body);
            if self.reachable {
                ends.push(self.graph.snapshot());
            }
            self.graph.restore(after_cond);
            self.reachable = true;
        }
        match else_block {
            Some(block) => {
                self.verify_block(block);
                if self.reachable {
                    ends.push(self.graph.snapshot());
                }
            }
            None => ends.push(self.graph.snapshot()),
        }

        if ends.is_empty() {
            self.reachable = false;
            return;
        }
        let (merged, conditional) = self.graph.merge_branches(ends.clone());
        self.report_merge_conflicts(&ends, &merged, span);
        self.graph.restore(merged);
        self.reachable = true;
        for node in conditional {
            let name = self.node_name(node);
            self.report(VerifyError::ConditionalMove {
                name,
                span: self.file_span(span),
            });
        }
    }

    /// Runs the body until the state at the start of an iteration stops
    /// changing, or the configured iteration limit is hit.
    fn verify_loop(&mut self, cond: Option<&Expr>, body: &Block, span: Span) {
        let entry = self.graph.snapshot();
        let mut current = entry.clone();
        let limit = self.config.loop_iterations();
        let mut exits = Vec::new();
        let mut iteration = 0;
        loop {
            iteration += 1;
            self.graph.restore(current.clone());
            self.reachable = true;
            exits.clear();
            if let Some(cond) = cond {
                self.eval_condition(cond);
                exits.push(self.graph.snapshot());
            }

            self.loops.push(LoopFrame {
                scope_depth: self.scopes.depth(),
                breaks: Vec::new(),
                continues: Vec::new(),
            });
            self.verify_block(body);
            let Some(frame) = self.loops.pop() else {
                break;
            };
            exits.extend(frame.breaks);
            let mut ends = frame.continues;
            if self.reachable {
                ends.push(self.graph.snapshot());
            }
            if ends.is_empty() {
                break;
            }

            let end = self.graph.merge_iterations(ends.clone());
            self.report_merge_conflicts(&ends, &end, span);
            for violation in self.graph.loop_violations(&entry, &end) {
                let error = match violation {
                    LoopViolation::OuterMove(node) => VerifyError::OuterVariableMoveInsideLoop {
                        name: self.node_name(node),
                        span: self.file_span(span),
                    },
                    LoopViolation::OuterPollution(node) => VerifyError::OuterLoopPollution {
                        name: self.node_name(node),
                        span: self.file_span(span),
                    },
                };
                self.report(error);
            }

            let joined = vec![current.clone(), end];
            let next = self.graph.merge_iterations(joined.clone());
            self.report_merge_conflicts(&joined, &next, span);
            if next == current {
                debug!("loop at {span} converged after {iteration} iterations");
                break;
            }
            if iteration >= limit {
                warn!("loop at {span} did not converge within {limit} iterations");
                break;
            }
            current = next;
        }

        if exits.is_empty() {
            self.reachable = false;
            return;
        }
        let (merged, _) = self.graph.merge_branches(exits.clone());
        self.report_merge_conflicts(&exits, &merged, span);
        self.graph.restore(merged);
        self.reachable = true;
    }

    /// Reports references that only conflict once `parts` are joined.
    fn report_merge_conflicts(&mut self, parts: &[GraphState], merged: &GraphState, span: Span) {
        for node in self.graph.merge_conflicts(parts, merged) {
            let name = self.node_name(node);
            self.report(VerifyError::ReferenceProtection {
                name,
                span: self.file_span(span),
            });
        }
    }

    fn verify_jump(&mut self, is_break: bool, span: Span) {
        let Some(depth) = self.loops.last().map(|frame| frame.scope_depth) else {
            self.report(VerifyError::BreakOutsideLoop {
                span: self.file_span(span),
            });
            return;
        };
        self.unwind_scopes(depth, span);
        let state = self.graph.snapshot();
        if let Some(frame) = self.loops.last_mut() {
            if is_break {
                frame.breaks.push(state);
            } else {
                frame.continues.push(state);
            }
        }
        self.reachable = false;
    }

    fn verify_return(&mut self, value: Option<&Expr>, span: Span) {
        if let Some(expr) = value {
            if let Some(value) = self.eval(expr) {
                self.check_return_value(&value, expr.span);
            }
        }
        self.check_pollution_before_return(span);
        self.destroy_temporaries(0, span);
        self.unwind_scopes(0, span);
        self.reachable = false;
    }
}
