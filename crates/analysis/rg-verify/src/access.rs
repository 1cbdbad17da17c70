//! Expression evaluation: resolving expressions to nodes.

use crate::error::VerifyError;
use crate::scope::{Variable, VariableOrigin};
use crate::verifier::{FunctionVerifier, Operand};
use rg_graph::{ChildKey, NodeId, NodeKind, NodeRole};
use rg_notation::FieldLayout;
use rg_ops::{Capture, CaptureMode, Expr, ExprKind, FieldInit, FunctionKind, Mutability, Type};
use rg_span::Span;

impl FunctionVerifier<'_, '_> {
    /// Evaluates `expr`. `None` means the rest of the statement is skipped;
    /// the reason was already reported.
    pub(crate) fn eval(&mut self, expr: &Expr) -> Option<Operand> {
        let span = expr.span;
        match &expr.kind {
            ExprKind::Literal => Some(self.new_temporary(Type::Scalar)),
            ExprKind::Name(name) => {
                let variable = self.variable(name, span)?;
                Some(Operand {
                    node: variable.node,
                    ty: variable.ty,
                    mutable: variable.mutable,
                    temporary: false,
                })
            }
            ExprKind::Field { base, field } => {
                let base = self.eval(base)?;
                self.eval_field(&base, field, span)
            }
            ExprKind::TupleElement { base, index } => {
                let base = self.eval(base)?;
                self.eval_tuple_element(&base, *index, span)
            }
            ExprKind::Index { base, index } => {
                let base = self.eval(base)?;
                Some(self.eval_index(base, *index))
            }
            ExprKind::Binary { lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                self.check_read(lhs.node, span);
                self.check_read(rhs.node, span);
                Some(self.new_temporary(Type::Scalar))
            }
            ExprKind::Call { callee, args } => self.eval_call(callee, args, span),
            ExprKind::Construct { ty, fields } => self.eval_construct(ty, fields, span),
            ExprKind::Tuple(elements) => self.eval_tuple(elements),
            ExprKind::Move(name) => self.eval_move(name, span),
            ExprKind::Take(inner) => self.eval_take(inner, span),
            ExprKind::Select {
                cond,
                then,
                otherwise,
            } => self.eval_select(cond, then, otherwise, span),
            ExprKind::Closure { captures } => Some(self.eval_closure(captures, span)),
        }
    }

    /// Variable called `name` that was not moved.
    fn variable(&mut self, name: &str, span: Span) -> Option<Variable> {
        let Some(variable) = self.lookup(name) else {
            self.report(VerifyError::NameNotFound {
                what: "variable",
                name: name.to_string(),
                span: self.file_span(span),
            });
            return None;
        };
        if self.graph.is_moved(variable.node) {
            self.report(VerifyError::AccessingMovedVariable {
                name: name.to_string(),
                span: self.file_span(span),
            });
            return None;
        }
        Some(variable)
    }

    fn eval_field(&mut self, base: &Operand, field: &str, span: Span) -> Option<Operand> {
        let ctx = self.ctx;
        let Type::Composite(type_name) = &base.ty else {
            self.report(VerifyError::NameNotFound {
                what: "field",
                name: field.to_string(),
                span: self.file_span(span),
            });
            return None;
        };
        let layout = match ctx.types.require(type_name, self.file_span(span)) {
            Ok(layout) => layout,
            Err(error) => {
                self.report(error.into());
                return None;
            }
        };
        let Some(index) = layout.field_index(field) else {
            self.report(VerifyError::NameNotFound {
                what: "field",
                name: field.to_string(),
                span: self.file_span(span),
            });
            return None;
        };
        if self.func.kind == FunctionKind::Destructor
            && self.destructor_self == Some(self.graph.root(base.node))
            && layout.field_has_mutable_references(index)
        {
            self.report(VerifyError::DestructorFieldAccess {
                field: field.to_string(),
                span: self.file_span(span),
            });
        }

        let info = &layout.fields[index];
        let base_inner = self.inner(base.node);
        let name = format!("{}.{field}", self.node_name(base.node));
        match &info.layout {
            FieldLayout::Value { inner_tags } => {
                let inner = inner_tags
                    .iter()
                    .filter_map(|tag| base_inner.get(*tag).copied())
                    .collect();
                let symbol = self.names.intern(&name);
                let node = self.graph.child(
                    base.node,
                    ChildKey::Field(index as u32),
                    || symbol,
                    |_| inner,
                );
                Some(Operand {
                    node,
                    ty: info.ty.clone(),
                    mutable: base.mutable,
                    temporary: base.temporary,
                })
            }
            FieldLayout::Reference { mutability, tag } => {
                let holder = *base_inner.get(*tag)?;
                self.check_read(base.node, span);
                let mutable = mutability.is_mut() && base.mutable;
                let node = self.new_reference(&name, holder, mutable, NodeRole::Temporary, span);
                self.temporaries.push(node);
                Some(Operand {
                    node,
                    ty: info.ty.clone(),
                    mutable,
                    temporary: false,
                })
            }
        }
    }

    fn eval_tuple_element(&mut self, base: &Operand, index: u32, span: Span) -> Option<Operand> {
        let ctx = self.ctx;
        let element = match &base.ty {
            Type::Tuple(elements) => elements
                .get(index as usize)
                .map(|ty| (elements, ty.clone())),
            _ => None,
        };
        let Some((elements, ty)) = element else {
            self.report(VerifyError::NameNotFound {
                what: "tuple element",
                name: index.to_string(),
                span: self.file_span(span),
            });
            return None;
        };
        let offset = ctx.types.tuple_tag_offset(elements, index as usize);
        let count = ctx.types.tags(&ty).len();
        let inner = self
            .inner(base.node)
            .get(offset..offset + count)
            .map(<[NodeId]>::to_vec)
            .unwrap_or_default();
        let symbol = self
            .names
            .intern(&format!("{}.{index}", self.node_name(base.node)));
        let node = self
            .graph
            .child(base.node, ChildKey::TupleElement(index), || symbol, |_| inner);
        Some(Operand {
            node,
            ty,
            mutable: base.mutable,
            temporary: base.temporary,
        })
    }

    /// Constant indices address one element; computed indices the whole array.
    fn eval_index(&mut self, base: Operand, index: Option<u64>) -> Operand {
        let Type::Array { element, .. } = &base.ty else {
            return base;
        };
        let ty = element.as_ref().clone();
        let Some(index) = index else {
            return Operand { ty, ..base };
        };
        let inner = self.inner(base.node);
        let symbol = self
            .names
            .intern(&format!("{}[{index}]", self.node_name(base.node)));
        let node = self
            .graph
            .child(base.node, ChildKey::ArrayElement(index), || symbol, |_| inner);
        Operand {
            node,
            ty,
            mutable: base.mutable,
            temporary: base.temporary,
        }
    }

    fn eval_construct(&mut self, ty: &str, fields: &[FieldInit], span: Span) -> Option<Operand> {
        let ctx = self.ctx;
        let layout = match ctx.types.require(ty, self.file_span(span)) {
            Ok(layout) => layout,
            Err(error) => {
                self.report(error.into());
                return None;
            }
        };
        let result = self.new_temporary(Type::composite(ty));
        let targets = self.inner(result.node);
        for init in fields {
            let Some(index) = layout.field_index(&init.name) else {
                self.report(VerifyError::NameNotFound {
                    what: "field",
                    name: init.name.clone(),
                    span: self.file_span(init.value.span),
                });
                continue;
            };
            let Some(value) = self.eval(&init.value) else {
                continue;
            };
            match &layout.fields[index].layout {
                FieldLayout::Value { inner_tags } => {
                    let field_targets: Vec<_> = inner_tags
                        .iter()
                        .filter_map(|tag| targets.get(*tag).copied())
                        .collect();
                    self.pass_inner(&value, &field_targets, init.value.span);
                }
                FieldLayout::Reference { mutability, tag } => {
                    if let Some(&holder) = targets.get(*tag) {
                        self.store_reference(&value, *mutability, holder, init.value.span);
                    }
                }
            }
        }
        Some(result)
    }

    /// Stores a reference to `value` in the inner node `holder`.
    fn store_reference(&mut self, value: &Operand, mutability: Mutability, holder: NodeId, span: Span) {
        if mutability.is_mut() && !value.mutable {
            self.report(VerifyError::ExpectedReferenceValue {
                span: self.file_span(span),
            });
        }
        self.try_link(value.node, holder, span);
        let second_order: Vec<_> = self
            .inner(value.node)
            .into_iter()
            .zip(self.inner(holder))
            .collect();
        for (src, dst) in second_order {
            self.try_link(src, dst, span);
        }
    }

    fn eval_tuple(&mut self, elements: &[Expr]) -> Option<Operand> {
        let ctx = self.ctx;
        let mut values = Vec::with_capacity(elements.len());
        for element in elements {
            values.push(self.eval(element)?);
        }
        let types: Vec<Type> = values.iter().map(|value| value.ty.clone()).collect();
        let result = self.new_temporary(Type::Tuple(types.clone()));
        let targets = self.inner(result.node);
        for (index, (value, element)) in values.iter().zip(elements).enumerate() {
            let offset = ctx.types.tuple_tag_offset(&types, index);
            let count = ctx.types.tags(&value.ty).len();
            let element_targets = targets
                .get(offset..offset + count)
                .map(<[NodeId]>::to_vec)
                .unwrap_or_default();
            self.pass_inner(value, &element_targets, element.span);
        }
        Some(result)
    }

    fn eval_move(&mut self, name: &str, span: Span) -> Option<Operand> {
        let file_span = self.file_span(span);
        let Some(variable) = self.lookup(name) else {
            self.report(VerifyError::NameNotFound {
                what: "variable",
                name: name.to_string(),
                span: file_span,
            });
            return None;
        };
        if variable.origin == VariableOrigin::Global
            || self.graph.node(variable.node).kind.is_reference()
        {
            self.report(VerifyError::ExpectedVariable { span: file_span });
            return None;
        }
        if !variable.mutable {
            self.report(VerifyError::ExpectedReferenceValue { span: file_span });
            return None;
        }
        if self.graph.is_moved(variable.node) {
            self.report(VerifyError::AccessingMovedVariable {
                name: name.to_string(),
                span: file_span,
            });
            return None;
        }
        if self.graph.has_outgoing_links(variable.node) {
            self.report(VerifyError::MovedVariableHasReferences {
                name: name.to_string(),
                span: file_span,
            });
            return None;
        }

        let result = self.new_temporary(variable.ty.clone());
        self.copy_referents(variable.node, result.node);
        self.graph.move_node(variable.node);
        Some(result)
    }

    /// Makes the inner nodes of `to` reference what those of `from` reference.
    fn copy_referents(&mut self, from: NodeId, to: NodeId) {
        let pairs = self.inner_pairs(&self.inner(from), &self.inner(to));
        for (src, dst) in pairs {
            let referents: Vec<_> = self.graph.in_links(src).collect();
            for referent in referents {
                self.graph.add_link(referent, dst);
            }
        }
    }

    /// Takes the value out of a place, leaving a default value behind.
    fn eval_take(&mut self, inner: &Expr, span: Span) -> Option<Operand> {
        let value = self.eval(inner)?;
        if value.temporary {
            return Some(value);
        }
        if !value.mutable {
            self.report(VerifyError::ExpectedReferenceValue {
                span: self.file_span(span),
            });
            return None;
        }
        if self.graph.has_outgoing_links(value.node) {
            let name = self.node_name(value.node);
            self.report(VerifyError::ReferenceProtection {
                name,
                span: self.file_span(span),
            });
            return None;
        }
        let result = self.new_temporary(value.ty.clone());
        self.copy_referents(value.node, result.node);
        if self.graph.node(value.node).owns_inner {
            for inner in self.inner(value.node) {
                self.graph.remove_node_links(inner);
            }
        }
        Some(result)
    }

    fn eval_select(&mut self, cond: &Expr, then: &Expr, otherwise: &Expr, span: Span) -> Option<Operand> {
        let condition = self.eval(cond)?;
        self.check_read(condition.node, cond.span);
        let then = self.eval(then)?;
        let otherwise = self.eval(otherwise)?;

        if then.temporary || otherwise.temporary {
            let result = self.new_temporary(then.ty.clone());
            let targets = self.inner(result.node);
            self.pass_inner(&then, &targets, span);
            self.pass_inner(&otherwise, &targets, span);
            return Some(result);
        }

        // Both places: a reference that may point to either.
        let mutable = then.mutable && otherwise.mutable;
        let node = self.graph.add_node(
            self.names.intern("select"),
            NodeKind::reference(mutable),
            NodeRole::Temporary,
        );
        let tags = self.ctx.types.tags(&then.ty);
        self.add_inner_nodes(node, "select", &tags);
        self.temporaries.push(node);
        self.try_link(then.node, node, span);
        self.try_link(otherwise.node, node, span);
        let targets = self.inner(node);
        for source in [then.node, otherwise.node] {
            let pairs = self.inner_pairs(&self.inner(source), &targets);
            for (src, dst) in pairs {
                self.graph.add_link(src, dst);
            }
        }
        Some(Operand {
            node,
            ty: then.ty,
            mutable,
            temporary: false,
        })
    }

    /// Closure object with one inner node per reference it captures.
    fn eval_closure(&mut self, captures: &[Capture], span: Span) -> Operand {
        let closure = self.graph.add_node(
            self.names.intern("closure"),
            NodeKind::Value,
            NodeRole::Temporary,
        );
        self.temporaries.push(closure);
        let mut tags = Vec::new();
        for capture in captures {
            let Some(variable) = self.variable(&capture.name, span) else {
                continue;
            };
            let name = self.names.intern(&format!("closure'{}", capture.name));
            match capture.mode {
                CaptureMode::Value => {
                    self.check_read(variable.node, span);
                    for inner in self.inner(variable.node) {
                        let kind = self.graph.node(inner).kind;
                        let node = self.graph.add_inner_node(closure, name, kind);
                        tags.push(mutability_of(kind));
                        self.try_link(inner, node, span);
                    }
                }
                CaptureMode::RefMut | CaptureMode::RefImut => {
                    let mutable = capture.mode == CaptureMode::RefMut;
                    if mutable && !variable.mutable {
                        self.report(VerifyError::ExpectedReferenceValue {
                            span: self.file_span(span),
                        });
                        continue;
                    }
                    let node =
                        self.graph
                            .add_inner_node(closure, name, NodeKind::reference(mutable));
                    tags.push(mutability_of(NodeKind::reference(mutable)));
                    self.try_link(variable.node, node, span);
                }
            }
        }
        Operand {
            node: closure,
            ty: Type::Closure(tags),
            mutable: true,
            temporary: true,
        }
    }
}

fn mutability_of(kind: NodeKind) -> Mutability {
    if kind.is_mutable_reference() {
        Mutability::Mut
    } else {
        Mutability::Imut
    }
}
