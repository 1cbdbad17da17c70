//! Calls: binding arguments, linking the result and applying the declared
//! pollution.

use crate::error::VerifyError;
use crate::verifier::{FunctionVerifier, Operand};
use rg_graph::{NodeId, NodeKind, NodeRole};
use rg_notation::{ParamReference, ParamTag};
use rg_ops::Expr;
use rg_span::Span;

/// An argument as seen by the callee.
struct BoundArg {
    /// Reference passed for a by-reference parameter
    reference: Option<NodeId>,
    /// Inner reference nodes of the argument
    inner: Vec<NodeId>,
}

fn bound_node(args: &[BoundArg], param: ParamReference) -> Option<NodeId> {
    let arg = args.get(param.param)?;
    match param.tag {
        ParamTag::Reference => arg.reference,
        ParamTag::Inner(tag) => arg.inner.get(tag).copied(),
    }
}

impl FunctionVerifier<'_, '_> {
    pub(crate) fn eval_call(&mut self, callee: &str, args: &[Expr], span: Span) -> Option<Operand> {
        let ctx = self.ctx;
        let Some(sig) = ctx.signature(callee) else {
            self.report(VerifyError::NameNotFound {
                what: "function",
                name: callee.to_string(),
                span: self.file_span(span),
            });
            return None;
        };

        let mut bound = Vec::with_capacity(args.len());
        // Argument references, copies and locks, removed after the call
        let mut call_nodes = Vec::new();
        for (index, arg) in args.iter().enumerate() {
            let Some(value) = self.eval(arg) else {
                for node in call_nodes.into_iter().rev() {
                    self.graph.remove_node(node);
                }
                return None;
            };
            let Some(param) = sig.params.get(index) else {
                // Programs are loaded without an arity check, so a surplus
                // argument is evaluated for its reads and otherwise unbound.
                self.report(VerifyError::NameNotFound {
                    what: "parameter",
                    name: format!("{callee}#{index}"),
                    span: self.file_span(arg.span),
                });
                continue;
            };
            let arg_bound = match param.passing.reference() {
                Some(mutability) => {
                    if mutability.is_mut() && (!value.mutable || value.temporary) {
                        self.report(VerifyError::ExpectedReferenceValue {
                            span: self.file_span(arg.span),
                        });
                    }
                    let node = self.new_reference(
                        &param.name,
                        value.node,
                        mutability.is_mut(),
                        NodeRole::Temporary,
                        arg.span,
                    );
                    call_nodes.push(node);
                    BoundArg {
                        reference: Some(node),
                        inner: self.inner(node),
                    }
                }
                None if value.temporary => BoundArg {
                    reference: None,
                    inner: self.inner(value.node),
                },
                None => {
                    let copy = self.new_value_node(&param.name, &param.ty, NodeRole::Temporary);
                    let targets = self.inner(copy);
                    self.pass_inner(&value, &targets, arg.span);
                    call_nodes.push(copy);
                    BoundArg {
                        reference: None,
                        inner: targets,
                    }
                }
            };

            // Objects behind second-order references stay locked for the call.
            for (tag, shape) in param.tags.iter().enumerate() {
                let Some(second) = shape.second_order else {
                    continue;
                };
                let Some(&holder) = arg_bound.inner.get(tag) else {
                    continue;
                };
                for source in self.inner(holder) {
                    let lock = self.graph.add_node(
                        self.names.intern("lock"),
                        NodeKind::reference(second.is_mut()),
                        NodeRole::Temporary,
                    );
                    self.try_link(source, lock, arg.span);
                    call_nodes.push(lock);
                }
            }
            bound.push(arg_bound);
        }

        let shape = sig.call_result();
        let result = match shape.passing.reference() {
            Some(mutability) => {
                let node = self.graph.add_node(
                    self.names.intern(callee),
                    NodeKind::reference(mutability.is_mut()),
                    NodeRole::Temporary,
                );
                // A result borrowed from a single argument sees that
                // argument's storage. Otherwise it owns fresh inner nodes fed
                // by every candidate, which a binding adopts.
                let sources: Vec<NodeId> = shape
                    .references
                    .iter()
                    .filter_map(|param| bound_node(&bound, *param))
                    .collect();
                let shared = match sources.as_slice() {
                    [source] => {
                        Some(self.inner(*source)).filter(|inner| inner.len() == shape.tags.len())
                    }
                    _ => None,
                };
                match shared {
                    Some(inner) => self.graph.share_inner_nodes(node, inner),
                    None => {
                        self.add_inner_nodes(node, callee, &shape.tags);
                        let targets = self.inner(node);
                        for source in sources {
                            let pairs = self.inner_pairs(&self.inner(source), &targets);
                            for (src, dst) in pairs {
                                self.try_link(src, dst, span);
                            }
                        }
                    }
                }
                self.temporaries.push(node);
                Operand {
                    node,
                    ty: shape.ty.clone(),
                    mutable: mutability.is_mut(),
                    temporary: false,
                }
            }
            None => self.new_temporary(shape.ty.clone()),
        };

        for param in &shape.references {
            if let Some(source) = bound_node(&bound, *param) {
                self.try_link(source, result.node, span);
            }
        }
        let targets = self.inner(result.node);
        for (tag, allowed) in shape.inner_references.iter().enumerate() {
            let Some(&target) = targets.get(tag) else {
                continue;
            };
            for param in allowed {
                // A shared inner node already is the argument's own.
                if let Some(source) = bound_node(&bound, *param).filter(|source| *source != target) {
                    self.try_link(source, target, span);
                }
            }
        }

        for pair in &sig.pollution {
            let (Some(dst), Some(src)) = (bound_node(&bound, pair.dst), bound_node(&bound, pair.src))
            else {
                continue;
            };
            for error in self.graph.try_add_link_to_accessible_variable_inner_nodes(src, dst) {
                let error = self.link_error(error, span);
                self.report(error);
            }
        }

        for node in call_nodes.into_iter().rev() {
            self.graph.remove_node(node);
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bound_node() {
        let mut graph = rg_graph::ReferencesGraph::new();
        let names = rg_intern::Interner::new();
        let reference = graph.add_node(names.intern("r"), NodeKind::reference(true), NodeRole::Temporary);
        let inner = graph.add_node(names.intern("i"), NodeKind::Value, NodeRole::Temporary);
        let args = vec![
            BoundArg {
                reference: Some(reference),
                inner: vec![inner],
            },
            BoundArg {
                reference: None,
                inner: Vec::new(),
            },
        ];
        assert_eq!(bound_node(&args, ParamReference::reference(0)), Some(reference));
        assert_eq!(bound_node(&args, ParamReference::inner(0, 0)), Some(inner));
        assert_eq!(bound_node(&args, ParamReference::reference(1)), None);
        assert_eq!(bound_node(&args, ParamReference::inner(2, 0)), None);
    }
}
