//! What may leave a function: returned references and parameter pollution.

use crate::error::VerifyError;
use crate::verifier::{FunctionVerifier, Operand};
use rg_graph::{NodeId, NodeRole};
use rg_notation::ParamReference;
use rg_span::Span;
use std::collections::BTreeSet;

impl FunctionVerifier<'_, '_> {
    /// Checks a returned (or yielded) value against the return notation.
    pub(crate) fn check_return_value(&mut self, value: &Operand, span: Span) {
        let ret = self.sig.ret.clone();
        match ret.passing.reference() {
            Some(mutability) => {
                if value.temporary {
                    self.report(VerifyError::ReturningUnallowedReference {
                        name: self.node_name(value.node),
                        span: self.file_span(span),
                    });
                    return;
                }
                if mutability.is_mut() && !value.mutable {
                    self.report(VerifyError::ExpectedReferenceValue {
                        span: self.file_span(span),
                    });
                }
                self.check_escape(value.node, &ret.references, span);
            }
            None => {
                if !value.temporary {
                    self.check_read(value.node, span);
                }
            }
        }

        let empty = BTreeSet::new();
        for (tag, inner) in self.inner(value.node).into_iter().enumerate() {
            let allowed = ret.inner_references.get(tag).unwrap_or(&empty);
            self.check_escape(inner, allowed, span);
            // Second-order references never leave a function.
            for second in self.inner(inner) {
                if let Some(target) = self.sorted_accessible(second).first() {
                    self.report(VerifyError::ReturningUnallowedReference {
                        name: self.node_name(*target),
                        span: self.file_span(span),
                    });
                }
            }
        }
    }

    /// Every storage `node` may point to must be global or one of `allowed`.
    fn check_escape(&mut self, node: NodeId, allowed: &BTreeSet<ParamReference>, span: Span) {
        for target in self.sorted_accessible(node) {
            if self.graph.node(target).role == NodeRole::Global {
                continue;
            }
            if self
                .arg_nodes
                .get(&target)
                .is_some_and(|param| allowed.contains(param))
            {
                continue;
            }
            self.report(VerifyError::ReturningUnallowedReference {
                name: self.node_name(target),
                span: self.file_span(span),
            });
        }
    }

    /// Checks that inner references of by-reference parameters only gained
    /// referents the signature declares.
    pub(crate) fn check_pollution_before_return(&mut self, span: Span) {
        for entry in self.param_inner.clone() {
            let dst = ParamReference::inner(entry.param, entry.tag);
            for source in self.sorted_accessible(entry.node) {
                if self.graph.node(source).role == NodeRole::Global {
                    continue;
                }
                if self
                    .arg_nodes
                    .get(&source)
                    .is_some_and(|src| *src == dst || self.sig.allows_pollution(dst, *src))
                {
                    continue;
                }
                let name = self
                    .sig
                    .params
                    .get(entry.param)
                    .map_or_else(|| self.node_name(entry.node), |param| param.name.clone());
                self.report(VerifyError::UnallowedReferencePollution {
                    name,
                    span: self.file_span(span),
                });
            }
        }
    }

    fn sorted_accessible(&self, node: NodeId) -> Vec<NodeId> {
        let mut nodes: Vec<_> = self.graph.accessible_variable_nodes(node).into_iter().collect();
        nodes.sort_by_key(|node| u32::from(node.into_raw()));
        nodes
    }
}
