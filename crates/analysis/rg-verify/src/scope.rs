//! Lexical scopes mapping names to graph nodes.

use rg_graph::NodeId;
use rg_intern::Symbol;
use rg_ops::Type;

/// Where a variable was declared.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum VariableOrigin {
    /// `let`, `with` or decomposition
    Local,
    /// Function parameter
    Parameter,
    /// Global variable
    Global,
}

/// A named variable.
#[derive(Clone, Debug)]
pub(crate) struct Variable {
    pub node: NodeId,
    /// Value type, or pointee type of a reference
    pub ty: Type,
    /// Mutable binding, or mutable reference
    pub mutable: bool,
    pub origin: VariableOrigin,
}

/// One lexical scope.
#[derive(Debug, Default)]
pub(crate) struct Scope {
    /// Variables in declaration order
    pub variables: Vec<(Symbol, Variable)>,
    /// Temporaries living as long as the scope (`with` expressions)
    pub temporaries: Vec<NodeId>,
}

/// Nested scopes of a function body. The innermost scope is last.
#[derive(Debug, Default)]
pub(crate) struct ScopeStack {
    scopes: Vec<Scope>,
}

impl ScopeStack {
    pub fn push(&mut self) {
        self.scopes.push(Scope::default());
    }

    pub fn pop(&mut self) -> Option<Scope> {
        self.scopes.pop()
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Declares `name` in the innermost scope, shadowing earlier declarations.
    pub fn declare(&mut self, name: Symbol, variable: Variable) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.variables.push((name, variable));
        }
    }

    /// Keeps `temporaries` alive until the innermost scope ends.
    pub fn adopt_temporaries(&mut self, temporaries: Vec<NodeId>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.temporaries.extend(temporaries);
        }
    }

    /// Innermost declaration of `name`.
    pub fn lookup(&self, name: Symbol) -> Option<&Variable> {
        self.scopes.iter().rev().find_map(|scope| {
            scope
                .variables
                .iter()
                .rev()
                .find(|(declared, _)| *declared == name)
                .map(|(_, variable)| variable)
        })
    }

    /// Scopes at `depth` and deeper, innermost first.
    pub fn scopes_from(&self, depth: usize) -> impl Iterator<Item = &Scope> {
        self.scopes.iter().skip(depth).rev()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rg_graph::{NodeKind, NodeRole, ReferencesGraph};
    use rg_intern::Interner;

    fn make_variable(graph: &mut ReferencesGraph, names: &Interner, name: &str) -> Variable {
        Variable {
            node: graph.add_node(names.intern(name), NodeKind::Value, NodeRole::Variable),
            ty: Type::Scalar,
            mutable: false,
            origin: VariableOrigin::Local,
        }
    }

    #[test]
    fn test_shadowing() {
        let names = Interner::new();
        let mut graph = ReferencesGraph::new();
        let x = names.intern("x");
        let mut scopes = ScopeStack::default();
        scopes.push();
        let outer = make_variable(&mut graph, &names, "x");
        scopes.declare(x, outer.clone());
        scopes.push();
        let inner = make_variable(&mut graph, &names, "x");
        scopes.declare(x, inner.clone());
        assert_eq!(scopes.lookup(x).map(|v| v.node), Some(inner.node));
        scopes.pop();
        assert_eq!(scopes.lookup(x).map(|v| v.node), Some(outer.node));
    }

    #[test]
    fn test_scopes_from_is_innermost_first() {
        let names = Interner::new();
        let mut graph = ReferencesGraph::new();
        let mut scopes = ScopeStack::default();
        scopes.push();
        let a = make_variable(&mut graph, &names, "a");
        scopes.declare(names.intern("a"), a.clone());
        scopes.push();
        let b = make_variable(&mut graph, &names, "b");
        scopes.declare(names.intern("b"), b.clone());
        let order: Vec<_> = scopes
            .scopes_from(0)
            .flat_map(|scope| scope.variables.iter().map(|(_, v)| v.node))
            .collect();
        assert_eq!(order, vec![b.node, a.node]);
        assert_eq!(scopes.scopes_from(1).count(), 1);
        assert!(scopes.lookup(names.intern("c")).is_none());
    }
}
