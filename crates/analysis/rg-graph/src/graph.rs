//! Graph operations.

use crate::error::LinkError;
use crate::node::{ChildKey, Node, NodeId, NodeKind, NodeRole};
use crate::state::{GraphState, NodeState};
use la_arena::Arena;
use log::trace;
use rg_intern::Symbol;
use rustc_hash::FxHashSet;

/// Nodes of one function activation and their current links.
#[derive(Clone, Debug, Default)]
pub struct ReferencesGraph {
    nodes: Arena<Node>,
    state: GraphState,
}

impl ReferencesGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptor of `id`.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Whether `id` is alive in the current state.
    pub fn contains(&self, id: NodeId) -> bool {
        self.state.contains(id)
    }

    /// Current state.
    pub fn state(&self) -> &GraphState {
        &self.state
    }

    /// Copy of the current state, for branching.
    pub fn snapshot(&self) -> GraphState {
        self.state.clone()
    }

    /// Replaces the current state.
    pub fn restore(&mut self, state: GraphState) {
        self.state = state;
    }

    #[expect(clippy::panic, reason = "a dead node id is a verifier bug, not a user error")]
    fn node_state(&self, id: NodeId) -> &NodeState {
        self.state
            .nodes
            .get(&id)
            .unwrap_or_else(|| panic!("node {id:?} is not alive in the references graph"))
    }

    #[expect(clippy::panic, reason = "a dead node id is a verifier bug, not a user error")]
    fn node_state_mut(&mut self, id: NodeId) -> &mut NodeState {
        self.state
            .nodes
            .get_mut(&id)
            .unwrap_or_else(|| panic!("node {id:?} is not alive in the references graph"))
    }

    /// Creates a node without links.
    pub fn add_node(&mut self, name: Symbol, kind: NodeKind, role: NodeRole) -> NodeId {
        let id = self.nodes.alloc(Node::new(name, kind, role));
        self.state.nodes.insert(id, NodeState::default());
        trace!("add node {id:?} ({kind:?}, {role:?})");
        id
    }

    /// Creates an inner reference node owned by `owner`.
    pub fn add_inner_node(&mut self, owner: NodeId, name: Symbol, kind: NodeKind) -> NodeId {
        let id = self.add_node(name, kind, NodeRole::InnerReference);
        self.nodes[id].owner = Some(owner);
        let owner_node = &mut self.nodes[owner];
        owner_node.inner.push(id);
        owner_node.owns_inner = true;
        id
    }

    /// Makes `node` see `inner` as its inner reference nodes without owning
    /// them. Used for references, which share the referent's inner nodes.
    pub fn share_inner_nodes(&mut self, node: NodeId, inner: Vec<NodeId>) {
        let target = &mut self.nodes[node];
        target.inner = inner;
        target.owns_inner = false;
    }

    /// Hands the inner nodes owned by `from` over to `to`, so they outlive
    /// `from`. Does nothing when `from` only shares its inner nodes.
    pub fn adopt_inner_nodes(&mut self, from: NodeId, to: NodeId) {
        if !self.nodes[from].owns_inner {
            return;
        }
        let inner = self.nodes[from].inner.clone();
        for id in &inner {
            self.nodes[*id].owner = Some(to);
        }
        self.nodes[from].owns_inner = false;
        let target = &mut self.nodes[to];
        target.inner = inner;
        target.owns_inner = true;
    }

    /// Returns the child of `parent` for `key`, materializing it on first
    /// access. `inner` computes the inner nodes of a new child.
    pub fn child(
        &mut self,
        parent: NodeId,
        key: ChildKey,
        name: impl FnOnce() -> Symbol,
        inner: impl FnOnce(&Self) -> Vec<NodeId>,
    ) -> NodeId {
        if let Some(existing) = self.nodes[parent].child(key) {
            self.state.nodes.entry(existing).or_default();
            return existing;
        }
        let inner = inner(self);
        let kind = self.nodes[parent].kind;
        let id = self.add_node(name(), kind, NodeRole::Child);
        let child = &mut self.nodes[id];
        child.parent = Some(parent);
        child.inner = inner;
        self.nodes[parent].children.insert(key, id);
        id
    }

    fn alive_children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes[id]
            .children()
            .filter(|child| self.contains(*child))
            .collect()
    }

    /// Destroys a node, its children and owned inner nodes.
    ///
    /// Everything referencing through the node keeps referencing what the
    /// node referenced.
    pub fn remove_node(&mut self, id: NodeId) {
        if !self.contains(id) {
            return;
        }
        for child in self.alive_children(id) {
            self.remove_node(child);
        }
        if self.nodes[id].owns_inner {
            for inner in self.nodes[id].inner.clone() {
                self.remove_node(inner);
            }
        }
        self.remove_node_links(id);
        self.state.nodes.remove(&id);
        trace!("remove node {id:?}");
    }

    /// Removes all links of `id`, connecting each node it referenced to each
    /// node referencing it. Links out of a child move to its parent.
    pub fn remove_node_links(&mut self, id: NodeId) {
        let state = self.node_state_mut(id);
        let in_links: Vec<_> = state.in_links.drain().collect();
        let out_links: Vec<_> = state.out_links.drain().collect();
        for from in &in_links {
            self.node_state_mut(*from).out_links.remove(&id);
        }
        for to in &out_links {
            self.node_state_mut(*to).in_links.remove(&id);
        }
        for &from in &in_links {
            for &to in &out_links {
                self.add_link(from, to);
            }
        }
        if let Some(parent) = self.nodes[id].parent {
            if self.contains(parent) {
                for &to in &out_links {
                    self.add_link(parent, to);
                }
            }
        }
    }

    /// Records `to` as referencing `from` without any check.
    pub fn add_link(&mut self, from: NodeId, to: NodeId) {
        if from == to {
            return;
        }
        self.node_state_mut(from).out_links.insert(to);
        self.node_state_mut(to).in_links.insert(from);
        trace!("link {from:?} -> {to:?}");
    }

    /// Records `to` as referencing `from`, checking the link rules first.
    ///
    /// The link is recorded even when a rule is broken.
    ///
    /// # Errors
    ///
    /// [`LinkError::ReferenceProtection`] if `from` is already referenced in a
    /// way that conflicts with `to`, [`LinkError::MutableReferencesLoop`] if
    /// `to` is a mutable reference stored inside storage reachable from
    /// `from` itself.
    pub fn try_add_link(&mut self, from: NodeId, to: NodeId) -> Result<(), LinkError> {
        if self.node_state(from).out_links.contains(&to) {
            return Ok(());
        }
        let to_mut = self.nodes[to].kind.is_mutable_reference();
        let result = if self.has_outgoing_mutable_links(from)
            || (to_mut && self.has_outgoing_links(from))
        {
            Err(LinkError::ReferenceProtection(from))
        } else if to_mut && self.creates_loop(from, to) {
            Err(LinkError::MutableReferencesLoop(from))
        } else {
            Ok(())
        };
        self.add_link(from, to);
        result
    }

    /// Whether anything references `id`, one of its children or one of its
    /// ancestors directly.
    pub fn has_outgoing_links(&self, id: NodeId) -> bool {
        self.any_outgoing(id, |_| true)
    }

    /// Like [`Self::has_outgoing_links`], counting mutable references only.
    pub fn has_outgoing_mutable_links(&self, id: NodeId) -> bool {
        self.any_outgoing(id, |node| node.kind.is_mutable_reference())
    }

    fn any_outgoing(&self, id: NodeId, pred: impl Fn(&Node) -> bool + Copy) -> bool {
        if self.subtree_has_outgoing(id, pred) {
            return true;
        }
        let mut current = self.nodes[id].parent;
        while let Some(parent) = current {
            if self
                .state
                .get(parent)
                .is_some_and(|state| state.out_links.iter().any(|to| pred(&self.nodes[*to])))
            {
                return true;
            }
            current = self.nodes[parent].parent;
        }
        false
    }

    fn subtree_has_outgoing(&self, id: NodeId, pred: impl Fn(&Node) -> bool + Copy) -> bool {
        let Some(state) = self.state.get(id) else {
            return false;
        };
        state.out_links.iter().any(|to| pred(&self.nodes[*to]))
            || self.nodes[id]
                .children()
                .any(|child| self.subtree_has_outgoing(child, pred))
    }

    /// Outermost node `id` is part of: walks parents and owners.
    pub fn root(&self, id: NodeId) -> NodeId {
        let mut current = id;
        loop {
            let node = &self.nodes[current];
            match node.parent.or(node.owner) {
                Some(up) => current = up,
                None => return current,
            }
        }
    }

    /// Whether linking `to` under `from` stores `to` inside storage that
    /// derives from `from`.
    fn creates_loop(&self, from: NodeId, to: NodeId) -> bool {
        let root = self.root(to);
        let mut visited = FxHashSet::default();
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            if current == from {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            let Some(state) = self.state.get(current) else {
                continue;
            };
            stack.extend(state.out_links.iter().copied());
            stack.extend(self.nodes[current].children());
            if self.nodes[current].owns_inner {
                stack.extend(self.nodes[current].inner.iter().copied());
            }
        }
        false
    }

    /// Marks `id` as moved and drops its links. Links into its inner nodes
    /// are handed over to whatever already referenced through them.
    pub fn move_node(&mut self, id: NodeId) {
        self.node_state_mut(id).moved = true;
        if self.nodes[id].owns_inner {
            for inner in self.nodes[id].inner.clone() {
                if self.contains(inner) {
                    self.remove_node_links(inner);
                }
            }
        }
        for child in self.alive_children(id) {
            self.move_node(child);
        }
        self.remove_node_links(id);
        trace!("move node {id:?}");
    }

    /// Clears the moved flag of `id` and its children.
    pub fn reinitialize(&mut self, id: NodeId) {
        self.node_state_mut(id).moved = false;
        for child in self.alive_children(id) {
            self.reinitialize(child);
        }
    }

    /// Whether `id` or one of its ancestors was moved.
    pub fn is_moved(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.state.get(node).is_some_and(|state| state.moved) {
                return true;
            }
            current = self.nodes[node].parent;
        }
        false
    }

    /// Nodes `id` references directly.
    pub fn in_links(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.node_state(id).in_links.iter().copied()
    }

    /// Nodes referencing `id` directly.
    pub fn out_links(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.node_state(id).out_links.iter().copied()
    }

    /// Value storage `id` may point into, following links backwards.
    /// Children are reported as their root value.
    pub fn accessible_variable_nodes(&self, id: NodeId) -> FxHashSet<NodeId> {
        let mut result = FxHashSet::default();
        self.walk_back(id, |graph, node| {
            if graph.nodes[node].kind == NodeKind::Value {
                result.insert(graph.root(node));
                true
            } else {
                false
            }
        });
        result
    }

    /// Inner reference nodes of values that `id` derives from.
    pub fn accessible_variable_inner_nodes(&self, id: NodeId) -> FxHashSet<NodeId> {
        let mut result = FxHashSet::default();
        self.walk_back(id, |graph, node| {
            if graph.is_value_inner_node(node) {
                result.insert(node);
                true
            } else {
                false
            }
        });
        result
    }

    /// Whether `id` is an inner reference node owned by value storage.
    pub fn is_value_inner_node(&self, id: NodeId) -> bool {
        let node = &self.nodes[id];
        node.role == NodeRole::InnerReference
            && node
                .owner
                .is_some_and(|owner| self.nodes[owner].kind == NodeKind::Value)
    }

    /// Depth-first walk against link direction. `stop` returns true for
    /// nodes whose sources should not be visited.
    fn walk_back(&self, start: NodeId, mut stop: impl FnMut(&Self, NodeId) -> bool) {
        let mut visited = FxHashSet::default();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) || !self.contains(current) {
                continue;
            }
            if stop(self, current) {
                continue;
            }
            stack.extend(self.node_state(current).in_links.iter().copied());
            if let Some(parent) = self.nodes[current].parent {
                stack.push(parent);
            }
        }
    }

    /// Links `from` into every value inner node `to` derives from, so that
    /// storage reached through `to` records the new referent.
    ///
    /// # Errors
    ///
    /// Every rule violation found while linking.
    pub fn try_add_link_to_accessible_variable_inner_nodes(
        &mut self,
        from: NodeId,
        to: NodeId,
    ) -> Vec<LinkError> {
        let mut targets: Vec<_> = self.accessible_variable_inner_nodes(to).into_iter().collect();
        targets.sort_by_key(|node| u32::from(node.into_raw()));
        targets
            .into_iter()
            .filter_map(|target| self.try_add_link(from, target).err())
            .collect()
    }

    /// Nodes whose direct references break the coexistence rule.
    pub fn coexistence_violations(&self) -> Vec<NodeId> {
        self.coexistence_violations_in(&self.state)
    }

    /// Nodes whose direct references break the coexistence rule in `state`.
    pub(crate) fn coexistence_violations_in(&self, state: &GraphState) -> Vec<NodeId> {
        let mut violations: Vec<_> = state
            .nodes
            .iter()
            .filter(|(_, node_state)| {
                let mutable = node_state
                    .out_links
                    .iter()
                    .filter(|to| self.nodes[**to].kind.is_mutable_reference())
                    .count();
                mutable > 1 || (mutable == 1 && node_state.out_links.len() > 1)
            })
            .map(|(id, _)| *id)
            .collect();
        violations.sort_by_key(|node| u32::from(node.into_raw()));
        violations
    }
}
