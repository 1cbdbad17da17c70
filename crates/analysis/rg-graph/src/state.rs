//! Mutable part of the graph: links and moved flags.

use crate::node::NodeId;
use rustc_hash::{FxHashMap, FxHashSet};

/// Links and moved flag of one node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeState {
    /// Whether the node was moved out
    pub moved: bool,
    /// Nodes this node references
    pub in_links: FxHashSet<NodeId>,
    /// Nodes referencing this node
    pub out_links: FxHashSet<NodeId>,
}

/// Snapshot of all tracked nodes.
///
/// Branches of control flow work on clones of the state; the merge engine
/// joins them afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GraphState {
    pub(crate) nodes: FxHashMap<NodeId, NodeState>,
}

impl GraphState {
    /// Whether `node` is currently alive.
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    /// State of `node`, if alive.
    pub fn get(&self, node: NodeId) -> Option<&NodeState> {
        self.nodes.get(&node)
    }

    /// Number of alive nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no node is alive.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Joins `other` into `self`: links are united, moved flags or-ed.
    ///
    /// Returns nodes alive in both whose moved flags disagreed.
    pub(crate) fn join(&mut self, other: &Self) -> Vec<NodeId> {
        let mut disagreeing = Vec::new();
        for (&id, theirs) in &other.nodes {
            match self.nodes.get_mut(&id) {
                Some(ours) => {
                    if ours.moved != theirs.moved {
                        disagreeing.push(id);
                    }
                    ours.moved |= theirs.moved;
                    ours.in_links.extend(theirs.in_links.iter().copied());
                    ours.out_links.extend(theirs.out_links.iter().copied());
                }
                None => {
                    self.nodes.insert(id, theirs.clone());
                }
            }
        }
        disagreeing
    }
}
