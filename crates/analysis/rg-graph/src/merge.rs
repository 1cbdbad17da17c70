//! Joining states at control-flow merge points.

use crate::error::LoopViolation;
use crate::graph::ReferencesGraph;
use crate::node::NodeId;
use crate::state::GraphState;
use log::trace;
use rustc_hash::FxHashSet;

impl ReferencesGraph {
    /// Joins the end states of the arms of a branch.
    ///
    /// Links of all arms are united. Returns the joined state and the
    /// top-level nodes moved in some arms but not in others.
    pub fn merge_branches(&self, states: Vec<GraphState>) -> (GraphState, Vec<NodeId>) {
        let mut states = states.into_iter();
        let Some(mut merged) = states.next() else {
            return (GraphState::default(), Vec::new());
        };
        let mut conditional = Vec::new();
        for state in states {
            for node in merged.join(&state) {
                if self.node(node).parent.is_none()
                    && self.node(node).owner.is_none()
                    && !conditional.contains(&node)
                {
                    conditional.push(node);
                }
            }
        }
        conditional.sort_by_key(|node| u32::from(node.into_raw()));
        trace!(
            "merged branches: {} nodes, {} conditional moves",
            merged.len(),
            conditional.len()
        );
        (merged, conditional)
    }

    /// Joins states of loop iterations: a node counts as moved if it was
    /// moved on any path.
    pub fn merge_iterations(&self, states: Vec<GraphState>) -> GraphState {
        let mut states = states.into_iter();
        let Some(mut merged) = states.next() else {
            return GraphState::default();
        };
        for state in states {
            merged.join(&state);
        }
        merged
    }

    /// Nodes breaking the coexistence rule in `merged` although they kept it
    /// in every joined state.
    ///
    /// An immutable reference from one arm and a mutable one from another
    /// only conflict once the arms are joined.
    pub fn merge_conflicts(&self, parts: &[GraphState], merged: &GraphState) -> Vec<NodeId> {
        let known: FxHashSet<NodeId> = parts
            .iter()
            .flat_map(|state| self.coexistence_violations_in(state))
            .collect();
        self.coexistence_violations_in(merged)
            .into_iter()
            .filter(|node| !known.contains(node))
            .collect()
    }

    /// Compares the state at the end of a loop iteration with the state
    /// before the loop.
    pub fn loop_violations(&self, before: &GraphState, after: &GraphState) -> Vec<LoopViolation> {
        let mut violations = Vec::new();
        for (&id, old) in &before.nodes {
            let Some(new) = after.nodes.get(&id) else {
                continue;
            };
            let node = self.node(id);
            if new.moved && !old.moved && node.parent.is_none() && node.owner.is_none() {
                violations.push(LoopViolation::OuterMove(id));
            }
            if self.is_value_inner_node(id)
                && new.in_links.iter().any(|src| !old.in_links.contains(src))
            {
                violations.push(LoopViolation::OuterPollution(id));
            }
        }
        violations.sort_by_key(|violation| match violation {
            LoopViolation::OuterMove(id) | LoopViolation::OuterPollution(id) => {
                u32::from(id.into_raw())
            }
        });
        violations
    }
}
