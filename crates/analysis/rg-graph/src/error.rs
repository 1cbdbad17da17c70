//! Violations detected by the graph itself.

use crate::node::NodeId;
use thiserror::Error;

/// A link was inserted although it breaks a link rule.
///
/// The link is recorded anyway so analysis can continue with a conservative
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LinkError {
    /// The referenced node already has conflicting references.
    #[error("node {0:?} is already referenced in a conflicting way")]
    ReferenceProtection(NodeId),
    /// The mutable reference would end up stored inside its own referent.
    #[error("mutable reference to node {0:?} would be stored inside itself")]
    MutableReferencesLoop(NodeId),
}

impl LinkError {
    /// Node whose references conflicted.
    pub fn node(self) -> NodeId {
        match self {
            Self::ReferenceProtection(node) | Self::MutableReferencesLoop(node) => node,
        }
    }
}

/// State change inside a loop body that must not carry over to the next
/// iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopViolation {
    /// A node existing before the loop was moved inside it.
    OuterMove(NodeId),
    /// An inner reference node of a value existing before the loop gained
    /// new referents inside it.
    OuterPollution(NodeId),
}
