//! Node descriptors.

use la_arena::Idx;
use rg_intern::Symbol;
use rustc_hash::FxHashMap;

/// Stable index of a node in the graph arena.
pub type NodeId = Idx<Node>;

/// What a node stands for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Storage holding a value
    Value,
    /// A mutable reference
    ReferenceMut,
    /// An immutable reference
    ReferenceImut,
}

impl NodeKind {
    /// Reference kind of the given mutability.
    pub fn reference(mutable: bool) -> Self {
        if mutable {
            Self::ReferenceMut
        } else {
            Self::ReferenceImut
        }
    }

    /// Whether this is a mutable reference.
    pub fn is_mutable_reference(self) -> bool {
        self == Self::ReferenceMut
    }

    /// Whether this is a reference of either mutability.
    pub fn is_reference(self) -> bool {
        self != Self::Value
    }
}

/// Where a node came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeRole {
    /// Named local variable or parameter
    Variable,
    /// Expression result living until the end of the statement
    Temporary,
    /// Storage outside the function, reached through a parameter
    Argument,
    /// Global variable
    Global,
    /// Reference stored inside its owner
    InnerReference,
    /// Field or element of its parent
    Child,
}

/// Key of a lazily created child.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChildKey {
    /// Struct field by index
    Field(u32),
    /// Tuple element by index
    TupleElement(u32),
    /// Array element with a constant index
    ArrayElement(u64),
}

/// Facts about a node that never change once it exists.
#[derive(Clone, Debug)]
pub struct Node {
    /// Name used in diagnostics
    pub name: Symbol,
    /// Value or reference
    pub kind: NodeKind,
    /// Origin
    pub role: NodeRole,
    /// Parent of a child node
    pub parent: Option<NodeId>,
    /// Owner of an inner reference node
    pub owner: Option<NodeId>,
    /// Inner reference nodes, one per tag of the node's type
    pub inner: Vec<NodeId>,
    /// Whether `inner` belongs to this node (as opposed to being shared with
    /// the referenced storage or the parent)
    pub owns_inner: bool,
    pub(crate) children: FxHashMap<ChildKey, NodeId>,
}

impl Node {
    pub(crate) fn new(name: Symbol, kind: NodeKind, role: NodeRole) -> Self {
        Self {
            name,
            kind,
            role,
            parent: None,
            owner: None,
            inner: Vec::new(),
            owns_inner: false,
            children: FxHashMap::default(),
        }
    }

    /// Child for `key` if it was ever materialized.
    pub fn child(&self, key: ChildKey) -> Option<NodeId> {
        self.children.get(&key).copied()
    }

    /// All children ever materialized.
    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.values().copied()
    }
}
