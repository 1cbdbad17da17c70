//! The references graph used by the reference-safety verifier.
//!
//! Every storage location that can be referenced during a function activation
//! is a node: variables, temporaries, fields and elements of those, and the
//! inner reference nodes standing for references stored inside values. A link
//! `from -> to` records that `to` currently references (derives from) `from`.
//!
//! # Architecture
//!
//! - [`ReferencesGraph`]: arena of node descriptors plus the current
//!   [`GraphState`]
//! - [`Node`]: immutable facts about a node (kind, role, parent, inner nodes)
//!   and its lazily materialized children
//! - [`GraphState`]: links and moved flags; cheap to clone, compared for
//!   equality when iterating loops to a fixed point
//!
//! # Link rules
//!
//! 1. A node may have any number of immutable references, or exactly one
//!    mutable reference
//! 2. Links out of a node's children and ancestors count as links out of the
//!    node; links out of siblings do not
//! 3. Removing a node reconnects everything that referenced through it
//!
//! # Examples
//!
//! ```rust
//! use rg_graph::{NodeKind, NodeRole, ReferencesGraph};
//! use rg_intern::Interner;
//!
//! let names = Interner::new();
//! let mut graph = ReferencesGraph::new();
//! let x = graph.add_node(names.intern("x"), NodeKind::Value, NodeRole::Variable);
//! let first = graph.add_node(names.intern("r0"), NodeKind::ReferenceMut, NodeRole::Variable);
//! let second = graph.add_node(names.intern("r1"), NodeKind::ReferenceImut, NodeRole::Variable);
//!
//! assert!(graph.try_add_link(x, first).is_ok());
//! assert!(graph.try_add_link(x, second).is_err());
//! ```

mod error;
mod graph;
mod merge;
mod node;
mod state;

pub use error::{LinkError, LoopViolation};
pub use graph::ReferencesGraph;
pub use node::{ChildKey, Node, NodeId, NodeKind, NodeRole};
pub use state::{GraphState, NodeState};
