//! Reference notation for composite types and function signatures.
//!
//! Reference tags are the only information the verifier has about what a
//! function may do with the references passed to it, and about how the
//! reference fields of a composite relate to each other. This crate turns the
//! declared notation into indexed, validated form.
//!
//! # Architecture
//!
//! - [`TypeTable`]: per-composite inner tag layouts, with second-order checks
//! - [`TagShape`]: mutability of one inner tag, and of its second-order
//!   reference if it has one
//! - [`ResolvedSignature`]: parameters, return references and pollution
//!   expressed as [`ParamReference`]s
//!
//! # Limitations
//!
//! - Reference indirection is limited to depth two: a reference field may
//!   point to a composite whose references are first-order only
//! - A reference tag on a by-value parameter carries no meaning and is ignored

mod error;
mod layout;
mod signature;
mod tags;

pub use error::{NotationError, NotationResult};
pub use layout::{CompositeLayout, FieldInfo, FieldLayout, TypeTable};
pub use signature::{resolve_signature, ResolvedParam, ResolvedSignature, ReturnShape};
pub use tags::{ParamReference, ParamTag, PollutionPair, TagShape};
