//! Elaborated operations consumed by the reference-safety verifier.
//!
//! This crate is the boundary between the surrounding compiler and the
//! verifier. Everything in it is already resolved: names refer to declared
//! locals, globals, composites and functions, every generic has been
//! instantiated, and overloads have been chosen.
//!
//! # Contents
//!
//! - [`Type`], [`CompositeDef`], [`FieldDef`]: the type shapes the verifier
//!   needs (which fields are references, and under which tags)
//! - [`Signature`], [`FunctionDef`]: reference notation of functions
//! - [`Block`], [`Stmt`], [`Expr`]: the operation stream of a function body
//! - [`ErrorKind`]: every diagnostic kind the verifier can produce
//!
//! Programs can be loaded from JSON with [`Program::from_json_str`].

mod body;
mod error_kind;
mod program;
mod signature;
mod types;

pub use body::{
    Binding, Block, Capture, CaptureMode, Expr, ExprKind, FieldInit, IfBranch, Stmt, StmtKind,
};
pub use error_kind::{ErrorGroup, ErrorKind};
pub use program::{GlobalDef, LoadError, Program};
pub use signature::{
    FunctionDef, FunctionKind, Instantiation, ParamDecl, Passing, PollutionDecl, ReturnDecl,
    Signature, TemplateArg,
};
pub use types::{CompositeDef, FieldDef, Mutability, Name, Type};
