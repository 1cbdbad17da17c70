//! Compile-time reference-safety verification of elaborated function bodies.
//!
//! Each function body is walked statement by statement while a
//! [`rg_graph::ReferencesGraph`] tracks which storage every live reference
//! points to. Signatures are trusted: a call is checked against the notation
//! of the callee only, so functions are verified independently.
//!
//! # Architecture
//!
//! - `verifier`: entry points and per-function state (parameters, globals,
//!   temporaries, node helpers)
//! - `access`: evaluating expressions to graph nodes
//! - `call`: argument references, result links, declared pollution,
//!   second-order locks
//! - `control`: bindings, assignment, `if` merges, loops iterated to a
//!   fixed point, `break`/`continue`/`return`
//! - `escape`: returned references and parameter pollution at exit points
//! - [`Diagnostic`]: an error with its function and instantiation trail
//!
//! # Limitations
//!
//! - Loops are iterated at most [`VerifierConfig::max_loop_iterations`] times
//! - An index that is not a constant addresses the whole array
//! - Only declared pollution is synthesized for calls
//!
//! # Examples
//!
//! ```rust
//! use rg_ops::Program;
//! use rg_verify::{verify_program, VerifierConfig};
//!
//! let report = verify_program(&Program::default(), &VerifierConfig::default());
//! assert!(report.is_ok());
//! ```

mod access;
mod call;
mod config;
mod context;
mod control;
mod diagnostic;
mod error;
mod escape;
mod scope;
mod verifier;

pub use config::{ConfigError, VerifierConfig};
pub use diagnostic::{render_diagnostics, Diagnostic, DiagnosticRecord, InstantiationFrame};
pub use error::VerifyError;
pub use verifier::{verify_function, verify_program, Verifier, VerifyReport, VerifyResult};

#[cfg(test)]
mod tests {
    use super::*;
    use rg_ops::{
        Binding, Block, ErrorKind, Expr, ExprKind, FunctionDef, ParamDecl, Passing, Program,
        ReturnDecl, Signature, Stmt, StmtKind, Type,
    };
    use rg_span::{FileId, Span};

    fn make_expr(kind: ExprKind) -> Expr {
        Expr::new(kind, Span::default())
    }

    fn make_name(name: &str) -> Expr {
        make_expr(ExprKind::Name(name.to_string()))
    }

    fn make_let(name: &str, binding: Binding, init: Expr) -> Stmt {
        Stmt::new(
            StmtKind::Let {
                name: name.to_string(),
                binding,
                ty: None,
                init: Some(init),
            },
            Span::default(),
        )
    }

    fn make_program(signature: Signature, stmts: Vec<Stmt>) -> Program {
        Program {
            functions: vec![
                FunctionDef::prototype("main", signature)
                    .with_body(Block::new(stmts, Span::new(0, 100))),
            ],
            ..Program::default()
        }
    }

    fn make_kinds(program: &Program) -> Vec<ErrorKind> {
        verify_program(program, &VerifierConfig::default())
            .diagnostics
            .iter()
            .map(Diagnostic::kind)
            .collect()
    }

    #[test]
    fn test_shared_references_coexist() {
        let program = make_program(
            Signature::default(),
            vec![
                make_let("x", Binding::Value { mutable: true }, make_expr(ExprKind::Literal)),
                make_let("a", Binding::RefImut, make_name("x")),
                make_let("b", Binding::RefImut, make_name("x")),
            ],
        );
        assert!(make_kinds(&program).is_empty());
    }

    #[test]
    fn test_second_mutable_reference() {
        let program = make_program(
            Signature::default(),
            vec![
                make_let("x", Binding::Value { mutable: true }, make_expr(ExprKind::Literal)),
                make_let("a", Binding::RefMut, make_name("x")),
                make_let("b", Binding::RefImut, make_name("x")),
            ],
        );
        assert_eq!(make_kinds(&program), vec![ErrorKind::ReferenceProtectionError]);
    }

    #[test]
    fn test_returning_parameter_reference() {
        let signature = Signature {
            params: vec![ParamDecl::new("p", Type::Scalar, Passing::RefImut).tagged("a")],
            ret: ReturnDecl {
                ty: Type::Scalar,
                passing: Passing::RefImut,
                tags: vec!["a".to_string()],
                inner_tags: Vec::new(),
            },
            ..Signature::default()
        };
        let ret = Stmt::new(StmtKind::Return(Some(make_name("p"))), Span::default());
        assert!(make_kinds(&make_program(signature, vec![ret])).is_empty());
    }

    #[test]
    fn test_diagnostics_point_into_configured_file() {
        let program = make_program(
            Signature::default(),
            vec![
                make_let("x", Binding::Value { mutable: true }, make_expr(ExprKind::Literal)),
                make_let("a", Binding::RefMut, make_name("x")),
                make_let("b", Binding::RefMut, make_name("x")),
            ],
        );
        let report = Verifier::new(VerifierConfig::default())
            .with_file(FileId::new(3))
            .verify_program(&program);
        let errors = report.into_result().expect_err("conflicting references");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error.span().file, FileId::new(3));

        let clean = make_program(Signature::default(), Vec::new());
        assert_eq!(
            Verifier::default().verify_program(&clean).into_result(),
            Ok(())
        );
    }

    #[test]
    fn test_unknown_function() {
        let errors = verify_function(&Program::default(), "missing", &VerifierConfig::default())
            .expect_err("unknown function");
        assert_eq!(errors[0].kind(), ErrorKind::NameNotFound);
    }
}
