//! Integration test utilities for the reference-safety verifier
//!
//! Builders for elaborated programs, so scenarios read close to the source
//! they stand for.

use anyhow::{Context, Result};
use rg_ops::{
    Binding, Block, Capture, CaptureMode, CompositeDef, ErrorKind, Expr, ExprKind, FieldDef,
    FieldInit, FunctionDef, FunctionKind, GlobalDef, IfBranch, Instantiation, Mutability,
    ParamDecl, Passing, PollutionDecl, Program, ReturnDecl, Signature, Stmt, StmtKind, Type,
};
use rg_span::Span;
use rg_verify::{VerifierConfig, VerifyReport, verify_program};
use std::path::Path;

/// Literal without references.
pub fn lit() -> Expr {
    Expr::new(ExprKind::Literal, Span::default())
}

/// Variable access.
pub fn name(name: &str) -> Expr {
    Expr::new(ExprKind::Name(name.to_string()), Span::default())
}

/// `base.field`
pub fn field(base: Expr, field: &str) -> Expr {
    Expr::new(
        ExprKind::Field {
            base: Box::new(base),
            field: field.to_string(),
        },
        Span::default(),
    )
}

/// `base[index]` on a tuple.
pub fn element(base: Expr, index: u32) -> Expr {
    Expr::new(
        ExprKind::TupleElement {
            base: Box::new(base),
            index,
        },
        Span::default(),
    )
}

/// `base[index]` on an array; `None` for a computed index.
pub fn index(base: Expr, index: Option<u64>) -> Expr {
    Expr::new(
        ExprKind::Index {
            base: Box::new(base),
            index,
        },
        Span::default(),
    )
}

/// `lhs op rhs`
pub fn binary(lhs: Expr, rhs: Expr) -> Expr {
    Expr::new(
        ExprKind::Binary {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        Span::default(),
    )
}

/// `callee(args...)`
pub fn call(callee: &str, args: Vec<Expr>) -> Expr {
    Expr::new(
        ExprKind::Call {
            callee: callee.to_string(),
            args,
        },
        Span::default(),
    )
}

/// `Ty { field: value, ... }`
pub fn construct(ty: &str, fields: Vec<(&str, Expr)>) -> Expr {
    Expr::new(
        ExprKind::Construct {
            ty: ty.to_string(),
            fields: fields
                .into_iter()
                .map(|(name, value)| FieldInit {
                    name: name.to_string(),
                    value,
                })
                .collect(),
        },
        Span::default(),
    )
}

/// `(elements...)`
pub fn tuple(elements: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::Tuple(elements), Span::default())
}

/// `move(name)`
pub fn move_out(name: &str) -> Expr {
    Expr::new(ExprKind::Move(name.to_string()), Span::default())
}

/// `take(place)`
pub fn take(place: Expr) -> Expr {
    Expr::new(ExprKind::Take(Box::new(place)), Span::default())
}

/// `select(cond ? then : otherwise)`
pub fn select(cond: Expr, then: Expr, otherwise: Expr) -> Expr {
    Expr::new(
        ExprKind::Select {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        },
        Span::default(),
    )
}

/// Closure capturing `(name, mode)` pairs.
pub fn closure(captures: Vec<(&str, CaptureMode)>) -> Expr {
    Expr::new(
        ExprKind::Closure {
            captures: captures
                .into_iter()
                .map(|(name, mode)| Capture {
                    name: name.to_string(),
                    mode,
                })
                .collect(),
        },
        Span::default(),
    )
}

fn stmt(kind: StmtKind) -> Stmt {
    Stmt::new(kind, Span::default())
}

/// Places a statement at `start..end`.
pub fn at(mut stmt: Stmt, start: u32, end: u32) -> Stmt {
    stmt.span = Span::new(start, end);
    stmt
}

fn let_binding(name: &str, binding: Binding, init: Expr) -> Stmt {
    stmt(StmtKind::Let {
        name: name.to_string(),
        binding,
        ty: None,
        init: Some(init),
    })
}

/// `let name = init`
pub fn let_value(name: &str, init: Expr) -> Stmt {
    let_binding(name, Binding::Value { mutable: false }, init)
}

/// `let mut name = init`
pub fn let_mut(name: &str, init: Expr) -> Stmt {
    let_binding(name, Binding::Value { mutable: true }, init)
}

/// `let &mut name = init`
pub fn let_ref_mut(name: &str, init: Expr) -> Stmt {
    let_binding(name, Binding::RefMut, init)
}

/// `let &name = init`
pub fn let_ref(name: &str, init: Expr) -> Stmt {
    let_binding(name, Binding::RefImut, init)
}

/// Decomposition of an immediate value into `names`.
pub fn decompose(names: &[&str], init: Expr) -> Stmt {
    stmt(StmtKind::Decompose {
        names: names.iter().map(ToString::to_string).collect(),
        init,
    })
}

/// Expression statement.
pub fn expr(expr: Expr) -> Stmt {
    stmt(StmtKind::Expr(expr))
}

/// `dst = src`
pub fn assign(dst: Expr, src: Expr) -> Stmt {
    stmt(StmtKind::Assign { dst, src })
}

/// `dst op= src`
pub fn compound_assign(dst: Expr, src: Expr) -> Stmt {
    stmt(StmtKind::CompoundAssign { dst, src })
}

/// Block of statements.
pub fn block(stmts: Vec<Stmt>) -> Block {
    Block::new(stmts, Span::default())
}

/// Nested scope.
pub fn scope(stmts: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::Block(block(stmts)))
}

/// `if cond { then }`
pub fn if_then(cond: Expr, then: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::If {
        branches: vec![IfBranch {
            cond,
            body: block(then),
        }],
        else_block: None,
    })
}

/// `if cond { then } else { otherwise }`
pub fn if_else(cond: Expr, then: Vec<Stmt>, otherwise: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::If {
        branches: vec![IfBranch {
            cond,
            body: block(then),
        }],
        else_block: Some(block(otherwise)),
    })
}

/// `while cond { body }`
pub fn while_loop(cond: Expr, body: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::While {
        cond,
        body: block(body),
    })
}

/// `loop { body }`
pub fn infinite_loop(body: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::Loop { body: block(body) })
}

/// `break`
pub fn break_loop() -> Stmt {
    stmt(StmtKind::Break)
}

/// `continue`
pub fn continue_loop() -> Stmt {
    stmt(StmtKind::Continue)
}

/// `return value`
pub fn ret(value: Option<Expr>) -> Stmt {
    stmt(StmtKind::Return(value))
}

/// `yield value`
pub fn yield_value(value: Expr) -> Stmt {
    stmt(StmtKind::Yield(value))
}

/// `halt`
pub fn halt() -> Stmt {
    stmt(StmtKind::Halt)
}

/// `with name = expr { body }`
pub fn with(name: &str, binding: Binding, expr: Expr, body: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::With {
        name: name.to_string(),
        binding,
        expr,
        body: block(body),
    })
}

/// Composite with reference field `x: &mutability Scalar` under tag `a`.
pub fn holder(name: &str, mutability: Mutability) -> CompositeDef {
    composite(
        name,
        vec![FieldDef::reference("x", mutability, Type::Scalar, "a")],
    )
}

/// Composite with the given fields.
pub fn composite(name: &str, fields: Vec<FieldDef>) -> CompositeDef {
    CompositeDef {
        name: name.to_string(),
        fields,
        has_destructor: false,
        span: Span::default(),
    }
}

/// Parameter passed by mutable reference under `tag`.
pub fn param_mut(name: &str, ty: Type, tag: &str) -> ParamDecl {
    ParamDecl::new(name, ty, Passing::RefMut).tagged(tag)
}

/// Parameter passed by immutable reference under `tag`.
pub fn param_ref(name: &str, ty: Type, tag: &str) -> ParamDecl {
    ParamDecl::new(name, ty, Passing::RefImut).tagged(tag)
}

/// Parameter passed by value.
pub fn param_value(name: &str, ty: Type) -> ParamDecl {
    ParamDecl::new(name, ty, Passing::Value)
}

/// Return by reference aliasing `tags`.
pub fn returns_ref(ty: Type, mutability: Mutability, tags: &[&str]) -> ReturnDecl {
    ReturnDecl {
        ty,
        passing: match mutability {
            Mutability::Mut => Passing::RefMut,
            Mutability::Imut => Passing::RefImut,
        },
        tags: tags.iter().map(ToString::to_string).collect(),
        inner_tags: Vec::new(),
    }
}

/// Return by value, inner tag `i` aliasing `inner_tags[i]`.
pub fn returns_value(ty: Type, inner_tags: &[&[&str]]) -> ReturnDecl {
    ReturnDecl {
        ty,
        passing: Passing::Value,
        tags: Vec::new(),
        inner_tags: inner_tags
            .iter()
            .map(|tags| tags.iter().map(ToString::to_string).collect())
            .collect(),
    }
}

/// `dst <- src`
pub fn pollution(dst: &str, src: &str) -> PollutionDecl {
    PollutionDecl {
        dst: dst.to_string(),
        src: src.to_string(),
    }
}

/// Builds functions of a [`Program`].
#[derive(Debug, Clone)]
pub struct FunctionBuilder {
    def: FunctionDef,
}

impl FunctionBuilder {
    /// Function without parameters returning nothing.
    pub fn new(name: &str) -> Self {
        Self {
            def: FunctionDef::prototype(name, Signature::default()),
        }
    }

    /// Adds a parameter.
    #[must_use]
    pub fn param(mut self, param: ParamDecl) -> Self {
        self.def.signature.params.push(param);
        self
    }

    /// Sets the return descriptor.
    #[must_use]
    pub fn returns(mut self, ret: ReturnDecl) -> Self {
        self.def.signature.ret = ret;
        self
    }

    /// Declares a pollution.
    #[must_use]
    pub fn pollutes(mut self, decl: PollutionDecl) -> Self {
        self.def.signature.pollution.push(decl);
        self
    }

    /// Sets the special role.
    #[must_use]
    pub fn kind(mut self, kind: FunctionKind) -> Self {
        self.def.kind = kind;
        self
    }

    /// Records the template instantiation the function comes from.
    #[must_use]
    pub fn instantiated(mut self, instantiation: Instantiation) -> Self {
        self.def.instantiation = Some(instantiation);
        self
    }

    /// Attaches a body.
    pub fn body(mut self, stmts: Vec<Stmt>) -> FunctionDef {
        self.def.body = Some(Block::new(stmts, Span::new(0, 1000)));
        self.def
    }

    /// Finishes a prototype.
    pub fn prototype(self) -> FunctionDef {
        self.def
    }
}

/// Builds a [`Program`].
#[derive(Debug, Clone, Default)]
pub struct ProgramBuilder {
    program: Program,
}

impl ProgramBuilder {
    /// Empty program.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a composite.
    #[must_use]
    pub fn composite(mut self, def: CompositeDef) -> Self {
        self.program.composites.push(def);
        self
    }

    /// Adds a global.
    #[must_use]
    pub fn global(mut self, name: &str, ty: Type, mutable: bool) -> Self {
        self.program.globals.push(GlobalDef {
            name: name.to_string(),
            ty,
            mutable,
        });
        self
    }

    /// Adds a function.
    #[must_use]
    pub fn function(mut self, def: FunctionDef) -> Self {
        self.program.functions.push(def);
        self
    }

    /// Adds `main` with `stmts` as its body.
    #[must_use]
    pub fn main(self, stmts: Vec<Stmt>) -> Self {
        self.function(FunctionBuilder::new("main").body(stmts))
    }

    /// Finishes the program.
    pub fn build(self) -> Program {
        self.program
    }
}

/// Verifies with the default configuration.
pub fn verify(program: &Program) -> VerifyReport {
    verify_program(program, &VerifierConfig::default())
}

/// Kinds of every diagnostic, in report order.
pub fn kinds(program: &Program) -> Vec<ErrorKind> {
    verify(program)
        .diagnostics
        .iter()
        .map(rg_verify::Diagnostic::kind)
        .collect()
}

/// Loads a JSON fixture from `tests/fixtures`.
///
/// # Errors
///
/// Returns an error if the fixture is missing or malformed
pub fn load_fixture(file: &str) -> Result<Program> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(file);
    Program::from_file(&path).with_context(|| format!("failed to load fixture {}", path.display()))
}
