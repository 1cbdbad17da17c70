//! Function bodies as a tree of elaborated operations.

use crate::types::{Name, Type};
use rg_span::Span;
use serde::{Deserialize, Serialize};

/// A lexical scope. Variables declared inside are destroyed at its end.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Statements in order
    #[serde(default)]
    pub stmts: Vec<Stmt>,
    /// Location of the whole block; its end is where destruction happens
    #[serde(default)]
    pub span: Span,
}

impl Block {
    /// Block with the given statements.
    pub fn new(stmts: Vec<Stmt>, span: Span) -> Self {
        Self { stmts, span }
    }
}

/// How a declared name is bound.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Binding {
    /// A value variable
    Value {
        /// Whether the variable may be modified
        #[serde(default)]
        mutable: bool,
    },
    /// A mutable reference to the initializer
    RefMut,
    /// An immutable reference to the initializer
    RefImut,
}

/// A statement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    /// What the statement does
    pub kind: StmtKind,
    /// Location
    #[serde(default)]
    pub span: Span,
}

impl Stmt {
    /// Statement at a location.
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Statement kinds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StmtKind {
    /// Variable declaration or reference binding
    Let {
        /// Declared name
        name: Name,
        /// Value or reference binding
        binding: Binding,
        /// Declared type; inferred from `init` when absent
        #[serde(default)]
        ty: Option<Type>,
        /// Initializer
        #[serde(default)]
        init: Option<Expr>,
    },
    /// Splits an immediate composite or tuple value into new variables
    Decompose {
        /// One name per field or element
        names: Vec<Name>,
        /// Immediate value being split
        init: Expr,
    },
    /// Expression evaluated for its effects
    Expr(Expr),
    /// `dst = src`
    Assign {
        /// Place written
        dst: Expr,
        /// Value stored
        src: Expr,
    },
    /// `dst op= src`; `dst` is pinned while `src` is evaluated
    CompoundAssign {
        /// Place updated
        dst: Expr,
        /// Operand
        src: Expr,
    },
    /// Nested scope
    Block(Block),
    /// `if`/`else if`/`else` chain
    If {
        /// Conditional branches in order
        branches: Vec<IfBranch>,
        /// Final `else`
        #[serde(default)]
        else_block: Option<Block>,
    },
    /// `while cond { body }`
    While {
        /// Condition evaluated before every iteration
        cond: Expr,
        /// Loop body
        body: Block,
    },
    /// Unconditional loop
    Loop {
        /// Loop body
        body: Block,
    },
    /// Leaves the innermost loop
    Break,
    /// Jumps to the next iteration of the innermost loop
    Continue,
    /// Leaves the function
    Return(Option<Expr>),
    /// Suspends a generator with a value
    Yield(Expr),
    /// Aborts execution; nothing after it runs
    Halt,
    /// Scoped binding: `expr` stays bound to `name` for the body
    With {
        /// Bound name
        name: Name,
        /// Value or reference binding
        binding: Binding,
        /// Bound expression
        expr: Expr,
        /// Body executed with the binding alive
        body: Block,
    },
}

/// One `if` arm.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IfBranch {
    /// Condition
    pub cond: Expr,
    /// Body executed when the condition holds
    pub body: Block,
}

/// An expression.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    /// What the expression computes
    pub kind: ExprKind,
    /// Location
    #[serde(default)]
    pub span: Span,
}

impl Expr {
    /// Expression at a location.
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// How a closure captures a variable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    /// Copy of the variable
    Value,
    /// Mutable reference
    RefMut,
    /// Immutable reference
    RefImut,
}

/// One closure capture.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capture {
    /// Captured variable
    pub name: Name,
    /// Capture mode
    pub mode: CaptureMode,
}

/// Field initializer of a [`ExprKind::Construct`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldInit {
    /// Field name
    pub name: Name,
    /// Initial value; for reference fields, the referenced place
    pub value: Expr,
}

/// Expression kinds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExprKind {
    /// Constant without references
    Literal,
    /// Local variable, parameter or global
    Name(Name),
    /// `base.field`
    Field {
        /// Accessed object
        base: Box<Expr>,
        /// Field name
        field: Name,
    },
    /// `base[index]` on a tuple
    TupleElement {
        /// Accessed tuple
        base: Box<Expr>,
        /// Element index
        index: u32,
    },
    /// `base[index]` on an array; `None` for an index only known at runtime
    Index {
        /// Accessed array
        base: Box<Expr>,
        /// Constant index
        #[serde(default)]
        index: Option<u64>,
    },
    /// Arithmetic or comparison; reads both operands
    Binary {
        /// Left operand
        lhs: Box<Expr>,
        /// Right operand
        rhs: Box<Expr>,
    },
    /// Call of a resolved function
    Call {
        /// Function name
        callee: Name,
        /// Arguments in parameter order
        #[serde(default)]
        args: Vec<Expr>,
    },
    /// Struct construction
    Construct {
        /// Composite name
        ty: Name,
        /// Field initializers
        #[serde(default)]
        fields: Vec<FieldInit>,
    },
    /// Tuple construction
    Tuple(Vec<Expr>),
    /// `move(name)`
    Move(Name),
    /// `take(expr)`: copies out, leaving the source in place
    Take(Box<Expr>),
    /// `select(cond ? then : otherwise)`
    Select {
        /// Condition
        cond: Box<Expr>,
        /// Value if true
        then: Box<Expr>,
        /// Value if false
        otherwise: Box<Expr>,
    },
    /// Closure object creation
    Closure {
        /// Captured variables
        #[serde(default)]
        captures: Vec<Capture>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_json() {
        let stmt: Stmt = serde_json::from_str(
            r#"{
                "kind": {"let": {
                    "name": "r",
                    "binding": "ref_mut",
                    "init": {"kind": {"field": {"base": {"kind": {"name": "s"}}, "field": "a"}}}
                }},
                "span": {"start": 3, "end": 9}
            }"#,
        )
        .unwrap();
        let StmtKind::Let { binding, init, .. } = stmt.kind else {
            panic!("expected a let statement");
        };
        assert_eq!(binding, Binding::RefMut);
        assert!(matches!(init.unwrap().kind, ExprKind::Field { .. }));
        assert_eq!(stmt.span, Span::new(3, 9));
    }

    #[test]
    fn test_unit_statements() {
        let block: Block =
            serde_json::from_str(r#"{"stmts": [{"kind": "break"}, {"kind": {"return": null}}]}"#)
                .unwrap();
        assert_eq!(block.stmts[0].kind, StmtKind::Break);
        assert_eq!(block.stmts[1].kind, StmtKind::Return(None));
    }
}
