//! References to objects that themselves hold references.

use rg_ops::{ErrorKind, FieldDef, Mutability, Program, Type};
use verify_tests::*;

/// `Outer { h: &imut Inner }` where `Inner` holds a `holder_mutability`
/// reference, and `f(a: &imut Outer, b: &imut Outer)`.
fn make_program(holder_mutability: Mutability) -> Program {
    ProgramBuilder::new()
        .composite(holder("Inner", holder_mutability))
        .composite(composite(
            "Outer",
            vec![FieldDef::reference(
                "h",
                Mutability::Imut,
                Type::composite("Inner"),
                "b",
            )],
        ))
        .function(
            FunctionBuilder::new("f")
                .param(param_ref("a", Type::composite("Outer"), "p"))
                .param(param_ref("b", Type::composite("Outer"), "q"))
                .prototype(),
        )
        .main(vec![
            let_mut("z", lit()),
            let_mut("h", construct("Inner", vec![("x", name("z"))])),
            let_value("o", construct("Outer", vec![("h", name("h"))])),
            expr(call("f", vec![name("o"), name("o")])),
        ])
        .build()
}

#[test]
fn test_mutable_second_order_reference_passed_twice() {
    assert_eq!(
        kinds(&make_program(Mutability::Mut)),
        vec![ErrorKind::ReferenceProtectionError]
    );
}

#[test]
fn test_immutable_second_order_reference_passed_twice() {
    assert!(kinds(&make_program(Mutability::Imut)).is_empty());
}

#[test]
fn test_second_order_reference_returned() {
    let program = ProgramBuilder::new()
        .composite(holder("Inner", Mutability::Mut))
        .composite(composite(
            "Outer",
            vec![FieldDef::reference(
                "h",
                Mutability::Imut,
                Type::composite("Inner"),
                "b",
            )],
        ))
        .function(
            FunctionBuilder::new("make")
                .returns(returns_value(Type::composite("Outer"), &[]))
                .body(vec![
                    let_mut("z", lit()),
                    let_mut("h", construct("Inner", vec![("x", name("z"))])),
                    ret(Some(construct("Outer", vec![("h", name("h"))]))),
                ]),
        )
        .build();
    assert!(verify(&program).has(ErrorKind::ReturningUnallowedReference));
}

fn make_nested(tail: Vec<rg_ops::Stmt>) -> Program {
    let mut main = vec![
        let_mut("x", lit()),
        let_mut("a", construct("A", vec![("x", name("x"))])),
        let_value("b", construct("B", vec![("a", name("a"))])),
        let_ref("r1", field(name("b"), "a")),
        let_ref("r2", field(name("b"), "a")),
    ];
    main.extend(tail);
    ProgramBuilder::new()
        .composite(holder("A", Mutability::Mut))
        .composite(composite(
            "B",
            vec![FieldDef::reference(
                "a",
                Mutability::Imut,
                Type::composite("A"),
                "t",
            )],
        ))
        .main(main)
        .build()
}

#[test]
fn test_shared_views_through_second_order_field() {
    assert!(kinds(&make_nested(Vec::new())).is_empty());
}

#[test]
fn test_write_behind_second_order_field() {
    let program = make_nested(vec![assign(name("x"), lit())]);
    assert!(verify(&program).has(ErrorKind::ReferenceProtectionError));
}
