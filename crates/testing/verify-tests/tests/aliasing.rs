//! Exclusivity of mutable references to locals and their fields.

use rg_ops::{CaptureMode, ErrorKind, FieldDef, Mutability, Type};
use verify_tests::*;

fn pair() -> rg_ops::CompositeDef {
    composite(
        "Pair",
        vec![
            FieldDef::value("x", Type::Scalar),
            FieldDef::value("y", Type::Scalar),
        ],
    )
}

#[test]
fn test_two_mutable_references() {
    let program = ProgramBuilder::new()
        .main(vec![
            let_mut("x", lit()),
            let_ref_mut("a", name("x")),
            let_ref_mut("b", name("x")),
        ])
        .build();
    assert_eq!(kinds(&program), vec![ErrorKind::ReferenceProtectionError]);
}

#[test]
fn test_write_while_referenced() {
    let program = ProgramBuilder::new()
        .main(vec![
            let_mut("x", lit()),
            let_ref("a", name("x")),
            assign(name("x"), lit()),
        ])
        .build();
    assert_eq!(kinds(&program), vec![ErrorKind::ReferenceProtectionError]);
}

#[test]
fn test_reference_ends_with_its_scope() {
    let program = ProgramBuilder::new()
        .main(vec![
            let_mut("x", lit()),
            scope(vec![let_ref_mut("a", name("x"))]),
            let_ref_mut("b", name("x")),
        ])
        .build();
    assert!(kinds(&program).is_empty());
}

#[test]
fn test_disjoint_fields() {
    let program = ProgramBuilder::new()
        .composite(pair())
        .main(vec![
            let_mut("p", construct("Pair", vec![("x", lit()), ("y", lit())])),
            let_ref_mut("a", field(name("p"), "x")),
            let_ref_mut("b", field(name("p"), "y")),
        ])
        .build();
    assert!(kinds(&program).is_empty());
}

#[test]
fn test_whole_object_conflicts_with_field() {
    let program = ProgramBuilder::new()
        .composite(pair())
        .main(vec![
            let_mut("p", construct("Pair", vec![("x", lit()), ("y", lit())])),
            let_ref_mut("a", field(name("p"), "x")),
            let_ref_mut("b", field(name("p"), "y")),
            let_ref("c", name("p")),
        ])
        .build();
    assert_eq!(kinds(&program), vec![ErrorKind::ReferenceProtectionError]);
}

#[test]
fn test_holder_outlives_referenced_local() {
    let program = ProgramBuilder::new()
        .composite(holder("Holder", Mutability::Mut))
        .main(vec![
            let_mut("y", lit()),
            let_mut("h", construct("Holder", vec![("x", name("y"))])),
            scope(vec![
                let_mut("z", lit()),
                assign(name("h"), construct("Holder", vec![("x", name("z"))])),
            ]),
        ])
        .build();
    assert_eq!(
        kinds(&program),
        vec![ErrorKind::DestroyedVariableStillHasReferences]
    );
}

#[test]
fn test_closure_capture_keeps_reference() {
    let program = ProgramBuilder::new()
        .main(vec![
            let_mut("x", lit()),
            let_value("c", closure(vec![("x", CaptureMode::RefMut)])),
            let_ref("b", name("x")),
        ])
        .build();
    assert_eq!(kinds(&program), vec![ErrorKind::ReferenceProtectionError]);
}

#[test]
fn test_select_references_both_places() {
    let program = ProgramBuilder::new()
        .main(vec![
            let_mut("x", lit()),
            let_mut("y", lit()),
            let_ref_mut("r", select(lit(), name("x"), name("y"))),
            let_ref("b", name("x")),
        ])
        .build();
    assert_eq!(kinds(&program), vec![ErrorKind::ReferenceProtectionError]);
}

#[test]
fn test_take_of_referenced_variable() {
    let program = ProgramBuilder::new()
        .main(vec![
            let_mut("x", lit()),
            let_ref("a", name("x")),
            let_value("y", take(name("x"))),
        ])
        .build();
    assert_eq!(kinds(&program), vec![ErrorKind::ReferenceProtectionError]);
}

#[test]
fn test_scalar_compound_assign() {
    let program = ProgramBuilder::new()
        .main(vec![
            let_mut("x", lit()),
            compound_assign(name("x"), name("x")),
        ])
        .build();
    assert!(kinds(&program).is_empty());
}

#[test]
fn test_unknown_variable() {
    let program = ProgramBuilder::new()
        .main(vec![let_value("y", name("z"))])
        .build();
    assert_eq!(kinds(&program), vec![ErrorKind::NameNotFound]);
}
