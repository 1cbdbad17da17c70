//! Moves, uses after move and re-initialization.

use rg_ops::ErrorKind;
use verify_tests::*;

#[test]
fn test_use_after_move() {
    let program = ProgramBuilder::new()
        .main(vec![
            let_mut("x", lit()),
            let_value("y", move_out("x")),
            let_value("z", name("x")),
        ])
        .build();
    assert_eq!(kinds(&program), vec![ErrorKind::AccessingMovedVariable]);
}

#[test]
fn test_move_of_immutable_variable() {
    let program = ProgramBuilder::new()
        .main(vec![let_value("x", lit()), let_value("y", move_out("x"))])
        .build();
    assert_eq!(kinds(&program), vec![ErrorKind::ExpectedReferenceValue]);
}

#[test]
fn test_move_while_referenced() {
    let program = ProgramBuilder::new()
        .main(vec![
            let_mut("x", lit()),
            let_ref("a", name("x")),
            let_value("y", move_out("x")),
        ])
        .build();
    assert_eq!(kinds(&program), vec![ErrorKind::MovedVariableHasReferences]);
}

#[test]
fn test_conditional_move() {
    let program = ProgramBuilder::new()
        .main(vec![
            let_mut("x", lit()),
            if_then(lit(), vec![let_value("y", move_out("x"))]),
        ])
        .build();
    assert_eq!(kinds(&program), vec![ErrorKind::ConditionalMove]);
}

#[test]
fn test_move_in_every_branch() {
    let program = ProgramBuilder::new()
        .main(vec![
            let_mut("x", lit()),
            if_else(
                lit(),
                vec![let_value("y", move_out("x"))],
                vec![let_value("z", move_out("x"))],
            ),
        ])
        .build();
    assert!(kinds(&program).is_empty());
}

#[test]
fn test_assignment_reinitializes() {
    let program = ProgramBuilder::new()
        .main(vec![
            let_mut("x", lit()),
            let_value("y", move_out("x")),
            assign(name("x"), lit()),
            let_value("z", name("x")),
        ])
        .build();
    assert!(kinds(&program).is_empty());
}

#[test]
fn test_move_inside_loop() {
    let program = ProgramBuilder::new()
        .main(vec![
            let_mut("x", lit()),
            while_loop(lit(), vec![let_value("y", move_out("x"))]),
        ])
        .build();
    let report = verify(&program);
    assert!(report.has(ErrorKind::OuterVariableMoveInsideLoop));
}

#[test]
fn test_decompose_immediate_tuple() {
    let program = ProgramBuilder::new()
        .main(vec![decompose(&["a", "b"], tuple(vec![lit(), lit()]))])
        .build();
    assert!(kinds(&program).is_empty());
}

#[test]
fn test_decompose_named_tuple() {
    let program = ProgramBuilder::new()
        .main(vec![
            let_value("t", tuple(vec![lit(), lit()])),
            decompose(&["a", "b"], name("t")),
        ])
        .build();
    assert_eq!(
        kinds(&program),
        vec![ErrorKind::ImmediateValueExpectedInDecomposeDeclaration]
    );
}
