//! Branches, loops, jumps and the states they merge.

use rg_ops::{Binding, ErrorKind, Mutability, Program};
use rg_verify::{VerifierConfig, verify_program};
use verify_tests::*;

#[test]
fn test_statement_after_return() {
    let program = ProgramBuilder::new()
        .main(vec![ret(None), expr(lit())])
        .build();
    assert_eq!(kinds(&program), vec![ErrorKind::UnreachableCode]);
}

#[test]
fn test_statement_after_halt() {
    let program = ProgramBuilder::new()
        .main(vec![halt(), let_value("x", lit())])
        .build();
    assert_eq!(kinds(&program), vec![ErrorKind::UnreachableCode]);
}

#[test]
fn test_unreachable_code_can_be_silenced() {
    let program = ProgramBuilder::new()
        .main(vec![ret(None), expr(lit())])
        .build();
    let config = VerifierConfig {
        report_unreachable_code: false,
        ..VerifierConfig::default()
    };
    assert!(verify_program(&program, &config).is_ok());
}

#[test]
fn test_break_outside_loop() {
    let program = ProgramBuilder::new().main(vec![break_loop()]).build();
    assert_eq!(kinds(&program), vec![ErrorKind::BreakOutsideLoop]);
}

#[test]
fn test_continue_outside_loop() {
    let program = ProgramBuilder::new().main(vec![continue_loop()]).build();
    assert_eq!(kinds(&program), vec![ErrorKind::BreakOutsideLoop]);
}

#[test]
fn test_break_destroys_loop_scope() {
    let program = ProgramBuilder::new()
        .main(vec![
            let_mut("x", lit()),
            infinite_loop(vec![let_ref_mut("a", name("x")), break_loop()]),
            let_ref_mut("b", name("x")),
        ])
        .build();
    assert!(kinds(&program).is_empty());
}

#[test]
fn test_with_binding_ends_with_body() {
    let program = ProgramBuilder::new()
        .main(vec![
            let_mut("x", lit()),
            with("r", Binding::RefMut, name("x"), vec![expr(name("r"))]),
            let_ref_mut("b", name("x")),
        ])
        .build();
    assert!(kinds(&program).is_empty());
}

#[test]
fn test_with_binding_is_alive_in_body() {
    let program = ProgramBuilder::new()
        .main(vec![
            let_mut("x", lit()),
            with(
                "r",
                Binding::RefMut,
                name("x"),
                vec![let_ref("b", name("x"))],
            ),
        ])
        .build();
    assert_eq!(kinds(&program), vec![ErrorKind::ReferenceProtectionError]);
}

#[test]
fn test_error_limit() {
    let program = ProgramBuilder::new()
        .main(vec![
            at(expr(name("a")), 0, 1),
            at(expr(name("b")), 2, 3),
            at(expr(name("c")), 4, 5),
        ])
        .build();
    assert_eq!(kinds(&program).len(), 3);

    let config = VerifierConfig {
        error_limit: Some(1),
        ..VerifierConfig::default()
    };
    assert_eq!(verify_program(&program, &config).diagnostics.len(), 1);
}

#[test]
fn test_branches_conflict_after_merge() {
    let program = ProgramBuilder::new()
        .composite(holder("HM", Mutability::Mut))
        .composite(holder("HI", Mutability::Imut))
        .main(vec![
            let_mut("a", lit()),
            let_mut("b", lit()),
            let_mut("c", lit()),
            let_mut("hm", construct("HM", vec![("x", name("b"))])),
            let_mut("hi", construct("HI", vec![("x", name("c"))])),
            if_else(
                lit(),
                vec![assign(name("hm"), construct("HM", vec![("x", name("a"))]))],
                vec![assign(name("hi"), construct("HI", vec![("x", name("a"))]))],
            ),
        ])
        .build();
    assert_eq!(kinds(&program), vec![ErrorKind::ReferenceProtectionError]);
}

#[test]
fn test_branches_agreeing_after_merge() {
    let program = ProgramBuilder::new()
        .composite(holder("HI", Mutability::Imut))
        .main(vec![
            let_mut("a", lit()),
            let_mut("b", lit()),
            let_mut("h1", construct("HI", vec![("x", name("b"))])),
            let_mut("h2", construct("HI", vec![("x", name("b"))])),
            if_else(
                lit(),
                vec![assign(name("h1"), construct("HI", vec![("x", name("a"))]))],
                vec![assign(name("h2"), construct("HI", vec![("x", name("a"))]))],
            ),
        ])
        .build();
    assert!(kinds(&program).is_empty());
}

fn make_store_then_read(looped: bool) -> Program {
    let body = vec![
        let_value("v", name("b")),
        assign(name("q"), construct("HM", vec![("x", name("b"))])),
    ];
    let mut main = vec![
        let_mut("a", lit()),
        let_mut("b", lit()),
        let_mut("q", construct("HM", vec![("x", name("a"))])),
    ];
    if looped {
        main.push(while_loop(lit(), body));
    } else {
        main.extend(body);
    }
    ProgramBuilder::new()
        .composite(holder("HM", Mutability::Mut))
        .main(main)
        .build()
}

#[test]
fn test_loop_conflict_found_on_second_iteration() {
    assert!(kinds(&make_store_then_read(false)).is_empty());

    let report = verify(&make_store_then_read(true));
    assert!(report.has(ErrorKind::ReferencePollutionOfOuterLoopVariable));
    assert!(report.has(ErrorKind::ReferenceProtectionError));
}

/// Each iteration moves what `p` references one holder further down the
/// `p`, `q`, `r` chain, so the loop needs three passes to settle.
fn make_rotation() -> Program {
    ProgramBuilder::new()
        .composite(holder("HI", Mutability::Imut))
        .main(vec![
            let_value("a", lit()),
            let_value("c", lit()),
            let_mut("p", construct("HI", vec![("x", name("a"))])),
            let_mut("q", construct("HI", vec![("x", name("a"))])),
            let_mut("r", construct("HI", vec![("x", name("a"))])),
            while_loop(
                lit(),
                vec![
                    assign(name("r"), name("q")),
                    let_value("t", take(name("q"))),
                    assign(name("q"), name("p")),
                    assign(name("p"), construct("HI", vec![("x", name("c"))])),
                ],
            ),
        ])
        .build()
}

#[test]
fn test_loop_iteration_cap() {
    let program = make_rotation();
    let full = verify(&program);
    assert_eq!(full.functions_verified, 1);
    assert!(full.has(ErrorKind::ReferencePollutionOfOuterLoopVariable));

    let config = VerifierConfig {
        max_loop_iterations: 2,
        ..VerifierConfig::default()
    };
    let capped = verify_program(&program, &config);
    assert_eq!(capped.functions_verified, 1);
    assert_eq!(capped.diagnostics, full.diagnostics);
}
