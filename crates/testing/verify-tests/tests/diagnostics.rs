//! Rendered diagnostics, instantiation trails and error limits.

use expect_test::expect;
use rg_ops::{Instantiation, Program, TemplateArg};
use rg_span::Span;
use std::fmt::Write;
use verify_tests::*;

fn make_program() -> Program {
    let instantiation = Instantiation {
        template: "swap".to_string(),
        args: vec![TemplateArg {
            param: "T".to_string(),
            value: "Holder".to_string(),
        }],
        span: Span::new(5, 9),
        parent: None,
    };
    ProgramBuilder::new()
        .function(
            FunctionBuilder::new("swap")
                .instantiated(instantiation)
                .body(vec![ret(None), at(expr(lit()), 20, 30)]),
        )
        .build()
}

#[test]
fn test_display_with_instantiation_trail() {
    let mut output = String::new();
    for diagnostic in verify(&make_program()).diagnostics {
        writeln!(output, "{diagnostic}").unwrap();
    }
    expect![[r#"
        error[UnreachableCode] at 20..30 in `swap`: unreachable code
          note: in instantiation of `swap` with T = Holder (at 5..9)
    "#]]
    .assert_eq(&output);
}

#[test]
fn test_json_records() {
    let records: Vec<_> = verify(&make_program())
        .diagnostics
        .iter()
        .map(rg_verify::Diagnostic::to_record)
        .collect();
    let json = serde_json::to_string(&records).unwrap();
    expect![[r#"[{"kind":"UnreachableCode","function":"swap","start":20,"end":30,"message":"unreachable code","trail":[{"description":"`swap` with T = Holder","span":{"start":5,"end":9}}]}]"#]]
    .assert_eq(&json);
}

#[test]
fn test_rendered_against_source() {
    let source = format!("{}\n", "x".repeat(40));
    let output = rg_verify::render_diagnostics("swap.rg", &source, &verify(&make_program()).diagnostics);
    assert!(output.contains("unreachable code"));
    assert!(output.contains("swap.rg"));
    assert!(output.contains("in instantiation of `swap` with T = Holder"));
}
