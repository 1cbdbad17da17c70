//! Programs loaded from JSON, the format the command line tool reads.

use rg_ops::ErrorKind;
use rg_verify::{VerifierConfig, verify_program};
use std::path::Path;
use verify_tests::*;

#[test]
fn test_safe_fixture() {
    let program = load_fixture("shared_references.json").unwrap();
    let report = verify(&program);
    assert!(report.is_ok(), "{:?}", report.diagnostics);
    assert_eq!(report.functions_verified, 2);
}

#[test]
fn test_dangling_fixture() {
    let program = load_fixture("dangling_holder.json").unwrap();
    assert_eq!(
        kinds(&program),
        vec![ErrorKind::DestroyedVariableStillHasReferences]
    );
}

#[test]
fn test_missing_fixture() {
    assert!(load_fixture("missing.json").is_err());
}

#[test]
fn test_fixture_config() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("refgraph.toml");
    let config = VerifierConfig::from_file(&path).unwrap();
    assert_eq!(config.max_loop_iterations, 4);
    assert!(!config.report_unreachable_code);

    let program = ProgramBuilder::new()
        .main(vec![ret(None), expr(lit())])
        .build();
    assert!(verify_program(&program, &config).is_ok());
}
