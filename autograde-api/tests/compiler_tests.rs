//! Compile and load tests

mod common;

use autograde_api::{
    infer_entry_name, GraderConfig, GradingError, GradingSession, NativeFileSystem, SourceUnit, Ty, Value,
    VirtualFileSystem,
};
use common::Harness;
use std::sync::Arc;

#[test]
fn test_name_inference_ignores_comments_and_strings() {
    let source = r#"
// public class Decoy {}
/* public class Other { } */
class Helper { String s = "public class Fake {"; }
public final class Real {
    char c = '{';
}
"#;
    assert_eq!(infer_entry_name(source).as_deref(), Some("Real"));
    let harness = Harness::new();
    let unit = harness.compile(source);
    assert_eq!(unit.entry_name, "Real");
}

#[test]
fn test_missing_public_class() {
    let harness = Harness::new();
    let err = harness
        .session
        .compile_source(SourceUnit::from_memory("class OnlyPackagePrivate {}"))
        .unwrap_err();
    assert_eq!(err.kind(), "NameInferenceFailed");
}

#[test]
fn test_compile_failure_report_has_position() {
    let harness = Harness::new();
    let err = harness
        .session
        .compile_source(SourceUnit::from_memory("public class Broken {\n  int f() { return 1 }\n}"))
        .unwrap_err();
    let GradingError::CompileFailure { diagnostics } = &err else {
        panic!("expected compile failure, got {err:?}");
    };
    assert!(!diagnostics.is_empty());
    let report = err.to_report();
    assert_eq!(report.kind, "CompileFailure");
    assert_eq!(report.line, Some(2));
}

#[test]
fn test_package_declaration_keeps_line_numbers() {
    let source = "package student.hw1;\n\npublic class Lines {\n    public static int boom() {\n        return 1 / 0;\n    }\n}\n";
    let harness = Harness::new();
    let unit = harness.compile(source);
    assert_ne!(unit.namespace(), "student.hw1");
    let mut attempt = harness.session.attempt(&unit).unwrap();
    let report = attempt.call(None, "boom", vec![], None).unwrap();
    let report = report.outcome.to_report().unwrap();
    assert_eq!(report.line, Some(5));
}

#[test]
fn test_fresh_loader_resets_static_state() {
    let source = r#"
public class Counter {
    private static int count;
    public static int next() { count++; return count; }
}
"#;
    let harness = Harness::new();
    let unit = harness.compile(source);
    for _ in 0..2 {
        let mut attempt = harness.session.attempt(&unit).unwrap();
        let first = attempt.call(None, "next", vec![], Some(Ty::Int)).unwrap();
        let second = attempt.call(None, "next", vec![], Some(Ty::Int)).unwrap();
        assert_eq!(first.value(), Some(&Value::Int(1)));
        assert_eq!(second.value(), Some(&Value::Int(2)));
    }
}

#[test]
fn test_two_units_with_same_type_name() {
    let harness = Harness::new();
    let a = harness.compile("public class Same { public static int id() { return 1; } }");
    let b = harness.compile("public class Same { public static int id() { return 2; } }");
    assert_ne!(a.namespace(), b.namespace());
    let mut first = harness.session.attempt(&a).unwrap();
    let mut second = harness.session.attempt(&b).unwrap();
    assert_eq!(
        first.call(None, "id", vec![], None).unwrap().value(),
        Some(&Value::Int(1))
    );
    assert_eq!(
        second.call(None, "id", vec![], None).unwrap().value(),
        Some(&Value::Int(2))
    );
}

#[test]
fn test_native_staging_in_temp_dir() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = GraderConfig::default();
    config.compiler.stage_sources = true;
    config.compiler.staging_dir = dir.path().join("staging");
    let fs = NativeFileSystem::new();
    let session = GradingSession::with_fs(config, Arc::new(fs.clone()));

    let submission = dir.path().join("Shape.java");
    std::fs::write(&submission, "public class Shape { public static int sides() { return 4; } }").unwrap();
    let unit = session.compile_file(&submission).unwrap();

    let staged = session.byproducts().paths();
    assert_eq!(staged.len(), 1);
    assert!(staged[0].starts_with(dir.path().join("staging")));
    assert!(fs.is_file(&staged[0]));
    let text = fs.read_to_string(&staged[0]).unwrap();
    assert!(text.starts_with(&format!("package {};", unit.namespace())));

    // staging files are the caller's to clean up
    assert!(session.byproducts().cleanup(&fs).is_empty());
    assert!(!staged[0].exists());
}
