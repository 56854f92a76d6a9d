//! End-to-end grading scenarios

mod common;

use autograde::{
    Attempt, CaptureMode, Deadline, Disposition, GraderConfig, GradingError, Invocation, InvocationOutcome, JArray,
    NamespacePolicy, SourceUnit, Ty, Value, PREMATURE_EXIT_NOTICE,
};
use common::{compile, session, session_with, BANK_ACCOUNT, BROKEN, SUMMER};
use std::time::{Duration, Instant};

fn call(attempt: &mut Attempt<'_>, account: &Value, name: &str, args: Vec<Value>, expected: Ty) -> InvocationOutcome {
    attempt
        .call(Some(account.clone()), name, args, Some(expected))
        .unwrap()
        .outcome
}

#[test]
fn test_grading_script_over_bank_account() {
    let (session, _) = session();
    let unit = compile(&session, BANK_ACCOUNT);
    assert_eq!(unit.entry_name, "BankAccount");
    assert_ne!(unit.namespace(), "bank");
    let mut attempt = session.attempt(&unit).unwrap();

    let account = attempt
        .construct(vec![Value::from("Ada"), Value::Int(100)])
        .unwrap()
        .value()
        .cloned()
        .unwrap();
    assert_eq!(
        call(&mut attempt, &account, "deposit", vec![Value::Int(50)], Ty::Void),
        InvocationOutcome::Completed(Value::Void)
    );
    assert_eq!(
        call(&mut attempt, &account, "withdraw", vec![Value::Int(500)], Ty::Boolean),
        InvocationOutcome::Completed(Value::Bool(false))
    );
    assert_eq!(
        call(&mut attempt, &account, "withdraw", vec![Value::Int(30)], Ty::Boolean),
        InvocationOutcome::Completed(Value::Bool(true))
    );
    assert_eq!(
        call(&mut attempt, &account, "getBalance", vec![], Ty::Long),
        InvocationOutcome::Completed(Value::Long(120))
    );
    assert_eq!(
        call(&mut attempt, &account, "transactions", vec![], Ty::Int),
        InvocationOutcome::Completed(Value::Int(3))
    );
    assert_eq!(
        call(&mut attempt, &account, "toString", vec![], Ty::String),
        InvocationOutcome::Completed(Value::from("Ada: 120"))
    );

    let InvocationOutcome::ExecutionFault { cause } = call(&mut attempt, &account, "deposit", vec![Value::Int(-1)], Ty::Void)
    else {
        panic!("negative deposit should fault");
    };
    assert_eq!(
        cause.to_string(),
        "java.lang.IllegalArgumentException: amount must be positive"
    );

    let balance = attempt
        .read_field(Some(account.clone()), "balance", Some(&Ty::Long))
        .unwrap();
    assert_eq!(balance.value(), Some(&Value::Long(120)));
    let owner = attempt.read_field_by_type(Some(account), &Ty::String).unwrap();
    assert_eq!(owner.value(), Some(&Value::from("Ada")));
}

#[test]
fn test_interactive_program_with_supplied_input() {
    let (session, sink) = session();
    let unit = compile(&session, SUMMER);
    let mut attempt = session.attempt(&unit).unwrap();
    attempt.header(Some("=== Summer ===".into()));

    let report = attempt
        .run_main(vec!["3".into(), "4 5".into(), "6".into()])
        .unwrap();
    assert_eq!(report.outcome, InvocationOutcome::Completed(Value::Void));
    let expected = "running total: 4\nrunning total: 9\nrunning total: 15\nsum=15\n";
    assert_eq!(report.output(), expected);
    assert_eq!(sink.contents(), format!("=== Summer ===\n{expected}"));

    // two of the three numbers
    let report = attempt.run_main(vec!["3".into(), "1 2".into()]).unwrap();
    assert_eq!(report.outcome, InvocationOutcome::InputExhausted);
    assert_eq!(report.output(), "running total: 1\nrunning total: 3\n");
    assert!(report.capture.incomplete);
}

#[test]
fn test_every_failure_mode_is_tagged() {
    let mut config = GraderConfig::default();
    config.capture.replay = true;
    config.engine.default_deadline_ms = Some(300);
    let (session, sink) = session_with(config);
    let unit = compile(&session, BROKEN);
    let mut attempt = session.attempt(&unit).unwrap();

    let started = Instant::now();
    let spin = attempt.call(None, "spin", vec![], Some(Ty::Int)).unwrap();
    assert_eq!(
        spin.outcome,
        InvocationOutcome::Timeout {
            deadline: Duration::from_millis(300)
        }
    );
    assert!(started.elapsed() < Duration::from_secs(2));

    let bail = attempt.call(None, "bail", vec![], None).unwrap();
    assert_eq!(bail.outcome, InvocationOutcome::ExitAttempted { status: 42 });
    assert!(sink.contents().ends_with(&format!("giving up\n{PREMATURE_EXIT_NOTICE}\n")));

    let values = Value::Array(JArray::new(Ty::Int, vec![Value::Int(1), Value::Int(2)]));
    let crash = attempt.call(None, "crash", vec![values], Some(Ty::Int)).unwrap();
    let InvocationOutcome::ExecutionFault { cause } = &crash.outcome else {
        panic!("expected fault, got {:?}", crash.outcome);
    };
    assert_eq!(cause.class, "ArrayIndexOutOfBoundsException");
    assert_eq!(cause.message.as_deref(), Some("Index 2 out of bounds for length 2"));

    let deep = attempt.call(None, "deep", vec![Value::Int(0)], None).unwrap();
    let InvocationOutcome::ExecutionFault { cause } = &deep.outcome else {
        panic!("expected fault, got {:?}", deep.outcome);
    };
    assert_eq!(cause.class, "StackOverflowError");

    for outcome in [&spin.outcome, &bail.outcome, &crash.outcome, &deep.outcome] {
        assert_eq!(outcome.disposition(), Disposition::Feedback);
        assert!(outcome.to_report().is_some());
    }

    // the harness is intact afterwards
    let fine = attempt.call(None, "fine", vec![], Some(Ty::Int)).unwrap();
    assert_eq!(fine.value(), Some(&Value::Int(7)));
    assert!(!session.guard().is_armed());
    assert_eq!(session.guard().intercepted(), 1);
}

#[test]
fn test_timed_out_worker_cannot_leak_output() {
    let source = r#"
public class Chatty {
    public static void talk() {
        while (true) { System.out.println("still here"); }
    }
}
"#;
    let mut config = GraderConfig::default();
    config.capture.replay = true;
    config.capture.mode = CaptureMode::Live;
    let (session, sink) = session_with(config);
    let unit = compile(&session, source);
    let mut attempt = session.attempt(&unit).unwrap();
    let report = attempt
        .invoke(Invocation::method("Chatty", "talk").deadline(Deadline::millis(100)))
        .unwrap();
    assert!(matches!(report.outcome, InvocationOutcome::Timeout { .. }));
    let shown = sink.contents();
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(sink.contents(), shown);
    assert_eq!(report.output(), shown);
}

#[test]
fn test_structural_errors_go_to_manual_review() {
    let (session, _) = session();

    let err = session
        .compile_source(SourceUnit::from_memory("public class Oops { int f() { return missing; } }"))
        .unwrap_err();
    assert!(matches!(err, GradingError::CompileFailure { .. }));
    assert_eq!(err.disposition(), Disposition::ManualReview);

    let err = session
        .compile_source(SourceUnit::from_memory("class NoPublic {}"))
        .unwrap_err();
    assert_eq!(err.disposition(), Disposition::ManualReview);

    let unit = compile(&session, BANK_ACCOUNT);
    let mut attempt = session.attempt(&unit).unwrap();
    let errors = [
        attempt.construct(vec![Value::Int(1)]).unwrap_err(),
        attempt.call(None, "getBalance", vec![], None).unwrap_err(),
        attempt.invoke(Invocation::constructor("Unknown")).unwrap_err(),
        attempt
            .invoke(Invocation::method("BankAccount", "getOwner").on(Value::from("not an account")))
            .unwrap_err(),
        attempt.read_field(None, "nothing", None).unwrap_err(),
    ];
    let kinds: Vec<&str> = errors.iter().map(GradingError::kind).collect();
    assert_eq!(
        kinds,
        vec!["MemberNotFound", "MemberNotFound", "TypeNotFound", "ReceiverMismatch", "FieldNotFound"]
    );
    assert!(errors.iter().all(|e| e.disposition() == Disposition::ManualReview));
}

#[test]
fn test_preserved_namespace_is_released_after_grading() {
    let mut config = GraderConfig::default();
    config.compiler.namespace = NamespacePolicy::Preserve;
    let (session, _) = session_with(config);
    let source = BANK_ACCOUNT.replace("package bank;", "package scenario.preserve;");
    {
        let unit = compile(&session, &source);
        assert_eq!(unit.namespace(), "scenario.preserve");
        let renamed = compile(&session, &source);
        assert_ne!(renamed.namespace(), "scenario.preserve");
    }
    let again = compile(&session, &source);
    assert_eq!(again.namespace(), "scenario.preserve");
}
