//! Bounded invocation engine
//!
//! Resolves a constructor, method or field of a loaded type by the runtime
//! types of the arguments, checks it against the caller's expectations, and
//! runs it on a dedicated worker thread. The caller waits for at most the
//! deadline; past it the engine signals cancellation, detaches the worker's
//! exit gate and reports `Timeout` without waiting any longer.
//!
//! A single-use [`Ticket`] decides whether the worker's result or the
//! timeout wins, so a late result can never be reported.

use crate::error::GradingError;
use crate::guard::ExitGate;
use crate::loader::Loader;
use crate::outcome::InvocationOutcome;
use autograde_config::{EngineConfig, LimitConfig};
use autograde_core::{
    CancelToken, ClassResolver, Console, ExecEnv, ExecResult, ExitHook, FieldInfo, Interpreter, Member,
    Raised, RuntimeLimits, Ty, TypeInfo, TypeOrigin, Value, Visibility,
};
use crossbeam_channel::RecvTimeoutError;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

static NEXT_WORKER: AtomicU64 = AtomicU64::new(1);

/// How long the caller waits for a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    Within(Duration),
    Unbounded,
}

impl Deadline {
    pub fn millis(ms: u64) -> Self {
        Deadline::Within(Duration::from_millis(ms))
    }

    /// `None` means unbounded, as in the configuration
    pub fn from_config(ms: Option<u64>) -> Self {
        ms.map_or(Deadline::Unbounded, Deadline::millis)
    }
}

/// Which member of the target type to call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Constructor,
    Method(String),
}

/// A request to call one member
#[derive(Debug, Clone)]
pub struct Invocation {
    pub type_name: String,
    pub target: Target,
    pub receiver: Option<Value>,
    pub args: Vec<Value>,
    /// `None` uses the engine's default deadline
    pub deadline: Option<Deadline>,
    /// Type the caller expects back; `None` accepts anything
    pub expected: Option<Ty>,
    pub cancel: Option<CancelToken>,
}

impl Invocation {
    pub fn constructor(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            target: Target::Constructor,
            receiver: None,
            args: Vec::new(),
            deadline: None,
            expected: None,
            cancel: None,
        }
    }

    pub fn method(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            target: Target::Method(name.into()),
            ..Self::constructor(type_name)
        }
    }

    /// Call on `receiver` instead of statically
    pub fn on(mut self, receiver: Value) -> Self {
        self.receiver = Some(receiver);
        self
    }

    pub fn args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    pub fn arg(mut self, arg: impl Into<Value>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn expect(mut self, ty: Ty) -> Self {
        self.expected = Some(ty);
        self
    }

    pub fn deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn cancel_with(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn member_name(&self) -> &str {
        match &self.target {
            Target::Constructor => "<init>",
            Target::Method(name) => name,
        }
    }
}

/// What one invocation runs against
#[derive(Clone)]
pub struct Bindings {
    pub loader: Arc<Loader>,
    pub console: Arc<dyn Console>,
    pub gate: ExitGate,
}

const RUNNING: u8 = 0;
const FINISHED: u8 = 1;
const ABANDONED: u8 = 2;

/// Single-use completion ticket shared by the caller and the worker
#[derive(Debug, Clone)]
struct Ticket(Arc<AtomicU8>);

impl Ticket {
    fn new() -> Self {
        Ticket(Arc::new(AtomicU8::new(RUNNING)))
    }

    /// Worker side: claim the right to report a result
    fn finish(&self) -> bool {
        self.0
            .compare_exchange(RUNNING, FINISHED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Caller side: give up on the worker
    fn abandon(&self) -> bool {
        self.0
            .compare_exchange(RUNNING, ABANDONED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

type WorkerResult = Result<ExecResult<Value>, String>;

pub struct Engine {
    config: EngineConfig,
    limits: RuntimeLimits,
}

impl Engine {
    pub fn new(config: &EngineConfig, limits: &LimitConfig) -> Self {
        Self {
            config: config.clone(),
            limits: RuntimeLimits::from(limits),
        }
    }

    pub fn default_deadline(&self) -> Deadline {
        Deadline::from_config(self.config.default_deadline_ms)
    }

    /// Construct an instance or call a method
    pub fn execute(&self, bindings: &Bindings, request: Invocation) -> Result<InvocationOutcome, GradingError> {
        let info = bindings.loader.resolve(&request.type_name)?;
        if let Some(receiver) = &request.receiver {
            check_receiver(&info, receiver)?;
        }

        let arg_types: Vec<Ty> = request.args.iter().map(Value::ty).collect();
        let member = match &request.target {
            Target::Constructor => info.select_constructor(&arg_types),
            Target::Method(name) => info.select_method(name, &arg_types, request.receiver.is_some()),
        }
        .cloned()
        .ok_or_else(|| GradingError::MemberNotFound {
            owner: info.simple_name.clone(),
            name: request.member_name().to_string(),
            args: type_list(&arg_types),
        })?;

        if let Some(expected) = &request.expected {
            if expected.accepts(&member.returns).is_none() {
                return Err(GradingError::ReturnTypeMismatch {
                    member: member.signature(),
                    actual: member.returns.name(),
                    expected: expected.name(),
                });
            }
        }
        self.check_access(&info, &member.signature(), member.visibility)?;

        debug!(target: "autograde::engine", member = %member.signature(), "invoking");
        let deadline = request.deadline.unwrap_or_else(|| self.default_deadline());
        let Invocation { receiver, args, cancel, .. } = request;
        self.run_bounded(bindings, deadline, cancel, move |interp| {
            member.invoke(interp, receiver, args)
        })
    }

    /// Read field `name`; without a receiver only static fields qualify
    pub fn read_field(
        &self,
        bindings: &Bindings,
        type_name: &str,
        receiver: Option<Value>,
        name: &str,
        expected: Option<&Ty>,
    ) -> Result<InvocationOutcome, GradingError> {
        let info = bindings.loader.resolve(type_name)?;
        let field = info
            .field(name)
            .cloned()
            .ok_or_else(|| GradingError::FieldNotFound {
                owner: info.simple_name.clone(),
                name: name.to_string(),
            })?;
        if let Some(expected) = expected {
            if expected.accepts(&field.ty).is_none() {
                return Err(GradingError::ReturnTypeMismatch {
                    member: field_signature(&info, &field),
                    actual: field.ty.name(),
                    expected: expected.name(),
                });
            }
        }
        self.read_resolved(bindings, &info, receiver, field)
    }

    /// Read the first declared field whose type fits `expected`
    pub fn read_field_by_type(
        &self,
        bindings: &Bindings,
        type_name: &str,
        receiver: Option<Value>,
        expected: &Ty,
    ) -> Result<InvocationOutcome, GradingError> {
        let info = bindings.loader.resolve(type_name)?;
        let field = info
            .fields
            .iter()
            .find(|f| (receiver.is_some() || f.is_static) && expected.accepts(&f.ty).is_some())
            .cloned()
            .ok_or_else(|| GradingError::FieldNotFound {
                owner: info.simple_name.clone(),
                name: format!("<{expected}>"),
            })?;
        self.read_resolved(bindings, &info, receiver, field)
    }

    /// Write `value` into the first declared field that accepts `field_type`
    pub fn write_field_by_type(
        &self,
        bindings: &Bindings,
        type_name: &str,
        receiver: Option<Value>,
        field_type: &Ty,
        value: Value,
    ) -> Result<InvocationOutcome, GradingError> {
        let info = bindings.loader.resolve(type_name)?;
        let field = info
            .fields
            .iter()
            .find(|f| (receiver.is_some() || f.is_static) && f.ty.accepts(field_type).is_some())
            .cloned()
            .ok_or_else(|| GradingError::FieldNotFound {
                owner: info.simple_name.clone(),
                name: format!("<{field_type}>"),
            })?;
        if field.ty.accepts(&value.ty()).is_none() {
            return Err(GradingError::ReturnTypeMismatch {
                member: field_signature(&info, &field),
                actual: value.ty().name(),
                expected: field.ty.name(),
            });
        }
        let (class, object) = self.field_access(&info, receiver, &field)?;
        let value = value.coerce(&field.ty);
        self.run_bounded(bindings, self.default_deadline(), None, move |interp| {
            interp
                .write_field(&class, object.as_ref(), &field.name, value)
                .map(|()| Value::Void)
        })
    }

    fn read_resolved(
        &self,
        bindings: &Bindings,
        info: &TypeInfo,
        receiver: Option<Value>,
        field: FieldInfo,
    ) -> Result<InvocationOutcome, GradingError> {
        let (class, object) = self.field_access(info, receiver, &field)?;
        self.run_bounded(bindings, self.default_deadline(), None, move |interp| {
            interp.read_field(&class, object.as_ref(), &field.name)
        })
    }

    /// Receiver and access checks shared by the field operations
    fn field_access(
        &self,
        info: &TypeInfo,
        receiver: Option<Value>,
        field: &FieldInfo,
    ) -> Result<(Arc<autograde_core::RuntimeClass>, Option<autograde_core::runtime::value::ObjectRef>), GradingError> {
        let class = info.class().cloned().ok_or_else(|| GradingError::FieldNotFound {
            owner: info.simple_name.clone(),
            name: field.name.clone(),
        })?;
        let object = match receiver {
            Some(receiver) => {
                check_receiver(info, &receiver)?;
                match receiver {
                    Value::Object(object) => Some(object),
                    _ => None,
                }
            }
            None if !field.is_static => {
                return Err(GradingError::ReceiverMismatch {
                    expected: info.simple_name.clone(),
                    actual: "no instance".to_string(),
                })
            }
            None => None,
        };
        self.check_access(info, &field_signature(info, field), field.visibility)?;
        Ok((class, object))
    }

    fn check_access(&self, info: &TypeInfo, member: &str, visibility: Visibility) -> Result<(), GradingError> {
        if visibility == Visibility::Public {
            return Ok(());
        }
        if info.origin == TypeOrigin::Ambient || !self.config.allow_private_access {
            return Err(GradingError::AccessDenied {
                member: member.to_string(),
                visibility: visibility.to_string(),
            });
        }
        trace!(target: "autograde::engine", member, %visibility, "forcing access");
        Ok(())
    }

    /// Run `job` on a fresh worker and wait for at most `deadline`
    fn run_bounded<F>(
        &self,
        bindings: &Bindings,
        deadline: Deadline,
        cancel: Option<CancelToken>,
        job: F,
    ) -> Result<InvocationOutcome, GradingError>
    where
        F: FnOnce(&mut Interpreter<'_>) -> ExecResult<Value> + Send + 'static,
    {
        let token = cancel.as_ref().map_or_else(CancelToken::new, CancelToken::child);
        let env = ExecEnv {
            classes: Arc::clone(&bindings.loader) as Arc<dyn ClassResolver>,
            console: Arc::clone(&bindings.console),
            exit: Arc::new(bindings.gate.clone()) as Arc<dyn ExitHook>,
            cancel: token.clone(),
            limits: self.limits,
        };
        let ticket = Ticket::new();
        let (tx, rx) = crossbeam_channel::bounded::<WorkerResult>(1);

        let worker_ticket = ticket.clone();
        let id = NEXT_WORKER.fetch_add(1, Ordering::Relaxed);
        thread::Builder::new()
            .name(format!("autograde-worker-{id}"))
            .stack_size(self.config.worker_stack_size)
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    let mut interp = Interpreter::new(&env);
                    job(&mut interp)
                }))
                .map_err(panic_message);
                if worker_ticket.finish() {
                    // the receiver is only gone if the caller already returned
                    let _ = tx.send(result);
                } else {
                    trace!(target: "autograde::engine", worker = id, "late result discarded");
                }
            })
            .map_err(|e| GradingError::WorkerSpawn(e.to_string()))?;

        let started = Instant::now();
        let received = match deadline {
            Deadline::Unbounded => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            Deadline::Within(limit) => rx.recv_timeout(limit),
        };
        let result = match received {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                if ticket.abandon() {
                    token.cancel();
                    bindings.gate.detach();
                    let limit = match deadline {
                        Deadline::Within(limit) => limit,
                        Deadline::Unbounded => started.elapsed(),
                    };
                    info!(
                        target: "autograde::engine",
                        worker = id,
                        deadline_ms = limit.as_millis() as u64,
                        "deadline passed, abandoning worker"
                    );
                    return Ok(InvocationOutcome::Timeout { deadline: limit });
                }
                // the worker finished in the meantime
                rx.recv()
                    .map_err(|_| GradingError::WorkerPanicked("worker vanished without a result".into()))?
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(GradingError::WorkerPanicked("worker vanished without a result".into()))
            }
        };

        let outcome = match result {
            Ok(Ok(value)) => InvocationOutcome::Completed(value),
            Ok(Err(Raised::Exception(fault))) => InvocationOutcome::ExecutionFault {
                cause: fault.true_cause(),
            },
            Ok(Err(Raised::Exit(status))) => InvocationOutcome::ExitAttempted { status },
            Ok(Err(Raised::InputExhausted)) => InvocationOutcome::InputExhausted,
            Ok(Err(Raised::Cancelled)) => InvocationOutcome::Cancelled,
            Err(message) => {
                warn!(target: "autograde::engine", worker = id, %message, "worker panicked");
                return Err(GradingError::WorkerPanicked(message));
            }
        };
        debug!(
            target: "autograde::engine",
            worker = id,
            outcome = outcome.kind(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "invocation finished"
        );
        Ok(outcome)
    }
}

fn check_receiver(info: &TypeInfo, receiver: &Value) -> Result<(), GradingError> {
    if info.is_instance(receiver) {
        Ok(())
    } else {
        Err(GradingError::ReceiverMismatch {
            expected: info.simple_name.clone(),
            actual: receiver.ty().name(),
        })
    }
}

fn field_signature(info: &TypeInfo, field: &FieldInfo) -> String {
    let separator = if field.is_static { '.' } else { '#' };
    format!("{}{separator}{}", info.simple_name, field.name)
}

fn type_list(types: &[Ty]) -> String {
    types.iter().map(Ty::name).collect::<Vec<_>>().join(", ")
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureSession, MemorySink};
    use crate::guard::ExitGuard;
    use autograde_config::{CaptureConfig, GraderConfig};
    use autograde_core::{EmbeddedToolchain, Toolchain, ToolchainSource};

    fn setup(source: &str) -> (Engine, Bindings, ExitGuard) {
        let loader = Loader::new();
        let classes = EmbeddedToolchain
            .compile(&[ToolchainSource::new("Calc.java", format!("package t; {source}"))], &[])
            .unwrap()
            .classes;
        for image in classes {
            loader.define(image).unwrap();
        }
        let guard = ExitGuard::new();
        let bindings = Bindings {
            loader,
            console: CaptureSession::begin(&CaptureConfig::default(), Vec::new(), Arc::new(MemorySink::new())),
            gate: guard.gate(),
        };
        let config = GraderConfig::default();
        (Engine::new(&config.engine, &config.limits), bindings, guard)
    }

    const CALC: &str = "public class Calc {
        private int base;
        public static int created;
        public Calc(int base) { this.base = base; created++; }
        public int add(int a, int b) { return base + a + b; }
        private int secret() { return 42; }
        public static long twice(long x) { return 2 * x; }
        public int divide(int a) { return a / 0; }
        public void spin() { while (true) { } }
    }";

    fn construct(engine: &Engine, bindings: &Bindings) -> Value {
        let outcome = engine
            .execute(bindings, Invocation::constructor("Calc").arg(10))
            .unwrap();
        outcome.value().cloned().unwrap()
    }

    #[test]
    fn test_deadline_from_config() {
        assert_eq!(Deadline::from_config(None), Deadline::Unbounded);
        assert_eq!(Deadline::from_config(Some(5)), Deadline::Within(Duration::from_millis(5)));
    }

    #[test]
    fn test_construct_and_invoke() {
        let (engine, bindings, _guard) = setup(CALC);
        let calc = construct(&engine, &bindings);
        let outcome = engine
            .execute(
                &bindings,
                Invocation::method("Calc", "add").on(calc).arg(2).arg(3).expect(Ty::Int),
            )
            .unwrap();
        assert_eq!(outcome, InvocationOutcome::Completed(Value::Int(15)));
    }

    #[test]
    fn test_widened_static_call() {
        let (engine, bindings, _guard) = setup(CALC);
        let outcome = engine
            .execute(&bindings, Invocation::method("Calc", "twice").arg(21).expect(Ty::Long))
            .unwrap();
        assert_eq!(outcome, InvocationOutcome::Completed(Value::Long(42)));
    }

    #[test]
    fn test_member_not_found() {
        let (engine, bindings, _guard) = setup(CALC);
        let err = engine
            .execute(&bindings, Invocation::method("Calc", "add").arg(1).arg("x"))
            .unwrap_err();
        assert_eq!(
            err,
            GradingError::MemberNotFound {
                owner: "Calc".into(),
                name: "add".into(),
                args: "int, String".into(),
            }
        );
    }

    #[test]
    fn test_instance_member_needs_receiver() {
        let (engine, bindings, _guard) = setup(CALC);
        let err = engine
            .execute(&bindings, Invocation::method("Calc", "add").arg(1).arg(2))
            .unwrap_err();
        assert!(matches!(err, GradingError::MemberNotFound { .. }));
    }

    #[test]
    fn test_return_type_mismatch() {
        let (engine, bindings, _guard) = setup(CALC);
        let calc = construct(&engine, &bindings);
        let err = engine
            .execute(
                &bindings,
                Invocation::method("Calc", "add").on(calc).arg(1).arg(2).expect(Ty::String),
            )
            .unwrap_err();
        assert_eq!(
            err,
            GradingError::ReturnTypeMismatch {
                member: "Calc#add(int, int)".into(),
                actual: "int".into(),
                expected: "String".into(),
            }
        );
    }

    #[test]
    fn test_private_access() {
        let (engine, bindings, _guard) = setup(CALC);
        let calc = construct(&engine, &bindings);
        let outcome = engine
            .execute(&bindings, Invocation::method("Calc", "secret").on(calc.clone()))
            .unwrap();
        assert_eq!(outcome.value(), Some(&Value::Int(42)));

        let strict = Engine::new(
            &EngineConfig {
                allow_private_access: false,
                ..EngineConfig::default()
            },
            &LimitConfig::default(),
        );
        let err = strict
            .execute(&bindings, Invocation::method("Calc", "secret").on(calc))
            .unwrap_err();
        assert_eq!(
            err,
            GradingError::AccessDenied {
                member: "Calc#secret()".into(),
                visibility: "private".into(),
            }
        );
    }

    #[test]
    fn test_fault_is_unwrapped() {
        let (engine, bindings, _guard) = setup(CALC);
        let calc = construct(&engine, &bindings);
        let outcome = engine
            .execute(&bindings, Invocation::method("Calc", "divide").on(calc).arg(1))
            .unwrap();
        let InvocationOutcome::ExecutionFault { cause } = outcome else {
            panic!("expected fault, got {outcome:?}");
        };
        assert_eq!(cause.class, "ArithmeticException");
        assert!(cause.cause.is_none());
    }

    #[test]
    fn test_timeout_returns_promptly() {
        let (engine, bindings, _guard) = setup(CALC);
        let calc = construct(&engine, &bindings);
        let started = Instant::now();
        let outcome = engine
            .execute(
                &bindings,
                Invocation::method("Calc", "spin").on(calc).deadline(Deadline::millis(100)),
            )
            .unwrap();
        assert_eq!(
            outcome,
            InvocationOutcome::Timeout {
                deadline: Duration::from_millis(100)
            }
        );
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(bindings.gate.is_detached());
    }

    #[test]
    fn test_external_cancellation() {
        let (engine, bindings, _guard) = setup(CALC);
        let calc = construct(&engine, &bindings);
        let token = CancelToken::new();
        let trigger = token.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            trigger.cancel();
        });
        let outcome = engine
            .execute(
                &bindings,
                Invocation::method("Calc", "spin")
                    .on(calc)
                    .deadline(Deadline::Unbounded)
                    .cancel_with(token),
            )
            .unwrap();
        canceller.join().unwrap();
        assert_eq!(outcome, InvocationOutcome::Cancelled);
    }

    #[test]
    fn test_fields() {
        let (engine, bindings, _guard) = setup(CALC);
        let calc = construct(&engine, &bindings);
        let outcome = engine
            .read_field(&bindings, "Calc", Some(calc.clone()), "base", Some(&Ty::Int))
            .unwrap();
        assert_eq!(outcome.value(), Some(&Value::Int(10)));

        let outcome = engine.read_field_by_type(&bindings, "Calc", None, &Ty::Int).unwrap();
        assert_eq!(outcome.value(), Some(&Value::Int(1)));

        engine
            .write_field_by_type(&bindings, "Calc", Some(calc.clone()), &Ty::Int, Value::Int(7))
            .unwrap();
        let outcome = engine.read_field(&bindings, "Calc", Some(calc), "base", None).unwrap();
        assert_eq!(outcome.value(), Some(&Value::Int(7)));

        let err = engine.read_field(&bindings, "Calc", None, "base", None).unwrap_err();
        assert!(matches!(err, GradingError::ReceiverMismatch { .. }));
        let err = engine.read_field(&bindings, "Calc", None, "missing", None).unwrap_err();
        assert!(matches!(err, GradingError::FieldNotFound { .. }));
        let err = engine
            .read_field(&bindings, "Calc", None, "created", Some(&Ty::String))
            .unwrap_err();
        assert!(matches!(err, GradingError::ReturnTypeMismatch { .. }));
    }

    #[test]
    fn test_receiver_mismatch() {
        let (engine, bindings, _guard) = setup(CALC);
        let err = engine
            .execute(&bindings, Invocation::method("Calc", "add").on(Value::from("text")).arg(1).arg(2))
            .unwrap_err();
        assert_eq!(
            err,
            GradingError::ReceiverMismatch {
                expected: "Calc".into(),
                actual: "String".into(),
            }
        );
    }

    #[test]
    fn test_ambient_type() {
        let (engine, bindings, _guard) = setup(CALC);
        let outcome = engine
            .execute(&bindings, Invocation::method("Math", "max").arg(3).arg(9).expect(Ty::Int))
            .unwrap();
        assert_eq!(outcome.value(), Some(&Value::Int(9)));
    }
}
