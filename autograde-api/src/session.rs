//! Grading session
//!
//! The orchestrator's entry point. A [`GradingSession`] owns the compiler,
//! the engine and the one [`ExitGuard`]; each compiled unit is graded in an
//! [`Attempt`] with its own loader. Every call on an attempt takes
//! `&mut self`, so invocations are sequential, and each one runs as
//! capture begin, guard armed, engine, capture end.

use crate::capture::{CaptureReport, CaptureSession, OutputSink, StdoutSink};
use crate::compiler::{ByproductRegistry, CompiledUnit, ToolchainRegistry, UnitCompiler};
use crate::engine::{Bindings, Deadline, Engine, Invocation};
use crate::error::GradingError;
use crate::guard::ExitGuard;
use crate::loader::Loader;
use crate::outcome::InvocationOutcome;
use crate::source::SourceUnit;
use autograde_config::GraderConfig;
use autograde_core::{JArray, Ty, Value};
use autograde_vfs::{NativeFileSystem, VirtualFileSystem};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// What one invocation produced
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationReport {
    pub outcome: InvocationOutcome,
    pub capture: CaptureReport,
    pub elapsed: Duration,
}

impl InvocationReport {
    pub fn value(&self) -> Option<&Value> {
        self.outcome.value()
    }

    pub fn output(&self) -> &str {
        &self.capture.output
    }
}

pub struct GradingSession {
    config: GraderConfig,
    compiler: UnitCompiler,
    engine: Engine,
    guard: ExitGuard,
    sink: Arc<dyn OutputSink>,
}

impl GradingSession {
    /// Session over the native file system, replaying to standard output
    pub fn new(config: GraderConfig) -> Self {
        Self::with_fs(config, Arc::new(NativeFileSystem::new()))
    }

    pub fn with_fs(config: GraderConfig, fs: Arc<dyn VirtualFileSystem>) -> Self {
        let compiler = UnitCompiler::new(config.compiler.clone(), fs);
        let engine = Engine::new(&config.engine, &config.limits);
        Self {
            config,
            compiler,
            engine,
            guard: ExitGuard::new(),
            sink: Arc::new(StdoutSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_toolchains(mut self, toolchains: ToolchainRegistry) -> Self {
        self.compiler = self.compiler.with_toolchains(toolchains);
        self
    }

    pub fn config(&self) -> &GraderConfig {
        &self.config
    }

    pub fn guard(&self) -> &ExitGuard {
        &self.guard
    }

    /// Staging files written so far; cleaning them up is the caller's job
    pub fn byproducts(&self) -> &ByproductRegistry {
        self.compiler.byproducts()
    }

    pub fn compile_source(&self, unit: SourceUnit) -> Result<CompiledUnit, GradingError> {
        self.compiler.compile(unit)
    }

    pub fn compile_with(
        &self,
        primary: SourceUnit,
        ancillary: Vec<SourceUnit>,
    ) -> Result<CompiledUnit, GradingError> {
        self.compiler.compile_with(primary, ancillary)
    }

    pub fn compile_file(&self, path: impl AsRef<Path>) -> Result<CompiledUnit, GradingError> {
        let unit = self.read_source(path)?;
        self.compiler.compile(unit)
    }

    /// Read a unit through the session's file system without compiling it
    pub fn read_source(&self, path: impl AsRef<Path>) -> Result<SourceUnit, GradingError> {
        self.compiler.read_source(path.as_ref())
    }

    /// Remove recorded staging files; returns the ones that could not be removed
    pub fn clean_byproducts(&self) -> Vec<std::path::PathBuf> {
        let failures = self.compiler.byproducts().cleanup(self.compiler.fs().as_ref());
        for (path, err) in &failures {
            debug!(target: "autograde::compiler", path = %path.display(), "cleanup failed: {err}");
        }
        failures.into_iter().map(|(path, _)| path).collect()
    }

    /// Load `unit` into a fresh loader
    pub fn attempt(&self, unit: &CompiledUnit) -> Result<Attempt<'_>, GradingError> {
        let loader = Loader::new();
        loader.define_unit(unit)?;
        info!(
            target: "autograde::loader",
            loader = loader.id(),
            entry = %unit.entry_qualified_name(),
            classes = unit.classes.len(),
            "unit loaded"
        );
        Ok(Attempt {
            session: self,
            loader,
            entry: unit.entry_qualified_name(),
            entry_name: unit.entry_name.clone(),
            input: Vec::new(),
            header: self.config.capture.header.clone(),
        })
    }

    /// Disarm the guard and end the process
    pub fn shutdown(self, status: i32) -> ! {
        self.guard.shutdown(status)
    }
}

/// One loaded unit being graded
pub struct Attempt<'s> {
    session: &'s GradingSession,
    loader: Arc<Loader>,
    entry: String,
    entry_name: String,
    input: Vec<String>,
    header: Option<String>,
}

impl Attempt<'_> {
    /// Simple name of the entry type
    pub fn entry_name(&self) -> &str {
        &self.entry_name
    }

    pub fn loader(&self) -> &Arc<Loader> {
        &self.loader
    }

    /// Standard input lines for the following invocations
    pub fn with_input<I, S>(&mut self, lines: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input = lines.into_iter().map(Into::into).collect();
        self
    }

    /// Header shown in front of the replayed output
    pub fn header(&mut self, header: Option<String>) -> &mut Self {
        self.header = header;
        self
    }

    /// Construct an instance of the entry type
    pub fn construct(&mut self, args: Vec<Value>) -> Result<InvocationReport, GradingError> {
        let request = Invocation::constructor(self.entry.clone()).args(args);
        self.invoke(request)
    }

    /// Call `name` on the entry type, on `receiver` or statically
    pub fn call(
        &mut self,
        receiver: Option<Value>,
        name: &str,
        args: Vec<Value>,
        expected: Option<Ty>,
    ) -> Result<InvocationReport, GradingError> {
        let mut request = Invocation::method(self.entry.clone(), name).args(args);
        request.receiver = receiver;
        request.expected = expected;
        self.invoke(request)
    }

    /// Run `main(String[])` of the entry type with `input` as standard input
    pub fn run_main(&mut self, input: Vec<String>) -> Result<InvocationReport, GradingError> {
        let argv = Value::Array(JArray::new(Ty::String, Vec::new()));
        let request = Invocation::method(self.entry.clone(), "main").arg(argv);
        self.captured(input, move |engine, bindings| engine.execute(bindings, request))
    }

    pub fn invoke(&mut self, request: Invocation) -> Result<InvocationReport, GradingError> {
        let input = self.input.clone();
        self.captured(input, move |engine, bindings| engine.execute(bindings, request))
    }

    pub fn read_field(
        &mut self,
        receiver: Option<Value>,
        name: &str,
        expected: Option<&Ty>,
    ) -> Result<InvocationReport, GradingError> {
        let entry = self.entry.clone();
        let input = self.input.clone();
        self.captured(input, |engine, bindings| engine.read_field(bindings, &entry, receiver, name, expected))
    }

    pub fn read_field_by_type(
        &mut self,
        receiver: Option<Value>,
        expected: &Ty,
    ) -> Result<InvocationReport, GradingError> {
        let entry = self.entry.clone();
        let input = self.input.clone();
        self.captured(input, |engine, bindings| engine.read_field_by_type(bindings, &entry, receiver, expected))
    }

    pub fn write_field_by_type(
        &mut self,
        receiver: Option<Value>,
        field_type: &Ty,
        value: Value,
    ) -> Result<InvocationReport, GradingError> {
        let entry = self.entry.clone();
        let input = self.input.clone();
        self.captured(input, |engine, bindings| {
            engine.write_field_by_type(bindings, &entry, receiver, field_type, value)
        })
    }

    /// Default deadline of the session's engine
    pub fn default_deadline(&self) -> Deadline {
        self.session.engine.default_deadline()
    }

    /// Run one invocation with `input` as its standard input
    fn captured<F>(&mut self, input: Vec<String>, run: F) -> Result<InvocationReport, GradingError>
    where
        F: FnOnce(&Engine, &Bindings) -> Result<InvocationOutcome, GradingError>,
    {
        let session = self.session;
        let capture_config = autograde_config::CaptureConfig {
            header: self.header.clone(),
            ..session.config.capture.clone()
        };
        let capture = CaptureSession::begin(&capture_config, input, Arc::clone(&session.sink));
        let started = Instant::now();

        let result = {
            let _armed = session.guard.armed();
            let bindings = Bindings {
                loader: Arc::clone(&self.loader),
                console: Arc::clone(&capture) as Arc<dyn autograde_core::Console>,
                gate: session.guard.gate(),
            };
            run(&session.engine, &bindings)
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                capture.end(false);
                debug!(target: "autograde::engine", kind = err.kind(), "structural error: {err}");
                return Err(err);
            }
        };
        if matches!(outcome, InvocationOutcome::ExitAttempted { .. }) {
            capture.mark_premature_exit();
        }
        let capture = capture.end(capture_config.replay);
        Ok(InvocationReport {
            outcome,
            capture,
            elapsed: started.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{MemorySink, PREMATURE_EXIT_NOTICE};
    use autograde_config::CaptureMode;
    use autograde_vfs::MemoryFileSystem;

    fn session() -> (GradingSession, MemorySink) {
        let sink = MemorySink::new();
        let mut config = GraderConfig::default();
        config.capture.replay = true;
        let session = GradingSession::with_fs(config, Arc::new(MemoryFileSystem::new()))
            .with_sink(Arc::new(sink.clone()));
        (session, sink)
    }

    const GREETER: &str = "import java.util.Scanner;
public class Greeter {
    private String greeting = \"Hello\";
    public Greeter() {}
    public String greet(String name) { return greeting + \", \" + name; }
    public static void main(String[] args) {
        Scanner in = new Scanner(System.in);
        String name = in.nextLine();
        System.out.println(\"Hi \" + name);
    }
    public static void quit() { System.out.println(\"bye\"); System.exit(3); }
}";

    #[test]
    fn test_construct_then_call() {
        let (session, _) = session();
        let unit = session.compile_source(SourceUnit::from_memory(GREETER)).unwrap();
        let mut attempt = session.attempt(&unit).unwrap();
        assert_eq!(attempt.entry_name(), "Greeter");
        let greeter = attempt.construct(Vec::new()).unwrap().value().cloned().unwrap();
        let report = attempt
            .call(Some(greeter), "greet", vec![Value::from("Ada")], Some(Ty::String))
            .unwrap();
        assert_eq!(report.value(), Some(&Value::from("Hello, Ada")));
    }

    #[test]
    fn test_run_main_replays_output() {
        let (session, sink) = session();
        let unit = session.compile_source(SourceUnit::from_memory(GREETER)).unwrap();
        let mut attempt = session.attempt(&unit).unwrap();
        attempt.header(Some("== main ==".into()));
        let report = attempt.run_main(vec!["Grace".into()]).unwrap();
        assert_eq!(report.outcome, InvocationOutcome::Completed(Value::Void));
        assert_eq!(report.output(), "Hi Grace\n");
        assert_eq!(sink.contents(), "== main ==\nHi Grace\n");
        assert!(!session.guard().is_armed());
    }

    #[test]
    fn test_exit_is_intercepted_and_annotated() {
        let (session, sink) = session();
        let unit = session.compile_source(SourceUnit::from_memory(GREETER)).unwrap();
        let mut attempt = session.attempt(&unit).unwrap();
        let report = attempt.call(None, "quit", Vec::new(), None).unwrap();
        assert_eq!(report.outcome, InvocationOutcome::ExitAttempted { status: 3 });
        assert!(report.capture.premature_exit);
        assert_eq!(sink.contents(), format!("bye\n{PREMATURE_EXIT_NOTICE}\n"));
        assert_eq!(session.guard().intercepted(), 1);
        assert!(!session.guard().is_armed());
    }

    #[test]
    fn test_structural_error_emits_nothing() {
        let (session, sink) = session();
        let unit = session.compile_source(SourceUnit::from_memory(GREETER)).unwrap();
        let mut attempt = session.attempt(&unit).unwrap();
        let err = attempt.call(None, "missing", Vec::new(), None).unwrap_err();
        assert!(matches!(err, GradingError::MemberNotFound { .. }));
        assert_eq!(sink.contents(), "");
    }

    #[test]
    fn test_field_access_through_attempt() {
        let (session, _) = session();
        let unit = session.compile_source(SourceUnit::from_memory(GREETER)).unwrap();
        let mut attempt = session.attempt(&unit).unwrap();
        let greeter = attempt.construct(Vec::new()).unwrap().value().cloned().unwrap();
        attempt
            .write_field_by_type(Some(greeter.clone()), &Ty::String, Value::from("Howdy"))
            .unwrap();
        let report = attempt.read_field(Some(greeter.clone()), "greeting", Some(&Ty::String)).unwrap();
        assert_eq!(report.value(), Some(&Value::from("Howdy")));
        let report = attempt.read_field_by_type(Some(greeter), &Ty::String).unwrap();
        assert_eq!(report.value(), Some(&Value::from("Howdy")));
    }

    #[test]
    fn test_live_mode_streams() {
        let sink = MemorySink::new();
        let mut config = GraderConfig::default();
        config.capture.mode = CaptureMode::Live;
        let session = GradingSession::with_fs(config, Arc::new(MemoryFileSystem::new()))
            .with_sink(Arc::new(sink.clone()));
        let unit = session.compile_source(SourceUnit::from_memory(GREETER)).unwrap();
        let mut attempt = session.attempt(&unit).unwrap();
        attempt.run_main(vec!["Linus".into()]).unwrap();
        assert_eq!(sink.contents(), "Hi Linus\n");
    }

    #[test]
    fn test_compile_file_reads_through_fs() {
        let fs = MemoryFileSystem::new();
        fs.write_file(Path::new("/sub/Greeter.java"), GREETER.as_bytes()).unwrap();
        let session = GradingSession::with_fs(GraderConfig::default(), Arc::new(fs));
        let unit = session.compile_file("/sub/Greeter.java").unwrap();
        assert_eq!(unit.entry_name, "Greeter");
        let missing = session.compile_file("/sub/Nope.java").unwrap_err();
        assert!(matches!(missing, GradingError::Io(_)));
    }
}
