//! AutoGrade API - bounded execution of submitted units
//!
//! Compiles a submitted source unit into a private namespace, loads it into a
//! fresh loader, and calls its constructors and members under a deadline with
//! captured I/O and intercepted process exits. Every path ends in either a
//! structural [`GradingError`] (manual review) or a behavioral
//! [`InvocationOutcome`] (feedback).
//!
//! ```ignore
//! let session = GradingSession::new(GraderConfig::default());
//! let unit = session.compile_source(SourceUnit::from_memory(source))?;
//! let mut attempt = session.attempt(&unit)?;
//! let calc = attempt.construct(vec![])?;
//! ```

pub mod capture;
pub mod compiler;
pub mod engine;
pub mod error;
pub mod guard;
pub mod loader;
pub mod outcome;
pub mod session;
pub mod source;

pub use capture::{CaptureReport, CaptureSession, MemorySink, OutputSink, StdoutSink, PREMATURE_EXIT_NOTICE};
pub use compiler::{
    namespace_in_use, ByproductRegistry, CompiledUnit, NamespaceLease, ToolchainRegistry, UnitCompiler,
    PRIVATE_NAMESPACE_PREFIX,
};
pub use engine::{Bindings, Deadline, Engine, Invocation, Target};
pub use error::{Disposition, ErrorReport, GradingError};
pub use guard::{ArmedScope, ExitGate, ExitGuard};
pub use loader::Loader;
pub use outcome::InvocationOutcome;
pub use session::{Attempt, GradingSession, InvocationReport};
pub use source::{infer_entry_name, SourceUnit, MEMORY_ORIGIN};

// Re-export config and core types
pub use autograde_config;
pub use autograde_config::{
    CaptureConfig, CaptureMode, CollisionPolicy, CompilerConfig, EngineConfig, GraderConfig, LimitConfig,
    NamespacePolicy, Phase,
};
pub use autograde_core::{
    CancelToken, Diagnostic, JArray, Severity, Throwable, Toolchain, ToolchainOutput, ToolchainSource, Ty,
    Value,
};
pub use autograde_vfs::{MemoryFileSystem, NativeFileSystem, VirtualFileSystem};
