//! AutoGrade Core - the unit language (pure logic, no IO)
//!
//! Contains the lexer, parser, semantic checker, the embedded toolchain, the
//! tree-walking interpreter with its natively implemented library, and the
//! member tables used for reflective invocation.
//!
//! Console streams, process exit and cancellation reach the interpreter
//! through an explicit [`ExecEnv`], never through global state.

pub mod compiler;
pub mod kit;
pub mod reflect;
pub mod runtime;
pub mod toolchain;

pub use compiler::ast::Visibility;
pub use compiler::{Diagnostic, Severity};
pub use reflect::{FieldInfo, Member, MemberKind, TypeInfo, TypeOrigin};
pub use runtime::{
    select_overload, CancelToken, ClassImage, ClassResolver, Console, ExecEnv, ExecResult, ExitHook,
    Interpreter, JArray, Raised, RuntimeClass, RuntimeLimits, Throwable, TraceFrame, Ty, Value,
};
pub use toolchain::{EmbeddedToolchain, Toolchain, ToolchainOutput, ToolchainSource};

pub use autograde_config::{LimitConfig, Phase};
