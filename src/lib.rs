//! AutoGrade - bounded execution engine for grading submitted code
//!
//! A grading script compiles a student's unit into a private namespace,
//! loads it into a fresh loader, and calls its constructors and methods by
//! the runtime types of the arguments. Every call runs on a worker under a
//! deadline, with standard input supplied up front, output captured, and
//! process exits intercepted. The result is always one tagged value: a
//! behavioral [`InvocationOutcome`] the student gets as feedback, or a
//! structural [`GradingError`] that sends the submission to manual review.
//!
//! # Architecture
//!
//! ```text
//! autograde-config  - configuration data
//! autograde-vfs     - file system abstraction (native and in-memory)
//! autograde-core    - the unit language: compiler, interpreter, library
//! autograde-api     - compiler front end, loader, capture, guard, engine
//! autograde-cli     - `autograde` binary
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use autograde::{GraderConfig, GradingSession, SourceUnit, Value, Ty};
//!
//! let session = GradingSession::new(GraderConfig::default());
//! let unit = session.compile_source(SourceUnit::from_memory(source))?;
//! let mut attempt = session.attempt(&unit)?;
//! let calc = attempt.construct(vec![])?.value().cloned();
//! let sum = attempt.call(calc, "add", vec![Value::Int(2), Value::Int(3)], Some(Ty::Int))?;
//! ```

pub use autograde_api::*;
