//! Runtime of the unit language: values, classes, the interpreter and the
//! natively implemented library

pub mod builtins;
pub mod class;
pub mod env;
pub mod error;
pub mod interpreter;
pub mod types;
pub mod value;

pub use class::{ClassImage, RuntimeClass};
pub use env::{CancelToken, ClassResolver, Console, ExecEnv, ExitHook, RuntimeLimits};
pub use error::{ExecResult, Raised, Throwable, TraceFrame};
pub use interpreter::Interpreter;
pub use types::{select_overload, Ty};
pub use value::{java_double, JArray, Value};

use std::sync::{Mutex, MutexGuard};

/// Lock a mutex, recovering the data if a panicking thread poisoned it
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
