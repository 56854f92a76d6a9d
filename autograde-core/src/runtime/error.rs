//! Faults raised while submitted code runs
//!
//! Faults are values: a [`Throwable`] travels up the interpreter inside
//! [`Raised::Exception`] until a `catch` clause takes it or it leaves the
//! invoked member. The other [`Raised`] variants are control signals that
//! submitted code cannot catch.

use super::types::{throwable_distance, throwable_qualified_name};
use std::fmt;
use std::sync::Arc;

/// One stack frame of a fault trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFrame {
    pub class: String,
    pub method: String,
    /// `None` when line numbers are disabled (`-g:none`)
    pub line: Option<usize>,
}

impl fmt::Display for TraceFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "at {}.{}(line {line})", self.class, self.method),
            None => write!(f, "at {}.{}(Unknown Source)", self.class, self.method),
        }
    }
}

/// A library throwable instance
#[derive(Debug, Clone, PartialEq)]
pub struct Throwable {
    /// Simple class name (`ArithmeticException`)
    pub class: String,
    pub message: Option<String>,
    pub cause: Option<Arc<Throwable>>,
    pub trace: Vec<TraceFrame>,
}

impl Throwable {
    pub const INVOCATION_TARGET: &'static str = "InvocationTargetException";

    pub fn new(class: impl Into<String>, message: Option<String>) -> Self {
        Self {
            class: class.into(),
            message,
            cause: None,
            trace: Vec::new(),
        }
    }

    pub fn with_cause(mut self, cause: Arc<Throwable>) -> Self {
        self.cause = Some(cause);
        self
    }

    pub fn with_trace(mut self, trace: Vec<TraceFrame>) -> Self {
        self.trace = trace;
        self
    }

    /// `java.lang.ArithmeticException`
    pub fn qualified_class(&self) -> String {
        throwable_qualified_name(&self.class)
    }

    /// `catch (ancestor e)` would take this fault
    pub fn is_instance_of(&self, ancestor: &str) -> bool {
        throwable_distance(&self.class, ancestor).is_some()
    }

    /// Wrap a fault the way a reflective call does
    pub fn wrap_invocation(cause: Arc<Throwable>) -> Arc<Throwable> {
        Arc::new(Throwable::new(Self::INVOCATION_TARGET, None).with_cause(cause))
    }

    /// Peel every `InvocationTargetException` layer
    pub fn true_cause(self: &Arc<Self>) -> Arc<Throwable> {
        let mut current = Arc::clone(self);
        while current.class == Self::INVOCATION_TARGET {
            match &current.cause {
                Some(cause) => current = Arc::clone(cause),
                None => break,
            }
        }
        current
    }

    /// Innermost frame that carries a line number
    pub fn line(&self) -> Option<usize> {
        self.trace.first().and_then(|frame| frame.line)
    }
}

impl fmt::Display for Throwable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {message}", self.qualified_class()),
            None => f.write_str(&self.qualified_class()),
        }
    }
}

/// Why evaluation stopped early
#[derive(Debug, Clone, PartialEq)]
pub enum Raised {
    Exception(Arc<Throwable>),
    /// `System.exit(status)` intercepted by the exit hook
    Exit(i32),
    /// Reading past the last supplied input line
    InputExhausted,
    /// The cancellation token fired
    Cancelled,
}

impl Raised {
    pub fn exception(class: &str, message: impl Into<Option<String>>) -> Raised {
        Raised::Exception(Arc::new(Throwable::new(class, message.into())))
    }

    pub fn null_pointer(what: impl Into<String>) -> Raised {
        Raised::exception("NullPointerException", Some(what.into()))
    }
}

pub type ExecResult<T> = Result<T, Raised>;

#[cfg(test)]
mod tests {
    use super::*;

    fn nested(depth: usize) -> Arc<Throwable> {
        let mut current = Arc::new(Throwable::new("ArithmeticException", Some("/ by zero".into())));
        for _ in 0..depth {
            current = Throwable::wrap_invocation(current);
        }
        current
    }

    #[test]
    fn test_true_cause_peels_every_layer() {
        for depth in [0, 1, 5] {
            let cause = nested(depth).true_cause();
            assert_eq!(cause.class, "ArithmeticException");
            assert_eq!(cause.message.as_deref(), Some("/ by zero"));
        }
    }

    #[test]
    fn test_true_cause_keeps_user_causes() {
        let inner = Arc::new(Throwable::new("IllegalStateException", None));
        let outer = Arc::new(Throwable::new("RuntimeException", Some("wrapped".into())).with_cause(inner));
        let cause = Throwable::wrap_invocation(outer).true_cause();
        assert_eq!(cause.class, "RuntimeException");
    }

    #[test]
    fn test_display_uses_qualified_name() {
        let t = Throwable::new("NoSuchElementException", Some("No line found".into()));
        assert_eq!(t.to_string(), "java.util.NoSuchElementException: No line found");
        let t = Throwable::new("NullPointerException", None);
        assert_eq!(t.to_string(), "java.lang.NullPointerException");
    }

    #[test]
    fn test_instance_of() {
        let t = Throwable::new("NumberFormatException", None);
        assert!(t.is_instance_of("IllegalArgumentException"));
        assert!(t.is_instance_of("Exception"));
        assert!(!t.is_instance_of("Error"));
    }
}
