//! Behavioral outcomes of one invocation

use crate::error::{Disposition, ErrorReport};
use autograde_core::{Throwable, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Exactly one of the ways an invocation can end
///
/// A `void` member completes with [`Value::Void`], so the absence of a value
/// is never mistaken for success.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationOutcome {
    Completed(Value),
    /// The member raised; `cause` is the innermost fault with every
    /// reflective wrapper peeled
    ExecutionFault { cause: Arc<Throwable> },
    /// The deadline passed; the worker may still be running
    Timeout { deadline: Duration },
    /// Submitted code tried to terminate the process
    ExitAttempted { status: i32 },
    /// Submitted code read past the supplied input
    InputExhausted,
    /// An external cancellation token fired and the worker acknowledged it
    Cancelled,
}

impl InvocationOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, InvocationOutcome::Completed(_))
    }

    /// Returned value of a completed invocation
    pub fn value(&self) -> Option<&Value> {
        match self {
            InvocationOutcome::Completed(value) => Some(value),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            InvocationOutcome::Completed(_) => "Completed",
            InvocationOutcome::ExecutionFault { .. } => "ExecutionFault",
            InvocationOutcome::Timeout { .. } => "Timeout",
            InvocationOutcome::ExitAttempted { .. } => "ExitAttempted",
            InvocationOutcome::InputExhausted => "InputExhausted",
            InvocationOutcome::Cancelled => "Cancelled",
        }
    }

    /// Outcomes describe the submission's behavior, so they are all gradeable
    pub fn disposition(&self) -> Disposition {
        Disposition::Feedback
    }

    /// Report of a non-completed outcome
    pub fn to_report(&self) -> Option<ErrorReport> {
        if self.is_completed() {
            return None;
        }
        let (line, details) = match self {
            InvocationOutcome::ExecutionFault { cause } => (
                cause.line(),
                cause.trace.iter().map(ToString::to_string).collect(),
            ),
            _ => (None, Vec::new()),
        };
        Some(ErrorReport {
            kind: self.kind(),
            disposition: self.disposition(),
            message: self.to_string(),
            line,
            column: None,
            details,
        })
    }
}

impl fmt::Display for InvocationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvocationOutcome::Completed(Value::Void) => f.write_str("completed"),
            InvocationOutcome::Completed(value) => write!(f, "completed: {}", value.display()),
            InvocationOutcome::ExecutionFault { cause } => write!(f, "{cause}"),
            InvocationOutcome::Timeout { deadline } => {
                write!(f, "timed out after {}ms", deadline.as_millis())
            }
            InvocationOutcome::ExitAttempted { status } => {
                write!(f, "attempted to exit with status {status}")
            }
            InvocationOutcome::InputExhausted => {
                f.write_str("program requested more input than was supplied")
            }
            InvocationOutcome::Cancelled => f.write_str("invocation cancelled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autograde_core::TraceFrame;

    #[test]
    fn test_display() {
        assert_eq!(InvocationOutcome::Completed(Value::Int(5)).to_string(), "completed: 5");
        assert_eq!(InvocationOutcome::Completed(Value::Void).to_string(), "completed");
        assert_eq!(
            InvocationOutcome::Timeout {
                deadline: Duration::from_millis(200)
            }
            .to_string(),
            "timed out after 200ms"
        );
        assert_eq!(
            InvocationOutcome::ExitAttempted { status: 2 }.to_string(),
            "attempted to exit with status 2"
        );
    }

    #[test]
    fn test_completed_has_no_report() {
        let outcome = InvocationOutcome::Completed(Value::Int(1));
        assert!(outcome.is_completed());
        assert_eq!(outcome.value(), Some(&Value::Int(1)));
        assert!(outcome.to_report().is_none());
    }

    #[test]
    fn test_fault_report_carries_trace() {
        let cause = Throwable::new("ArithmeticException", Some("/ by zero".into())).with_trace(vec![
            TraceFrame {
                class: "Calc".into(),
                method: "divide".into(),
                line: Some(4),
            },
        ]);
        let outcome = InvocationOutcome::ExecutionFault {
            cause: Arc::new(cause),
        };
        let report = outcome.to_report().unwrap();
        assert_eq!(report.kind, "ExecutionFault");
        assert_eq!(report.disposition, Disposition::Feedback);
        assert_eq!(report.message, "java.lang.ArithmeticException: / by zero");
        assert_eq!(report.line, Some(4));
        assert_eq!(report.details, vec!["at Calc.divide(line 4)"]);
    }
}
