//! API error types
//!
//! Structural errors ("cannot be graded automatically") are [`GradingError`].
//! Behavioral outcomes live in [`crate::InvocationOutcome`]. Both turn into
//! an [`ErrorReport`] for printing or JSON export.

use autograde_core::Diagnostic;
use autograde_vfs::VfsError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// What the grader should do with a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// The harness could not grade this; a person has to look at it
    ManualReview,
    /// The result describes what the submission did and can be graded
    Feedback,
}

/// Structural failures of the harness or of the submission's shape
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GradingError {
    #[error("compilation failed: {}", first_diagnostic(.diagnostics))]
    CompileFailure { diagnostics: Vec<Diagnostic> },

    #[error("no public class declaration found in {origin}")]
    NameInferenceFailed { origin: String },

    #[error("toolchain unavailable: {name}{}", version_suffix(.version))]
    ToolchainUnavailable {
        name: String,
        version: Option<String>,
    },

    #[error("type not found: {name}")]
    TypeNotFound { name: String },

    #[error("no member of {owner} matches {name}({args})")]
    MemberNotFound {
        owner: String,
        name: String,
        args: String,
    },

    #[error("access denied: {member} is {visibility}")]
    AccessDenied { member: String, visibility: String },

    #[error("{member} has type {actual}, expected {expected}")]
    ReturnTypeMismatch {
        member: String,
        actual: String,
        expected: String,
    },

    #[error("namespace {namespace} is held by another active unit")]
    NamespaceCollision { namespace: String },

    #[error("type {name} is already defined in this loader")]
    DuplicateDefinition { name: String },

    #[error("receiver of type {actual} is not an instance of {expected}")]
    ReceiverMismatch { expected: String, actual: String },

    #[error("field not found: {owner}.{name}")]
    FieldNotFound { owner: String, name: String },

    #[error("I/O error: {0}")]
    Io(#[from] VfsError),

    #[error("failed to start invocation worker: {0}")]
    WorkerSpawn(String),

    #[error("invocation worker panicked: {0}")]
    WorkerPanicked(String),
}

fn first_diagnostic(diagnostics: &[Diagnostic]) -> String {
    match diagnostics {
        [] => "no diagnostics".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}

fn version_suffix(version: &Option<String>) -> String {
    version
        .as_ref()
        .map(|v| format!(" {v}"))
        .unwrap_or_default()
}

impl GradingError {
    /// Stable identifier of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            GradingError::CompileFailure { .. } => "CompileFailure",
            GradingError::NameInferenceFailed { .. } => "NameInferenceFailed",
            GradingError::ToolchainUnavailable { .. } => "ToolchainUnavailable",
            GradingError::TypeNotFound { .. } => "TypeNotFound",
            GradingError::MemberNotFound { .. } => "MemberNotFound",
            GradingError::AccessDenied { .. } => "AccessDenied",
            GradingError::ReturnTypeMismatch { .. } => "ReturnTypeMismatch",
            GradingError::NamespaceCollision { .. } => "NamespaceCollision",
            GradingError::DuplicateDefinition { .. } => "DuplicateDefinition",
            GradingError::ReceiverMismatch { .. } => "ReceiverMismatch",
            GradingError::FieldNotFound { .. } => "FieldNotFound",
            GradingError::Io(_) => "Io",
            GradingError::WorkerSpawn(_) => "WorkerSpawn",
            GradingError::WorkerPanicked(_) => "WorkerPanicked",
        }
    }

    /// Every structural error goes to manual review
    pub fn disposition(&self) -> Disposition {
        Disposition::ManualReview
    }

    /// Line of the first compile error, if any
    pub fn line(&self) -> Option<usize> {
        match self {
            GradingError::CompileFailure { diagnostics } => {
                diagnostics.first().and_then(Diagnostic::line)
            }
            _ => None,
        }
    }

    pub fn column(&self) -> Option<usize> {
        match self {
            GradingError::CompileFailure { diagnostics } => {
                diagnostics.first().and_then(Diagnostic::column)
            }
            _ => None,
        }
    }

    pub fn to_report(&self) -> ErrorReport {
        let details = match self {
            GradingError::CompileFailure { diagnostics } => {
                diagnostics.iter().map(ToString::to_string).collect()
            }
            _ => Vec::new(),
        };
        ErrorReport {
            kind: self.kind(),
            disposition: self.disposition(),
            message: self.to_string(),
            line: self.line(),
            column: self.column(),
            details,
        }
    }
}

/// Structured report of a structural error or a behavioral outcome
///
/// The CLI prints it, other front ends serialize it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    pub kind: &'static str,
    pub disposition: Disposition,
    pub message: String,
    /// 1-based line, if known
    pub line: Option<usize>,
    /// 1-based column, if known
    pub column: Option<usize>,
    /// Diagnostics or trace frames
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl ErrorReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// `kind: message`
    pub fn to_short(&self) -> String {
        format!("{}: {}", self.kind, self.message)
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(f, "[{line}:{column}] {}: {}", self.kind, self.message)?,
            (Some(line), None) => write!(f, "[{line}] {}: {}", self.kind, self.message)?,
            _ => write!(f, "[{}] {}", self.kind, self.message)?,
        }
        for detail in &self.details {
            write!(f, "\n    {detail}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autograde_core::kit::lexer::Coordinate;

    fn diagnostic(line: usize, column: usize, message: &str) -> Diagnostic {
        Diagnostic::error("Calc.java", Some(Coordinate { line, column }), message)
    }

    #[test]
    fn test_compile_failure_location() {
        let err = GradingError::CompileFailure {
            diagnostics: vec![diagnostic(3, 5, "cannot find symbol: variable x"), diagnostic(9, 1, "missing return statement")],
        };
        assert_eq!(err.kind(), "CompileFailure");
        assert_eq!(err.line(), Some(3));
        assert_eq!(err.column(), Some(5));
        assert_eq!(
            err.to_string(),
            "compilation failed: Calc.java:3:5: error: cannot find symbol: variable x (and 1 more)"
        );
    }

    #[test]
    fn test_structural_errors_need_manual_review() {
        let err = GradingError::TypeNotFound { name: "Calc".into() };
        assert_eq!(err.disposition(), Disposition::ManualReview);
        assert_eq!(err.line(), None);
        assert_eq!(err.to_string(), "type not found: Calc");
    }

    #[test]
    fn test_toolchain_message() {
        let err = GradingError::ToolchainUnavailable {
            name: "javac".into(),
            version: Some("17".into()),
        };
        assert_eq!(err.to_string(), "toolchain unavailable: javac 17");
    }

    #[test]
    fn test_report_display() {
        let report = GradingError::CompileFailure {
            diagnostics: vec![diagnostic(2, 7, "duplicate class: Calc")],
        }
        .to_report();
        let text = report.to_string();
        assert!(text.starts_with("[2:7] CompileFailure: "));
        assert!(text.contains("\n    Calc.java:2:7: error: duplicate class: Calc"));

        let report = GradingError::WorkerSpawn("no threads".into()).to_report();
        assert_eq!(report.to_string(), "[WorkerSpawn] failed to start invocation worker: no threads");
        assert_eq!(report.to_short(), "WorkerSpawn: failed to start invocation worker: no threads");
    }

    #[test]
    fn test_report_json() {
        let report = GradingError::FieldNotFound {
            owner: "Calc".into(),
            name: "total".into(),
        }
        .to_report();
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["kind"], "FieldNotFound");
        assert_eq!(json["disposition"], "manual_review");
        assert_eq!(json["message"], "field not found: Calc.total");
        assert!(json["line"].is_null());
        assert!(json.get("details").is_none());
    }
}
