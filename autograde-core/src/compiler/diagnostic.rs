//! Toolchain diagnostics

use super::error::ParserError;
use crate::kit::lexer::Coordinate;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// One compiler message, rendered `Origin.java:3:5: error: message`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{origin}:{}{severity}: {message}", position_text(.position))]
pub struct Diagnostic {
    pub origin: String,
    pub position: Option<Coordinate>,
    pub severity: Severity,
    pub message: String,
}

fn position_text(position: &Option<Coordinate>) -> String {
    match position {
        Some(pos) => format!("{pos}: "),
        None => " ".to_string(),
    }
}

impl Diagnostic {
    pub fn error(origin: &str, position: Option<Coordinate>, message: impl Into<String>) -> Self {
        Self {
            origin: origin.to_string(),
            position,
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn warning(origin: &str, position: Option<Coordinate>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(origin, position, message)
        }
    }

    pub fn from_parser_error(origin: &str, err: &ParserError) -> Self {
        Self::error(origin, err.location, err.message())
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn line(&self) -> Option<usize> {
        self.position.map(|pos| pos.line)
    }

    pub fn column(&self) -> Option<usize> {
        self.position.map(|pos| pos.column)
    }

    /// Same message as an error (`-Werror`)
    pub fn promoted(self) -> Self {
        Self {
            severity: Severity::Error,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::error::ParserErrorKind;

    #[test]
    fn test_render_with_position() {
        let d = Diagnostic::error("Calc.java", Some(Coordinate::new(3, 5)), "cannot find symbol: x");
        assert_eq!(d.to_string(), "Calc.java:3:5: error: cannot find symbol: x");
        assert!(d.is_error());
    }

    #[test]
    fn test_render_without_position() {
        let d = Diagnostic::warning("Calc.java", None, "[shadow] local x hides a field");
        assert_eq!(d.to_string(), "Calc.java: warning: [shadow] local x hides a field");
        assert!(!d.is_error());
        assert!(d.promoted().is_error());
    }

    #[test]
    fn test_from_parser_error_keeps_location() {
        let err = ParserError::at(ParserErrorKind::Unsupported("switch".into()), Coordinate::new(7, 9));
        let d = Diagnostic::from_parser_error("Main.java", &err);
        assert_eq!(d.line(), Some(7));
        assert_eq!(d.column(), Some(9));
        assert_eq!(d.message, "unsupported construct: switch");
    }
}
