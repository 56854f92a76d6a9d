//! Lexer error types

use super::position::Coordinate;
use thiserror::Error;

/// What went wrong while scanning
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    InvalidChar(char),
    UnterminatedString,
    UnterminatedChar,
    UnterminatedComment,
    EmptyChar,
    InvalidEscape(String),
    InvalidNumber(String),
}

/// A lexical error with its position
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{position}] {message}")]
pub struct LexerError {
    pub kind: LexErrorKind,
    pub position: Coordinate,
    pub message: String,
}

impl LexerError {
    pub fn at(kind: LexErrorKind, position: Coordinate) -> Self {
        let message = match &kind {
            LexErrorKind::InvalidChar(ch) => format!("illegal character: '{ch}'"),
            LexErrorKind::UnterminatedString => "unclosed string literal".to_string(),
            LexErrorKind::UnterminatedChar => "unclosed character literal".to_string(),
            LexErrorKind::UnterminatedComment => "unclosed comment".to_string(),
            LexErrorKind::EmptyChar => "empty character literal".to_string(),
            LexErrorKind::InvalidEscape(seq) => format!("illegal escape character: {seq}"),
            LexErrorKind::InvalidNumber(num) => format!("malformed number: {num}"),
        };
        Self {
            kind,
            position,
            message,
        }
    }

    pub fn line(&self) -> usize {
        self.position.line
    }

    pub fn column(&self) -> usize {
        self.position.column
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LexerError::at(LexErrorKind::InvalidChar('#'), Coordinate::new(3, 7));
        assert_eq!(err.to_string(), "[3:7] illegal character: '#'");
        assert_eq!(err.line(), 3);
        assert_eq!(err.column(), 7);
    }

    #[test]
    fn test_unterminated_string_message() {
        let err = LexerError::at(LexErrorKind::UnterminatedString, Coordinate::start());
        assert!(err.message.contains("unclosed string"));
    }
}
