//! Parser error types

use crate::kit::lexer::{Coordinate, LexerError};
use thiserror::Error;

/// Syntax error kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParserErrorKind {
    UnexpectedToken { found: String, expected: Vec<String> },
    ExpectedIdentifier { found: String },
    UnexpectedEndOfInput,
    IntegerTooLarge(String),
    InvalidNumberFormat(String),
    /// A construct outside the unit language (inheritance, switch, lambdas...)
    Unsupported(String),
    Custom(String),
}

/// A syntax error, `location == None` meaning end of input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{}] {}", location_text(.location), message_text(.kind))]
pub struct ParserError {
    pub kind: ParserErrorKind,
    pub location: Option<Coordinate>,
}

fn location_text(location: &Option<Coordinate>) -> String {
    match location {
        Some(pos) => pos.to_string(),
        None => "EOF".to_string(),
    }
}

fn message_text(kind: &ParserErrorKind) -> String {
    match kind {
        ParserErrorKind::UnexpectedToken { found, expected } => {
            if expected.is_empty() {
                format!("unexpected token '{found}'")
            } else {
                format!("'{}' expected, found '{found}'", expected.join("' or '"))
            }
        }
        ParserErrorKind::ExpectedIdentifier { found } => {
            format!("<identifier> expected, found '{found}'")
        }
        ParserErrorKind::UnexpectedEndOfInput => "reached end of file while parsing".to_string(),
        ParserErrorKind::IntegerTooLarge(text) => format!("integer number too large: {text}"),
        ParserErrorKind::InvalidNumberFormat(text) => format!("malformed number: {text}"),
        ParserErrorKind::Unsupported(what) => format!("unsupported construct: {what}"),
        ParserErrorKind::Custom(msg) => msg.clone(),
    }
}

impl ParserError {
    pub fn at(kind: ParserErrorKind, pos: Coordinate) -> Self {
        Self {
            kind,
            location: Some(pos),
        }
    }

    pub fn at_eof(kind: ParserErrorKind) -> Self {
        Self {
            kind,
            location: None,
        }
    }

    pub fn line(&self) -> Option<usize> {
        self.location.map(|pos| pos.line)
    }

    pub fn column(&self) -> Option<usize> {
        self.location.map(|pos| pos.column)
    }

    /// Message without the location prefix
    pub fn message(&self) -> String {
        message_text(&self.kind)
    }
}

impl From<LexerError> for ParserError {
    fn from(err: LexerError) -> Self {
        ParserError::at(ParserErrorKind::Custom(err.message), err.position)
    }
}

pub type ParseResult<T> = Result<T, ParserError>;
