//! Lexer for the unit language
//!
//! Turns source text into a flat token vector. Comments are dropped, literal
//! escapes are decoded, and every token remembers where it started so the
//! parser and the checker can report `line:column` positions.

pub mod error;
pub mod lexer;
pub mod position;
pub mod token;

pub use error::{LexErrorKind, LexerError};
pub use lexer::Lexer;
pub use position::{Coordinate, Span};
pub use token::{Token, TokenKind};
