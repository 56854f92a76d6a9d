//! Front end of the unit language: syntax tree, parser and semantic checks

pub mod ast;
pub mod check;
pub mod diagnostic;
pub mod error;
pub mod parser;

pub use check::{check_units, CheckInput};
pub use diagnostic::{Diagnostic, Severity};
pub use error::{ParserError, ParserErrorKind};
pub use parser::parse_source;
