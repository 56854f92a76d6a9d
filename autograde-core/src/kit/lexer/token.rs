//! Token definitions

use super::position::Span;

/// Token kinds of the unit language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Keywords
    Package,
    Import,
    Public,
    Private,
    Protected,
    Static,
    Final,
    Abstract,
    Class,
    Void,
    Boolean,
    Char,
    Int,
    Long,
    Double,
    Var,
    If,
    Else,
    While,
    Do,
    For,
    Break,
    Continue,
    Return,
    New,
    Null,
    True,
    False,
    This,
    Throw,
    Throws,
    Try,
    Catch,
    Finally,

    // Recognized only to be rejected with a clear diagnostic
    Extends,
    Implements,
    Interface,
    Enum,
    Switch,
    Super,
    Instanceof,

    // Literals
    IntLiteral,
    LongLiteral,
    DoubleLiteral,
    CharLiteral,
    StringLiteral,

    Identifier,

    // Two or three character symbols
    EqualEqual,
    BangEqual,
    LessEqual,
    GreaterEqual,
    AndAnd,
    OrOr,
    PlusPlus,
    MinusMinus,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    PercentEqual,
    Arrow,
    Ellipsis,
    ColonColon,

    // Single character symbols
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Equal,
    Less,
    Greater,
    Question,
    Colon,
    Bar,
    Semicolon,
    Comma,
    Dot,
    At,
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
}

impl TokenKind {
    /// Keyword lookup
    pub fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word {
            "package" => TokenKind::Package,
            "import" => TokenKind::Import,
            "public" => TokenKind::Public,
            "private" => TokenKind::Private,
            "protected" => TokenKind::Protected,
            "static" => TokenKind::Static,
            "final" => TokenKind::Final,
            "abstract" => TokenKind::Abstract,
            "class" => TokenKind::Class,
            "void" => TokenKind::Void,
            "boolean" => TokenKind::Boolean,
            "char" => TokenKind::Char,
            "int" => TokenKind::Int,
            "long" => TokenKind::Long,
            "double" => TokenKind::Double,
            "var" => TokenKind::Var,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "do" => TokenKind::Do,
            "for" => TokenKind::For,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "return" => TokenKind::Return,
            "new" => TokenKind::New,
            "null" => TokenKind::Null,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "this" => TokenKind::This,
            "throw" => TokenKind::Throw,
            "throws" => TokenKind::Throws,
            "try" => TokenKind::Try,
            "catch" => TokenKind::Catch,
            "finally" => TokenKind::Finally,
            "extends" => TokenKind::Extends,
            "implements" => TokenKind::Implements,
            "interface" => TokenKind::Interface,
            "enum" => TokenKind::Enum,
            "switch" => TokenKind::Switch,
            "super" => TokenKind::Super,
            "instanceof" => TokenKind::Instanceof,
            _ => return None,
        };
        Some(kind)
    }

    /// Primitive type keywords
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            TokenKind::Boolean | TokenKind::Char | TokenKind::Int | TokenKind::Long | TokenKind::Double
        )
    }

    /// Source spelling, used in diagnostics
    pub fn describe(&self) -> &'static str {
        match self {
            TokenKind::Package => "package",
            TokenKind::Import => "import",
            TokenKind::Public => "public",
            TokenKind::Private => "private",
            TokenKind::Protected => "protected",
            TokenKind::Static => "static",
            TokenKind::Final => "final",
            TokenKind::Abstract => "abstract",
            TokenKind::Class => "class",
            TokenKind::Void => "void",
            TokenKind::Boolean => "boolean",
            TokenKind::Char => "char",
            TokenKind::Int => "int",
            TokenKind::Long => "long",
            TokenKind::Double => "double",
            TokenKind::Var => "var",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::While => "while",
            TokenKind::Do => "do",
            TokenKind::For => "for",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::Return => "return",
            TokenKind::New => "new",
            TokenKind::Null => "null",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::This => "this",
            TokenKind::Throw => "throw",
            TokenKind::Throws => "throws",
            TokenKind::Try => "try",
            TokenKind::Catch => "catch",
            TokenKind::Finally => "finally",
            TokenKind::Extends => "extends",
            TokenKind::Implements => "implements",
            TokenKind::Interface => "interface",
            TokenKind::Enum => "enum",
            TokenKind::Switch => "switch",
            TokenKind::Super => "super",
            TokenKind::Instanceof => "instanceof",
            TokenKind::IntLiteral | TokenKind::LongLiteral | TokenKind::DoubleLiteral => {
                "<number>"
            }
            TokenKind::CharLiteral => "<char>",
            TokenKind::StringLiteral => "<string>",
            TokenKind::Identifier => "<identifier>",
            TokenKind::EqualEqual => "==",
            TokenKind::BangEqual => "!=",
            TokenKind::LessEqual => "<=",
            TokenKind::GreaterEqual => ">=",
            TokenKind::AndAnd => "&&",
            TokenKind::OrOr => "||",
            TokenKind::PlusPlus => "++",
            TokenKind::MinusMinus => "--",
            TokenKind::PlusEqual => "+=",
            TokenKind::MinusEqual => "-=",
            TokenKind::StarEqual => "*=",
            TokenKind::SlashEqual => "/=",
            TokenKind::PercentEqual => "%=",
            TokenKind::Arrow => "->",
            TokenKind::Ellipsis => "...",
            TokenKind::ColonColon => "::",
            TokenKind::Bar => "|",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Bang => "!",
            TokenKind::Equal => "=",
            TokenKind::Less => "<",
            TokenKind::Greater => ">",
            TokenKind::Question => "?",
            TokenKind::Colon => ":",
            TokenKind::Semicolon => ";",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::At => "@",
            TokenKind::LeftParen => "(",
            TokenKind::RightParen => ")",
            TokenKind::LeftBrace => "{",
            TokenKind::RightBrace => "}",
            TokenKind::LeftBracket => "[",
            TokenKind::RightBracket => "]",
        }
    }
}

/// A scanned token
///
/// `text` holds the identifier name, the digits of a number (without the
/// `L` suffix or underscores) or the decoded content of a char/string literal.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
        }
    }

    /// Text shown in "found: ..." diagnostics
    pub fn display_text(&self) -> String {
        match self.kind {
            TokenKind::Identifier
            | TokenKind::IntLiteral
            | TokenKind::LongLiteral
            | TokenKind::DoubleLiteral => self.text.clone(),
            TokenKind::StringLiteral => format!("\"{}\"", self.text),
            TokenKind::CharLiteral => format!("'{}'", self.text),
            other => other.describe().to_string(),
        }
    }
}
