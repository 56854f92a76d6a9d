//! Lexer entry point

use super::error::{LexErrorKind, LexerError};
use super::position::{Coordinate, Span};
use super::token::{Token, TokenKind};

/// Scans a whole source text into tokens
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    pos: Coordinate,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            pos: Coordinate::start(),
        }
    }

    /// Scan everything, stopping at the first lexical error
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn peek_second(&self) -> Option<char> {
        let mut iter = self.chars.clone();
        iter.next();
        iter.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.pos.advance(c);
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn skip_trivia(&mut self) -> Result<(), LexerError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.peek_second() == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some('/') if self.peek_second() == Some('*') => {
                    let start = self.pos;
                    self.bump();
                    self.bump();
                    let mut closed = false;
                    while let Some(c) = self.bump() {
                        if c == '*' && self.peek() == Some('/') {
                            self.bump();
                            closed = true;
                            break;
                        }
                    }
                    if !closed {
                        return Err(LexerError::at(LexErrorKind::UnterminatedComment, start));
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, LexerError> {
        self.skip_trivia()?;
        let start = self.pos;
        let c = match self.bump() {
            Some(c) => c,
            None => return Ok(None),
        };

        let token = if c.is_alphabetic() || c == '_' || c == '$' {
            let mut word = String::from(c);
            while let Some(n) = self.peek() {
                if n.is_alphanumeric() || n == '_' || n == '$' {
                    word.push(n);
                    self.bump();
                } else {
                    break;
                }
            }
            match TokenKind::keyword(&word) {
                Some(kind) => Token::new(kind, word, Span::range(start, self.pos)),
                None => Token::new(TokenKind::Identifier, word, Span::range(start, self.pos)),
            }
        } else if c.is_ascii_digit() || (c == '.' && self.peek().is_some_and(|n| n.is_ascii_digit()))
        {
            self.number(c, start)?
        } else if c == '"' {
            self.string(start)?
        } else if c == '\'' {
            self.char_literal(start)?
        } else {
            let kind = self.symbol(c, start)?;
            Token::new(kind, kind.describe(), Span::range(start, self.pos))
        };
        Ok(Some(token))
    }

    fn number(&mut self, first: char, start: Coordinate) -> Result<Token, LexerError> {
        let mut text = String::from(first);
        let mut is_double = first == '.';
        while let Some(n) = self.peek() {
            if n.is_ascii_digit() || n == '_' {
                self.bump();
                if n != '_' {
                    text.push(n);
                }
            } else if n == '.' && !is_double && self.peek_second().is_some_and(|d| d.is_ascii_digit())
            {
                is_double = true;
                text.push(n);
                self.bump();
            } else if n == '.' && !is_double && !self.peek_second().is_some_and(|d| d.is_alphabetic())
            {
                // `1.` is a double literal, `1.toString` is not valid either way
                is_double = true;
                text.push(n);
                self.bump();
            } else if (n == 'e' || n == 'E') && !text.contains(['e', 'E']) {
                is_double = true;
                text.push(n);
                self.bump();
                if let Some(sign) = self.peek().filter(|s| *s == '+' || *s == '-') {
                    text.push(sign);
                    self.bump();
                }
                if !self.peek().is_some_and(|d| d.is_ascii_digit()) {
                    return Err(LexerError::at(LexErrorKind::InvalidNumber(text), start));
                }
            } else {
                break;
            }
        }

        let kind = match self.peek() {
            Some('L') | Some('l') if !is_double => {
                self.bump();
                TokenKind::LongLiteral
            }
            Some('d') | Some('D') | Some('f') | Some('F') => {
                self.bump();
                TokenKind::DoubleLiteral
            }
            _ if is_double => TokenKind::DoubleLiteral,
            _ => TokenKind::IntLiteral,
        };
        if self.peek().is_some_and(|n| n.is_alphanumeric() || n == '_') {
            let mut bad = text.clone();
            while let Some(n) = self.peek().filter(|n| n.is_alphanumeric() || *n == '_') {
                bad.push(n);
                self.bump();
            }
            return Err(LexerError::at(LexErrorKind::InvalidNumber(bad), start));
        }
        Ok(Token::new(kind, text, Span::range(start, self.pos)))
    }

    fn escape(&mut self, start: Coordinate) -> Result<char, LexerError> {
        let c = self
            .bump()
            .ok_or_else(|| LexerError::at(LexErrorKind::UnterminatedString, start))?;
        let decoded = match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'b' => '\u{8}',
            'f' => '\u{c}',
            '0' => '\0',
            's' => ' ',
            '\\' => '\\',
            '\'' => '\'',
            '"' => '"',
            'u' => {
                let mut hex = String::new();
                while self.peek() == Some('u') {
                    self.bump();
                }
                for _ in 0..4 {
                    match self.bump() {
                        Some(h) if h.is_ascii_hexdigit() => hex.push(h),
                        _ => {
                            return Err(LexerError::at(
                                LexErrorKind::InvalidEscape(format!("\\u{hex}")),
                                start,
                            ))
                        }
                    }
                }
                u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| {
                        LexerError::at(LexErrorKind::InvalidEscape(format!("\\u{hex}")), start)
                    })?
            }
            other => {
                return Err(LexerError::at(
                    LexErrorKind::InvalidEscape(format!("\\{other}")),
                    start,
                ))
            }
        };
        Ok(decoded)
    }

    fn string(&mut self, start: Coordinate) -> Result<Token, LexerError> {
        let mut value = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err(LexerError::at(LexErrorKind::UnterminatedString, start))
                }
                Some('"') => break,
                Some('\\') => value.push(self.escape(start)?),
                Some(c) => value.push(c),
            }
        }
        Ok(Token::new(
            TokenKind::StringLiteral,
            value,
            Span::range(start, self.pos),
        ))
    }

    fn char_literal(&mut self, start: Coordinate) -> Result<Token, LexerError> {
        let value = match self.bump() {
            None | Some('\n') => return Err(LexerError::at(LexErrorKind::UnterminatedChar, start)),
            Some('\'') => return Err(LexerError::at(LexErrorKind::EmptyChar, start)),
            Some('\\') => self.escape(start)?,
            Some(c) => c,
        };
        if !self.eat('\'') {
            return Err(LexerError::at(LexErrorKind::UnterminatedChar, start));
        }
        Ok(Token::new(
            TokenKind::CharLiteral,
            value.to_string(),
            Span::range(start, self.pos),
        ))
    }

    fn symbol(&mut self, c: char, start: Coordinate) -> Result<TokenKind, LexerError> {
        let kind = match c {
            '+' if self.eat('+') => TokenKind::PlusPlus,
            '+' if self.eat('=') => TokenKind::PlusEqual,
            '+' => TokenKind::Plus,
            '-' if self.eat('-') => TokenKind::MinusMinus,
            '-' if self.eat('=') => TokenKind::MinusEqual,
            '-' if self.eat('>') => TokenKind::Arrow,
            '-' => TokenKind::Minus,
            '*' if self.eat('=') => TokenKind::StarEqual,
            '*' => TokenKind::Star,
            '/' if self.eat('=') => TokenKind::SlashEqual,
            '/' => TokenKind::Slash,
            '%' if self.eat('=') => TokenKind::PercentEqual,
            '%' => TokenKind::Percent,
            '=' if self.eat('=') => TokenKind::EqualEqual,
            '=' => TokenKind::Equal,
            '!' if self.eat('=') => TokenKind::BangEqual,
            '!' => TokenKind::Bang,
            '<' if self.eat('=') => TokenKind::LessEqual,
            '<' => TokenKind::Less,
            '>' if self.eat('=') => TokenKind::GreaterEqual,
            '>' => TokenKind::Greater,
            '&' if self.eat('&') => TokenKind::AndAnd,
            '|' if self.eat('|') => TokenKind::OrOr,
            '|' => TokenKind::Bar,
            '.' if self.peek() == Some('.') && self.peek_second() == Some('.') => {
                self.bump();
                self.bump();
                TokenKind::Ellipsis
            }
            '.' => TokenKind::Dot,
            '?' => TokenKind::Question,
            ':' if self.eat(':') => TokenKind::ColonColon,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            '@' => TokenKind::At,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            other => return Err(LexerError::at(LexErrorKind::InvalidChar(other), start)),
        };
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("public class Calc"),
            vec![TokenKind::Public, TokenKind::Class, TokenKind::Identifier]
        );
    }

    #[test]
    fn test_numbers() {
        let tokens = Lexer::new("42 7L 3.5 1e7 2.0f 1_000").tokenize().unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::IntLiteral,
                TokenKind::LongLiteral,
                TokenKind::DoubleLiteral,
                TokenKind::DoubleLiteral,
                TokenKind::DoubleLiteral,
                TokenKind::IntLiteral,
            ]
        );
        assert_eq!(tokens[1].text, "7");
        assert_eq!(tokens[5].text, "1000");
    }

    #[test]
    fn test_comments_are_skipped() {
        let src = "// line\n/* block\n comment */ int x; /** doc */";
        assert_eq!(
            kinds(src),
            vec![TokenKind::Int, TokenKind::Identifier, TokenKind::Semicolon]
        );
    }

    #[test]
    fn test_string_and_char_escapes() {
        let tokens = Lexer::new(r#""a\tb\n" '\'' 'A'"#).tokenize().unwrap();
        assert_eq!(tokens[0].text, "a\tb\n");
        assert_eq!(tokens[1].text, "'");
        assert_eq!(tokens[2].text, "A");
    }

    #[test]
    fn test_compound_symbols() {
        assert_eq!(
            kinds("a += b++ && c != d -> e"),
            vec![
                TokenKind::Identifier,
                TokenKind::PlusEqual,
                TokenKind::Identifier,
                TokenKind::PlusPlus,
                TokenKind::AndAnd,
                TokenKind::Identifier,
                TokenKind::BangEqual,
                TokenKind::Identifier,
                TokenKind::Arrow,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn test_positions() {
        let tokens = Lexer::new("int\n  x").tokenize().unwrap();
        assert_eq!(tokens[1].span.start, Coordinate::new(2, 3));
    }

    #[test]
    fn test_unterminated_string() {
        let err = Lexer::new("\"abc").tokenize().unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedString);
    }

    #[test]
    fn test_invalid_char() {
        let err = Lexer::new("int #x").tokenize().unwrap_err();
        assert_eq!(err.kind, LexErrorKind::InvalidChar('#'));
        assert_eq!(err.position, Coordinate::new(1, 5));
    }

    #[test]
    fn test_unclosed_comment() {
        let err = Lexer::new("/* never closed").tokenize().unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedComment);
    }
}
