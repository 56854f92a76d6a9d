//! Source units and the structural scan that runs before compilation
//!
//! The scan never parses: it blanks out comments, string literals and char
//! literals (keeping byte offsets and line breaks) and then looks for the
//! `package`, `import` and `public class` declarations in what is left.

use std::ops::Range;

/// Origin of a unit that did not come from a file
pub const MEMORY_ORIGIN: &str = "<memory>";

const CLASS_MODIFIERS: &[&str] = &["final", "abstract", "static", "strictfp"];

/// A unit of submitted source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    /// File path, or [`MEMORY_ORIGIN`]
    pub origin: String,
    pub text: String,
    /// Namespace named by the unit's own `package` declaration
    pub declared_namespace: Option<String>,
    /// Simple name of the public entry type
    pub entry_name: Option<String>,
    pub imports: Vec<String>,
    /// Namespace after rewriting, once the compiler has assigned one
    pub effective_namespace: Option<String>,
}

impl SourceUnit {
    /// Scan `text`, inferring the entry type and namespace
    pub fn new(origin: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let code = mask_non_code(&text);
        Self {
            origin: origin.into(),
            declared_namespace: find_package(&code).map(|(name, _)| name),
            entry_name: find_public_class(&code),
            imports: find_imports(&code),
            effective_namespace: None,
            text,
        }
    }

    pub fn from_memory(text: impl Into<String>) -> Self {
        Self::new(MEMORY_ORIGIN, text)
    }

    /// Use a caller-supplied entry type name instead of the inferred one
    pub fn with_entry(mut self, name: impl Into<String>) -> Self {
        self.entry_name = Some(name.into());
        self
    }

    /// File name diagnostics refer to (`Calc.java`)
    pub fn file_name(&self) -> String {
        if self.origin != MEMORY_ORIGIN {
            let name = self
                .origin
                .rsplit(['/', '\\'])
                .next()
                .unwrap_or(self.origin.as_str());
            if !name.is_empty() {
                return name.to_string();
            }
        }
        match &self.entry_name {
            Some(entry) => format!("{entry}.java"),
            None => MEMORY_ORIGIN.to_string(),
        }
    }

    /// Point the unit at `namespace`, rewriting or synthesizing its
    /// `package` declaration
    pub fn rewrite_namespace(&mut self, namespace: &str) {
        self.text = rewrite_namespace(&self.text, namespace);
        self.effective_namespace = Some(namespace.to_string());
    }
}

/// Simple name of the first `public class` outside comments and literals
pub fn infer_entry_name(text: &str) -> Option<String> {
    find_public_class(&mask_non_code(text))
}

/// Replace the unit's `package` declaration with `namespace`, or add one.
///
/// A synthesized declaration goes on the first line so line numbers in
/// diagnostics still match the submitted file.
pub fn rewrite_namespace(text: &str, namespace: &str) -> String {
    let code = mask_non_code(text);
    let declaration = format!("package {namespace};");
    match find_package(&code) {
        Some((_, range)) => {
            let mut rewritten = String::with_capacity(text.len() + namespace.len());
            rewritten.push_str(&text[..range.start]);
            rewritten.push_str(&declaration);
            rewritten.push_str(&text[range.end..]);
            rewritten
        }
        None => format!("{declaration} {text}"),
    }
}

/// Words and punctuation of masked code, with their byte ranges
fn words(code: &str) -> Vec<(&str, Range<usize>)> {
    let is_word = |c: char| c.is_alphanumeric() || c == '_' || c == '$';
    let mut out = Vec::new();
    let mut iter = code.char_indices().peekable();
    while let Some((start, c)) = iter.next() {
        if c.is_whitespace() {
            continue;
        }
        let mut end = start + c.len_utf8();
        if is_word(c) {
            while let Some(&(i, next)) = iter.peek() {
                if !is_word(next) {
                    break;
                }
                end = i + next.len_utf8();
                iter.next();
            }
        }
        out.push((&code[start..end], start..end));
    }
    out
}

fn is_identifier(word: &str) -> bool {
    word.chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
}

/// `a.b.c` starting at `words[at]`, up to and including the closing `;`.
/// Returns the dotted name and the index of the `;`.
fn dotted_name(words: &[(&str, Range<usize>)], at: usize, allow_star: bool) -> Option<(String, usize)> {
    let mut name = String::new();
    let mut index = at;
    loop {
        let (word, _) = words.get(index)?;
        let last = allow_star && *word == "*";
        if !(is_identifier(word) || last) {
            return None;
        }
        name.push_str(word);
        index += 1;
        match words.get(index)?.0 {
            ";" => return Some((name, index)),
            "." if !last => {
                name.push('.');
                index += 1;
            }
            _ => return None,
        }
    }
}

fn find_package(code: &str) -> Option<(String, Range<usize>)> {
    let words = words(code);
    words.iter().enumerate().find_map(|(i, (word, range))| {
        if *word != "package" {
            return None;
        }
        let (name, end) = dotted_name(&words, i + 1, false)?;
        Some((name, range.start..words[end].1.end))
    })
}

fn find_imports(code: &str) -> Vec<String> {
    let words = words(code);
    words
        .iter()
        .enumerate()
        .filter(|(_, (word, _))| *word == "import")
        .filter_map(|(i, _)| {
            let start = if words.get(i + 1).map(|w| w.0) == Some("static") { i + 2 } else { i + 1 };
            dotted_name(&words, start, true).map(|(name, _)| name)
        })
        .collect()
}

/// `public [final|abstract|static|strictfp]* class Name`
fn find_public_class(code: &str) -> Option<String> {
    let words = words(code);
    words.iter().enumerate().find_map(|(i, (word, _))| {
        if *word != "public" {
            return None;
        }
        let mut index = i + 1;
        while words.get(index).is_some_and(|(w, _)| CLASS_MODIFIERS.contains(w)) {
            index += 1;
        }
        if words.get(index)?.0 != "class" {
            return None;
        }
        let (name, _) = words.get(index + 1)?;
        is_identifier(name).then(|| name.to_string())
    })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Region {
    Code,
    LineComment,
    BlockComment,
    Str,
    Char,
}

/// Blank out comments, string literals and char literals.
///
/// Every masked character becomes as many spaces as it has UTF-8 bytes, and
/// line breaks are kept, so offsets into the result are offsets into `text`.
pub fn mask_non_code(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut region = Region::Code;
    let mut chars = text.chars().peekable();
    let blank = |out: &mut String, c: char| {
        if c == '\n' {
            out.push('\n');
        } else {
            out.extend(std::iter::repeat(' ').take(c.len_utf8()));
        }
    };

    while let Some(c) = chars.next() {
        match region {
            Region::Code => match c {
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    out.push_str("  ");
                    region = Region::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    out.push_str("  ");
                    region = Region::BlockComment;
                }
                '"' => {
                    out.push(' ');
                    region = Region::Str;
                }
                '\'' => {
                    out.push(' ');
                    region = Region::Char;
                }
                _ => out.push(c),
            },
            Region::LineComment => {
                if c == '\n' {
                    region = Region::Code;
                }
                blank(&mut out, c);
            }
            Region::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("  ");
                    region = Region::Code;
                } else {
                    blank(&mut out, c);
                }
            }
            Region::Str | Region::Char => {
                let quote = if region == Region::Str { '"' } else { '\'' };
                match c {
                    '\\' => {
                        blank(&mut out, c);
                        if let Some(escaped) = chars.next() {
                            blank(&mut out, escaped);
                        }
                    }
                    // an unterminated literal ends at the line break
                    '\n' => {
                        out.push('\n');
                        region = Region::Code;
                    }
                    c if c == quote => {
                        out.push(' ');
                        region = Region::Code;
                    }
                    c => blank(&mut out, c),
                }
            }
        }
    }
    out
}
