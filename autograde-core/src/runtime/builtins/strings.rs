//! `java.lang.String`

use super::{format::format_java, index_error, int_arg};
use crate::runtime::error::{ExecResult, Raised};
use crate::runtime::interpreter::Interpreter;
use crate::runtime::lock;
use crate::runtime::types::Ty;
use crate::runtime::value::{JArray, NativeObject, Value};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Compiled patterns shared by `split`, `matches` and `replaceAll`
static PATTERNS: Lazy<Mutex<HashMap<String, Arc<Regex>>>> = Lazy::new(Default::default);

fn pattern(source: &str) -> ExecResult<Arc<Regex>> {
    if let Some(regex) = lock(&PATTERNS).get(source) {
        return Ok(Arc::clone(regex));
    }
    let regex = Regex::new(source)
        .map(Arc::new)
        .map_err(|e| Raised::exception("PatternSyntaxException", Some(e.to_string())))?;
    lock(&PATTERNS).insert(source.to_string(), Arc::clone(&regex));
    Ok(regex)
}

/// `String.hashCode`
pub(super) fn java_hash(text: &str) -> i32 {
    text.encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as i32))
}

fn string_index_error(index: i64, len: usize) -> Raised {
    index_error("StringIndexOutOfBoundsException", index, len)
}

fn chars_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Array(array) if array.elem == Ty::Char => Some(
            array
                .snapshot()
                .iter()
                .filter_map(|v| match v {
                    Value::Char(c) => Some(*c),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    }
}

pub(super) fn construct(args: &[Value]) -> Option<ExecResult<Value>> {
    let text = match args {
        [] => String::new(),
        [Value::Str(s)] => s.to_string(),
        [array] => chars_to_string(array)?,
        _ => return None,
    };
    Some(Ok(Value::from(text)))
}

pub(super) fn call_static(
    interp: &mut Interpreter<'_>,
    name: &str,
    args: &[Value],
) -> Option<ExecResult<Value>> {
    match (name, args) {
        ("valueOf" | "copyValueOf", [value]) => match chars_to_string(value) {
            Some(text) => Some(Ok(Value::from(text))),
            None => Some(interp.stringify(value).map(Value::from)),
        },
        ("format", [Value::Str(pattern), rest @ ..]) => {
            Some(format_java(interp, pattern, rest).map(Value::from))
        }
        ("join", [Value::Str(delimiter), rest @ ..]) => {
            let items = match rest {
                [Value::Native(native)] => match native.as_ref() {
                    NativeObject::List(items) => lock(items).clone(),
                    _ => return None,
                },
                [Value::Array(array)] => array.snapshot(),
                items => items.to_vec(),
            };
            let mut parts = Vec::with_capacity(items.len());
            for item in &items {
                match interp.stringify(item) {
                    Ok(text) => parts.push(text),
                    Err(raised) => return Some(Err(raised)),
                }
            }
            Some(Ok(Value::from(parts.join(delimiter))))
        }
        _ => None,
    }
}

pub(super) fn call_method(
    text: &Arc<str>,
    name: &str,
    args: &[Value],
) -> Option<ExecResult<Value>> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let result = match (name, args) {
        ("length", []) => Ok(Value::Int(len as i32)),
        ("isEmpty", []) => Ok(Value::Bool(len == 0)),
        ("isBlank", []) => Ok(Value::Bool(text.trim().is_empty())),
        ("charAt", [index]) => {
            let index = int_arg(index)? as i64;
            usize::try_from(index)
                .ok()
                .and_then(|i| chars.get(i).copied())
                .map(Value::Char)
                .ok_or_else(|| string_index_error(index, len))
        }
        ("substring", [begin]) => substring(&chars, int_arg(begin)? as i64, len as i64),
        ("substring", [begin, end]) => {
            substring(&chars, int_arg(begin)? as i64, int_arg(end)? as i64)
        }
        ("indexOf", [needle]) => Ok(Value::Int(index_of(&chars, &needle_chars(needle)?, 0))),
        ("indexOf", [needle, from]) => Ok(Value::Int(index_of(
            &chars,
            &needle_chars(needle)?,
            int_arg(from)?.max(0) as usize,
        ))),
        ("lastIndexOf", [needle]) => {
            Ok(Value::Int(last_index_of(&chars, &needle_chars(needle)?)))
        }
        ("contains", [Value::Str(needle)]) => Ok(Value::Bool(text.contains(&**needle))),
        ("contains", [Value::Null]) => Err(Raised::null_pointer("Cannot invoke contains with null")),
        ("equals", [other]) => Ok(Value::Bool(
            matches!(other, Value::Str(o) if **o == **text),
        )),
        ("equalsIgnoreCase", [other]) => Ok(Value::Bool(match other {
            Value::Str(o) => o.to_lowercase() == text.to_lowercase(),
            _ => false,
        })),
        ("compareTo", [Value::Str(other)]) => Ok(Value::Int(compare_to(text, other))),
        ("compareToIgnoreCase", [Value::Str(other)]) => Ok(Value::Int(compare_to(
            &text.to_lowercase(),
            &other.to_lowercase(),
        ))),
        ("toUpperCase", []) => Ok(Value::from(text.to_uppercase())),
        ("toLowerCase", []) => Ok(Value::from(text.to_lowercase())),
        ("trim", []) => Ok(Value::from(text.trim_matches(|c: char| c <= ' '))),
        ("strip", []) => Ok(Value::from(text.trim())),
        ("startsWith", [Value::Str(prefix)]) => Ok(Value::Bool(text.starts_with(&**prefix))),
        ("endsWith", [Value::Str(suffix)]) => Ok(Value::Bool(text.ends_with(&**suffix))),
        ("concat", [Value::Str(other)]) => Ok(Value::from(format!("{text}{other}"))),
        ("repeat", [count]) => {
            let count = int_arg(count)?;
            if count < 0 {
                Err(Raised::exception(
                    "IllegalArgumentException",
                    Some(format!("count is negative: {count}")),
                ))
            } else {
                Ok(Value::from(text.repeat(count as usize)))
            }
        }
        ("replace", [Value::Char(from), Value::Char(to)]) => {
            Ok(Value::from(text.replace(*from, &to.to_string())))
        }
        ("replace", [Value::Str(from), Value::Str(to)]) => {
            Ok(Value::from(text.replace(&**from, to)))
        }
        ("replaceAll", [Value::Str(regex), Value::Str(replacement)]) => pattern(regex)
            .map(|re| Value::from(re.replace_all(text, &**replacement).into_owned())),
        ("replaceFirst", [Value::Str(regex), Value::Str(replacement)]) => pattern(regex)
            .map(|re| Value::from(re.replace(text, &**replacement).into_owned())),
        ("matches", [Value::Str(regex)]) => pattern(&format!("^(?:{regex})$"))
            .map(|re| Value::Bool(re.is_match(text))),
        ("split", [Value::Str(regex)]) => split(text, regex, 0),
        ("split", [Value::Str(regex), limit]) => split(text, regex, int_arg(limit)?),
        ("toCharArray", []) => Ok(Value::Array(JArray::new(
            Ty::Char,
            chars.iter().copied().map(Value::Char).collect(),
        ))),
        ("hashCode", []) => Ok(Value::Int(java_hash(text))),
        ("toString" | "intern", []) => Ok(Value::Str(Arc::clone(text))),
        _ => return None,
    };
    Some(result)
}

fn needle_chars(needle: &Value) -> Option<Vec<char>> {
    match needle {
        Value::Str(s) => Some(s.chars().collect()),
        Value::Char(c) => Some(vec![*c]),
        Value::Int(i) => char::from_u32(*i as u32).map(|c| vec![c]),
        _ => None,
    }
}

fn index_of(haystack: &[char], needle: &[char], from: usize) -> i32 {
    if needle.is_empty() {
        return from.min(haystack.len()) as i32;
    }
    (from..haystack.len())
        .find(|&i| haystack[i..].starts_with(needle))
        .map_or(-1, |i| i as i32)
}

fn last_index_of(haystack: &[char], needle: &[char]) -> i32 {
    if needle.is_empty() {
        return haystack.len() as i32;
    }
    (0..haystack.len())
        .rev()
        .find(|&i| haystack[i..].starts_with(needle))
        .map_or(-1, |i| i as i32)
}

fn substring(chars: &[char], begin: i64, end: i64) -> ExecResult<Value> {
    let len = chars.len() as i64;
    if begin < 0 || end > len || begin > end {
        return Err(Raised::exception(
            "StringIndexOutOfBoundsException",
            Some(format!("begin {begin}, end {end}, length {len}")),
        ));
    }
    Ok(Value::from(
        chars[begin as usize..end as usize].iter().collect::<String>(),
    ))
}

/// `String.compareTo`: first differing UTF-16 unit, else length difference
fn compare_to(a: &str, b: &str) -> i32 {
    let (a, b): (Vec<u16>, Vec<u16>) = (a.encode_utf16().collect(), b.encode_utf16().collect());
    for (x, y) in a.iter().zip(&b) {
        if x != y {
            return *x as i32 - *y as i32;
        }
    }
    a.len() as i32 - b.len() as i32
}

/// `String.split` with Java's trailing-empty-string removal for `limit == 0`
fn split(text: &str, regex: &str, limit: i32) -> ExecResult<Value> {
    let re = pattern(regex)?;
    let mut parts: Vec<&str> = if limit > 0 {
        re.splitn(text, limit as usize).collect()
    } else {
        re.split(text).collect()
    };
    if !text.is_empty() && parts.first() == Some(&"") {
        // a zero-width match at the start never yields a leading empty string
        if re.find(text).is_some_and(|m| m.start() == 0 && m.end() == 0) {
            parts.remove(0);
        }
    }
    if limit == 0 && !text.is_empty() {
        while parts.last() == Some(&"") {
            parts.pop();
        }
    }
    let items = parts.into_iter().map(Value::from).collect();
    Ok(Value::Array(JArray::new(Ty::String, items)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_strings(text: &str, regex: &str) -> Vec<String> {
        let Value::Array(array) = split(text, regex, 0).unwrap() else {
            panic!("expected array");
        };
        array.snapshot().iter().map(Value::display).collect()
    }

    #[test]
    fn test_split_drops_trailing_empties() {
        assert_eq!(split_strings("a,b,,", ","), vec!["a", "b"]);
        assert_eq!(split_strings(",a", ","), vec!["", "a"]);
        assert_eq!(split_strings("1 2   3", "\\s+"), vec!["1", "2", "3"]);
        assert_eq!(split_strings("", ","), vec![""]);
    }

    #[test]
    fn test_split_with_limit() {
        let Value::Array(array) = split("a:b:c", ":", 2).unwrap() else {
            panic!("expected array");
        };
        assert_eq!(array.len(), 2);
        assert_eq!(array.get(1), Some(Value::from("b:c")));
    }

    #[test]
    fn test_compare_to() {
        assert_eq!(compare_to("apple", "banana"), 'a' as i32 - 'b' as i32);
        assert_eq!(compare_to("ab", "abc"), -1);
        assert_eq!(compare_to("same", "same"), 0);
    }

    #[test]
    fn test_java_hash() {
        assert_eq!(java_hash(""), 0);
        assert_eq!(java_hash("hello"), 99162322);
    }

    #[test]
    fn test_substring_bounds() {
        let chars: Vec<char> = "hello".chars().collect();
        assert_eq!(substring(&chars, 1, 3).unwrap(), Value::from("el"));
        let Err(Raised::Exception(t)) = substring(&chars, 2, 9) else {
            panic!("expected exception");
        };
        assert_eq!(t.message.as_deref(), Some("begin 2, end 9, length 5"));
    }

    #[test]
    fn test_index_of() {
        let hay: Vec<char> = "banana".chars().collect();
        assert_eq!(index_of(&hay, &['n', 'a'], 0), 2);
        assert_eq!(index_of(&hay, &['n', 'a'], 3), 4);
        assert_eq!(last_index_of(&hay, &['a']), 5);
        assert_eq!(index_of(&hay, &['x'], 0), -1);
    }

    #[test]
    fn test_bad_pattern() {
        assert!(pattern("(").is_err());
    }
}
