//! `java.util.Scanner` over the console input
//!
//! The scanner keeps the unread rest of the current line. Token reads leave
//! that rest in place, so `nextInt()` followed by `nextLine()` yields the
//! (usually empty) remainder of the number's line, as in Java.

use super::int_arg;
use super::math::{checked_radix, parse_double};
use crate::runtime::error::{ExecResult, Raised};
use crate::runtime::interpreter::Interpreter;
use crate::runtime::lock;
use crate::runtime::value::{NativeObject, ScannerState, Value};
use std::sync::Mutex;

pub(super) fn construct(args: &[Value]) -> Option<ExecResult<Value>> {
    match args {
        [Value::Native(source)] if matches!(source.as_ref(), NativeObject::InputStream) => Some(Ok(
            Value::native(NativeObject::Scanner(Mutex::new(ScannerState::default()))),
        )),
        _ => None,
    }
}

fn input_mismatch(token: &str) -> Raised {
    Raised::exception(
        "InputMismatchException",
        Some(format!("For input string: \"{token}\"")),
    )
}

/// Fill `pending` until it holds a token; false once input runs out.
/// With `lookahead` the console is never asked past its last line.
fn fill_token(interp: &Interpreter<'_>, state: &mut ScannerState, lookahead: bool) -> bool {
    loop {
        if let Some(rest) = &state.pending {
            if !rest.trim().is_empty() {
                return true;
            }
        }
        if lookahead && !interp.console().has_line() {
            return false;
        }
        match interp.console().read_line() {
            Some(line) => state.pending = Some(line),
            None => return false,
        }
    }
}

/// Peek the next whitespace-delimited token
fn peek_token(state: &ScannerState) -> Option<&str> {
    state
        .pending
        .as_deref()
        .and_then(|rest| rest.split_whitespace().next())
}

/// Remove the next token from `pending`, keeping whatever follows it
fn take_token(state: &mut ScannerState) -> Option<String> {
    let rest = state.pending.take()?;
    let start = rest.find(|c: char| !c.is_whitespace())?;
    let end = rest[start..]
        .find(char::is_whitespace)
        .map_or(rest.len(), |i| start + i);
    state.pending = Some(rest[end..].to_string());
    Some(rest[start..end].to_string())
}

fn next_token(interp: &Interpreter<'_>, state: &mut ScannerState) -> ExecResult<String> {
    if !fill_token(interp, state, false) {
        return Err(Raised::InputExhausted);
    }
    take_token(state).ok_or(Raised::InputExhausted)
}

/// Consume the next token if `parse` accepts it; a rejected token stays
/// unread and raises `InputMismatchException`
fn next_parsed<T>(
    interp: &Interpreter<'_>,
    state: &mut ScannerState,
    parse: impl Fn(&str) -> Option<T>,
) -> ExecResult<T> {
    if !fill_token(interp, state, false) {
        return Err(Raised::InputExhausted);
    }
    let token = peek_token(state).unwrap_or_default().to_string();
    match parse(&token) {
        Some(value) => {
            take_token(state);
            Ok(value)
        }
        None => Err(input_mismatch(&token)),
    }
}

pub(super) fn call_method(
    interp: &mut Interpreter<'_>,
    scanner: &Mutex<ScannerState>,
    name: &str,
    args: &[Value],
) -> Option<ExecResult<Value>> {
    let mut state = lock(scanner);
    if state.closed && name != "close" {
        return Some(Err(Raised::exception(
            "IllegalStateException",
            Some("Scanner closed".to_string()),
        )));
    }
    let result = match (name, args) {
        ("nextLine", []) => match state.pending.take() {
            Some(rest) => Ok(Value::from(rest)),
            None => interp
                .console()
                .read_line()
                .map(Value::from)
                .ok_or(Raised::InputExhausted),
        },
        ("next", []) => next_token(interp, &mut state).map(Value::from),
        ("nextInt", []) => next_parsed(interp, &mut state, |t| t.parse::<i32>().ok()).map(Value::Int),
        ("nextInt", [radix]) => {
            let radix = int_arg(radix)?;
            checked_radix(radix)
                .and_then(|radix| next_parsed(interp, &mut state, move |t| i32::from_str_radix(t, radix).ok()))
                .map(Value::Int)
        }
        ("nextLong", []) => next_parsed(interp, &mut state, |t| t.parse::<i64>().ok()).map(Value::Long),
        ("nextDouble", []) => {
            next_parsed(interp, &mut state, |t| parse_double(t).ok()).map(Value::Double)
        }
        ("nextBoolean", []) => next_parsed(interp, &mut state, |t| {
            match t.to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            }
        })
        .map(Value::Bool),
        ("hasNext", []) => Ok(Value::Bool(fill_token(interp, &mut state, true))),
        ("hasNextInt", []) => Ok(Value::Bool(
            fill_token(interp, &mut state, true)
                && peek_token(&state).is_some_and(|t| t.parse::<i32>().is_ok()),
        )),
        ("hasNextDouble", []) => Ok(Value::Bool(
            fill_token(interp, &mut state, true)
                && peek_token(&state).is_some_and(|t| parse_double(t).is_ok()),
        )),
        ("hasNextLine", []) => {
            if state.pending.is_none() && interp.console().has_line() {
                state.pending = interp.console().read_line();
            }
            Ok(Value::Bool(state.pending.is_some()))
        }
        ("close", []) => {
            state.closed = true;
            Ok(Value::Void)
        }
        _ => return None,
    };
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(pending: &str) -> ScannerState {
        ScannerState {
            pending: Some(pending.to_string()),
            closed: false,
        }
    }

    #[test]
    fn test_take_token_keeps_rest() {
        let mut s = state("  12 34  ");
        assert_eq!(take_token(&mut s).as_deref(), Some("12"));
        assert_eq!(s.pending.as_deref(), Some(" 34  "));
        assert_eq!(take_token(&mut s).as_deref(), Some("34"));
        assert_eq!(s.pending.as_deref(), Some("  "));
    }

    #[test]
    fn test_peek_token() {
        let s = state("\tabc def");
        assert_eq!(peek_token(&s), Some("abc"));
        assert_eq!(peek_token(&state("   ")), None);
    }

    #[test]
    fn test_token_at_line_end_leaves_empty_rest() {
        let mut s = state("42");
        assert_eq!(take_token(&mut s).as_deref(), Some("42"));
        assert_eq!(s.pending.as_deref(), Some(""));
    }
}
