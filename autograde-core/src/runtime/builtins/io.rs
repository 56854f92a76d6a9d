//! `System`, `PrintStream` and throwable members

use super::{format::format_java, index_error, int_arg};
use crate::runtime::error::{ExecResult, Raised, Throwable};
use crate::runtime::interpreter::Interpreter;
use crate::runtime::types::Ty;
use crate::runtime::value::{Stream, Value};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::debug;

pub(super) fn call_system(
    interp: &mut Interpreter<'_>,
    name: &str,
    args: &[Value],
) -> Option<ExecResult<Value>> {
    let result = match (name, args) {
        ("exit", [status]) => {
            let status = int_arg(status)?;
            debug!(target: "autograde::runtime", status, "System.exit requested");
            interp.env().exit.on_exit(status);
            Err(Raised::Exit(status))
        }
        ("currentTimeMillis", []) => Ok(Value::Long(
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| d.as_millis() as i64),
        )),
        ("nanoTime", []) => Ok(Value::Long(monotonic_nanos())),
        ("lineSeparator", []) => Ok(Value::from("\n")),
        ("identityHashCode", [value]) => {
            return super::call_object_method(interp, value, "hashCode", Vec::new())
        }
        ("arraycopy", [Value::Array(src), src_pos, Value::Array(dst), dst_pos, len]) => {
            let (src_pos, dst_pos, len) = (int_arg(src_pos)?, int_arg(dst_pos)?, int_arg(len)?);
            let fits = |pos: i32, array_len: usize| {
                pos >= 0 && len >= 0 && (pos as usize + len as usize) <= array_len
            };
            if !fits(src_pos, src.len()) || !fits(dst_pos, dst.len()) {
                Err(index_error(
                    "ArrayIndexOutOfBoundsException",
                    src_pos.max(dst_pos) as i64 + len as i64,
                    src.len().min(dst.len()),
                ))
            } else {
                let items = src.snapshot();
                for offset in 0..len as usize {
                    dst.set(dst_pos as usize + offset, items[src_pos as usize + offset].clone());
                }
                Ok(Value::Void)
            }
        }
        _ => return None,
    };
    Some(result)
}

fn monotonic_nanos() -> i64 {
    use once_cell::sync::Lazy;
    static START: Lazy<Instant> = Lazy::new(Instant::now);
    START.elapsed().as_nanos() as i64
}

/// `print` renders `char[]` as text, everything else through `String.valueOf`
fn print_text(interp: &mut Interpreter<'_>, value: &Value) -> ExecResult<String> {
    match value {
        Value::Array(array) if array.elem == Ty::Char => Ok(array
            .snapshot()
            .iter()
            .map(Value::display)
            .collect()),
        other => interp.stringify(other),
    }
}

fn write(interp: &Interpreter<'_>, stream: Stream, text: &str) {
    match stream {
        Stream::Out => interp.console().write_out(text),
        Stream::Err => interp.console().write_err(text),
    }
}

pub(super) fn call_print_stream(
    interp: &mut Interpreter<'_>,
    stream: Stream,
    name: &str,
    args: &[Value],
) -> Option<ExecResult<Value>> {
    let text = match (name, args) {
        ("println", []) => Ok("\n".to_string()),
        ("println", [value]) => print_text(interp, value).map(|mut text| {
            text.push('\n');
            text
        }),
        ("print", [value]) => print_text(interp, value),
        ("printf" | "format", [Value::Str(pattern), rest @ ..]) => format_java(interp, pattern, rest),
        ("flush", []) => Ok(String::new()),
        _ => return None,
    };
    let text = match text {
        Ok(text) => text,
        Err(raised) => return Some(Err(raised)),
    };
    if !text.is_empty() {
        write(interp, stream, &text);
    }
    Some(Ok(Value::Void))
}

/// Render a throwable the way `printStackTrace` does
pub fn stack_trace_text(throwable: &Throwable) -> String {
    let mut out = String::new();
    let mut current = Some(throwable);
    let mut first = true;
    while let Some(t) = current {
        if !first {
            out.push_str("Caused by: ");
        }
        out.push_str(&t.to_string());
        out.push('\n');
        for frame in &t.trace {
            out.push_str(&format!("\t{frame}\n"));
        }
        first = false;
        current = t.cause.as_deref();
    }
    out
}

pub(super) fn call_throwable(
    interp: &mut Interpreter<'_>,
    throwable: &Arc<Throwable>,
    name: &str,
    args: &[Value],
) -> Option<ExecResult<Value>> {
    let value = match (name, args) {
        ("getMessage" | "getLocalizedMessage", []) => throwable
            .message
            .clone()
            .map_or(Value::Null, Value::from),
        ("getCause", []) => throwable
            .cause
            .clone()
            .map_or(Value::Null, Value::Throwable),
        ("toString", []) => Value::from(throwable.to_string()),
        ("printStackTrace", []) => {
            interp.console().write_err(&stack_trace_text(throwable));
            Value::Void
        }
        _ => return None,
    };
    Some(Ok(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::error::TraceFrame;

    #[test]
    fn test_stack_trace_text_includes_causes() {
        let cause = Throwable::new("ArithmeticException", Some("/ by zero".into())).with_trace(vec![
            TraceFrame {
                class: "Calc".into(),
                method: "divide".into(),
                line: Some(7),
            },
        ]);
        let outer = Throwable::new("RuntimeException", Some("wrapped".into())).with_cause(Arc::new(cause));
        let text = stack_trace_text(&outer);
        assert_eq!(
            text,
            "java.lang.RuntimeException: wrapped\n\
             Caused by: java.lang.ArithmeticException: / by zero\n\
             \tat Calc.divide(line 7)\n"
        );
    }
}
