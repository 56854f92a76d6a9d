//! `Math` and the boxed-number classes

use super::{int_arg, number_format, strings::java_hash};
use crate::runtime::error::{ExecResult, Raised};
use crate::runtime::types::Ty;
use crate::runtime::value::{java_double, Value};
use std::cmp::Ordering;
use std::time::{SystemTime, UNIX_EPOCH};

pub(super) fn static_field(class: &str, name: &str) -> Option<Value> {
    let value = match (class, name) {
        ("Math", "PI") => Value::Double(std::f64::consts::PI),
        ("Math", "E") => Value::Double(std::f64::consts::E),
        ("Integer", "MAX_VALUE") => Value::Int(i32::MAX),
        ("Integer", "MIN_VALUE") => Value::Int(i32::MIN),
        ("Long", "MAX_VALUE") => Value::Long(i64::MAX),
        ("Long", "MIN_VALUE") => Value::Long(i64::MIN),
        ("Double", "MAX_VALUE") => Value::Double(f64::MAX),
        ("Double", "MIN_VALUE") => Value::Double(f64::from_bits(1)),
        ("Double", "POSITIVE_INFINITY") => Value::Double(f64::INFINITY),
        ("Double", "NEGATIVE_INFINITY") => Value::Double(f64::NEG_INFINITY),
        ("Double", "NaN") => Value::Double(f64::NAN),
        ("Character", "MAX_VALUE") => Value::Char('\u{FFFF}'),
        ("Character", "MIN_VALUE") => Value::Char('\0'),
        _ => return None,
    };
    Some(value)
}

pub(super) fn call_static(class: &str, name: &str, args: &[Value]) -> Option<ExecResult<Value>> {
    match class {
        "Math" => call_math(name, args),
        "Integer" => call_integer(name, args),
        "Long" => call_long(name, args),
        "Double" => call_double(name, args),
        "Boolean" => match (name, args) {
            ("parseBoolean" | "valueOf", [Value::Str(s)]) => {
                Some(Ok(Value::Bool(s.eq_ignore_ascii_case("true"))))
            }
            ("parseBoolean", [Value::Null]) => Some(Ok(Value::Bool(false))),
            ("valueOf", [Value::Bool(b)]) => Some(Ok(Value::Bool(*b))),
            ("toString", [Value::Bool(b)]) => Some(Ok(Value::from(b.to_string()))),
            _ => None,
        },
        "Character" => call_character(name, args),
        _ => None,
    }
}

fn float(value: &Value) -> Option<f64> {
    value.as_f64()
}

fn call_math(name: &str, args: &[Value]) -> Option<ExecResult<Value>> {
    let value = match (name, args) {
        ("abs", [Value::Int(i)]) => Value::Int(i.wrapping_abs()),
        ("abs", [Value::Long(l)]) => Value::Long(l.wrapping_abs()),
        ("abs", [Value::Char(c)]) => Value::Int(*c as i32),
        ("abs", [Value::Double(d)]) => Value::Double(d.abs()),
        ("max" | "min", [a, b]) => extremum(name == "max", a, b)?,
        ("pow", [a, b]) => Value::Double(float(a)?.powf(float(b)?)),
        ("sqrt", [a]) => Value::Double(float(a)?.sqrt()),
        ("cbrt", [a]) => Value::Double(float(a)?.cbrt()),
        ("floor", [a]) => Value::Double(float(a)?.floor()),
        ("ceil", [a]) => Value::Double(float(a)?.ceil()),
        ("round", [a]) => Value::Long(java_round(float(a)?)),
        ("random", []) => Value::Double(pseudo_random()),
        ("hypot", [a, b]) => Value::Double(float(a)?.hypot(float(b)?)),
        ("log", [a]) => Value::Double(float(a)?.ln()),
        ("log10", [a]) => Value::Double(float(a)?.log10()),
        ("exp", [a]) => Value::Double(float(a)?.exp()),
        ("signum", [a]) => {
            let d = float(a)?;
            Value::Double(if d == 0.0 || d.is_nan() { d } else { d.signum() })
        }
        ("sin", [a]) => Value::Double(float(a)?.sin()),
        ("cos", [a]) => Value::Double(float(a)?.cos()),
        ("tan", [a]) => Value::Double(float(a)?.tan()),
        ("atan2", [a, b]) => Value::Double(float(a)?.atan2(float(b)?)),
        ("toRadians", [a]) => Value::Double(float(a)?.to_radians()),
        ("toDegrees", [a]) => Value::Double(float(a)?.to_degrees()),
        ("floorDiv" | "floorMod", [a, b]) => {
            let (x, y) = (a.as_i64()?, b.as_i64()?);
            if y == 0 {
                return Some(Err(Raised::exception(
                    "ArithmeticException",
                    Some("/ by zero".to_string()),
                )));
            }
            let quotient = floor_div(x, y);
            let result = if name == "floorDiv" {
                quotient
            } else {
                x.wrapping_sub(quotient.wrapping_mul(y))
            };
            if matches!((a, b), (Value::Long(_), _) | (_, Value::Long(_))) {
                Value::Long(result)
            } else {
                Value::Int(result as i32)
            }
        }
        _ => return None,
    };
    Some(Ok(value))
}

fn floor_div(x: i64, y: i64) -> i64 {
    let quotient = x.wrapping_div(y);
    if x.wrapping_rem(y) != 0 && ((x < 0) != (y < 0)) {
        quotient - 1
    } else {
        quotient
    }
}

/// `Math.max`/`Math.min` with binary numeric promotion
fn extremum(max: bool, a: &Value, b: &Value) -> Option<Value> {
    let pick = |ordering: Ordering| (ordering == Ordering::Greater) == max;
    Some(match (a, b) {
        (Value::Double(_), _) | (_, Value::Double(_)) => {
            let (x, y) = (a.as_f64()?, b.as_f64()?);
            if x.is_nan() || y.is_nan() {
                Value::Double(f64::NAN)
            } else {
                Value::Double(if pick(x.total_cmp(&y)) { x } else { y })
            }
        }
        (Value::Long(_), _) | (_, Value::Long(_)) => {
            let (x, y) = (a.as_i64()?, b.as_i64()?);
            Value::Long(if pick(x.cmp(&y)) { x } else { y })
        }
        _ => {
            let (x, y) = (int_arg(a)?, int_arg(b)?);
            Value::Int(if pick(x.cmp(&y)) { x } else { y })
        }
    })
}

/// `Math.round`: round half up, saturating
fn java_round(d: f64) -> i64 {
    if d.is_nan() {
        return 0;
    }
    (d + 0.5).floor() as i64
}

/// xorshift seeded from the clock; submitted programs only need "some" value
fn pseudo_random() -> f64 {
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x2545_F491_4F6C_DD1D);
    let mut x = seed | 1;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    (x >> 11) as f64 / (1u64 << 53) as f64
}

/// Radix as `Integer.parseInt` and `Scanner.nextInt` accept it
pub(super) fn checked_radix(radix: i32) -> ExecResult<u32> {
    let message = if radix < 2 {
        format!("radix {radix} less than Character.MIN_RADIX")
    } else if radix > 36 {
        format!("radix {radix} greater than Character.MAX_RADIX")
    } else {
        return Ok(radix as u32);
    };
    Err(Raised::exception("NumberFormatException", Some(message)))
}

fn parse_int(text: &str, radix: u32) -> ExecResult<i64> {
    i64::from_str_radix(text, radix).map_err(|_| number_format(text))
}

fn call_integer(name: &str, args: &[Value]) -> Option<ExecResult<Value>> {
    let result = match (name, args) {
        ("parseInt" | "valueOf", [Value::Str(s)]) => parse_int(s, 10).and_then(|v| to_i32(v, s)),
        ("parseInt" | "valueOf", [Value::Str(s), Value::Int(radix)]) => checked_radix(*radix)
            .and_then(|radix| parse_int(s, radix))
            .and_then(|v| to_i32(v, s)),
        ("parseInt", [Value::Null]) => Err(Raised::exception(
            "NumberFormatException",
            Some("Cannot parse null string: null".to_string()),
        )),
        ("valueOf", [v]) => Ok(Value::Int(int_arg(v)?)),
        ("toString", [v]) => Ok(Value::from(int_arg(v)?.to_string())),
        ("toString", [v, Value::Int(radix)]) => Ok(Value::from(to_radix(int_arg(v)? as i64, *radix as u32))),
        ("toBinaryString", [v]) => Ok(Value::from(format!("{:b}", int_arg(v)? as u32))),
        ("toHexString", [v]) => Ok(Value::from(format!("{:x}", int_arg(v)? as u32))),
        ("toOctalString", [v]) => Ok(Value::from(format!("{:o}", int_arg(v)? as u32))),
        ("compare", [a, b]) => Ok(Value::Int(ordering(int_arg(a)?.cmp(&int_arg(b)?)))),
        ("sum", [a, b]) => Ok(Value::Int(int_arg(a)?.wrapping_add(int_arg(b)?))),
        ("max", [a, b]) => Ok(Value::Int(int_arg(a)?.max(int_arg(b)?))),
        ("min", [a, b]) => Ok(Value::Int(int_arg(a)?.min(int_arg(b)?))),
        ("signum", [a]) => Ok(Value::Int(int_arg(a)?.signum())),
        _ => return None,
    };
    Some(result)
}

fn to_i32(value: i64, text: &str) -> ExecResult<Value> {
    i32::try_from(value)
        .map(Value::Int)
        .map_err(|_| number_format(text))
}

fn to_radix(mut value: i64, radix: u32) -> String {
    if !(2..=36).contains(&radix) || value == 0 {
        return value.to_string();
    }
    let negative = value < 0;
    let mut digits = Vec::new();
    while value != 0 {
        let digit = (value % radix as i64).unsigned_abs() as u32;
        digits.push(char::from_digit(digit, radix).unwrap_or('?'));
        value /= radix as i64;
    }
    if negative {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

fn call_long(name: &str, args: &[Value]) -> Option<ExecResult<Value>> {
    let result = match (name, args) {
        ("parseLong" | "valueOf", [Value::Str(s)]) => parse_int(s, 10).map(Value::Long),
        ("valueOf", [v]) => Ok(Value::Long(v.as_i64()?)),
        ("toString", [v]) => Ok(Value::from(v.as_i64()?.to_string())),
        ("compare", [a, b]) => Ok(Value::Int(ordering(a.as_i64()?.cmp(&b.as_i64()?)))),
        ("max", [a, b]) => Ok(Value::Long(a.as_i64()?.max(b.as_i64()?))),
        ("min", [a, b]) => Ok(Value::Long(a.as_i64()?.min(b.as_i64()?))),
        ("sum", [a, b]) => Ok(Value::Long(a.as_i64()?.wrapping_add(b.as_i64()?))),
        _ => return None,
    };
    Some(result)
}

/// `Double.parseDouble`: surrounding whitespace allowed, `d`/`f` suffix allowed
pub(super) fn parse_double(text: &str) -> ExecResult<f64> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_suffix(['d', 'D', 'f', 'F'])
        .unwrap_or(trimmed);
    match body {
        "NaN" => return Ok(f64::NAN),
        "Infinity" | "+Infinity" => return Ok(f64::INFINITY),
        "-Infinity" => return Ok(f64::NEG_INFINITY),
        _ => {}
    }
    let valid = !body.is_empty()
        && body
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'));
    if !valid {
        return Err(number_format(text));
    }
    body.parse::<f64>().map_err(|_| number_format(text))
}

fn call_double(name: &str, args: &[Value]) -> Option<ExecResult<Value>> {
    let result = match (name, args) {
        ("parseDouble" | "valueOf", [Value::Str(s)]) => parse_double(s).map(Value::Double),
        ("parseDouble", [Value::Null]) => Err(Raised::null_pointer("Cannot parse null string")),
        ("valueOf", [v]) => Ok(Value::Double(v.as_f64()?)),
        ("toString", [v]) => Ok(Value::from(java_double(v.as_f64()?))),
        ("compare", [a, b]) => Ok(Value::Int(ordering(a.as_f64()?.total_cmp(&b.as_f64()?)))),
        ("isNaN", [v]) => Ok(Value::Bool(v.as_f64()?.is_nan())),
        ("isInfinite", [v]) => Ok(Value::Bool(v.as_f64()?.is_infinite())),
        ("max", [a, b]) => Ok(Value::Double(a.as_f64()?.max(b.as_f64()?))),
        ("min", [a, b]) => Ok(Value::Double(a.as_f64()?.min(b.as_f64()?))),
        ("sum", [a, b]) => Ok(Value::Double(a.as_f64()? + b.as_f64()?)),
        _ => return None,
    };
    Some(result)
}

fn call_character(name: &str, args: &[Value]) -> Option<ExecResult<Value>> {
    let c = match args {
        [Value::Char(c)] => *c,
        [Value::Int(i)] => char::from_u32(*i as u32)?,
        _ => return None,
    };
    let value = match name {
        "isDigit" => Value::Bool(c.is_ascii_digit()),
        "isLetter" => Value::Bool(c.is_alphabetic()),
        "isAlphabetic" => Value::Bool(c.is_alphabetic()),
        "isLetterOrDigit" => Value::Bool(c.is_alphanumeric()),
        "isUpperCase" => Value::Bool(c.is_uppercase()),
        "isLowerCase" => Value::Bool(c.is_lowercase()),
        "isWhitespace" => Value::Bool(c.is_whitespace()),
        "toUpperCase" => Value::Char(c.to_uppercase().next().unwrap_or(c)),
        "toLowerCase" => Value::Char(c.to_lowercase().next().unwrap_or(c)),
        "getNumericValue" => Value::Int(c.to_digit(36).map_or(-1, |d| d as i32)),
        "toString" => Value::from(c.to_string()),
        "valueOf" => Value::Char(c),
        _ => return None,
    };
    Some(Ok(value))
}

fn ordering(ordering: Ordering) -> i32 {
    match ordering {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

/// Instance methods of boxed primitives (`Integer x; x.compareTo(y)`)
pub(super) fn call_boxed(receiver: &Value, name: &str, args: &[Value]) -> Option<ExecResult<Value>> {
    let value = match (name, args) {
        ("toString", []) => Value::from(receiver.display()),
        ("equals", [other]) => Value::Bool(
            std::mem::discriminant(receiver) == std::mem::discriminant(other) && receiver.same(other),
        ),
        ("hashCode", []) => Value::Int(match receiver {
            Value::Bool(b) => {
                if *b {
                    1231
                } else {
                    1237
                }
            }
            Value::Long(l) => (*l ^ (*l >> 32)) as i32,
            Value::Double(d) => {
                let bits = d.to_bits();
                (bits ^ (bits >> 32)) as i32
            }
            Value::Char(c) => *c as i32,
            Value::Int(i) => *i,
            other => java_hash(&other.display()),
        }),
        ("compareTo" | "compare", [other]) => Value::Int(match (receiver, other) {
            (Value::Double(_), _) | (_, Value::Double(_)) => {
                ordering(receiver.as_f64()?.total_cmp(&other.as_f64()?))
            }
            (Value::Bool(a), Value::Bool(b)) => ordering(a.cmp(b)),
            _ => ordering(receiver.as_i64()?.cmp(&other.as_i64()?)),
        }),
        ("intValue", []) => receiver.cast(&Ty::Int)?,
        ("longValue", []) => receiver.cast(&Ty::Long)?,
        ("doubleValue", []) => receiver.cast(&Ty::Double)?,
        ("charValue", []) | ("booleanValue", []) => receiver.clone(),
        _ => return None,
    };
    Some(Ok(value))
}
