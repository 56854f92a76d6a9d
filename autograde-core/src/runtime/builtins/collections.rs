//! `ArrayList`, `StringBuilder`, `Arrays` and `Collections`

use super::{index_error, int_arg};
use crate::runtime::error::{ExecResult, Raised};
use crate::runtime::interpreter::Interpreter;
use crate::runtime::lock;
use crate::runtime::types::Ty;
use crate::runtime::value::{JArray, NativeObject, Value};
use std::cmp::Ordering;
use std::sync::{Arc, Mutex};

// ===== construction =====

pub(super) fn construct_string_builder(
    interp: &mut Interpreter<'_>,
    args: &[Value],
) -> Option<ExecResult<Value>> {
    let initial = match args {
        [] | [Value::Int(_)] => String::new(),
        [Value::Str(s)] => s.to_string(),
        [other @ Value::Native(_)] => match interp.stringify(other) {
            Ok(text) => text,
            Err(raised) => return Some(Err(raised)),
        },
        _ => return None,
    };
    Some(Ok(Value::native(NativeObject::StringBuilder(Mutex::new(
        initial,
    )))))
}

pub(super) fn construct_list(args: &[Value]) -> Option<ExecResult<Value>> {
    let items = match args {
        [] => Vec::new(),
        [Value::Int(capacity)] if *capacity < 0 => {
            return Some(Err(Raised::exception(
                "IllegalArgumentException",
                Some(format!("Illegal Capacity: {capacity}")),
            )))
        }
        [Value::Int(_)] => Vec::new(),
        [Value::Native(native)] => match native.as_ref() {
            NativeObject::List(items) => lock(items).clone(),
            _ => return None,
        },
        _ => return None,
    };
    Some(Ok(Value::list(items)))
}

// ===== ordering =====

/// Natural ordering (`Comparable`), calling a user `compareTo` when present
fn compare_values(interp: &mut Interpreter<'_>, a: &Value, b: &Value) -> ExecResult<Ordering> {
    let ordering = match (a, b) {
        (Value::Str(x), Value::Str(y)) => x.encode_utf16().cmp(y.encode_utf16()),
        (Value::Double(_), _) | (_, Value::Double(_)) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => return Err(not_comparable(a)),
        },
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Object(object), other) => {
            let class = Arc::clone(&object.class);
            let result = interp.call_by_name(
                &class,
                Some(Arc::clone(object)),
                "compareTo",
                vec![other.clone()],
            );
            return match result {
                Ok(value) => Ok(value.as_i64().unwrap_or(0).cmp(&0)),
                Err(Raised::Exception(t)) if t.class == "NoSuchMethodError" => Err(not_comparable(a)),
                Err(raised) => Err(raised),
            };
        }
        _ => match (a.as_i64(), b.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => return Err(not_comparable(a)),
        },
    };
    Ok(ordering)
}

fn not_comparable(value: &Value) -> Raised {
    Raised::exception(
        "ClassCastException",
        Some(format!(
            "class {} cannot be cast to class java.lang.Comparable",
            value.ty()
        )),
    )
}

/// Stable merge sort with a fallible comparison
fn sort_values(interp: &mut Interpreter<'_>, items: Vec<Value>) -> ExecResult<Vec<Value>> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let mut left = items;
    let right = left.split_off(left.len() / 2);
    let left = sort_values(interp, left)?;
    let right = sort_values(interp, right)?;

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(l), Some(r)) = (left.peek(), right.peek()) {
        if compare_values(interp, r, l)? == Ordering::Less {
            merged.extend(right.next());
        } else {
            merged.extend(left.next());
        }
    }
    merged.extend(left);
    merged.extend(right);
    Ok(merged)
}

fn extreme(interp: &mut Interpreter<'_>, items: &[Value], want: Ordering) -> ExecResult<Value> {
    let mut best = items
        .first()
        .cloned()
        .ok_or_else(|| Raised::exception("NoSuchElementException", None::<String>))?;
    for item in &items[1..] {
        if compare_values(interp, item, &best)? == want {
            best = item.clone();
        }
    }
    Ok(best)
}

fn stringify_all(interp: &mut Interpreter<'_>, items: &[Value]) -> ExecResult<String> {
    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        parts.push(match item {
            Value::Array(array) => {
                let nested = array.snapshot();
                stringify_all(interp, &nested)?
            }
            other => interp.stringify(other)?,
        });
    }
    Ok(format!("[{}]", parts.join(", ")))
}

// ===== Arrays / Collections =====

pub(super) fn call_static(
    interp: &mut Interpreter<'_>,
    class: &str,
    name: &str,
    args: &[Value],
) -> Option<ExecResult<Value>> {
    match class {
        "Arrays" => call_arrays(interp, name, args),
        _ => call_collections(interp, name, args),
    }
}

fn call_arrays(interp: &mut Interpreter<'_>, name: &str, args: &[Value]) -> Option<ExecResult<Value>> {
    let result = match (name, args) {
        ("toString" | "deepToString", [Value::Null]) => Ok(Value::from("null")),
        ("toString", [Value::Array(array)]) => {
            let items = array.snapshot();
            let mut parts = Vec::with_capacity(items.len());
            for item in &items {
                match interp.stringify(item) {
                    Ok(text) => parts.push(text),
                    Err(raised) => return Some(Err(raised)),
                }
            }
            Ok(Value::from(format!("[{}]", parts.join(", "))))
        }
        ("deepToString", [Value::Array(array)]) => {
            stringify_all(interp, &array.snapshot()).map(Value::from)
        }
        ("sort", [Value::Array(array)]) => sort_values(interp, array.snapshot()).map(|sorted| {
            array.replace(sorted);
            Value::Void
        }),
        ("fill", [Value::Array(array), value]) => {
            for index in 0..array.len() {
                array.set(index, value.clone());
            }
            Ok(Value::Void)
        }
        ("copyOf", [Value::Array(array), length]) => {
            let length = int_arg(length)?;
            if length < 0 {
                Err(Raised::exception(
                    "NegativeArraySizeException",
                    Some(length.to_string()),
                ))
            } else {
                let mut items = array.snapshot();
                items.resize(length as usize, Value::default_for(&array.elem));
                Ok(Value::Array(JArray::new(array.elem.clone(), items)))
            }
        }
        ("copyOfRange", [Value::Array(array), from, to]) => {
            let (from, to) = (int_arg(from)?, int_arg(to)?);
            let items = array.snapshot();
            if from < 0 || from as usize > items.len() {
                Err(index_error("ArrayIndexOutOfBoundsException", from as i64, items.len()))
            } else if from > to {
                Err(Raised::exception(
                    "IllegalArgumentException",
                    Some(format!("{from} > {to}")),
                ))
            } else {
                let mut range: Vec<Value> = items[from as usize..(to as usize).min(items.len())].to_vec();
                range.resize((to - from) as usize, Value::default_for(&array.elem));
                Ok(Value::Array(JArray::new(array.elem.clone(), range)))
            }
        }
        ("equals", [Value::Array(a), Value::Array(b)]) => {
            let (a, b) = (a.snapshot(), b.snapshot());
            let mut equal = a.len() == b.len();
            for (x, y) in a.iter().zip(&b) {
                if !equal {
                    break;
                }
                match interp.values_equal(x, y) {
                    Ok(same) => equal = same,
                    Err(raised) => return Some(Err(raised)),
                }
            }
            Ok(Value::Bool(equal))
        }
        ("asList", [Value::Array(array)]) => Ok(Value::list(array.snapshot())),
        ("asList", items) => Ok(Value::list(items.to_vec())),
        _ => return None,
    };
    Some(result)
}

fn with_list<R>(value: &Value, f: impl FnOnce(&Mutex<Vec<Value>>) -> R) -> Option<R> {
    match value {
        Value::Native(native) => match native.as_ref() {
            NativeObject::List(items) => Some(f(items)),
            _ => None,
        },
        _ => None,
    }
}

fn call_collections(
    interp: &mut Interpreter<'_>,
    name: &str,
    args: &[Value],
) -> Option<ExecResult<Value>> {
    let result = match (name, args) {
        ("sort", [list]) => {
            let items = with_list(list, |items| lock(items).clone())?;
            sort_values(interp, items).map(|sorted| {
                with_list(list, |items| *lock(items) = sorted);
                Value::Void
            })
        }
        ("reverse", [list]) => {
            with_list(list, |items| lock(items).reverse())?;
            Ok(Value::Void)
        }
        ("swap", [list, i, j]) => {
            let (i, j) = (int_arg(i)?, int_arg(j)?);
            with_list(list, |items| {
                let mut items = lock(items);
                let len = items.len();
                for index in [i, j] {
                    if index < 0 || index as usize >= len {
                        return Err(index_error("IndexOutOfBoundsException", index as i64, len));
                    }
                }
                items.swap(i as usize, j as usize);
                Ok(Value::Void)
            })?
        }
        ("max" | "min", [list]) => {
            let items = with_list(list, |items| lock(items).clone())?;
            let want = if name == "max" { Ordering::Greater } else { Ordering::Less };
            extreme(interp, &items, want)
        }
        _ => return None,
    };
    Some(result)
}

// ===== StringBuilder =====

pub(super) fn call_string_builder(
    interp: &mut Interpreter<'_>,
    receiver: &Value,
    buffer: &Mutex<String>,
    name: &str,
    args: &[Value],
) -> Option<ExecResult<Value>> {
    let value = match (name, args) {
        ("append", [value]) => {
            let text = match value {
                Value::Array(array) if array.elem == Ty::Char => {
                    array.snapshot().iter().map(Value::display).collect()
                }
                other => match interp.stringify(other) {
                    Ok(text) => text,
                    Err(raised) => return Some(Err(raised)),
                },
            };
            lock(buffer).push_str(&text);
            receiver.clone()
        }
        ("toString", []) => Value::from(lock(buffer).clone()),
        ("length", []) => Value::Int(lock(buffer).chars().count() as i32),
        ("isEmpty", []) => Value::Bool(lock(buffer).is_empty()),
        ("reverse", []) => {
            let mut text = lock(buffer);
            *text = text.chars().rev().collect();
            receiver.clone()
        }
        ("charAt", [index]) => {
            let index = int_arg(index)?;
            let text = lock(buffer);
            let len = text.chars().count();
            match usize::try_from(index).ok().and_then(|i| text.chars().nth(i)) {
                Some(c) => Value::Char(c),
                None => {
                    return Some(Err(index_error(
                        "StringIndexOutOfBoundsException",
                        index as i64,
                        len,
                    )))
                }
            }
        }
        ("indexOf", [Value::Str(needle)]) => {
            let text = lock(buffer);
            Value::Int(
                text.find(&**needle)
                    .map_or(-1, |byte| text[..byte].chars().count() as i32),
            )
        }
        ("insert", [index, value]) => {
            let index = int_arg(index)?;
            let insert = match interp.stringify(value) {
                Ok(text) => text,
                Err(raised) => return Some(Err(raised)),
            };
            let mut text = lock(buffer);
            let mut chars: Vec<char> = text.chars().collect();
            if index < 0 || index as usize > chars.len() {
                return Some(Err(index_error(
                    "StringIndexOutOfBoundsException",
                    index as i64,
                    chars.len(),
                )));
            }
            chars.splice(index as usize..index as usize, insert.chars());
            *text = chars.into_iter().collect();
            receiver.clone()
        }
        ("deleteCharAt", [index]) => {
            let index = int_arg(index)?;
            let mut text = lock(buffer);
            let mut chars: Vec<char> = text.chars().collect();
            if index < 0 || index as usize >= chars.len() {
                return Some(Err(index_error(
                    "StringIndexOutOfBoundsException",
                    index as i64,
                    chars.len(),
                )));
            }
            chars.remove(index as usize);
            *text = chars.into_iter().collect();
            receiver.clone()
        }
        ("delete", [start, end]) => {
            let (start, end) = (int_arg(start)?, int_arg(end)?);
            let mut text = lock(buffer);
            let mut chars: Vec<char> = text.chars().collect();
            let end = (end.max(0) as usize).min(chars.len());
            if start < 0 || start as usize > end {
                return Some(Err(index_error(
                    "StringIndexOutOfBoundsException",
                    start as i64,
                    chars.len(),
                )));
            }
            chars.drain(start as usize..end);
            *text = chars.into_iter().collect();
            receiver.clone()
        }
        ("setCharAt", [index, Value::Char(c)]) => {
            let index = int_arg(index)?;
            let mut text = lock(buffer);
            let mut chars: Vec<char> = text.chars().collect();
            match usize::try_from(index).ok().filter(|i| *i < chars.len()) {
                Some(i) => chars[i] = *c,
                None => {
                    return Some(Err(index_error(
                        "StringIndexOutOfBoundsException",
                        index as i64,
                        chars.len(),
                    )))
                }
            }
            *text = chars.into_iter().collect();
            Value::Void
        }
        ("setLength", [length]) => {
            let length = int_arg(length)?.max(0) as usize;
            let mut text = lock(buffer);
            let mut chars: Vec<char> = text.chars().collect();
            chars.resize(length, '\0');
            *text = chars.into_iter().collect();
            Value::Void
        }
        _ => return None,
    };
    Some(Ok(value))
}

// ===== ArrayList =====

fn list_index(index: i32, len: usize) -> ExecResult<usize> {
    match usize::try_from(index) {
        Ok(i) if i < len => Ok(i),
        _ => Err(index_error("IndexOutOfBoundsException", index as i64, len)),
    }
}

fn position(interp: &mut Interpreter<'_>, items: &[Value], target: &Value) -> ExecResult<Option<usize>> {
    for (index, item) in items.iter().enumerate() {
        if interp.values_equal(item, target)? {
            return Ok(Some(index));
        }
    }
    Ok(None)
}

pub(super) fn call_list(
    interp: &mut Interpreter<'_>,
    list: &Mutex<Vec<Value>>,
    name: &str,
    args: &[Value],
) -> Option<ExecResult<Value>> {
    let result = match (name, args) {
        ("add", [value]) => {
            lock(list).push(value.clone());
            Ok(Value::Bool(true))
        }
        ("add", [index, value]) => {
            let index = int_arg(index)?;
            let mut items = lock(list);
            if index < 0 || index as usize > items.len() {
                Err(index_error("IndexOutOfBoundsException", index as i64, items.len()))
            } else {
                items.insert(index as usize, value.clone());
                Ok(Value::Void)
            }
        }
        ("get", [index]) => {
            let items = lock(list);
            list_index(int_arg(index)?, items.len()).map(|i| items[i].clone())
        }
        ("set", [index, value]) => {
            let mut items = lock(list);
            list_index(int_arg(index)?, items.len())
                .map(|i| std::mem::replace(&mut items[i], value.clone()))
        }
        ("size", []) => Ok(Value::Int(lock(list).len() as i32)),
        ("isEmpty", []) => Ok(Value::Bool(lock(list).is_empty())),
        ("clear", []) => {
            lock(list).clear();
            Ok(Value::Void)
        }
        ("remove", [Value::Int(index)]) => {
            let mut items = lock(list);
            list_index(*index, items.len()).map(|i| items.remove(i))
        }
        ("remove", [value]) => {
            let items = lock(list).clone();
            position(interp, &items, value).map(|found| match found {
                Some(index) => {
                    lock(list).remove(index);
                    Value::Bool(true)
                }
                None => Value::Bool(false),
            })
        }
        ("contains", [value]) => {
            let items = lock(list).clone();
            position(interp, &items, value).map(|found| Value::Bool(found.is_some()))
        }
        ("indexOf", [value]) => {
            let items = lock(list).clone();
            position(interp, &items, value)
                .map(|found| Value::Int(found.map_or(-1, |i| i as i32)))
        }
        ("lastIndexOf", [value]) => {
            let mut items = lock(list).clone();
            items.reverse();
            let len = items.len();
            position(interp, &items, value)
                .map(|found| Value::Int(found.map_or(-1, |i| (len - 1 - i) as i32)))
        }
        ("addAll", [other]) => {
            let extra = with_list(other, |items| lock(items).clone())?;
            let changed = !extra.is_empty();
            lock(list).extend(extra);
            Ok(Value::Bool(changed))
        }
        ("equals", [other]) => {
            let mine = lock(list).clone();
            let Some(theirs) = with_list(other, |items| lock(items).clone()) else {
                return Some(Ok(Value::Bool(false)));
            };
            if mine.len() != theirs.len() {
                Ok(Value::Bool(false))
            } else {
                let mut equal = true;
                for (a, b) in mine.iter().zip(&theirs) {
                    match interp.values_equal(a, b) {
                        Ok(true) => {}
                        Ok(false) => {
                            equal = false;
                            break;
                        }
                        Err(raised) => return Some(Err(raised)),
                    }
                }
                Ok(Value::Bool(equal))
            }
        }
        ("toArray", []) => Ok(Value::Array(JArray::new(Ty::Object, lock(list).clone()))),
        _ => return None,
    };
    Some(result)
}
