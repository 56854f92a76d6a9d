//! Natively implemented library classes
//!
//! Static members (`Math.max`, `Integer.parseInt`, `System.out`) dispatch on
//! the class name; instance members dispatch on the receiver value. Each
//! submodule answers `None` for a member it does not know so the caller can
//! report `NoSuchMethodError` in one place.

mod collections;
mod format;
mod io;
mod math;
mod scanner;
mod strings;

pub use format::format_java;
pub use io::stack_trace_text;

use super::error::{ExecResult, Raised};
use super::interpreter::Interpreter;
use super::types::{is_throwable_class, library_simple_name, Ty};
use super::value::{NativeObject, Value};
use once_cell::sync::Lazy;
use std::sync::Arc;

/// Library classes that can appear in front of a `.` in submitted code
const STATIC_HOLDERS: &[&str] = &[
    "Math",
    "System",
    "Integer",
    "Long",
    "Double",
    "Boolean",
    "Character",
    "String",
    "Arrays",
    "Collections",
];

/// Canonical name of a library class usable as a static member holder
pub fn library_class(name: &str) -> Option<&'static str> {
    let simple = library_simple_name(name);
    STATIC_HOLDERS.iter().copied().find(|holder| *holder == simple)
}

/// One member of the ambient library, as reflection sees it
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryMethod {
    pub class: &'static str,
    pub name: &'static str,
    pub is_static: bool,
    pub params: Vec<Ty>,
    pub returns: Ty,
}

fn stat(class: &'static str, name: &'static str, params: &[Ty], returns: Ty) -> LibraryMethod {
    LibraryMethod {
        class,
        name,
        is_static: true,
        params: params.to_vec(),
        returns,
    }
}

fn inst(class: &'static str, name: &'static str, params: &[Ty], returns: Ty) -> LibraryMethod {
    LibraryMethod {
        is_static: false,
        ..stat(class, name, params, returns)
    }
}

/// Reflection table of the ambient classes that resolve by name
static LIBRARY: Lazy<Vec<LibraryMethod>> = Lazy::new(|| {
    use Ty::{Boolean, Char, Double, Int, Long, String as Str};
    vec![
        stat("Math", "abs", &[Int], Int),
        stat("Math", "abs", &[Long], Long),
        stat("Math", "abs", &[Double], Double),
        stat("Math", "max", &[Int, Int], Int),
        stat("Math", "max", &[Long, Long], Long),
        stat("Math", "max", &[Double, Double], Double),
        stat("Math", "min", &[Int, Int], Int),
        stat("Math", "min", &[Long, Long], Long),
        stat("Math", "min", &[Double, Double], Double),
        stat("Math", "pow", &[Double, Double], Double),
        stat("Math", "sqrt", &[Double], Double),
        stat("Math", "cbrt", &[Double], Double),
        stat("Math", "floor", &[Double], Double),
        stat("Math", "ceil", &[Double], Double),
        stat("Math", "round", &[Double], Long),
        stat("Math", "random", &[], Double),
        stat("Math", "hypot", &[Double, Double], Double),
        stat("Math", "log", &[Double], Double),
        stat("Math", "log10", &[Double], Double),
        stat("Math", "exp", &[Double], Double),
        stat("Math", "signum", &[Double], Double),
        stat("Math", "floorDiv", &[Int, Int], Int),
        stat("Math", "floorMod", &[Int, Int], Int),
        stat("Math", "sin", &[Double], Double),
        stat("Math", "cos", &[Double], Double),
        stat("Math", "tan", &[Double], Double),
        stat("Math", "toRadians", &[Double], Double),
        stat("Math", "toDegrees", &[Double], Double),
        stat("Integer", "parseInt", &[Str], Int),
        stat("Integer", "parseInt", &[Str, Int], Int),
        stat("Integer", "valueOf", &[Int], Int),
        stat("Integer", "valueOf", &[Str], Int),
        stat("Integer", "toString", &[Int], Str),
        stat("Integer", "toString", &[Int, Int], Str),
        stat("Integer", "toBinaryString", &[Int], Str),
        stat("Integer", "toHexString", &[Int], Str),
        stat("Integer", "compare", &[Int, Int], Int),
        stat("Integer", "sum", &[Int, Int], Int),
        stat("Integer", "max", &[Int, Int], Int),
        stat("Integer", "min", &[Int, Int], Int),
        stat("Long", "parseLong", &[Str], Long),
        stat("Long", "valueOf", &[Long], Long),
        stat("Long", "toString", &[Long], Str),
        stat("Long", "compare", &[Long, Long], Int),
        stat("Double", "parseDouble", &[Str], Double),
        stat("Double", "valueOf", &[Double], Double),
        stat("Double", "valueOf", &[Str], Double),
        stat("Double", "toString", &[Double], Str),
        stat("Double", "compare", &[Double, Double], Int),
        stat("Double", "isNaN", &[Double], Boolean),
        stat("Boolean", "parseBoolean", &[Str], Boolean),
        stat("Boolean", "toString", &[Boolean], Str),
        stat("Character", "isDigit", &[Char], Boolean),
        stat("Character", "isLetter", &[Char], Boolean),
        stat("Character", "isLetterOrDigit", &[Char], Boolean),
        stat("Character", "isAlphabetic", &[Int], Boolean),
        stat("Character", "isUpperCase", &[Char], Boolean),
        stat("Character", "isLowerCase", &[Char], Boolean),
        stat("Character", "isWhitespace", &[Char], Boolean),
        stat("Character", "toUpperCase", &[Char], Char),
        stat("Character", "toLowerCase", &[Char], Char),
        stat("Character", "getNumericValue", &[Char], Int),
        stat("String", "valueOf", &[Int], Str),
        stat("String", "valueOf", &[Long], Str),
        stat("String", "valueOf", &[Double], Str),
        stat("String", "valueOf", &[Char], Str),
        stat("String", "valueOf", &[Boolean], Str),
        stat("String", "valueOf", &[Ty::Object], Str),
        inst("String", "length", &[], Int),
        inst("String", "charAt", &[Int], Char),
        inst("String", "substring", &[Int], Str),
        inst("String", "substring", &[Int, Int], Str),
        inst("String", "indexOf", &[Str], Int),
        inst("String", "indexOf", &[Char], Int),
        inst("String", "contains", &[Str], Boolean),
        inst("String", "equals", &[Ty::Object], Boolean),
        inst("String", "equalsIgnoreCase", &[Str], Boolean),
        inst("String", "isEmpty", &[], Boolean),
        inst("String", "toUpperCase", &[], Str),
        inst("String", "toLowerCase", &[], Str),
        inst("String", "trim", &[], Str),
        inst("String", "startsWith", &[Str], Boolean),
        inst("String", "endsWith", &[Str], Boolean),
        inst("String", "compareTo", &[Str], Int),
        inst("String", "split", &[Str], Ty::array_of(Str)),
        inst("String", "replace", &[Str, Str], Str),
        inst("String", "toCharArray", &[], Ty::array_of(Char)),
    ]
});

/// Public members of an ambient class, in table order
pub fn library_methods(class: &str) -> Vec<&'static LibraryMethod> {
    let simple = library_simple_name(class);
    LIBRARY.iter().filter(|m| m.class == simple).collect()
}

/// Ambient classes that have a reflection table
pub fn is_ambient_class(name: &str) -> bool {
    let simple = library_simple_name(name);
    LIBRARY.iter().any(|m| m.class == simple)
}

// ===== dispatch =====

/// Value of a library static field (`Math.PI`, `System.out`)
pub fn static_field(class: &str, name: &str) -> Option<Value> {
    match (library_simple_name(class), name) {
        ("System", "out") => Some(Value::native(NativeObject::PrintStream(
            super::value::Stream::Out,
        ))),
        ("System", "err") => Some(Value::native(NativeObject::PrintStream(
            super::value::Stream::Err,
        ))),
        ("System", "in") => Some(Value::native(NativeObject::InputStream)),
        (class, name) => math::static_field(class, name),
    }
}

/// Call a library static method
pub fn call_static(
    interp: &mut Interpreter<'_>,
    class: &str,
    name: &str,
    args: Vec<Value>,
) -> ExecResult<Value> {
    let class = library_simple_name(class);
    let result = match class {
        "System" => io::call_system(interp, name, &args),
        "String" => strings::call_static(interp, name, &args),
        "Arrays" | "Collections" => collections::call_static(interp, class, name, &args),
        _ => math::call_static(class, name, &args),
    };
    result.unwrap_or_else(|| Err(no_such_method(class, name, &args)))
}

/// Call a method on a library value (string, boxed primitive, native
/// object, throwable or array)
pub fn call_method(
    interp: &mut Interpreter<'_>,
    receiver: &Value,
    name: &str,
    args: Vec<Value>,
) -> ExecResult<Value> {
    let result = match receiver {
        Value::Str(text) => strings::call_method(text, name, &args),
        Value::Native(native) => match native.as_ref() {
            NativeObject::PrintStream(stream) => io::call_print_stream(interp, *stream, name, &args),
            NativeObject::Scanner(state) => scanner::call_method(interp, state, name, &args),
            NativeObject::StringBuilder(buffer) => {
                collections::call_string_builder(interp, receiver, buffer, name, &args)
            }
            NativeObject::List(items) => collections::call_list(interp, items, name, &args),
            NativeObject::InputStream => None,
        },
        Value::Throwable(throwable) => io::call_throwable(interp, throwable, name, &args),
        Value::Array(array) => match (name, args.as_slice()) {
            ("clone", []) => Some(Ok(Value::Array(super::value::JArray::new(
                array.elem.clone(),
                array.snapshot(),
            )))),
            _ => None,
        },
        primitive => math::call_boxed(primitive, name, &args),
    };
    match result {
        Some(result) => result,
        None => call_object_method(interp, receiver, name, args)
            .unwrap_or_else(|| Err(no_such_method(&receiver.ty().to_string(), name, &[]))),
    }
}

/// `java.lang.Object` members every reference has
pub fn call_object_method(
    interp: &mut Interpreter<'_>,
    receiver: &Value,
    name: &str,
    args: Vec<Value>,
) -> Option<ExecResult<Value>> {
    match (name, args.as_slice()) {
        ("toString", []) => Some(interp.stringify(receiver).map(Value::from)),
        ("equals", [other]) => Some(Ok(Value::Bool(receiver.same(other)))),
        ("hashCode", []) => Some(Ok(Value::Int(identity_hash(receiver)))),
        _ => None,
    }
}

/// Construct a library object; `None` if `class` is not a library class
pub fn construct(
    interp: &mut Interpreter<'_>,
    class: &str,
    args: Vec<Value>,
) -> Option<ExecResult<Value>> {
    let class = library_simple_name(class);
    let result = match class {
        "Scanner" => scanner::construct(&args),
        "StringBuilder" | "StringBuffer" => collections::construct_string_builder(interp, &args),
        "ArrayList" | "LinkedList" => collections::construct_list(&args),
        "String" => strings::construct(&args),
        name if is_throwable_class(name) => construct_throwable(interp, name, &args),
        _ => return None,
    };
    Some(result.unwrap_or_else(|| Err(no_such_method(class, "<init>", &args))))
}

fn construct_throwable(
    interp: &mut Interpreter<'_>,
    class: &str,
    args: &[Value],
) -> Option<ExecResult<Value>> {
    let (message, cause) = match args {
        [] => (None, None),
        [Value::Null] => (None, None),
        [Value::Str(message)] => (Some(message.to_string()), None),
        [Value::Throwable(cause)] => (Some(cause.to_string()), Some(Arc::clone(cause))),
        [message, Value::Throwable(cause)] => {
            let message = message.as_str().map(str::to_string);
            (message, Some(Arc::clone(cause)))
        }
        [message, Value::Null] if message.as_str().is_some() || message.is_null() => {
            (message.as_str().map(str::to_string), None)
        }
        _ => return None,
    };
    Some(Ok(interp.new_throwable(class, message, cause)))
}

// ===== argument helpers =====

pub(crate) fn no_such_method(class: &str, name: &str, args: &[Value]) -> Raised {
    let types: Vec<String> = args.iter().map(|a| a.ty().to_string()).collect();
    Raised::exception(
        "NoSuchMethodError",
        Some(format!("{class}.{name}({})", types.join(", "))),
    )
}

fn int_arg(value: &Value) -> Option<i32> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Char(c) => Some(*c as i32),
        _ => None,
    }
}

fn index_error(class: &str, index: i64, len: usize) -> Raised {
    Raised::exception(
        class,
        Some(format!("Index {index} out of bounds for length {len}")),
    )
}

fn identity_hash(value: &Value) -> i32 {
    let display = value.display();
    match display.rsplit_once('@') {
        Some((_, hex)) => u32::from_str_radix(hex, 16).unwrap_or(0) as i32,
        None => strings::java_hash(&display),
    }
}

/// `NumberFormatException` as `Integer.parseInt` reports it
fn number_format(input: &str) -> Raised {
    Raised::exception(
        "NumberFormatException",
        Some(format!("For input string: \"{input}\"")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_class_names() {
        assert_eq!(library_class("Math"), Some("Math"));
        assert_eq!(library_class("java.lang.Integer"), Some("Integer"));
        assert_eq!(library_class("Scanner"), None);
        assert_eq!(library_class("Calc"), None);
    }

    #[test]
    fn test_library_table() {
        let math = library_methods("java.lang.Math");
        assert!(math.iter().any(|m| m.name == "max" && m.params == vec![Ty::Int, Ty::Int]));
        assert!(math.iter().all(|m| m.is_static));
        assert!(library_methods("String").iter().any(|m| !m.is_static && m.name == "length"));
        assert!(is_ambient_class("Double"));
        assert!(!is_ambient_class("Scanner"));
    }

    #[test]
    fn test_static_fields() {
        assert_eq!(static_field("Integer", "MAX_VALUE"), Some(Value::Int(i32::MAX)));
        assert_eq!(static_field("Math", "PI"), Some(Value::Double(std::f64::consts::PI)));
        assert!(matches!(static_field("System", "out"), Some(Value::Native(_))));
        assert_eq!(static_field("Math", "TAU_X"), None);
    }
}
