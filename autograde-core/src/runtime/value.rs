//! Runtime values
//!
//! Reference values are `Arc`s so they can cross into an invocation worker
//! and back. Interior state sits behind `Mutex`es that are only held for a
//! single read or write, never while submitted code runs.

use super::class::RuntimeClass;
use super::error::Throwable;
use super::lock;
use super::types::Ty;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

pub type ArrayRef = Arc<JArray>;
pub type ObjectRef = Arc<Instance>;
pub type NativeRef = Arc<NativeObject>;

#[derive(Clone)]
pub enum Value {
    /// Result of a `void` member
    Void,
    Null,
    Bool(bool),
    Char(char),
    Int(i32),
    Long(i64),
    Double(f64),
    Str(Arc<str>),
    Array(ArrayRef),
    Object(ObjectRef),
    Native(NativeRef),
    Throwable(Arc<Throwable>),
}

/// An array with a fixed element type
pub struct JArray {
    pub elem: Ty,
    items: Mutex<Vec<Value>>,
}

impl JArray {
    pub fn new(elem: Ty, items: Vec<Value>) -> ArrayRef {
        Arc::new(Self {
            elem,
            items: Mutex::new(items),
        })
    }

    /// Array of `len` default values
    pub fn filled(elem: Ty, len: usize) -> ArrayRef {
        let items = vec![Value::default_for(&elem); len];
        Self::new(elem, items)
    }

    pub fn len(&self) -> usize {
        lock(&self.items).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        lock(&self.items).get(index).cloned()
    }

    /// Store a value converted to the element type; false when out of bounds
    pub fn set(&self, index: usize, value: Value) -> bool {
        let value = value.coerce(&self.elem);
        match lock(&self.items).get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self) -> Vec<Value> {
        lock(&self.items).clone()
    }

    pub fn replace(&self, items: Vec<Value>) {
        *lock(&self.items) = items;
    }
}

/// An instance of a unit class
pub struct Instance {
    pub class: Arc<RuntimeClass>,
    fields: Mutex<HashMap<String, Value>>,
}

impl Instance {
    /// New instance with every instance field at its default value
    pub fn new(class: Arc<RuntimeClass>) -> ObjectRef {
        let fields = class
            .decl()
            .fields
            .iter()
            .filter(|f| !f.modifiers.is_static)
            .map(|f| {
                let ty = Ty::resolve(&f.ty, class.namespace());
                (f.name.clone(), Value::default_for(&ty))
            })
            .collect();
        Arc::new(Self {
            class,
            fields: Mutex::new(fields),
        })
    }

    pub fn get_field(&self, name: &str) -> Option<Value> {
        lock(&self.fields).get(name).cloned()
    }

    /// Store a field value converted to the declared type
    pub fn set_field(&self, name: &str, value: Value) -> bool {
        let ty = match self.class.field_ty(name) {
            Some(ty) => ty,
            None => return false,
        };
        let mut fields = lock(&self.fields);
        match fields.get_mut(name) {
            Some(slot) => {
                *slot = value.coerce(&ty);
                true
            }
            None => false,
        }
    }
}

/// Which console stream a `PrintStream` writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Out,
    Err,
}

/// Scanner read position: the unread rest of the current line
#[derive(Debug, Default)]
pub struct ScannerState {
    pub pending: Option<String>,
    pub closed: bool,
}

/// Library objects implemented natively
pub enum NativeObject {
    PrintStream(Stream),
    InputStream,
    Scanner(Mutex<ScannerState>),
    StringBuilder(Mutex<String>),
    List(Mutex<Vec<Value>>),
}

impl NativeObject {
    pub fn ty(&self) -> Ty {
        match self {
            NativeObject::PrintStream(_) => Ty::PrintStream,
            NativeObject::InputStream => Ty::InputStream,
            NativeObject::Scanner(_) => Ty::Scanner,
            NativeObject::StringBuilder(_) => Ty::StringBuilder,
            NativeObject::List(_) => Ty::List,
        }
    }
}

impl Value {
    pub fn string(text: impl AsRef<str>) -> Value {
        Value::Str(Arc::from(text.as_ref()))
    }

    pub fn native(object: NativeObject) -> Value {
        Value::Native(Arc::new(object))
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::native(NativeObject::List(Mutex::new(items)))
    }

    /// Zero value of a type (`0`, `false`, `'\0'`, `null`)
    pub fn default_for(ty: &Ty) -> Value {
        match ty {
            Ty::Boolean => Value::Bool(false),
            Ty::Char => Value::Char('\0'),
            Ty::Int => Value::Int(0),
            Ty::Long => Value::Long(0),
            Ty::Double => Value::Double(0.0),
            Ty::Void => Value::Void,
            _ => Value::Null,
        }
    }

    /// Runtime type of the value
    pub fn ty(&self) -> Ty {
        match self {
            Value::Void => Ty::Void,
            Value::Null => Ty::Null,
            Value::Bool(_) => Ty::Boolean,
            Value::Char(_) => Ty::Char,
            Value::Int(_) => Ty::Int,
            Value::Long(_) => Ty::Long,
            Value::Double(_) => Ty::Double,
            Value::Str(_) => Ty::String,
            Value::Array(array) => Ty::array_of(array.elem.clone()),
            Value::Object(obj) => Ty::Class(obj.class.name().to_string()),
            Value::Native(native) => native.ty(),
            Value::Throwable(t) => Ty::Throwable(t.class.clone()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integral value widened to i64 (char, int, long)
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Char(c) => Some(*c as i64),
            Value::Int(i) => Some(*i as i64),
            Value::Long(l) => Some(*l),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            other => other.as_i64().map(|i| i as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Assignment conversion: widen primitives to the target type, leave
    /// everything else untouched
    pub fn coerce(self, ty: &Ty) -> Value {
        match (ty, &self) {
            (Ty::Int, Value::Char(c)) => Value::Int(*c as i32),
            (Ty::Long, Value::Char(c)) => Value::Long(*c as i64),
            (Ty::Long, Value::Int(i)) => Value::Long(*i as i64),
            (Ty::Double, Value::Char(c)) => Value::Double(*c as u32 as f64),
            (Ty::Double, Value::Int(i)) => Value::Double(*i as f64),
            (Ty::Double, Value::Long(l)) => Value::Double(*l as f64),
            // compile-time narrowing of int constants (`char c = 65;`)
            (Ty::Char, Value::Int(i)) if (0..=0xFFFF).contains(i) => {
                Value::Char(char::from_u32(*i as u32).unwrap_or('\u{FFFD}'))
            }
            _ => self,
        }
    }

    /// Primitive cast with Java narrowing rules; `None` if not castable
    pub fn cast(&self, ty: &Ty) -> Option<Value> {
        let value = match ty {
            Ty::Int => match self {
                Value::Double(d) => Value::Int(*d as i32),
                Value::Long(l) => Value::Int(*l as i32),
                other => Value::Int(other.as_i64()? as i32),
            },
            Ty::Long => match self {
                Value::Double(d) => Value::Long(*d as i64),
                other => Value::Long(other.as_i64()?),
            },
            Ty::Double => Value::Double(self.as_f64()?),
            Ty::Char => {
                let code = match self {
                    Value::Double(d) => *d as i32 as u16,
                    other => other.as_i64()? as u16,
                };
                Value::Char(char::from_u32(code as u32).unwrap_or('\u{FFFD}'))
            }
            Ty::Boolean => Value::Bool(self.as_bool()?),
            _ => return None,
        };
        Some(value)
    }

    /// Primitive rendering as Java prints it; references use their type and
    /// identity since user `toString` needs the interpreter
    pub fn display(&self) -> String {
        match self {
            Value::Void => String::new(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Char(c) => c.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Long(l) => l.to_string(),
            Value::Double(d) => java_double(*d),
            Value::Str(s) => s.to_string(),
            Value::Array(array) => format!("{}@{:x}", array_descriptor(&array.elem), identity(array)),
            Value::Object(obj) => format!("{}@{:x}", obj.class.simple_name(), identity(obj)),
            Value::Native(native) => match native.as_ref() {
                NativeObject::StringBuilder(sb) => lock(sb).clone(),
                NativeObject::List(items) => {
                    let parts: Vec<String> = lock(items).iter().map(|v| v.display()).collect();
                    format!("[{}]", parts.join(", "))
                }
                NativeObject::Scanner(_) => "java.util.Scanner".to_string(),
                NativeObject::PrintStream(_) => format!("java.io.PrintStream@{:x}", identity(native)),
                NativeObject::InputStream => format!("java.io.InputStream@{:x}", identity(native)),
            },
            Value::Throwable(t) => t.to_string(),
        }
    }

    /// Reference identity or primitive equality (`==`). Strings compare by
    /// content.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) | (Value::Void, Value::Void) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Arc::ptr_eq(a, b),
            (Value::Throwable(a), Value::Throwable(b)) => Arc::ptr_eq(a, b),
            (a, b) => match (a, b) {
                (Value::Double(_), _) | (_, Value::Double(_)) => match (a.as_f64(), b.as_f64()) {
                    (Some(x), Some(y)) => x == y,
                    _ => false,
                },
                _ => match (a.as_i64(), b.as_i64()) {
                    (Some(x), Some(y)) => x == y,
                    _ => false,
                },
            },
        }
    }
}

impl PartialEq for Value {
    /// Same as `same`, except numbers of different types are unequal
    fn eq(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other) && self.same(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => f.write_str("Void"),
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Char(c) => write!(f, "Char({c:?})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Long(l) => write!(f, "Long({l})"),
            Value::Double(d) => write!(f, "Double({d})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Throwable(t) => write!(f, "Throwable({t})"),
            other => write!(f, "{}({})", other.ty(), other.display()),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Value::Char(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::string(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(Arc::from(v))
    }
}

fn identity<T: ?Sized>(arc: &Arc<T>) -> u32 {
    let addr = Arc::as_ptr(arc) as *const () as usize;
    ((addr >> 4) as u32).wrapping_mul(0x9E37_79B9)
}

/// JVM-style descriptor prefix of an array (`[I`, `[Ljava.lang.String;`)
fn array_descriptor(elem: &Ty) -> String {
    match elem {
        Ty::Boolean => "[Z".to_string(),
        Ty::Char => "[C".to_string(),
        Ty::Int => "[I".to_string(),
        Ty::Long => "[J".to_string(),
        Ty::Double => "[D".to_string(),
        Ty::Array(inner) => format!("[{}", array_descriptor(inner)),
        Ty::String => "[Ljava.lang.String;".to_string(),
        other => format!("[L{other};"),
    }
}

/// Format a double the way `Double.toString` does
pub fn java_double(d: f64) -> String {
    if d.is_nan() {
        return "NaN".to_string();
    }
    if d.is_infinite() {
        return if d > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if d == 0.0 {
        return if d.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    // shortest round-trip digits, e.g. "3.0000000000000004e-1"
    let sci = format!("{:e}", d.abs());
    let (mantissa, exponent) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };
    let digits: String = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();
    let sign = if d < 0.0 { "-" } else { "" };
    let magnitude = d.abs();

    if (1e-3..1e7).contains(&magnitude) {
        let body = if exponent >= 0 {
            let point = exponent as usize + 1;
            let (int_part, frac_part) = if digits.len() > point {
                (digits[..point].to_string(), digits[point..].to_string())
            } else {
                (format!("{digits:0<point$}"), String::new())
            };
            let frac_part = if frac_part.is_empty() { "0".to_string() } else { frac_part };
            format!("{int_part}.{frac_part}")
        } else {
            let zeros = "0".repeat((-exponent - 1) as usize);
            format!("0.{zeros}{digits}")
        };
        format!("{sign}{body}")
    } else {
        let (first, rest) = digits.split_at(1);
        let rest = if rest.is_empty() { "0" } else { rest };
        format!("{sign}{first}.{rest}E{exponent}")
    }
}
