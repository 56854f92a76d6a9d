//! Runtime types and assignability
//!
//! Boxed names (`Integer`, `Double`...) resolve to their primitive, so a
//! `List<Integer>` simply holds `Int` values. Overload selection for both the
//! interpreter and reflection goes through [`select_overload`].

use crate::compiler::ast::TypeExpr;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ty {
    Void,
    Boolean,
    Char,
    Int,
    Long,
    Double,
    String,
    Object,
    /// Type of the `null` literal
    Null,
    Scanner,
    StringBuilder,
    List,
    PrintStream,
    InputStream,
    /// A library throwable, by simple name
    Throwable(String),
    /// A unit class, by qualified name
    Class(String),
    Array(Box<Ty>),
}

/// Library throwables: (name, parent, package)
const THROWABLES: &[(&str, Option<&str>, &str)] = &[
    ("Throwable", None, "java.lang"),
    ("Exception", Some("Throwable"), "java.lang"),
    ("Error", Some("Throwable"), "java.lang"),
    ("RuntimeException", Some("Exception"), "java.lang"),
    ("ArithmeticException", Some("RuntimeException"), "java.lang"),
    ("IndexOutOfBoundsException", Some("RuntimeException"), "java.lang"),
    (
        "ArrayIndexOutOfBoundsException",
        Some("IndexOutOfBoundsException"),
        "java.lang",
    ),
    (
        "StringIndexOutOfBoundsException",
        Some("IndexOutOfBoundsException"),
        "java.lang",
    ),
    ("NullPointerException", Some("RuntimeException"), "java.lang"),
    ("IllegalArgumentException", Some("RuntimeException"), "java.lang"),
    ("NumberFormatException", Some("IllegalArgumentException"), "java.lang"),
    ("IllegalStateException", Some("RuntimeException"), "java.lang"),
    ("ClassCastException", Some("RuntimeException"), "java.lang"),
    ("NegativeArraySizeException", Some("RuntimeException"), "java.lang"),
    ("ArrayStoreException", Some("RuntimeException"), "java.lang"),
    ("UnsupportedOperationException", Some("RuntimeException"), "java.lang"),
    ("NoSuchElementException", Some("RuntimeException"), "java.util"),
    ("InputMismatchException", Some("NoSuchElementException"), "java.util"),
    ("IllegalFormatException", Some("IllegalArgumentException"), "java.util"),
    ("MissingFormatArgumentException", Some("IllegalFormatException"), "java.util"),
    ("IllegalFormatConversionException", Some("IllegalFormatException"), "java.util"),
    ("UnknownFormatConversionException", Some("IllegalFormatException"), "java.util"),
    ("PatternSyntaxException", Some("IllegalArgumentException"), "java.util.regex"),
    ("StackOverflowError", Some("Error"), "java.lang"),
    ("NoSuchMethodError", Some("Error"), "java.lang"),
    ("NoSuchFieldError", Some("Error"), "java.lang"),
    ("AbstractMethodError", Some("Error"), "java.lang"),
    ("VerifyError", Some("Error"), "java.lang"),
    ("NoClassDefFoundError", Some("Error"), "java.lang"),
    ("ReflectiveOperationException", Some("Exception"), "java.lang"),
    (
        "InvocationTargetException",
        Some("ReflectiveOperationException"),
        "java.lang.reflect",
    ),
];

fn throwable_entry(name: &str) -> Option<&'static (&'static str, Option<&'static str>, &'static str)> {
    THROWABLES.iter().find(|(n, _, _)| *n == name)
}

/// Is `name` a library throwable class?
pub fn is_throwable_class(name: &str) -> bool {
    throwable_entry(name).is_some()
}

/// Distance from `name` up to `ancestor`, if it is one
pub fn throwable_distance(name: &str, ancestor: &str) -> Option<u32> {
    let mut current = Some(name);
    let mut distance = 0;
    while let Some(n) = current {
        if n == ancestor {
            return Some(distance);
        }
        current = throwable_entry(n).and_then(|(_, parent, _)| *parent);
        distance += 1;
    }
    None
}

/// Fully qualified name of a library throwable
pub fn throwable_qualified_name(name: &str) -> String {
    match throwable_entry(name) {
        Some((_, _, package)) => format!("{package}.{name}"),
        None => name.to_string(),
    }
}

/// Strip a `java.lang.`/`java.util.`/`java.io.` prefix
pub fn library_simple_name(name: &str) -> &str {
    for prefix in ["java.lang.reflect.", "java.lang.", "java.util.regex.", "java.util.", "java.io."] {
        if let Some(rest) = name.strip_prefix(prefix) {
            return rest;
        }
    }
    name
}

fn simple(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// Class names match when equal, or when one side is unqualified and the
/// simple names agree
pub fn same_class(a: &str, b: &str) -> bool {
    a == b || ((!a.contains('.') || !b.contains('.')) && simple(a) == simple(b))
}

impl Ty {
    /// Library type by (possibly qualified) name
    pub fn library(name: &str) -> Option<Ty> {
        let ty = match library_simple_name(name) {
            "boolean" | "Boolean" => Ty::Boolean,
            "char" | "Character" => Ty::Char,
            "int" | "Integer" | "short" | "Short" | "byte" | "Byte" => Ty::Int,
            "long" | "Long" => Ty::Long,
            "double" | "Double" | "float" | "Float" => Ty::Double,
            "void" => Ty::Void,
            "String" | "CharSequence" => Ty::String,
            "Object" => Ty::Object,
            "Scanner" => Ty::Scanner,
            "StringBuilder" | "StringBuffer" => Ty::StringBuilder,
            "List" | "ArrayList" | "LinkedList" | "Collection" | "Iterable" => Ty::List,
            "PrintStream" => Ty::PrintStream,
            "InputStream" => Ty::InputStream,
            other if is_throwable_class(other) => Ty::Throwable(other.to_string()),
            _ => return None,
        };
        Some(ty)
    }

    /// Resolve a written type; unknown names are unit classes of `namespace`
    pub fn resolve(texpr: &TypeExpr, namespace: &str) -> Ty {
        let base = Ty::library(&texpr.name).unwrap_or_else(|| {
            if texpr.name.contains('.') || namespace.is_empty() {
                Ty::Class(texpr.name.clone())
            } else {
                Ty::Class(format!("{namespace}.{}", texpr.name))
            }
        });
        (0..texpr.dims).fold(base, |ty, _| Ty::Array(Box::new(ty)))
    }

    pub fn array_of(elem: Ty) -> Ty {
        Ty::Array(Box::new(elem))
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Ty::Boolean | Ty::Char | Ty::Int | Ty::Long | Ty::Double
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Ty::Char | Ty::Int | Ty::Long | Ty::Double)
    }

    pub fn is_reference(&self) -> bool {
        !self.is_primitive() && *self != Ty::Void
    }

    /// Cost of passing a value of type `from` where `self` is expected.
    /// `Some(0)` is an exact match, larger is a worse (widening) match.
    pub fn accepts(&self, from: &Ty) -> Option<u32> {
        if self.same(from) {
            return Some(0);
        }
        match (self, from) {
            (Ty::Int, Ty::Char) => Some(1),
            (Ty::Long, Ty::Int) => Some(1),
            (Ty::Long, Ty::Char) => Some(2),
            (Ty::Double, Ty::Long) => Some(1),
            (Ty::Double, Ty::Int) => Some(2),
            (Ty::Double, Ty::Char) => Some(3),
            (to, Ty::Null) if to.is_reference() => Some(1),
            (Ty::Object, Ty::Void) => None,
            (Ty::Object, other) if other.is_primitive() => Some(10),
            (Ty::Object, _) => Some(1),
            (Ty::Throwable(to), Ty::Throwable(sub)) => throwable_distance(sub, to),
            (Ty::Array(to), Ty::Array(elem)) if to.is_reference() && elem.is_reference() => {
                to.accepts(elem).map(|c| c + 1)
            }
            _ => None,
        }
    }

    fn same(&self, other: &Ty) -> bool {
        match (self, other) {
            (Ty::Class(a), Ty::Class(b)) => same_class(a, b),
            (Ty::Array(a), Ty::Array(b)) => a.same(b),
            (a, b) => a == b,
        }
    }

    /// Name as it appears in signatures (`int`, `String`, `Calc[]`)
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Void => f.write_str("void"),
            Ty::Boolean => f.write_str("boolean"),
            Ty::Char => f.write_str("char"),
            Ty::Int => f.write_str("int"),
            Ty::Long => f.write_str("long"),
            Ty::Double => f.write_str("double"),
            Ty::String => f.write_str("String"),
            Ty::Object => f.write_str("Object"),
            Ty::Null => f.write_str("null"),
            Ty::Scanner => f.write_str("Scanner"),
            Ty::StringBuilder => f.write_str("StringBuilder"),
            Ty::List => f.write_str("ArrayList"),
            Ty::PrintStream => f.write_str("PrintStream"),
            Ty::InputStream => f.write_str("InputStream"),
            Ty::Throwable(name) => f.write_str(name),
            Ty::Class(name) => f.write_str(simple(name)),
            Ty::Array(elem) => write!(f, "{elem}[]"),
        }
    }
}

/// Pick the best candidate parameter list for the given argument types.
///
/// Exact matches beat widening matches; among equally good candidates the
/// first one wins. Returns the candidate's index.
pub fn select_overload<'a, I>(candidates: I, args: &[Ty]) -> Option<usize>
where
    I: IntoIterator<Item = &'a [Ty]>,
{
    let mut best: Option<(usize, u32)> = None;
    for (index, params) in candidates.into_iter().enumerate() {
        if params.len() != args.len() {
            continue;
        }
        let cost = params
            .iter()
            .zip(args)
            .try_fold(0u32, |total, (param, arg)| param.accepts(arg).map(|c| total + c));
        if let Some(cost) = cost {
            if best.map_or(true, |(_, best_cost)| cost < best_cost) {
                best = Some((index, cost));
            }
        }
    }
    best.map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kit::lexer::Coordinate;

    fn texpr(name: &str, dims: usize) -> TypeExpr {
        TypeExpr::new(name, dims, Coordinate::start())
    }

    #[test]
    fn test_resolve_library_and_unit_types() {
        assert_eq!(Ty::resolve(&texpr("Integer", 0), "hw"), Ty::Int);
        assert_eq!(Ty::resolve(&texpr("java.util.Scanner", 0), "hw"), Ty::Scanner);
        assert_eq!(
            Ty::resolve(&texpr("Calc", 1), "hw"),
            Ty::array_of(Ty::Class("hw.Calc".into()))
        );
        assert_eq!(Ty::resolve(&texpr("Calc", 0), ""), Ty::Class("Calc".into()));
    }

    #[test]
    fn test_widening() {
        assert_eq!(Ty::Int.accepts(&Ty::Int), Some(0));
        assert_eq!(Ty::Int.accepts(&Ty::Char), Some(1));
        assert_eq!(Ty::Double.accepts(&Ty::Int), Some(2));
        assert_eq!(Ty::Int.accepts(&Ty::Long), None);
        assert_eq!(Ty::Char.accepts(&Ty::Int), None);
        assert_eq!(Ty::Boolean.accepts(&Ty::Int), None);
    }

    #[test]
    fn test_null_and_object() {
        assert_eq!(Ty::String.accepts(&Ty::Null), Some(1));
        assert_eq!(Ty::Int.accepts(&Ty::Null), None);
        assert!(Ty::Object.accepts(&Ty::Class("hw.Calc".into())).is_some());
        assert!(Ty::Object.accepts(&Ty::Int).is_some());
    }

    #[test]
    fn test_class_names_match_by_simple_name() {
        let qualified = Ty::Class("autograde.run1.Calc".into());
        assert_eq!(qualified.accepts(&Ty::Class("Calc".into())), Some(0));
        assert_eq!(
            qualified.accepts(&Ty::Class("autograde.run2.Calc".into())),
            None
        );
    }

    #[test]
    fn test_throwable_hierarchy() {
        let runtime = Ty::Throwable("RuntimeException".into());
        assert_eq!(
            runtime.accepts(&Ty::Throwable("ArithmeticException".into())),
            Some(1)
        );
        assert_eq!(
            throwable_qualified_name("InputMismatchException"),
            "java.util.InputMismatchException"
        );
        assert!(throwable_distance("StackOverflowError", "Exception").is_none());
    }

    #[test]
    fn test_select_overload_prefers_exact() {
        let widening = vec![Ty::Double, Ty::Double];
        let exact = vec![Ty::Int, Ty::Int];
        let candidates = [widening.as_slice(), exact.as_slice()];
        assert_eq!(select_overload(candidates, &[Ty::Int, Ty::Int]), Some(1));
        assert_eq!(select_overload(candidates, &[Ty::Double, Ty::Int]), Some(0));
        assert_eq!(select_overload(candidates, &[Ty::String, Ty::Int]), None);
    }

    #[test]
    fn test_select_overload_first_declared_wins_ties() {
        let a = vec![Ty::Long, Ty::Int];
        let b = vec![Ty::Int, Ty::Long];
        assert_eq!(
            select_overload([a.as_slice(), b.as_slice()], &[Ty::Int, Ty::Int]),
            Some(0)
        );
    }

    #[test]
    fn test_select_overload_arity() {
        let none: Vec<Ty> = vec![];
        let one = vec![Ty::Int];
        assert_eq!(select_overload([none.as_slice(), one.as_slice()], &[]), Some(0));
        assert_eq!(select_overload([none.as_slice()], &[Ty::Int]), None);
    }
}
