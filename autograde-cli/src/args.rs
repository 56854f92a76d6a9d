//! Typed argument values given on the command line
//!
//! `TYPE:VALUE`, for example `int:5`, `String:hello world`, `double:2.5`,
//! `char:x`, `boolean:true`, `int[]:1,2,3`, or the bare word `null`.

use autograde_api::{JArray, Ty, Value};

pub fn parse_value(text: &str) -> Result<Value, String> {
    if text == "null" {
        return Ok(Value::Null);
    }
    let (ty, raw) = text
        .split_once(':')
        .ok_or_else(|| format!("expected TYPE:VALUE, got '{text}'"))?;
    let ty = parse_type(ty)?;
    match ty {
        Ty::Array(elem) => {
            let items = if raw.is_empty() {
                Vec::new()
            } else {
                raw.split(',')
                    .map(|item| parse_scalar(&elem, item))
                    .collect::<Result<Vec<_>, _>>()?
            };
            Ok(Value::Array(JArray::new(*elem, items)))
        }
        scalar => parse_scalar(&scalar, raw),
    }
}

/// A type name as written in source: `int`, `String`, `double[]`
pub fn parse_type(text: &str) -> Result<Ty, String> {
    let text = text.trim();
    if let Some(elem) = text.strip_suffix("[]") {
        return Ok(Ty::array_of(parse_type(elem)?));
    }
    Ty::library(text).ok_or_else(|| format!("unsupported argument type '{text}'"))
}

fn parse_scalar(ty: &Ty, raw: &str) -> Result<Value, String> {
    let invalid = |_| format!("'{raw}' is not a valid {ty}");
    match ty {
        Ty::Int => raw.trim().parse::<i32>().map(Value::Int).map_err(invalid),
        Ty::Long => raw.trim().parse::<i64>().map(Value::Long).map_err(invalid),
        Ty::Double => raw
            .trim()
            .parse::<f64>()
            .map(Value::Double)
            .map_err(|_| format!("'{raw}' is not a valid {ty}")),
        Ty::Boolean => raw
            .trim()
            .parse::<bool>()
            .map(Value::Bool)
            .map_err(|_| format!("'{raw}' is not a valid {ty}")),
        Ty::Char => {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Value::Char(c)),
                _ => Err(format!("'{raw}' is not a single char")),
            }
        }
        Ty::String => Ok(Value::from(raw)),
        other => Err(format!("values of type {other} cannot be given on the command line")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars() {
        assert_eq!(parse_value("int:5").unwrap(), Value::Int(5));
        assert_eq!(parse_value("long:-7").unwrap(), Value::Long(-7));
        assert_eq!(parse_value("double:2.5").unwrap(), Value::Double(2.5));
        assert_eq!(parse_value("boolean:true").unwrap(), Value::Bool(true));
        assert_eq!(parse_value("char:x").unwrap(), Value::Char('x'));
        assert_eq!(parse_value("String:a:b c").unwrap(), Value::from("a:b c"));
        assert_eq!(parse_value("null").unwrap(), Value::Null);
    }

    #[test]
    fn test_arrays() {
        let Value::Array(array) = parse_value("int[]:1,2,3").unwrap() else {
            panic!("expected array");
        };
        assert_eq!(array.elem, Ty::Int);
        assert_eq!(array.len(), 3);
        let Value::Array(empty) = parse_value("String[]:").unwrap() else {
            panic!("expected array");
        };
        assert_eq!(empty.len(), 0);
    }

    #[test]
    fn test_errors() {
        assert!(parse_value("5").is_err());
        assert!(parse_value("int:five").is_err());
        assert!(parse_value("char:xy").is_err());
        assert!(parse_value("Scanner:x").is_err());
        assert!(parse_value("Widget:x").is_err());
    }
}
