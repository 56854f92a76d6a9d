//! `String.format` / `printf` conversions
//!
//! Supports `%[flags][width][.precision]conv` with flags `- 0 + , space`
//! and conversions `d s S f e c b x o n %`.

use crate::runtime::error::{ExecResult, Raised};
use crate::runtime::interpreter::Interpreter;
use crate::runtime::value::Value;

#[derive(Debug, Default)]
struct Spec {
    left: bool,
    zero: bool,
    plus: bool,
    space: bool,
    group: bool,
    width: Option<usize>,
    precision: Option<usize>,
    conversion: char,
}

fn format_error(class: &str, message: String) -> Raised {
    Raised::exception(class, Some(message))
}

/// Render a Java format string against `args`
pub fn format_java(interp: &mut Interpreter<'_>, pattern: &str, args: &[Value]) -> ExecResult<String> {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    let mut next_arg = 0;

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let mut spec = Spec::default();
        let mut text = String::from("%");
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => spec.left = true,
                '0' => spec.zero = true,
                '+' => spec.plus = true,
                ' ' => spec.space = true,
                ',' => spec.group = true,
                _ => break,
            }
            text.push(flag);
            chars.next();
        }
        let mut width = String::new();
        while let Some(&d) = chars.peek().filter(|d| d.is_ascii_digit()) {
            width.push(d);
            text.push(d);
            chars.next();
        }
        spec.width = width.parse().ok();
        if chars.peek() == Some(&'.') {
            chars.next();
            text.push('.');
            let mut precision = String::new();
            while let Some(&d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                precision.push(d);
                text.push(d);
                chars.next();
            }
            spec.precision = Some(precision.parse().unwrap_or(0));
        }
        let conversion = chars.next().ok_or_else(|| {
            format_error("UnknownFormatConversionException", "Conversion = '%'".to_string())
        })?;
        text.push(conversion);
        spec.conversion = conversion;

        match conversion {
            'n' => {
                out.push('\n');
                continue;
            }
            '%' => {
                out.push_str(&pad(&spec, "%".to_string()));
                continue;
            }
            _ => {}
        }

        let arg = args.get(next_arg).ok_or_else(|| {
            format_error("MissingFormatArgumentException", format!("Format specifier '{text}'"))
        })?;
        next_arg += 1;
        let rendered = convert(interp, &spec, arg, &text)?;
        out.push_str(&pad(&spec, rendered));
    }
    Ok(out)
}

fn mismatch(conversion: char, arg: &Value) -> Raised {
    let class = match arg {
        Value::Int(_) => "java.lang.Integer".to_string(),
        Value::Long(_) => "java.lang.Long".to_string(),
        Value::Double(_) => "java.lang.Double".to_string(),
        Value::Char(_) => "java.lang.Character".to_string(),
        Value::Bool(_) => "java.lang.Boolean".to_string(),
        Value::Str(_) => "java.lang.String".to_string(),
        other => other.ty().to_string(),
    };
    format_error("IllegalFormatConversionException", format!("{conversion} != {class}"))
}

fn convert(interp: &mut Interpreter<'_>, spec: &Spec, arg: &Value, text: &str) -> ExecResult<String> {
    match spec.conversion {
        'd' => {
            let n = match arg {
                Value::Int(_) | Value::Long(_) => arg.as_i64().unwrap_or(0),
                _ => return Err(mismatch('d', arg)),
            };
            let digits = n.unsigned_abs().to_string();
            let digits = if spec.group { group(&digits) } else { digits };
            Ok(sign(spec, n < 0, digits))
        }
        'x' | 'X' | 'o' => {
            let rendered = match (spec.conversion, arg) {
                ('o', Value::Int(i)) => format!("{:o}", *i as u32),
                ('o', Value::Long(l)) => format!("{:o}", *l as u64),
                (_, Value::Int(i)) => format!("{:x}", *i as u32),
                (_, Value::Long(l)) => format!("{:x}", *l as u64),
                (c, other) => return Err(mismatch(c, other)),
            };
            Ok(if spec.conversion == 'X' { rendered.to_uppercase() } else { rendered })
        }
        'f' | 'e' | 'E' => {
            let d = match arg {
                Value::Double(d) => *d,
                _ => return Err(mismatch(spec.conversion, arg)),
            };
            if d.is_nan() {
                return Ok("NaN".to_string());
            }
            if d.is_infinite() {
                return Ok(sign(spec, d < 0.0, "Infinity".to_string()));
            }
            let precision = spec.precision.unwrap_or(6);
            let body = if spec.conversion == 'f' {
                let fixed = round_half_up(d.abs(), precision);
                if spec.group {
                    match fixed.split_once('.') {
                        Some((int, frac)) => format!("{}.{frac}", group(int)),
                        None => group(&fixed),
                    }
                } else {
                    fixed
                }
            } else {
                let rendered = format!("{:.*e}", precision, d.abs());
                let (mantissa, exponent) = rendered.split_once('e').unwrap_or((rendered.as_str(), "0"));
                let exponent: i32 = exponent.parse().unwrap_or(0);
                let exp_sign = if exponent < 0 { '-' } else { '+' };
                let body = format!("{mantissa}e{exp_sign}{:02}", exponent.abs());
                if spec.conversion == 'E' { body.to_uppercase() } else { body }
            };
            Ok(sign(spec, d.is_sign_negative() && d != 0.0, body))
        }
        's' | 'S' => {
            let mut rendered = interp.stringify(arg)?;
            if let Some(precision) = spec.precision {
                rendered = rendered.chars().take(precision).collect();
            }
            Ok(if spec.conversion == 'S' { rendered.to_uppercase() } else { rendered })
        }
        'c' => match arg {
            Value::Char(c) => Ok(c.to_string()),
            Value::Int(i) => char::from_u32(*i as u32)
                .map(|c| c.to_string())
                .ok_or_else(|| mismatch('c', arg)),
            other => Err(mismatch('c', other)),
        },
        'b' | 'B' => {
            let rendered = match arg {
                Value::Null => "false".to_string(),
                Value::Bool(b) => b.to_string(),
                _ => "true".to_string(),
            };
            Ok(if spec.conversion == 'B' { rendered.to_uppercase() } else { rendered })
        }
        _ => Err(format_error(
            "UnknownFormatConversionException",
            format!("Conversion = '{}'", text.trim_start_matches('%')),
        )),
    }
}

fn sign(spec: &Spec, negative: bool, digits: String) -> String {
    if negative {
        format!("-{digits}")
    } else if spec.plus {
        format!("+{digits}")
    } else if spec.space {
        format!(" {digits}")
    } else {
        digits
    }
}

fn pad(spec: &Spec, text: String) -> String {
    let width = match spec.width {
        Some(width) if width > text.chars().count() => width,
        _ => return text,
    };
    let fill = width - text.chars().count();
    if spec.left {
        format!("{text}{}", " ".repeat(fill))
    } else if spec.zero && matches!(spec.conversion, 'd' | 'f' | 'x' | 'X' | 'o' | 'e' | 'E') {
        let (sign, digits) = match text.chars().next() {
            Some(c @ ('-' | '+' | ' ')) => (c.to_string(), text[1..].to_string()),
            _ => (String::new(), text),
        };
        format!("{sign}{}{digits}", "0".repeat(fill))
    } else {
        format!("{}{text}", " ".repeat(fill))
    }
}

/// Insert `,` every three digits from the right
fn group(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Fixed-point rendering with HALF_UP rounding of the shortest decimal
/// representation, which is how `Formatter` rounds `%.Nf`
fn round_half_up(d: f64, precision: usize) -> String {
    let shortest = format!("{d}");
    let (int_part, frac_part) = shortest.split_once('.').unwrap_or((&shortest, ""));
    if frac_part.len() <= precision {
        let zeros = "0".repeat(precision - frac_part.len());
        return if precision == 0 {
            int_part.to_string()
        } else {
            format!("{int_part}.{frac_part}{zeros}")
        };
    }

    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().take(precision))
        .map(|b| b - b'0')
        .collect();
    if frac_part.as_bytes()[precision] >= b'5' {
        let mut i = digits.len();
        loop {
            if i == 0 {
                digits.insert(0, 1);
                break;
            }
            i -= 1;
            if digits[i] == 9 {
                digits[i] = 0;
            } else {
                digits[i] += 1;
                break;
            }
        }
    }
    let split = digits.len() - precision;
    let text: String = digits.iter().map(|d| (b'0' + d) as char).collect();
    if precision == 0 {
        text
    } else {
        format!("{}.{}", &text[..split], &text[split..])
    }
}
