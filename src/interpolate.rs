//! `%`-style message interpolation.
//!
//! Supports the conversions `s r a d i u f F e E x X o c %`, the flags
//! `- + 0 # space`, a decimal width and precision, and `%(key)s` lookups
//! when the only argument is a map.

use crate::value::FieldValue;

/// Largest accepted field width or precision.
pub const MAX_FIELD_WIDTH: usize = 4096;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InterpolationError {
    #[error("not enough arguments for format string")]
    NotEnoughArguments,

    #[error("not all arguments converted during string formatting")]
    NotAllArgumentsConverted,

    #[error("unsupported format character '{0}'")]
    UnsupportedConversion(char),

    #[error("incomplete format")]
    IncompleteFormat,

    #[error("%{conversion} format: a number is required, not {found}")]
    BadArgument { conversion: char, found: &'static str },

    #[error("format key not found: {0}")]
    MissingKey(String),

    #[error("format requires a mapping")]
    MappingRequired,

    #[error("field width or precision exceeds {MAX_FIELD_WIDTH}")]
    WidthTooLarge,
}

#[derive(Debug, Default)]
struct Spec {
    left: bool,
    plus: bool,
    space: bool,
    zero: bool,
    alternate: bool,
    width: usize,
    precision: Option<usize>,
}

/// Interpolate `template` with `args`.
pub fn interpolate(template: &str, args: &[FieldValue]) -> Result<String, InterpolationError> {
    let mapping = match args {
        [single] => single.as_map(),
        _ => None,
    };

    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    let mut next_arg = 0usize;

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let mut key: Option<String> = None;
        if chars.peek() == Some(&'(') {
            chars.next();
            let mut depth = 1;
            let mut name = String::new();
            loop {
                match chars.next() {
                    Some('(') => {
                        depth += 1;
                        name.push('(');
                    }
                    Some(')') => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                        name.push(')');
                    }
                    Some(other) => name.push(other),
                    None => return Err(InterpolationError::IncompleteFormat),
                }
            }
            key = Some(name);
        }

        let mut spec = Spec::default();
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => spec.left = true,
                '+' => spec.plus = true,
                ' ' => spec.space = true,
                '0' => spec.zero = true,
                '#' => spec.alternate = true,
                _ => break,
            }
            chars.next();
        }
        spec.width = take_number(&mut chars).unwrap_or(0);
        if chars.peek() == Some(&'.') {
            chars.next();
            spec.precision = Some(take_number(&mut chars).unwrap_or(0));
        }
        if spec.width > MAX_FIELD_WIDTH || spec.precision.is_some_and(|p| p > MAX_FIELD_WIDTH) {
            return Err(InterpolationError::WidthTooLarge);
        }
        while matches!(chars.peek(), Some('h' | 'l' | 'L')) {
            chars.next();
        }

        let conversion = chars.next().ok_or(InterpolationError::IncompleteFormat)?;
        if conversion == '%' {
            out.push('%');
            continue;
        }

        let arg = match (&key, mapping) {
            (Some(name), Some(entries)) => entries
                .iter()
                .rev()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v)
                .ok_or_else(|| InterpolationError::MissingKey(name.clone()))?,
            (Some(_), None) => return Err(InterpolationError::MappingRequired),
            (None, _) => {
                let arg = args.get(next_arg).ok_or(InterpolationError::NotEnoughArguments)?;
                next_arg += 1;
                arg
            }
        };

        out.push_str(&convert(conversion, &spec, arg)?);
    }

    if mapping.is_none() && next_arg < args.len() {
        return Err(InterpolationError::NotAllArgumentsConverted);
    }
    Ok(out)
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<usize> {
    let mut value: Option<usize> = None;
    while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
        chars.next();
        value = Some(value.unwrap_or(0).saturating_mul(10).saturating_add(digit as usize));
    }
    value
}

fn convert(conversion: char, spec: &Spec, arg: &FieldValue) -> Result<String, InterpolationError> {
    match conversion {
        's' | 'r' | 'a' => {
            let mut text = match (conversion, arg) {
                ('s', _) => arg.to_string(),
                (_, FieldValue::Str(s)) => format!("{:?}", s),
                (_, other) => other.to_string(),
            };
            if let Some(precision) = spec.precision {
                text = text.chars().take(precision).collect();
            }
            Ok(pad_text(text, spec))
        }
        'd' | 'i' | 'u' => {
            let n = integer_arg(conversion, arg)?;
            let mut digits = n.unsigned_abs().to_string();
            if let Some(precision) = spec.precision {
                digits = format!("{:0>width$}", digits, width = precision);
            }
            Ok(pad_number(n < 0, "", digits, spec))
        }
        'x' | 'X' | 'o' => {
            let n = match arg {
                FieldValue::F64(_) => {
                    return Err(InterpolationError::BadArgument {
                        conversion,
                        found: "float",
                    })
                }
                other => integer_arg(conversion, other)?,
            };
            let magnitude = n.unsigned_abs();
            let (digits, prefix) = match conversion {
                'x' => (format!("{:x}", magnitude), "0x"),
                'X' => (format!("{:X}", magnitude), "0X"),
                _ => (format!("{:o}", magnitude), "0o"),
            };
            let prefix = if spec.alternate { prefix } else { "" };
            Ok(pad_number(n < 0, prefix, digits, spec))
        }
        'f' | 'F' | 'e' | 'E' => {
            let n = float_arg(conversion, arg)?;
            let precision = spec.precision.unwrap_or(6);
            let digits = if !n.is_finite() {
                let word = if n.is_nan() { "nan" } else { "inf" };
                if conversion.is_ascii_uppercase() {
                    word.to_ascii_uppercase()
                } else {
                    word.to_string()
                }
            } else if matches!(conversion, 'f' | 'F') {
                format!("{:.*}", precision, n.abs())
            } else {
                exponent_form(n.abs(), precision, conversion == 'E')
            };
            let negative = n.is_sign_negative() && !n.is_nan();
            Ok(pad_number(negative, "", digits, spec))
        }
        'c' => {
            let text = match arg {
                FieldValue::Str(s) if s.chars().count() == 1 => s.clone(),
                FieldValue::I64(_) | FieldValue::U64(_) => {
                    let code = integer_arg(conversion, arg)?;
                    u32::try_from(code)
                        .ok()
                        .and_then(char::from_u32)
                        .map(String::from)
                        .ok_or(InterpolationError::BadArgument {
                            conversion,
                            found: "out-of-range int",
                        })?
                }
                other => {
                    return Err(InterpolationError::BadArgument {
                        conversion,
                        found: kind_of(other),
                    })
                }
            };
            Ok(pad_text(text, spec))
        }
        other => Err(InterpolationError::UnsupportedConversion(other)),
    }
}

fn integer_arg(conversion: char, arg: &FieldValue) -> Result<i128, InterpolationError> {
    match arg {
        FieldValue::I64(n) => Ok(i128::from(*n)),
        FieldValue::U64(n) => Ok(i128::from(*n)),
        FieldValue::Bool(b) => Ok(i128::from(*b)),
        FieldValue::F64(n) if n.is_finite() => Ok(n.trunc() as i128),
        other => Err(InterpolationError::BadArgument {
            conversion,
            found: kind_of(other),
        }),
    }
}

fn float_arg(conversion: char, arg: &FieldValue) -> Result<f64, InterpolationError> {
    match arg {
        FieldValue::F64(n) => Ok(*n),
        FieldValue::I64(n) => Ok(*n as f64),
        FieldValue::U64(n) => Ok(*n as f64),
        FieldValue::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        other => Err(InterpolationError::BadArgument {
            conversion,
            found: kind_of(other),
        }),
    }
}

// `1.500000e+02`, exponent signed and at least two digits wide.
fn exponent_form(n: f64, precision: usize, upper: bool) -> String {
    let raw = format!("{:.*e}", precision, n);
    let (mantissa, exponent) = raw.split_once('e').unwrap_or((raw.as_str(), "0"));
    let (sign, exp_digits) = match exponent.strip_prefix('-') {
        Some(rest) => ('-', rest),
        None => ('+', exponent),
    };
    let e = if upper { 'E' } else { 'e' };
    format!("{}{}{}{:0>2}", mantissa, e, sign, exp_digits)
}

fn kind_of(value: &FieldValue) -> &'static str {
    match value {
        FieldValue::Null => "null",
        FieldValue::Bool(_) => "bool",
        FieldValue::I64(_) | FieldValue::U64(_) => "int",
        FieldValue::F64(_) => "float",
        FieldValue::Str(_) => "str",
        FieldValue::DateTime(_) | FieldValue::NaiveDateTime(_) => "datetime",
        FieldValue::Uuid(_) => "uuid",
        FieldValue::List(_) => "list",
        FieldValue::Map(_) => "map",
        FieldValue::Json(_) => "json",
        FieldValue::Opaque(_) => "object",
    }
}

fn pad_text(text: String, spec: &Spec) -> String {
    let len = text.chars().count();
    if len >= spec.width {
        return text;
    }
    let fill = " ".repeat(spec.width - len);
    if spec.left {
        text + &fill
    } else {
        fill + &text
    }
}

fn pad_number(negative: bool, prefix: &str, digits: String, spec: &Spec) -> String {
    let sign = if negative {
        "-"
    } else if spec.plus {
        "+"
    } else if spec.space {
        " "
    } else {
        ""
    };
    let len = sign.len() + prefix.len() + digits.len();
    if len >= spec.width {
        return format!("{}{}{}", sign, prefix, digits);
    }
    let fill = spec.width - len;
    if spec.left {
        format!("{}{}{}{}", sign, prefix, digits, " ".repeat(fill))
    } else if spec.zero {
        format!("{}{}{}{}", sign, prefix, "0".repeat(fill), digits)
    } else {
        format!("{}{}{}{}", " ".repeat(fill), sign, prefix, digits)
    }
}
