use super::{Value, ValueError, ValueRef};

// Conversions between the scalar types. Numeric casts are C style, strings
// must be consumed completely to count as numbers.

pub fn as_char(value: &Value) -> Result<u8, ValueError> {
    match value {
        Value::Char(c) => Ok(*c),
        Value::Int(i) => Ok(*i as u8),
        Value::Float(f) => Ok(*f as u8),
        Value::Str(s) => str_to_char(s),
        other => Err(ValueError::Conversion(other.type_name().to_string(), "char")),
    }
}

pub fn as_int(value: &Value) -> Result<i64, ValueError> {
    match value {
        Value::Char(c) => Ok(*c as i64),
        Value::Int(i) => Ok(*i),
        Value::Float(f) => Ok(*f as i64),
        Value::Str(s) => str_to_int(s),
        other => Err(ValueError::Conversion(other.type_name().to_string(), "int")),
    }
}

pub fn as_float(value: &Value) -> Result<f64, ValueError> {
    match value {
        Value::Char(c) => Ok(*c as f64),
        Value::Int(i) => Ok(*i as f64),
        Value::Float(f) => Ok(*f),
        Value::Str(s) => str_to_float(s),
        other => Err(ValueError::Conversion(other.type_name().to_string(), "float")),
    }
}

pub fn as_str(value: &Value) -> Result<String, ValueError> {
    match value {
        Value::Str(s) => Ok(s.clone()),
        other => Err(ValueError::Conversion(other.type_name().to_string(), "str")),
    }
}

pub fn as_list(value: &Value) -> Result<Vec<ValueRef>, ValueError> {
    match value {
        Value::List(items) => Ok(items.clone()),
        other => Err(ValueError::Conversion(other.type_name().to_string(), "list")),
    }
}

pub fn as_bool(value: &Value) -> Result<bool, ValueError> {
    match value {
        Value::Char(c) => Ok(*c != 0),
        Value::Int(i) => Ok(*i != 0),
        Value::Float(f) => Ok(*f != 0.0),
        other => Err(ValueError::Conversion(other.type_name().to_string(), "bool")),
    }
}

// Canonical textual form of a scalar, used for str assignment and for
// mixing numbers into string concatenation. Sequences and positions have
// no textual form.
pub fn to_text(value: &Value) -> Option<String> {
    match value {
        Value::Char(c) => Some((*c as char).to_string()),
        Value::Int(i) => Some(i.to_string()),
        Value::Float(f) => Some(format_float(*f)),
        Value::Str(s) => Some(s.clone()),
        _ => None,
    }
}

// Decode the raw spelling of a character constant. Exactly one byte, or a
// backslash escape from the supported set.
pub fn str_to_char(s: &str) -> Result<u8, ValueError> {
    let bytes = s.as_bytes();
    match bytes {
        [] => Err(ValueError::EmptyCharConstant),
        [b'\\'] => Err(ValueError::UnknownEscape('\0')),
        [b'\\', e, rest @ ..] => {
            let c = unescape(*e as char)?;
            if rest.is_empty() {
                Ok(c)
            } else {
                Err(ValueError::LongCharConstant)
            }
        }
        [c] => Ok(*c),
        _ => Err(ValueError::LongCharConstant),
    }
}

pub fn unescape(c: char) -> Result<u8, ValueError> {
    Ok(match c {
        '0' => 0,
        'b' => 8,
        'f' => 12,
        'n' => b'\n',
        'r' => b'\r',
        't' => b'\t',
        'v' => 11,
        '\\' => b'\\',
        '\'' => b'\'',
        '"' => b'"',
        _ => return Err(ValueError::UnknownEscape(c)),
    })
}

pub fn str_to_int(s: &str) -> Result<i64, ValueError> {
    s.trim()
        .parse::<i64>()
        .map_err(|_| ValueError::Conversion(s.to_string(), "int"))
}

pub fn str_to_float(s: &str) -> Result<f64, ValueError> {
    s.trim()
        .parse::<f64>()
        .map_err(|_| ValueError::Conversion(s.to_string(), "float"))
}

// Floats print like %.16G: up to 16 significant digits, trailing zeros
// trimmed, exponent notation outside the fixed range.
pub fn format_float(x: f64) -> String {
    if x.is_nan() {
        return "NAN".to_string();
    }
    if x.is_infinite() {
        return if x < 0.0 { "-INF" } else { "INF" }.to_string();
    }
    if x == 0.0 {
        return "0".to_string();
    }

    let sci = format!("{:.15e}", x);
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);

    if exp < -4 || exp >= 16 {
        let mantissa = mantissa.trim_end_matches('0').trim_end_matches('.');
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}E{}{:02}", mantissa, sign, exp.abs())
    } else {
        let decimals = (15 - exp).max(0) as usize;
        let fixed = format!("{:.*}", decimals, x);
        if fixed.contains('.') {
            fixed
                .trim_end_matches('0')
                .trim_end_matches('.')
                .to_string()
        } else {
            fixed
        }
    }
}
