use std::fmt;

use super::CifError;

/// A single CIF scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Str(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// String content for `Str` values only.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(s) => write!(f, "{s}"),
        }
    }
}

/// A parsed token together with its standard uncertainty, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedValue {
    pub value: Value,
    pub su: Option<f64>,
}

/// Parses one CIF token.
///
/// With `split_su`, tokens of the form `value(uncertainty)` are decomposed:
/// a mantissa with `d` fractional digits yields `su = digits × 10⁻ᵈ` and the
/// value rounded to `d` decimals; an integer mantissa keeps the raw
/// parenthesized integer as its uncertainty. Everything else falls through
/// to plain scalar parsing: quoted strings are unquoted and unescaped,
/// numeric literals become `Int` or `Float` by presence of a decimal point,
/// and anything else is kept as an unescaped string.
pub fn parse_value(token: &str, split_su: bool) -> ParsedValue {
    if split_su {
        if let Some((mantissa, fractional_digits, has_dot, su_digits)) = match_su_token(token) {
            if has_dot {
                let scale = 10f64.powi(fractional_digits as i32);
                // The mantissa always re-parses; it was scanned digit by digit.
                let raw: f64 = mantissa.parse().unwrap_or(0.0);
                return ParsedValue {
                    value: Value::Float((raw * scale).round() / scale),
                    su: Some(su_digits as f64 / scale),
                };
            }
            let raw: i64 = mantissa.parse().unwrap_or(0);
            return ParsedValue {
                value: Value::Int(raw),
                su: Some(su_digits as f64),
            };
        }
    }

    ParsedValue {
        value: parse_scalar(token),
        su: None,
    }
}

/// Matches `[+-]?(\d+\.?\d*|\.\d+)\(\d+\)` and returns
/// (signed mantissa, fractional digit count, mantissa has a dot, su digits).
fn match_su_token(token: &str) -> Option<(&str, usize, bool, u64)> {
    let s = token.as_bytes();
    let mut i = usize::from(matches!(s.first(), Some(b'+') | Some(b'-')));

    let mut digits_before = 0;
    while i < s.len() && s[i].is_ascii_digit() {
        i += 1;
        digits_before += 1;
    }

    let mut has_dot = false;
    let mut digits_after = 0;
    if i < s.len() && s[i] == b'.' {
        has_dot = true;
        i += 1;
        while i < s.len() && s[i].is_ascii_digit() {
            i += 1;
            digits_after += 1;
        }
    }
    if digits_before == 0 && digits_after == 0 {
        return None;
    }

    if s.get(i) != Some(&b'(') {
        return None;
    }
    let su_start = i + 1;
    let mut j = su_start;
    while j < s.len() && s[j].is_ascii_digit() {
        j += 1;
    }
    if j == su_start || s.get(j) != Some(&b')') || j + 1 != s.len() {
        return None;
    }

    let su_digits: u64 = token[su_start..j].parse().ok()?;
    Some((&token[..i], digits_after, has_dot, su_digits))
}

fn parse_scalar(token: &str) -> Value {
    let quoted = token.len() >= 2
        && ((token.starts_with('\'') && token.ends_with('\''))
            || (token.starts_with('"') && token.ends_with('"')));
    if quoted {
        return Value::Str(unescape(&token[1..token.len() - 1]));
    }

    if let Ok(v) = token.parse::<i64>() {
        return Value::Int(v);
    }
    // Guard against "inf"/"nan" style words sneaking through f64::from_str.
    if token.starts_with(|c: char| c.is_ascii_digit() || c == '+' || c == '-' || c == '.') {
        if let Ok(v) = token.parse::<f64>() {
            return Value::Float(v);
        }
    }

    Value::Str(unescape(token))
}

/// Removes backslash escapes: `\X` becomes `X`.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) => out.push(next),
                None => out.push(c),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Reads a `;`-fenced multiline value.
///
/// `lines[start]` is the opening `;` line; the field runs until the next line
/// that is exactly `;`. Returns the trimmed, unescaped join of the interior
/// lines and the index of the closing `;`.
pub fn parse_multiline(lines: &[String], start: usize) -> Result<(String, usize), CifError> {
    let close = lines[start + 1..]
        .iter()
        .position(|line| line.trim() == ";")
        .map(|offset| start + 1 + offset)
        .ok_or(CifError::UnterminatedMultiline { start })?;

    let body = lines[start + 1..close].join("\n");
    Ok((unescape(body.trim()), close))
}
