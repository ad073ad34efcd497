// Shared coercion helpers for formula evaluation
//
// Three numeric coercions live here and must stay distinct:
// - `coerce_cell_text`: raw cell text -> Number only if it is the canonical
//   rendering of a number, else Text
// - `arithmetic_operand`: operands of + - * / ^ and comparisons, NaN on failure
// - `to_number`: function arguments, 0 on failure

use super::value::CellValue;

/// Canonical shortest rendering of a number.
///
/// Integers print without a fraction, exponents are used at or above 1e21 and
/// below 1e-6 (`1e+21`, `1.5e-7`), and specials print as `NaN`, `Infinity`.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() };
    }
    if n == 0.0 {
        return "0".to_string();
    }

    let abs = n.abs();
    if (1e-6..1e21).contains(&abs) {
        return format!("{}", n);
    }

    let sci = format!("{:e}", n);
    match sci.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
        _ => sci,
    }
}

/// Parse the longest numeric prefix of `s` after leading whitespace.
///
/// Accepts an optional sign, digits with an optional fraction, an optional
/// exponent, or `Infinity`. Returns None when no digits are found.
pub(crate) fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut pos = 0;

    let negative = match bytes.first() {
        Some(b'-') => {
            pos += 1;
            true
        }
        Some(b'+') => {
            pos += 1;
            false
        }
        _ => false,
    };

    if s[pos..].starts_with("Infinity") {
        return Some(if negative { f64::NEG_INFINITY } else { f64::INFINITY });
    }

    let int_start = pos;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }
    let int_digits = &s[int_start..pos];

    let mut frac_digits = "";
    if pos < bytes.len() && bytes[pos] == b'.' {
        let frac_start = pos + 1;
        let mut end = frac_start;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        frac_digits = &s[frac_start..end];
        pos = end;
    }

    if int_digits.is_empty() && frac_digits.is_empty() {
        return None;
    }

    let mut exponent = "";
    if pos < bytes.len() && (bytes[pos] == b'e' || bytes[pos] == b'E') {
        let mut end = pos + 1;
        if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
            end += 1;
        }
        let digits_start = end;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        if end > digits_start {
            exponent = &s[pos..end];
        }
    }

    let normalized = format!(
        "{}{}.{}{}",
        if negative { "-" } else { "" },
        if int_digits.is_empty() { "0" } else { int_digits },
        if frac_digits.is_empty() { "0" } else { frac_digits },
        exponent,
    );
    normalized.parse::<f64>().ok()
}

/// Coerce raw (non-formula) cell text.
pub(crate) fn coerce_cell_text(raw: &str) -> CellValue {
    match parse_float_prefix(raw) {
        Some(n) if raw.trim() == format_number(n) => CellValue::Number(n),
        _ => CellValue::Text(raw.to_string()),
    }
}

/// Numeric view of an operator operand. Anything unparseable is NaN.
pub(crate) fn arithmetic_operand(value: &CellValue) -> f64 {
    match value {
        CellValue::Number(n) => *n,
        CellValue::Text(s) => parse_float_prefix(s).unwrap_or(f64::NAN),
        CellValue::Null | CellValue::Boolean(_) | CellValue::Error(_) => f64::NAN,
    }
}

/// Numeric view of a function argument. Anything unparseable is 0.
pub(crate) fn to_number(value: &CellValue) -> f64 {
    match value {
        CellValue::Number(n) => *n,
        CellValue::Boolean(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        CellValue::Text(s) => parse_float_prefix(s).unwrap_or(0.0),
        CellValue::Null | CellValue::Error(_) => 0.0,
    }
}

pub(crate) fn is_numeric(value: &CellValue) -> bool {
    match value {
        CellValue::Number(n) => !n.is_nan(),
        CellValue::Text(s) => !s.trim().is_empty() && parse_float_prefix(s).is_some(),
        _ => false,
    }
}

/// String rendering used by text functions; Null renders empty.
pub(crate) fn to_text(value: &CellValue) -> String {
    value.to_string()
}

/// Truthiness for IF conditions: false, 0, NaN, "" and Null are false.
pub(crate) fn is_truthy(value: &CellValue) -> bool {
    match value {
        CellValue::Boolean(b) => *b,
        CellValue::Number(n) => *n != 0.0 && !n.is_nan(),
        CellValue::Text(s) | CellValue::Error(s) => !s.is_empty(),
        CellValue::Null => false,
    }
}

/// Truthiness for AND/OR: any non-empty string counts as true.
pub(crate) fn logical_truth(value: &CellValue) -> bool {
    match value {
        CellValue::Boolean(b) => *b,
        CellValue::Number(n) => *n != 0.0,
        CellValue::Text(s) | CellValue::Error(s) => !s.is_empty(),
        CellValue::Null => false,
    }
}

/// Round half toward positive infinity (2.5 -> 3, -2.5 -> -2).
pub(crate) fn round_half_up(n: f64) -> f64 {
    (n + 0.5).floor()
}
