// Evaluation values: scalars (CellValue) and range results (EvalResult)

use std::fmt;

use serde::{Deserialize, Serialize};

use super::eval_helpers::format_number;

// =============================================================================
// CellValue: the scalar handed back to the grid for display
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum CellValue {
    #[default]
    Null,
    Number(f64),
    Text(String),
    Boolean(bool),
    /// Spreadsheet error sentinel, e.g. `#DIV/0!` or `#ERROR: ...`
    Error(String),
}

impl CellValue {
    pub fn is_error(&self) -> bool {
        matches!(self, CellValue::Error(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CellValue::Null => serde_json::Value::Null,
            CellValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or_else(|| serde_json::Value::String(format_number(*n))),
            CellValue::Text(s) | CellValue::Error(s) => serde_json::Value::String(s.clone()),
            CellValue::Boolean(b) => serde_json::Value::Bool(*b),
        }
    }
}

/// Display convention: Null is empty, errors show their sentinel text,
/// numbers use the canonical shortest form (`7`, `0.5`, `1e+21`).
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Number(n) => f.write_str(&format_number(*n)),
            CellValue::Text(s) | CellValue::Error(s) => f.write_str(s),
            CellValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

// =============================================================================
// EvalResult: result of evaluating one AST node (scalar or flattened range)
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum EvalResult {
    Scalar(CellValue),
    Array(Vec<CellValue>),
}

impl EvalResult {
    pub fn is_array(&self) -> bool {
        matches!(self, EvalResult::Array(_))
    }

    pub fn as_scalar(&self) -> Option<&CellValue> {
        match self {
            EvalResult::Scalar(v) => Some(v),
            EvalResult::Array(_) => None,
        }
    }

    /// Append this result to `out`, flattening arrays one level.
    pub fn flatten_into(self, out: &mut Vec<CellValue>) {
        match self {
            EvalResult::Scalar(v) => out.push(v),
            EvalResult::Array(values) => out.extend(values),
        }
    }
}

impl From<CellValue> for EvalResult {
    fn from(value: CellValue) -> Self {
        EvalResult::Scalar(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_convention() {
        assert_eq!(CellValue::Null.to_string(), "");
        assert_eq!(CellValue::Number(7.0).to_string(), "7");
        assert_eq!(CellValue::Number(0.5).to_string(), "0.5");
        assert_eq!(CellValue::Number(-3.25).to_string(), "-3.25");
        assert_eq!(CellValue::Boolean(true).to_string(), "true");
        assert_eq!(CellValue::Text("abc".into()).to_string(), "abc");
        assert_eq!(CellValue::Error("#DIV/0!".into()).to_string(), "#DIV/0!");
    }

    #[test]
    fn test_equality_is_strict() {
        assert_ne!(CellValue::Number(1.0), CellValue::Text("1".into()));
        assert_ne!(CellValue::Number(f64::NAN), CellValue::Number(f64::NAN));
        assert_eq!(CellValue::Null, CellValue::Null);
    }

    #[test]
    fn test_flatten_into() {
        let mut out = vec![CellValue::Number(1.0)];
        EvalResult::Array(vec![CellValue::Number(2.0), CellValue::Null]).flatten_into(&mut out);
        EvalResult::Scalar(CellValue::Boolean(false)).flatten_into(&mut out);
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn test_json_shape() {
        assert_eq!(CellValue::Number(2.5).to_json(), serde_json::json!(2.5));
        assert_eq!(CellValue::Number(f64::NAN).to_json(), serde_json::json!("NaN"));
        assert_eq!(CellValue::Null.to_json(), serde_json::Value::Null);
        let tagged = serde_json::to_value(CellValue::Text("hi".into())).unwrap();
        assert_eq!(tagged, serde_json::json!({"type": "text", "value": "hi"}));
    }
}
