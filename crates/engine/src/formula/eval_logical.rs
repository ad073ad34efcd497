// Logical functions: IF, AND, OR, NOT

use crate::error::Result;

use super::eval_helpers::{is_truthy, logical_truth};
use super::functions::{range_not_allowed, scalar_arg};
use super::value::{CellValue, EvalResult};

/// IF(cond, then, else). The chosen branch is passed through as-is, so a
/// branch may yield a range. A missing branch is Null.
pub(crate) fn if_fn(args: &[EvalResult]) -> Result<EvalResult> {
    let condition = scalar_arg("IF", args, 0)?.map(is_truthy).unwrap_or(false);
    let branch = if condition { args.get(1) } else { args.get(2) };
    Ok(branch.cloned().unwrap_or(EvalResult::Scalar(CellValue::Null)))
}

/// True when every argument is truthy (and for no arguments).
pub(crate) fn and(args: &[EvalResult]) -> Result<EvalResult> {
    let mut result = true;
    for arg in args {
        match arg {
            EvalResult::Scalar(value) => result &= logical_truth(value),
            EvalResult::Array(_) => return Err(range_not_allowed("AND")),
        }
    }
    Ok(CellValue::Boolean(result).into())
}

/// True when any argument is truthy; false for no arguments.
pub(crate) fn or(args: &[EvalResult]) -> Result<EvalResult> {
    let mut result = false;
    for arg in args {
        match arg {
            EvalResult::Scalar(value) => result |= logical_truth(value),
            EvalResult::Array(_) => return Err(range_not_allowed("OR")),
        }
    }
    Ok(CellValue::Boolean(result).into())
}

pub(crate) fn not(args: &[EvalResult]) -> Result<EvalResult> {
    let negated = match scalar_arg("NOT", args, 0)? {
        Some(CellValue::Boolean(b)) => !b,
        Some(CellValue::Number(n)) => *n == 0.0,
        Some(CellValue::Text(s)) => s.is_empty() || s.to_lowercase() == "false",
        Some(CellValue::Error(_)) => false,
        Some(CellValue::Null) | None => true,
    };
    Ok(CellValue::Boolean(negated).into())
}
