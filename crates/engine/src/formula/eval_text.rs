// Text functions: CONCAT, UPPER, LOWER, LEN

use crate::error::Result;

use super::eval_helpers::to_text;
use super::functions::scalar_arg;
use super::value::{CellValue, EvalResult};

/// Joins the rendering of every argument. A range renders as its cells
/// separated by commas, empty cells included ("x,,2").
pub(crate) fn concat(args: &[EvalResult]) -> Result<EvalResult> {
    let mut out = String::new();
    for arg in args {
        match arg {
            EvalResult::Scalar(v) => out.push_str(&to_text(v)),
            EvalResult::Array(values) => {
                let cells: Vec<String> = values.iter().map(to_text).collect();
                out.push_str(&cells.join(","));
            }
        }
    }
    Ok(CellValue::Text(out).into())
}

fn first_text(name: &str, args: &[EvalResult]) -> Result<String> {
    Ok(scalar_arg(name, args, 0)?.map(to_text).unwrap_or_default())
}

pub(crate) fn upper(args: &[EvalResult]) -> Result<EvalResult> {
    Ok(CellValue::Text(first_text("UPPER", args)?.to_uppercase()).into())
}

pub(crate) fn lower(args: &[EvalResult]) -> Result<EvalResult> {
    Ok(CellValue::Text(first_text("LOWER", args)?.to_lowercase()).into())
}

/// Length in characters, not bytes.
pub(crate) fn len(args: &[EvalResult]) -> Result<EvalResult> {
    Ok(CellValue::Number(first_text("LEN", args)?.chars().count() as f64).into())
}
