// Math functions: SUM, AVERAGE, COUNT, MIN, MAX (aggregates), ABS, ROUND

use crate::error::Result;

use super::eval_helpers::{is_numeric, round_half_up, to_number};
use super::functions::scalar_arg;
use super::value::{CellValue, EvalResult};

pub(crate) fn sum(values: &[CellValue]) -> CellValue {
    CellValue::Number(values.iter().map(to_number).sum())
}

/// Mean of the numeric elements; 0 when there are none.
pub(crate) fn average(values: &[CellValue]) -> CellValue {
    let numbers: Vec<f64> = values.iter().filter(|v| is_numeric(v)).map(to_number).collect();
    if numbers.is_empty() {
        return CellValue::Number(0.0);
    }
    CellValue::Number(numbers.iter().sum::<f64>() / numbers.len() as f64)
}

/// Non-empty elements. Numbers, booleans and error sentinels all count.
pub(crate) fn count(values: &[CellValue]) -> CellValue {
    let n = values
        .iter()
        .filter(|v| !matches!(v, CellValue::Null) && !matches!(v, CellValue::Text(s) if s.is_empty()))
        .count();
    CellValue::Number(n as f64)
}

pub(crate) fn min(values: &[CellValue]) -> CellValue {
    extremum(values, f64::min)
}

pub(crate) fn max(values: &[CellValue]) -> CellValue {
    extremum(values, f64::max)
}

fn extremum(values: &[CellValue], pick: fn(f64, f64) -> f64) -> CellValue {
    let result = values
        .iter()
        .filter(|v| is_numeric(v))
        .map(to_number)
        .reduce(pick)
        .unwrap_or(0.0);
    CellValue::Number(result)
}

pub(crate) fn abs(args: &[EvalResult]) -> Result<EvalResult> {
    let value = scalar_arg("ABS", args, 0)?.map(to_number).unwrap_or(0.0);
    Ok(CellValue::Number(value.abs()).into())
}

/// ROUND(value, decimals = 0). Decimals are floored; halves round up.
pub(crate) fn round(args: &[EvalResult]) -> Result<EvalResult> {
    let value = scalar_arg("ROUND", args, 0)?.map(to_number).unwrap_or(0.0);
    let decimals = scalar_arg("ROUND", args, 1)?.map(to_number).unwrap_or(0.0).floor();
    let multiplier = 10f64.powf(decimals);
    Ok(CellValue::Number(round_half_up(value * multiplier) / multiplier).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormulaError;

    fn nums(values: &[f64]) -> Vec<CellValue> {
        values.iter().map(|n| CellValue::Number(*n)).collect()
    }

    fn scalar(v: impl Into<CellValue>) -> EvalResult {
        EvalResult::Scalar(v.into())
    }

    #[test]
    fn test_sum_coerces_everything() {
        let values = vec![
            CellValue::Number(1.0),
            CellValue::Text("2".into()),
            CellValue::Text("abc".into()),
            CellValue::Boolean(true),
            CellValue::Null,
            CellValue::Error("#DIV/0!".into()),
        ];
        assert_eq!(sum(&values), CellValue::Number(4.0));
        assert_eq!(sum(&[]), CellValue::Number(0.0));
    }

    #[test]
    fn test_average_skips_non_numeric() {
        let values = vec![
            CellValue::Number(10.0),
            CellValue::Text("20".into()),
            CellValue::Text("x".into()),
            CellValue::Null,
            CellValue::Boolean(true),
        ];
        assert_eq!(average(&values), CellValue::Number(15.0));
        assert_eq!(average(&[CellValue::Null]), CellValue::Number(0.0));
    }

    #[test]
    fn test_count_non_empty() {
        let values = vec![
            CellValue::Number(0.0),
            CellValue::Text("".into()),
            CellValue::Text("x".into()),
            CellValue::Null,
            CellValue::Boolean(false),
            CellValue::Error("#DIV/0!".into()),
        ];
        assert_eq!(count(&values), CellValue::Number(4.0));
    }

    #[test]
    fn test_min_max() {
        assert_eq!(min(&nums(&[3.0, -1.0, 2.0])), CellValue::Number(-1.0));
        assert_eq!(max(&nums(&[3.0, -1.0, 2.0])), CellValue::Number(3.0));
        assert_eq!(max(&[CellValue::Text("7 apples".into())]), CellValue::Number(7.0));
        assert_eq!(min(&[CellValue::Text("x".into()), CellValue::Null]), CellValue::Number(0.0));
        assert_eq!(max(&[]), CellValue::Number(0.0));
    }

    #[test]
    fn test_abs() {
        assert_eq!(abs(&[scalar(-3.5)]).unwrap(), scalar(3.5));
        assert_eq!(abs(&[scalar("-2")]).unwrap(), scalar(2.0));
        assert_eq!(abs(&[]).unwrap(), scalar(0.0));
        assert!(matches!(
            abs(&[EvalResult::Array(vec![])]),
            Err(FormulaError::InvalidOperand(_))
        ));
    }

    #[test]
    fn test_round() {
        assert_eq!(round(&[scalar(2.5)]).unwrap(), scalar(3.0));
        assert_eq!(round(&[scalar(-2.5)]).unwrap(), scalar(-2.0));
        assert_eq!(round(&[scalar(3.14159), scalar(2.0)]).unwrap(), scalar(3.14));
        assert_eq!(round(&[scalar(3.14159), scalar(2.9)]).unwrap(), scalar(3.14));
        assert_eq!(round(&[scalar(1234.0), scalar(-2.0)]).unwrap(), scalar(1200.0));
        assert_eq!(round(&[scalar("1.26"), scalar("1")]).unwrap(), scalar(1.3));
    }
}
