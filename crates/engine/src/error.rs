//! Formula failures.
//!
//! Every structural or semantic failure raised while lexing, parsing or
//! evaluating a formula is a `FormulaError`. None of them escape the engine:
//! the nearest evaluation boundary turns them into an `#ERROR: <message>`
//! sentinel value (see [`FormulaError::to_sentinel`]).

use thiserror::Error;

use crate::formula::value::CellValue;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormulaError {
    /// Malformed formula structure (missing parens, unexpected token, ...).
    #[error("{0}")]
    Syntax(String),

    /// A cell or range label that is not `letters + digits`.
    #[error("Invalid cell reference: {0}")]
    InvalidLabel(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    /// A cell re-entered along one resolution path.
    #[error("Circular reference detected: {0}")]
    CircularReference(String),

    /// A range used where a single value is required.
    #[error("{0}")]
    InvalidOperand(String),

    #[error("Maximum reference depth of {0} exceeded")]
    DepthExceeded(usize),

    /// A range covering more cells than the configured limit.
    #[error("Range exceeds the maximum of {0} cells")]
    RangeTooLarge(usize),
}

pub type Result<T> = std::result::Result<T, FormulaError>;

impl FormulaError {
    pub(crate) fn syntax(msg: impl Into<String>) -> Self {
        FormulaError::Syntax(msg.into())
    }

    /// Convert into the displayable `#ERROR: ...` sentinel.
    pub fn to_sentinel(&self) -> CellValue {
        CellValue::Error(format!("#ERROR: {}", self))
    }
}
