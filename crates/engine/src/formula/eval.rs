// Formula evaluator - walks the AST against a read-only grid snapshot
//
// Referenced cells holding formulas are lexed, parsed and evaluated on demand.
// Each resolution carries the chain of cells being resolved above it; a cell
// that shows up twice on one chain is a circular reference. Sibling branches
// get independent chains, so diamond-shaped references are fine.

use crate::cell_id::{range_cells, CellId, DEFAULT_MAX_RANGE_CELLS};
use crate::error::{FormulaError, Result};
use crate::snapshot::CellLookup;

use super::eval_helpers::{arithmetic_operand, coerce_cell_text};
use super::functions::{FunctionImpl, FunctionRegistry, BUILTINS};
use super::parser::{parse_formula, parse_formula_strict, Expr, Op, UnaryOp};
use super::value::{CellValue, EvalResult};

pub const DEFAULT_MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalOptions {
    /// Longest chain of formula cells resolved through references.
    pub max_depth: usize,
    /// Most cells a single range reference may cover.
    pub max_range_cells: usize,
    /// Reject unknown characters and trailing tokens instead of skipping them.
    pub strict_syntax: bool,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_range_cells: DEFAULT_MAX_RANGE_CELLS,
            strict_syntax: false,
        }
    }
}

/// Cells currently being resolved, innermost first. Lives on the call stack.
#[derive(Debug, Clone, Copy)]
struct ResolutionPath<'p> {
    cell: Option<CellId>,
    parent: Option<&'p ResolutionPath<'p>>,
    depth: usize,
}

impl<'p> ResolutionPath<'p> {
    fn root() -> Self {
        Self { cell: None, parent: None, depth: 0 }
    }

    fn push(&'p self, cell: CellId) -> ResolutionPath<'p> {
        ResolutionPath { cell: Some(cell), parent: Some(self), depth: self.depth + 1 }
    }

    fn contains(&self, cell: CellId) -> bool {
        let mut node = Some(self);
        while let Some(path) = node {
            if path.cell == Some(cell) {
                return true;
            }
            node = path.parent;
        }
        false
    }
}

/// Evaluates formulas with a given function library and limits.
#[derive(Debug, Clone, Copy)]
pub struct FormulaEngine<'f> {
    functions: &'f FunctionRegistry,
    options: EvalOptions,
}

impl FormulaEngine<'static> {
    /// Engine over the built-in function library.
    pub fn new(options: EvalOptions) -> Self {
        Self { functions: &BUILTINS, options }
    }
}

impl Default for FormulaEngine<'static> {
    fn default() -> Self {
        Self::new(EvalOptions::default())
    }
}

impl<'f> FormulaEngine<'f> {
    pub fn with_functions(functions: &'f FunctionRegistry, options: EvalOptions) -> Self {
        Self { functions, options }
    }

    pub fn options(&self) -> EvalOptions {
        self.options
    }

    pub fn functions(&self) -> &'f FunctionRegistry {
        self.functions
    }

    pub fn parse(&self, formula: &str) -> Result<Expr> {
        if self.options.strict_syntax {
            parse_formula_strict(formula)
        } else {
            parse_formula(formula)
        }
    }

    /// Evaluate an AST. Errors propagate to the caller.
    pub fn evaluate<L: CellLookup + ?Sized>(&self, expr: &Expr, lookup: &L) -> Result<EvalResult> {
        self.eval_node(expr, lookup, &ResolutionPath::root())
    }

    /// Evaluate formula text, keeping a range result as an array.
    /// Failures become `#ERROR: ...` sentinels.
    pub fn evaluate_formula_result<L: CellLookup + ?Sized>(&self, formula: &str, lookup: &L) -> EvalResult {
        log::trace!("evaluating {}", formula);
        self.parse(formula)
            .and_then(|expr| self.evaluate(&expr, lookup))
            .unwrap_or_else(|e| EvalResult::Scalar(e.to_sentinel()))
    }

    /// Evaluate formula text to a single displayable value. Never fails.
    pub fn evaluate_formula<L: CellLookup + ?Sized>(&self, formula: &str, lookup: &L) -> CellValue {
        into_display_value(self.evaluate_formula_result(formula, lookup))
    }

    /// Displayed value of a stored cell, with the cell itself on the
    /// resolution path. Search cells show their raw text.
    pub fn evaluate_cell<L: CellLookup + ?Sized>(&self, label: &str, lookup: &L) -> CellValue {
        match CellId::parse(label) {
            Ok(id) => self.evaluate_cell_at(id, lookup),
            Err(e) => e.to_sentinel(),
        }
    }

    pub fn evaluate_cell_at<L: CellLookup + ?Sized>(&self, cell: CellId, lookup: &L) -> CellValue {
        let result = self
            .resolve_cell(cell, lookup, &ResolutionPath::root())
            .unwrap_or_else(|e| EvalResult::Scalar(e.to_sentinel()));
        into_display_value(result)
    }

    fn eval_node<L: CellLookup + ?Sized>(
        &self,
        expr: &Expr,
        lookup: &L,
        path: &ResolutionPath<'_>,
    ) -> Result<EvalResult> {
        match expr {
            Expr::Number(n) => Ok(CellValue::Number(*n).into()),
            Expr::Text(s) => Ok(CellValue::Text(s.clone()).into()),
            Expr::CellRef(label) => self.resolve_cell(CellId::parse(label)?, lookup, path),
            Expr::Range { start, end } => {
                let mut values = Vec::new();
                for cell in range_cells(start, end, self.options.max_range_cells)? {
                    self.resolve_cell(cell, lookup, path)?.flatten_into(&mut values);
                }
                Ok(EvalResult::Array(values))
            }
            Expr::BinaryOp { op, left, right } => {
                let left = self.eval_node(left, lookup, path)?;
                let right = self.eval_node(right, lookup, path)?;
                match (left, right) {
                    (EvalResult::Scalar(l), EvalResult::Scalar(r)) => Ok(binary_op(*op, &l, &r).into()),
                    _ => Err(FormulaError::InvalidOperand(
                        "Cannot perform binary operations on ranges directly".to_string(),
                    )),
                }
            }
            Expr::UnaryOp { op, operand } => match self.eval_node(operand, lookup, path)? {
                EvalResult::Scalar(v) => {
                    let n = arithmetic_operand(&v);
                    Ok(CellValue::Number(match op {
                        UnaryOp::Plus => n,
                        UnaryOp::Neg => -n,
                    })
                    .into())
                }
                EvalResult::Array(_) => Err(FormulaError::InvalidOperand(
                    "Cannot perform unary operations on ranges directly".to_string(),
                )),
            },
            Expr::Function { name, args } => {
                let name = name.to_uppercase();
                let implementation = self
                    .functions
                    .get(&name)
                    .ok_or_else(|| FormulaError::UnknownFunction(name.clone()))?;

                let args = args
                    .iter()
                    .map(|arg| self.eval_node(arg, lookup, path))
                    .collect::<Result<Vec<_>>>()?;

                match implementation {
                    FunctionImpl::Aggregate(f) => {
                        let mut flat = Vec::new();
                        for arg in args {
                            arg.flatten_into(&mut flat);
                        }
                        Ok(f(&flat).into())
                    }
                    FunctionImpl::Positional(f) => f(&args),
                }
            }
        }
    }

    /// Value of a referenced cell. A nested formula's own failures come back
    /// as a sentinel value; only cycle and depth violations are raised.
    fn resolve_cell<L: CellLookup + ?Sized>(
        &self,
        cell: CellId,
        lookup: &L,
        path: &ResolutionPath<'_>,
    ) -> Result<EvalResult> {
        if path.contains(cell) {
            log::debug!("circular reference at {}", cell);
            return Err(FormulaError::CircularReference(cell.to_string()));
        }

        let data = match lookup.get_cell(cell.row, cell.col) {
            Some(data) if !data.value.is_empty() => data,
            _ => return Ok(CellValue::Null.into()),
        };

        if !data.is_formula() {
            return Ok(coerce_cell_text(&data.value).into());
        }

        if path.depth >= self.options.max_depth {
            log::warn!("reference chain deeper than {} at {}", self.options.max_depth, cell);
            return Err(FormulaError::DepthExceeded(self.options.max_depth));
        }

        log::trace!("resolving {} = {}", cell, data.value);
        let inner = path.push(cell);
        Ok(self
            .parse(&data.value)
            .and_then(|expr| self.eval_node(&expr, lookup, &inner))
            .unwrap_or_else(|e| EvalResult::Scalar(e.to_sentinel())))
    }
}

/// Collapse a result to one value; a bare range can't be shown in one cell.
fn into_display_value(result: EvalResult) -> CellValue {
    match result {
        EvalResult::Scalar(v) => v,
        EvalResult::Array(_) => {
            FormulaError::InvalidOperand("Cannot display a range as a single value".to_string()).to_sentinel()
        }
    }
}

fn binary_op(op: Op, left: &CellValue, right: &CellValue) -> CellValue {
    let a = arithmetic_operand(left);
    let b = arithmetic_operand(right);
    match op {
        Op::Add => CellValue::Number(a + b),
        Op::Sub => CellValue::Number(a - b),
        Op::Mul => CellValue::Number(a * b),
        Op::Div if b == 0.0 => CellValue::Error("#DIV/0!".to_string()),
        Op::Div => CellValue::Number(a / b),
        Op::Pow => CellValue::Number(power(a, b)),
        Op::Lt => CellValue::Boolean(a < b),
        Op::Gt => CellValue::Boolean(a > b),
        Op::LtEq => CellValue::Boolean(a <= b),
        Op::GtEq => CellValue::Boolean(a >= b),
        // Equality compares the values themselves, not their numeric views
        Op::Eq => CellValue::Boolean(strict_equal(left, right)),
        Op::NotEq => CellValue::Boolean(!strict_equal(left, right)),
    }
}

/// Same type and payload. An error sentinel equals text with the same characters.
fn strict_equal(left: &CellValue, right: &CellValue) -> bool {
    match (left, right) {
        (CellValue::Error(a), CellValue::Text(b)) | (CellValue::Text(a), CellValue::Error(b)) => a == b,
        _ => left == right,
    }
}

// powf says 1^NaN = 1 and (-1)^inf = 1; spreadsheets expect NaN for both
fn power(base: f64, exponent: f64) -> f64 {
    if exponent.is_nan() || (base.abs() == 1.0 && exponent.is_infinite()) {
        f64::NAN
    } else {
        base.powf(exponent)
    }
}

/// Evaluate an AST with the built-in functions and default limits.
pub fn evaluate<L: CellLookup + ?Sized>(expr: &Expr, lookup: &L) -> Result<EvalResult> {
    FormulaEngine::default().evaluate(expr, lookup)
}

/// Evaluate formula text with the built-in functions and default limits.
pub fn evaluate_formula<L: CellLookup + ?Sized>(formula: &str, lookup: &L) -> CellValue {
    FormulaEngine::default().evaluate_formula(formula, lookup)
}
