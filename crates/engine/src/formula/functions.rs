// Built-in spreadsheet functions

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

use crate::error::{FormulaError, Result};

use super::value::{CellValue, EvalResult};
use super::{eval_logical, eval_math, eval_text};

/// How a function receives its arguments.
#[derive(Clone, Copy)]
pub enum FunctionImpl {
    /// Every argument flattened into one list (ranges spread out).
    Aggregate(fn(&[CellValue]) -> CellValue),
    /// Arguments as evaluated; a range stays an array.
    Positional(fn(&[EvalResult]) -> Result<EvalResult>),
}

impl std::fmt::Debug for FunctionImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FunctionImpl::Aggregate(_) => f.write_str("Aggregate"),
            FunctionImpl::Positional(_) => f.write_str("Positional"),
        }
    }
}

/// Immutable name -> implementation table. Names are upper-case.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: FxHashMap<&'static str, FunctionImpl>,
}

impl FunctionRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut registry = Self::empty();

        // Math
        registry.register("SUM", FunctionImpl::Aggregate(eval_math::sum));
        registry.register("AVERAGE", FunctionImpl::Aggregate(eval_math::average));
        registry.register("COUNT", FunctionImpl::Aggregate(eval_math::count));
        registry.register("MIN", FunctionImpl::Aggregate(eval_math::min));
        registry.register("MAX", FunctionImpl::Aggregate(eval_math::max));
        registry.register("ABS", FunctionImpl::Positional(eval_math::abs));
        registry.register("ROUND", FunctionImpl::Positional(eval_math::round));

        // Logic
        registry.register("IF", FunctionImpl::Positional(eval_logical::if_fn));
        registry.register("AND", FunctionImpl::Positional(eval_logical::and));
        registry.register("OR", FunctionImpl::Positional(eval_logical::or));
        registry.register("NOT", FunctionImpl::Positional(eval_logical::not));

        // Text
        registry.register("CONCAT", FunctionImpl::Positional(eval_text::concat));
        registry.register("UPPER", FunctionImpl::Positional(eval_text::upper));
        registry.register("LOWER", FunctionImpl::Positional(eval_text::lower));
        registry.register("LEN", FunctionImpl::Positional(eval_text::len));

        registry
    }

    pub fn register(&mut self, name: &'static str, implementation: FunctionImpl) {
        self.functions.insert(name, implementation);
    }

    pub fn get(&self, name: &str) -> Option<FunctionImpl> {
        self.functions.get(name).copied()
    }

    pub fn is_known_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn list_functions(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.functions.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// The built-in library, built once.
pub static BUILTINS: Lazy<FunctionRegistry> = Lazy::new(FunctionRegistry::builtin);

/// Check if a function name is a built-in. Names must be upper-case (as produced by the lexer).
pub fn is_known_function(name: &str) -> bool {
    BUILTINS.is_known_function(name)
}

/// Sorted names of all built-in functions.
pub fn list_functions() -> Vec<&'static str> {
    BUILTINS.list_functions()
}

/// Scalar argument `index` of `name`, or None when it was not supplied.
pub(crate) fn scalar_arg<'a>(name: &str, args: &'a [EvalResult], index: usize) -> Result<Option<&'a CellValue>> {
    match args.get(index) {
        None => Ok(None),
        Some(EvalResult::Scalar(v)) => Ok(Some(v)),
        Some(EvalResult::Array(_)) => Err(range_not_allowed(name)),
    }
}

pub(crate) fn range_not_allowed(name: &str) -> FormulaError {
    FormulaError::InvalidOperand(format!("{} does not accept a range argument", name))
}
