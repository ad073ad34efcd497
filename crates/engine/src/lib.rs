pub mod cell_id;
pub mod error;
pub mod formula;
pub mod snapshot;

pub use cell_id::{cell_label, expand_range, parse_cell_label, CellId};
pub use error::FormulaError;
pub use formula::eval::{evaluate, evaluate_formula, EvalOptions, FormulaEngine};
pub use formula::value::{CellValue, EvalResult};
pub use snapshot::{CellData, CellLookup, GridSnapshot};
