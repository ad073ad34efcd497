//! Cell identity and A1 labels.
//!
//! A `CellId` is a 0-based `(row, col)` coordinate. Labels are the
//! human-readable form: column letters (base 26, `A`=0, `Z`=25, `AA`=26)
//! followed by the 1-based row number. Letters are case-insensitive.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{FormulaError, Result};

static LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?<letters>[A-Za-z]+)(?<digits>[0-9]+)$").expect("valid label regex"));

/// Unique identifier for a cell in the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellId {
    /// Row index (0-based)
    pub row: usize,
    /// Column index (0-based)
    pub col: usize,
}

impl CellId {
    #[inline]
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Parse an A1-style label ("B12", "aa3").
    pub fn parse(label: &str) -> Result<Self> {
        let invalid = || FormulaError::InvalidLabel(label.to_string());
        let caps = LABEL_RE.captures(label).ok_or_else(invalid)?;

        let col = letters_to_col(&caps["letters"]).ok_or_else(invalid)?;
        let row = caps["digits"]
            .parse::<usize>()
            .ok()
            .and_then(|r| r.checked_sub(1))
            .ok_or_else(invalid)?;

        Ok(Self { row, col })
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", col_to_letters(self.col), self.row + 1)
    }
}

/// Returns true if `s` has cell-reference shape (`^[A-Za-z]+\d+$`).
pub fn is_cell_label(s: &str) -> bool {
    LABEL_RE.is_match(s)
}

/// Convert 0-based column index to letter(s): 0 -> A, 25 -> Z, 26 -> AA.
pub fn col_to_letters(col: usize) -> String {
    let mut result = String::new();
    let mut n = col as u128 + 1;
    while n > 0 {
        n -= 1;
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        n /= 26;
    }
    result
}

/// Convert column letters to a 0-based index. None on overflow.
fn letters_to_col(letters: &str) -> Option<usize> {
    let mut acc = 0usize;
    for c in letters.to_ascii_uppercase().bytes() {
        let digit = (c - b'A') as usize + 1;
        acc = acc.checked_mul(26)?.checked_add(digit)?;
    }
    acc.checked_sub(1)
}

/// Parse a label into `(row, col)`.
pub fn parse_cell_label(label: &str) -> Result<(usize, usize)> {
    CellId::parse(label).map(|id| (id.row, id.col))
}

/// Format `(row, col)` as a label: (0, 0) -> "A1".
pub fn cell_label(row: usize, col: usize) -> String {
    CellId::new(row, col).to_string()
}

/// Largest number of cells a single range may cover by default.
pub const DEFAULT_MAX_RANGE_CELLS: usize = 1_000_000;

/// Expand "A1:B5" into every cell label it covers.
///
/// Endpoints are normalized, so "B5:A1" yields the same list. Order is row
/// major, columns ascending within each row. Ranges over
/// [`DEFAULT_MAX_RANGE_CELLS`] cells fail with `RangeTooLarge`.
pub fn expand_range(range: &str) -> Result<Vec<String>> {
    let (start, end) = range
        .split_once(':')
        .ok_or_else(|| FormulaError::InvalidLabel(range.to_string()))?;
    Ok(range_cells(start, end, DEFAULT_MAX_RANGE_CELLS)?
        .into_iter()
        .map(|id| id.to_string())
        .collect())
}

/// Expand two endpoint labels into cell ids (same order as [`expand_range`]).
/// The cell count is checked against `max_cells` before anything is allocated.
pub fn range_cells(start: &str, end: &str, max_cells: usize) -> Result<Vec<CellId>> {
    let a = CellId::parse(start)?;
    let b = CellId::parse(end)?;

    let (min_row, max_row) = (a.row.min(b.row), a.row.max(b.row));
    let (min_col, max_col) = (a.col.min(b.col), a.col.max(b.col));

    let count = (max_row - min_row)
        .checked_add(1)
        .zip((max_col - min_col).checked_add(1))
        .and_then(|(rows, cols)| rows.checked_mul(cols))
        .filter(|&n| n <= max_cells)
        .ok_or(FormulaError::RangeTooLarge(max_cells))?;

    let mut cells = Vec::with_capacity(count);
    for row in min_row..=max_row {
        for col in min_col..=max_col {
            cells.push(CellId::new(row, col));
        }
    }
    Ok(cells)
}
