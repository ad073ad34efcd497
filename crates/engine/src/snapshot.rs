//! Read-only view of the grid handed to the evaluator.
//!
//! The evaluator only ever sees raw cell text through [`CellLookup`]; it never
//! writes back. [`GridSnapshot`] is the in-memory implementation used by the
//! CLI and the tests. Any other grid store can implement the trait.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::cell_id::CellId;
use crate::error::Result;

/// Raw content of one cell as the user typed it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellData {
    pub value: String,
    /// Search cells are never formula-evaluated; their raw text is shown as-is.
    #[serde(default)]
    pub is_search_query: bool,
}

impl CellData {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into(), is_search_query: false }
    }

    pub fn search(value: impl Into<String>) -> Self {
        Self { value: value.into(), is_search_query: true }
    }

    /// Build from user input, flagging `=SEARCH(...)` entries as search cells.
    pub fn from_input(input: &str) -> Self {
        if is_search_input(input) {
            Self::search(input)
        } else {
            Self::new(input)
        }
    }

    pub fn is_formula(&self) -> bool {
        self.value.starts_with('=') && !self.is_search_query
    }
}

/// True for `=SEARCH(...)` input (case-insensitive), the grid's search trigger.
pub fn is_search_input(input: &str) -> bool {
    input.to_lowercase().starts_with("=search(") && input.ends_with(')')
}

pub trait CellLookup {
    fn get_cell(&self, row: usize, col: usize) -> Option<&CellData>;
}

impl<L: CellLookup + ?Sized> CellLookup for &L {
    fn get_cell(&self, row: usize, col: usize) -> Option<&CellData> {
        (**self).get_cell(row, col)
    }
}

/// Sparse map of populated cells.
#[derive(Debug, Clone, Default)]
pub struct GridSnapshot {
    cells: FxHashMap<CellId, CellData>,
}

impl GridSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from rows of raw text starting at A1. Empty strings are skipped.
    pub fn from_rows<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut snapshot = Self::new();
        for (row, cells) in rows.into_iter().enumerate() {
            for (col, text) in cells.into_iter().enumerate() {
                snapshot.set_input(row, col, text.as_ref());
            }
        }
        snapshot
    }

    /// Store user input, detecting search cells. Empty input clears the cell.
    pub fn set_input(&mut self, row: usize, col: usize, input: &str) {
        if input.is_empty() {
            self.cells.remove(&CellId::new(row, col));
        } else {
            self.cells.insert(CellId::new(row, col), CellData::from_input(input));
        }
    }

    pub fn set(&mut self, row: usize, col: usize, data: CellData) {
        self.cells.insert(CellId::new(row, col), data);
    }

    /// Store plain input at an A1 label.
    pub fn set_label(&mut self, label: &str, input: &str) -> Result<()> {
        let id = CellId::parse(label)?;
        self.set_input(id.row, id.col, input);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Populated cells in row-major order.
    pub fn cells(&self) -> Vec<(CellId, &CellData)> {
        let mut cells: Vec<_> = self.cells.iter().map(|(id, data)| (*id, data)).collect();
        cells.sort_by_key(|(id, _)| *id);
        cells
    }

    /// `(rows, cols)` of the smallest A1-anchored rectangle holding every cell.
    pub fn bounds(&self) -> (usize, usize) {
        self.cells.keys().fold((0, 0), |(rows, cols), id| {
            (rows.max(id.row + 1), cols.max(id.col + 1))
        })
    }
}

impl CellLookup for GridSnapshot {
    fn get_cell(&self, row: usize, col: usize) -> Option<&CellData> {
        self.cells.get(&CellId::new(row, col))
    }
}
