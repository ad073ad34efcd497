// Loading CSV / TSV / JSON input into a grid snapshot

use std::collections::BTreeSet;
use std::io::{self, Read};
use std::path::Path;

use clap::ValueEnum;
use gridsearch_engine::{CellValue, GridSnapshot};

use crate::CliError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Csv,
    Tsv,
    Json,
}

/// Largest grid the input may fill, from `grid.defaultRows` / `grid.defaultColumns`.
#[derive(Clone, Copy, Debug)]
pub struct GridLimits {
    pub rows: usize,
    pub cols: usize,
}

/// Top-left cell the input is loaded at (0-indexed).
#[derive(Clone, Copy, Debug, Default)]
pub struct Origin {
    pub row: usize,
    pub col: usize,
}

pub fn infer_format(path: &Path) -> Result<Format, CliError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("csv") => Ok(Format::Csv),
        Some("tsv") | Some("tab") => Ok(Format::Tsv),
        Some("json") => Ok(Format::Json),
        _ => Err(CliError::args(format!(
            "cannot infer format from extension {:?}",
            ext.as_deref().unwrap_or("(none)")
        ))
        .with_hint("use --from with one of: csv, tsv, json")),
    }
}

pub fn read_stdin() -> Result<String, CliError> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .map_err(|e| CliError::io(e.to_string()))?;

    if input.is_empty() {
        return Err(CliError::parse("no input received on stdin")
            .with_hint("cat file.csv | gridsearch calc '=SUM(A:A)' --from csv"));
    }
    Ok(input)
}

pub fn read_file(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|e| CliError::io(format!("{}: {}", path.display(), e)))
}

pub fn parse_grid(
    content: &str,
    format: Format,
    delimiter: char,
    origin: Origin,
    limits: GridLimits,
) -> Result<GridSnapshot, CliError> {
    let mut grid = GridLoader::new(origin, limits);
    match format {
        Format::Csv => {
            let delimiter = u8::try_from(delimiter)
                .map_err(|_| CliError::args(format!("delimiter must be a single-byte character: {:?}", delimiter)))?;
            load_csv(content, delimiter, &mut grid)?;
        }
        Format::Tsv => load_csv(content, b'\t', &mut grid)?,
        Format::Json => load_json(content, &mut grid)?,
    }
    log::debug!("loaded {} cells", grid.snapshot.len());
    Ok(grid.snapshot)
}

/// Writes fields relative to the origin, enforcing the grid limits.
struct GridLoader {
    snapshot: GridSnapshot,
    origin: Origin,
    limits: GridLimits,
}

impl GridLoader {
    fn new(origin: Origin, limits: GridLimits) -> Self {
        Self { snapshot: GridSnapshot::new(), origin, limits }
    }

    fn put(&mut self, row: usize, col: usize, input: &str) -> Result<(), CliError> {
        if input.is_empty() {
            return Ok(());
        }
        let (row, col) = (self.origin.row + row, self.origin.col + col);
        if row >= self.limits.rows || col >= self.limits.cols {
            return Err(CliError::parse(format!(
                "input does not fit in a {}x{} grid (cell at row {}, column {})",
                self.limits.rows,
                self.limits.cols,
                row + 1,
                col + 1
            ))
            .with_hint("raise grid.defaultRows / grid.defaultColumns in settings.json"));
        }
        self.snapshot.set_input(row, col, input);
        Ok(())
    }
}

fn load_csv(content: &str, delimiter: u8, grid: &mut GridLoader) -> Result<(), CliError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| CliError::parse(format!("line {}: {}", row_idx + 1, e)))?;
        for (col_idx, field) in record.iter().enumerate() {
            grid.put(row_idx, col_idx, field)?;
        }
    }
    Ok(())
}

/// Array of arrays, or array of objects (keys sorted become the header row).
fn load_json(content: &str, grid: &mut GridLoader) -> Result<(), CliError> {
    let value: serde_json::Value = serde_json::from_str(content)
        .map_err(|e| CliError::parse(format!("JSON parse error: {}", e)))?;

    let serde_json::Value::Array(rows) = value else {
        return Err(CliError::parse("JSON must be array of arrays or array of objects"));
    };
    if rows.is_empty() {
        return Err(CliError::parse("empty input"));
    }

    if let Some(serde_json::Value::Object(_)) = rows.first() {
        let keys: BTreeSet<&String> = rows
            .iter()
            .filter_map(|row| row.as_object())
            .flat_map(|obj| obj.keys())
            .collect();

        for (col, key) in keys.iter().enumerate() {
            grid.put(0, col, key)?;
        }
        for (row_idx, row) in rows.iter().enumerate() {
            let obj = row
                .as_object()
                .ok_or_else(|| CliError::parse(format!("row {}: expected object", row_idx)))?;
            for (col, key) in keys.iter().enumerate() {
                if let Some(val) = obj.get(*key) {
                    grid.put(row_idx + 1, col, &json_value_to_input(val, row_idx + 1, key)?)?;
                }
            }
        }
    } else {
        for (row_idx, row) in rows.iter().enumerate() {
            let cols = row
                .as_array()
                .ok_or_else(|| CliError::parse(format!("row {}: expected array", row_idx)))?;
            for (col_idx, val) in cols.iter().enumerate() {
                grid.put(row_idx, col_idx, &json_value_to_input(val, row_idx, &col_idx.to_string())?)?;
            }
        }
    }
    Ok(())
}

/// Numbers are stored in the engine's canonical rendering so they coerce back to numbers.
fn json_value_to_input(val: &serde_json::Value, row: usize, key: &str) -> Result<String, CliError> {
    match val {
        serde_json::Value::Null => Ok(String::new()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        serde_json::Value::Number(n) => Ok(n
            .as_f64()
            .map(|f| CellValue::Number(f).to_string())
            .unwrap_or_else(|| n.to_string())),
        serde_json::Value::String(s) => Ok(s.clone()),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
            Err(CliError::parse(format!("non-scalar value at row {}, key \"{}\"", row, key)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes::{EXIT_PARSE, EXIT_USAGE};
    use gridsearch_engine::{CellData, CellLookup};

    const LIMITS: GridLimits = GridLimits { rows: 1000, cols: 26 };

    fn raw(grid: &GridSnapshot, row: usize, col: usize) -> Option<&str> {
        grid.get_cell(row, col).map(|c| c.value.as_str())
    }

    #[test]
    fn test_csv_at_origin() {
        let grid = parse_grid("1,2\n3,,4\n", Format::Csv, ',', Origin { row: 1, col: 2 }, LIMITS).unwrap();
        assert_eq!(raw(&grid, 1, 2), Some("1"));
        assert_eq!(raw(&grid, 1, 3), Some("2"));
        assert_eq!(raw(&grid, 2, 3), None);
        assert_eq!(raw(&grid, 2, 4), Some("4"));
        assert_eq!(grid.len(), 4);
    }

    #[test]
    fn test_custom_delimiter_and_tsv() {
        let grid = parse_grid("a;b\n", Format::Csv, ';', Origin::default(), LIMITS).unwrap();
        assert_eq!(raw(&grid, 0, 1), Some("b"));

        let grid = parse_grid("x\ty\n", Format::Tsv, ',', Origin::default(), LIMITS).unwrap();
        assert_eq!(raw(&grid, 0, 1), Some("y"));
    }

    #[test]
    fn test_non_ascii_delimiter_is_usage_error() {
        let err = parse_grid("a", Format::Csv, '→', Origin::default(), LIMITS).unwrap_err();
        assert_eq!(err.code, EXIT_USAGE);
    }

    #[test]
    fn test_search_cells_detected() {
        let grid = parse_grid("\"=SEARCH(\"\"rust\"\")\",=A1\n", Format::Csv, ',', Origin::default(), LIMITS).unwrap();
        assert_eq!(grid.get_cell(0, 0), Some(&CellData::search("=SEARCH(\"rust\")")));
        assert!(grid.get_cell(0, 1).is_some_and(|c| c.is_formula()));
    }

    #[test]
    fn test_json_array_of_arrays() {
        let grid = parse_grid(r#"[[1, "a", true], [2.50, null]]"#, Format::Json, ',', Origin::default(), LIMITS).unwrap();
        assert_eq!(raw(&grid, 0, 0), Some("1"));
        assert_eq!(raw(&grid, 0, 2), Some("true"));
        assert_eq!(raw(&grid, 1, 0), Some("2.5"));
        assert_eq!(raw(&grid, 1, 1), None);
    }

    #[test]
    fn test_json_array_of_objects() {
        let grid = parse_grid(r#"[{"b": 1, "a": "x"}, {"c": 3}]"#, Format::Json, ',', Origin::default(), LIMITS).unwrap();
        assert_eq!(raw(&grid, 0, 0), Some("a"));
        assert_eq!(raw(&grid, 0, 1), Some("b"));
        assert_eq!(raw(&grid, 0, 2), Some("c"));
        assert_eq!(raw(&grid, 1, 0), Some("x"));
        assert_eq!(raw(&grid, 2, 2), Some("3"));
    }

    #[test]
    fn test_json_errors() {
        for bad in ["{}", "[]", "[[{\"nested\": 1}]]", "not json"] {
            let err = parse_grid(bad, Format::Json, ',', Origin::default(), LIMITS).unwrap_err();
            assert_eq!(err.code, EXIT_PARSE, "{bad}");
        }
    }

    #[test]
    fn test_grid_limits() {
        let small = GridLimits { rows: 2, cols: 2 };
        assert!(parse_grid("1,2\n3,4\n", Format::Csv, ',', Origin::default(), small).is_ok());

        let err = parse_grid("1,2,3\n", Format::Csv, ',', Origin::default(), small).unwrap_err();
        assert_eq!(err.code, EXIT_PARSE);
        assert!(err.hint.is_some());

        let err = parse_grid("1\n", Format::Csv, ',', Origin { row: 2, col: 0 }, small).unwrap_err();
        assert_eq!(err.code, EXIT_PARSE);
    }

    #[test]
    fn test_infer_format() {
        assert_eq!(infer_format(Path::new("data.CSV")).unwrap(), Format::Csv);
        assert_eq!(infer_format(Path::new("data.tsv")).unwrap(), Format::Tsv);
        assert_eq!(infer_format(Path::new("data.json")).unwrap(), Format::Json);
        assert_eq!(infer_format(Path::new("data")).unwrap_err().code, EXIT_USAGE);
    }
}
