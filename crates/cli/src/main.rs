// gridsearch - headless formula evaluation over CSV / TSV / JSON grids

mod exit_codes;
mod load;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use gridsearch_config::Settings;
use gridsearch_engine::formula::functions::list_functions;
use gridsearch_engine::formula::lexer::{tokenize, tokenize_strict};
use gridsearch_engine::formula::parser::format_expr;
use gridsearch_engine::{parse_cell_label, CellId, CellValue, EvalOptions, EvalResult, FormulaEngine, GridSnapshot};

use exit_codes::{EXIT_FORMULA_ERROR, EXIT_IO, EXIT_PARSE, EXIT_SUCCESS, EXIT_USAGE};
use load::{Format, GridLimits, Origin};

#[derive(Parser)]
#[command(name = "gridsearch")]
#[command(about = "Spreadsheet formula engine (CLI mode, headless)")]
#[command(version)]
struct Cli {
    /// Settings file (default: <config dir>/gridsearch/settings.json)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Treat unknown characters and leftover tokens as syntax errors
    #[arg(long, global = true)]
    strict: bool,

    /// Longest chain of formula cells followed through references
    #[arg(long, global = true, value_name = "N")]
    max_depth: Option<usize>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a formula against data read from stdin
    #[command(after_help = "\
Examples:
  cat sales.csv | gridsearch calc '=SUM(B:B)' -f csv
  cat data.csv | gridsearch calc '=AVERAGE(A:A)' -f csv --headers
  echo '1,2,3' | gridsearch calc '=SUM(A1:C1)' -f csv
  echo '1,2,3' | gridsearch calc '=A1:C1' -f csv --spill json")]
    Calc {
        /// Formula to evaluate (leading = optional)
        formula: String,

        /// Input format
        #[arg(long, short = 'f')]
        from: Format,

        /// Load data starting at cell
        #[arg(long, default_value = "A1")]
        into: String,

        /// CSV delimiter
        #[arg(long, default_value = ",")]
        delimiter: char,

        /// First row is headers (excluded from column references like A:A)
        #[arg(long)]
        headers: bool,

        /// Output format for range results
        #[arg(long)]
        spill: Option<SpillFormat>,

        /// Print the result as a typed JSON value
        #[arg(long)]
        json: bool,
    },

    /// Evaluate every cell of a grid and print the displayed values
    #[command(after_help = "\
Examples:
  gridsearch render budget.csv
  cat budget.csv | gridsearch render -f csv --output json")]
    Render {
        /// Input file (omit to read from stdin)
        input: Option<PathBuf>,

        /// Input format (inferred from the file extension when omitted)
        #[arg(long, short = 'f')]
        from: Option<Format>,

        /// Output format
        #[arg(long, short = 'o', default_value = "csv")]
        output: OutputFormat,

        /// CSV delimiter (input and output)
        #[arg(long, default_value = ",")]
        delimiter: char,
    },

    /// Parse a formula and print its canonical form
    Parse {
        formula: String,

        /// Print the token stream instead, one `kind<TAB>text` per line
        #[arg(long)]
        tokens: bool,
    },

    /// List available formula functions
    ListFunctions,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SpillFormat {
    Csv,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    let ctx = Context::new(&cli, &settings);

    let result = match cli.command {
        Commands::Calc { formula, from, into, delimiter, headers, spill, json } => {
            cmd_calc(&ctx, &formula, from, &into, delimiter, headers, spill, json)
        }
        Commands::Render { input, from, output, delimiter } => {
            cmd_render(&ctx, input.as_deref(), from, output, delimiter)
        }
        Commands::Parse { formula, tokens } => cmd_parse(&ctx, &formula, tokens),
        Commands::ListFunctions => cmd_list_functions(),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

/// Logs go to stderr. `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .without_time()
        .with_target(false)
        .try_init();
}

/// Engine options and grid limits after applying CLI overrides to settings.
struct Context {
    options: EvalOptions,
    limits: GridLimits,
}

impl Context {
    fn new(cli: &Cli, settings: &Settings) -> Self {
        let options = EvalOptions {
            max_depth: cli.max_depth.unwrap_or(settings.max_resolution_depth),
            max_range_cells: settings.max_range_cells,
            strict_syntax: cli.strict || settings.strict_syntax,
        };
        log::debug!("eval options: {:?}", options);
        Self {
            options,
            limits: GridLimits { rows: settings.default_rows, cols: settings.default_columns },
        }
    }

    fn engine(&self) -> FormulaEngine<'static> {
        FormulaEngine::new(self.options)
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PARSE, message: msg.into(), hint: None }
    }

    pub fn formula(msg: impl Into<String>) -> Self {
        Self { code: EXIT_FORMULA_ERROR, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// list-functions
// ============================================================================

fn cmd_list_functions() -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    for name in list_functions() {
        writeln!(handle, "{}", name).map_err(|e| CliError::io(e.to_string()))?;
    }

    Ok(())
}

// ============================================================================
// calc
// ============================================================================

#[allow(clippy::too_many_arguments)]
fn cmd_calc(
    ctx: &Context,
    formula: &str,
    from: Format,
    into: &str,
    delimiter: char,
    headers: bool,
    spill: Option<SpillFormat>,
    json: bool,
) -> Result<(), CliError> {
    let (into_row, into_col) = parse_cell_label(into)
        .map_err(|_| CliError::args(format!("invalid cell reference: {}", into)))?;

    let input = load::read_stdin()?;
    let grid = load::parse_grid(&input, from, delimiter, Origin { row: into_row, col: into_col }, ctx.limits)?;

    // Column refs like A:A cover the loaded rows, skipping the header row
    let (data_rows, _) = grid.bounds();
    let data_start_row = if headers { into_row + 2 } else { into_row + 1 };
    let formula = if formula.starts_with('=') { formula.to_string() } else { format!("={}", formula) };
    let formula = translate_column_refs(&formula, data_start_row, data_rows.max(data_start_row));
    log::info!("evaluating {}", formula);

    match ctx.engine().evaluate_formula_result(&formula, &grid) {
        EvalResult::Scalar(value) => print_scalar(&value, json),
        EvalResult::Array(values) => match spill {
            None => Err(CliError::formula(format!("result is a range of {} values", values.len()))
                .with_hint("use --spill csv or --spill json")),
            Some(SpillFormat::Csv) => {
                let mut out = String::new();
                for v in &values {
                    out.push_str(&v.to_string());
                    out.push('\n');
                }
                print!("{}", out);
                Ok(())
            }
            Some(SpillFormat::Json) => {
                let array: Vec<serde_json::Value> = values.iter().map(CellValue::to_json).collect();
                println!("{}", serde_json::Value::Array(array));
                Ok(())
            }
        },
    }
}

/// Print a scalar result. Error sentinels are printed too, then reported.
fn print_scalar(value: &CellValue, json: bool) -> Result<(), CliError> {
    if json {
        let text = serde_json::to_string(value).map_err(|e| CliError::io(e.to_string()))?;
        println!("{}", text);
    } else {
        println!("{}", value);
    }

    match value {
        CellValue::Error(sentinel) => {
            Err(CliError::formula(format!("formula returned {}", sentinel)).with_hint(error_hint(sentinel)))
        }
        _ => Ok(()),
    }
}

fn error_hint(sentinel: &str) -> &'static str {
    if sentinel == "#DIV/0!" {
        "division by zero in your formula"
    } else if sentinel.contains("Circular reference") {
        "a referenced cell depends on itself; check the formulas in the loaded data"
    } else if sentinel.contains("Unknown function") {
        "unrecognized function name; run gridsearch list-functions to see all available"
    } else if sentinel.contains("Maximum reference depth") {
        "formula chain is too deep; raise it with --max-depth"
    } else if sentinel.contains("Range exceeds") {
        "range covers too many cells; narrow it or raise formula.maxRangeCells in settings.json"
    } else if sentinel.contains("range") {
        "wrap the range in a function such as SUM, or use --spill"
    } else {
        "check your formula syntax and cell references"
    }
}

// ============================================================================
// Column reference translation (A:A -> A<start>:A<end>)
// ============================================================================

/// Rewrite whole-column references (`A:A`, `B:D`) into explicit row ranges.
/// Text inside string literals is left alone.
fn translate_column_refs(formula: &str, start_row: usize, end_row: usize) -> String {
    let chars: Vec<char> = formula.chars().collect();
    let mut out = String::with_capacity(formula.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '"' || c == '\'' {
            let close = skip_string(&chars, i);
            out.extend(&chars[i..close]);
            i = close;
            continue;
        }

        let starts_word = i == 0 || !(chars[i - 1].is_ascii_alphanumeric() || chars[i - 1] == '_');
        if starts_word && c.is_ascii_alphabetic() {
            let col1_end = letters_end(&chars, i);
            if chars.get(col1_end) == Some(&':') {
                let col2_end = letters_end(&chars, col1_end + 1);
                let next = chars.get(col2_end);
                let is_column_ref = col2_end > col1_end + 1
                    && !next.is_some_and(|n| n.is_ascii_alphanumeric() || *n == '_');
                if is_column_ref {
                    let col1: String = chars[i..col1_end].iter().collect();
                    let col2: String = chars[col1_end + 1..col2_end].iter().collect();
                    out.push_str(&format!(
                        "{}{}:{}{}",
                        col1.to_ascii_uppercase(),
                        start_row,
                        col2.to_ascii_uppercase(),
                        end_row
                    ));
                    i = col2_end;
                    continue;
                }
            }
            // Not a column ref: copy the whole identifier so its tail is not rescanned
            let word_end = word_end(&chars, i);
            out.extend(&chars[i..word_end]);
            i = word_end;
            continue;
        }

        out.push(c);
        i += 1;
    }

    out
}

fn letters_end(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && chars[i].is_ascii_alphabetic() {
        i += 1;
    }
    i
}

fn word_end(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
        i += 1;
    }
    i
}

/// Index just past the string literal opening at `start` (honoring `\` escapes).
fn skip_string(chars: &[char], start: usize) -> usize {
    let quote = chars[start];
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    chars.len()
}

// ============================================================================
// render
// ============================================================================

fn cmd_render(
    ctx: &Context,
    input: Option<&Path>,
    from: Option<Format>,
    output: OutputFormat,
    delimiter: char,
) -> Result<(), CliError> {
    let (content, format) = match (input, from) {
        (Some(path), from) => {
            let format = match from {
                Some(f) => f,
                None => load::infer_format(path)?,
            };
            (load::read_file(path)?, format)
        }
        (None, Some(format)) => (load::read_stdin()?, format),
        (None, None) => {
            return Err(CliError::args("stdin requires --from to specify the input format")
                .with_hint("cat data.csv | gridsearch render -f csv"))
        }
    };

    let grid = load::parse_grid(&content, format, delimiter, Origin::default(), ctx.limits)?;
    let rows = render_grid(&ctx.engine(), &grid);

    let bytes = match output {
        OutputFormat::Csv => write_csv(&rows, delimiter)?,
        OutputFormat::Json => write_json(&rows)?,
    };
    io::stdout().write_all(&bytes).map_err(|e| CliError::io(e.to_string()))
}

/// Displayed value of every cell in the grid's bounds, row by row.
fn render_grid(engine: &FormulaEngine<'_>, grid: &GridSnapshot) -> Vec<Vec<CellValue>> {
    let (rows, cols) = grid.bounds();
    (0..rows)
        .map(|row| {
            (0..cols)
                .map(|col| engine.evaluate_cell_at(CellId::new(row, col), grid))
                .collect()
        })
        .collect()
}

fn write_csv(rows: &[Vec<CellValue>], delimiter: char) -> Result<Vec<u8>, CliError> {
    let delimiter = u8::try_from(delimiter)
        .map_err(|_| CliError::args(format!("delimiter must be a single-byte character: {:?}", delimiter)))?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_writer(Vec::new());

    for row in rows {
        let record: Vec<String> = row.iter().map(CellValue::to_string).collect();
        writer.write_record(&record).map_err(|e| CliError::io(e.to_string()))?;
    }

    writer.into_inner().map_err(|e| CliError::io(e.to_string()))
}

fn write_json(rows: &[Vec<CellValue>]) -> Result<Vec<u8>, CliError> {
    let json: Vec<Vec<serde_json::Value>> = rows
        .iter()
        .map(|row| row.iter().map(CellValue::to_json).collect())
        .collect();
    let mut bytes = serde_json::to_vec(&json).map_err(|e| CliError::io(e.to_string()))?;
    bytes.push(b'\n');
    Ok(bytes)
}

// ============================================================================
// parse
// ============================================================================

fn cmd_parse(ctx: &Context, formula: &str, tokens: bool) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    if tokens {
        let stream = if ctx.options.strict_syntax {
            tokenize_strict(formula).map_err(|e| CliError::formula(e.to_string()))?
        } else {
            tokenize(formula)
        };
        for token in stream {
            writeln!(handle, "{}\t{}", token.kind, token.text).map_err(|e| CliError::io(e.to_string()))?;
        }
        return Ok(());
    }

    let expr = ctx.engine().parse(formula).map_err(|e| CliError::formula(e.to_string()))?;
    writeln!(handle, "{}", format_expr(&expr)).map_err(|e| CliError::io(e.to_string()))
}
