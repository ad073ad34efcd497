// Integration tests for the gridsearch binary: stdout/stderr contract and exit codes.
//
// Every run points --config at a scratch directory so the user's settings are
// never read or written.
//
// Run with: cargo test -p gridsearch-cli --test cli_tests

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use proptest::prelude::*;

fn gridsearch(config: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_gridsearch"));
    cmd.arg("--config").arg(config);
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Run with `stdin` piped in, using default settings.
fn run(args: &[&str], stdin: &str) -> Output {
    let dir = tempfile::tempdir().unwrap();
    run_with_config(&dir.path().join("settings.json"), args, stdin)
}

fn run_with_config(config: &Path, args: &[&str], stdin: &str) -> Output {
    let mut child = gridsearch(config)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn gridsearch");

    child.stdin.take().unwrap().write_all(stdin.as_bytes()).unwrap();
    child.wait_with_output().expect("wait for gridsearch")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn assert_exit(output: &Output, code: i32) {
    assert_eq!(
        output.status.code(),
        Some(code),
        "stdout: {}\nstderr: {}",
        stdout(output),
        stderr(output)
    );
}

// ===========================================================================
// calc
// ===========================================================================

#[test]
fn calc_sum_of_range() {
    let output = run(&["calc", "=SUM(A1:C2)", "-f", "csv"], "1,2,3\n4,5,6\n");
    assert_exit(&output, 0);
    assert_eq!(stdout(&output), "21\n");
}

#[test]
fn calc_leading_equals_optional() {
    let output = run(&["calc", "A1*2", "-f", "csv"], "21\n");
    assert_exit(&output, 0);
    assert_eq!(stdout(&output), "42\n");
}

#[test]
fn calc_column_refs_respect_headers() {
    let output = run(&["calc", "=SUM(A:A)", "-f", "csv", "--headers"], "amount\n10\n20\n");
    assert_exit(&output, 0);
    assert_eq!(stdout(&output), "30\n");

    let output = run(&["calc", "=COUNT(A:A)", "-f", "csv"], "amount\n10\n20\n");
    assert_eq!(stdout(&output), "3\n");
}

#[test]
fn calc_into_offsets_data() {
    let output = run(&["calc", "=C3+D3", "-f", "csv", "--into", "C3"], "4,5\n");
    assert_exit(&output, 0);
    assert_eq!(stdout(&output), "9\n");
}

#[test]
fn calc_tsv_and_json_input() {
    let output = run(&["calc", "=A1&B1", "-f", "tsv"], "");
    // empty stdin is a parse error regardless of format
    assert_exit(&output, 4);

    let output = run(&["calc", "=B2", "-f", "json"], r#"[{"name": "a", "qty": 3}]"#);
    assert_exit(&output, 0);
    assert_eq!(stdout(&output), "3\n");

    let output = run(&["calc", "=A1*B1", "-f", "tsv"], "6\t7\n");
    assert_eq!(stdout(&output), "42\n");
}

#[test]
fn calc_division_by_zero() {
    let output = run(&["calc", "=A1/0", "-f", "csv"], "5\n");
    assert_exit(&output, 1);
    assert_eq!(stdout(&output), "#DIV/0!\n");
    assert!(stderr(&output).contains("division by zero"));
}

#[test]
fn calc_circular_reference() {
    let output = run(&["calc", "=A1", "-f", "csv"], "=B1,=A1\n");
    assert_exit(&output, 1);
    assert!(stdout(&output).starts_with("#ERROR: Circular reference detected"));
    assert!(stderr(&output).contains("depends on itself"));
}

#[test]
fn calc_diamond_is_not_a_cycle() {
    let output = run(&["calc", "=A1", "-f", "csv"], "=B1+C1,=D1,=D1,5\n");
    assert_exit(&output, 0);
    assert_eq!(stdout(&output), "10\n");
}

#[test]
fn calc_unknown_function_hint() {
    let output = run(&["calc", "=NOPE(1)", "-f", "csv"], "1\n");
    assert_exit(&output, 1);
    assert_eq!(stdout(&output), "#ERROR: Unknown function: NOPE\n");
    assert!(stderr(&output).contains("list-functions"));
}

#[test]
fn calc_max_depth() {
    let input = "=B1,=C1,5\n";
    let output = run(&["calc", "=A1", "-f", "csv"], input);
    assert_eq!(stdout(&output), "5\n");

    let output = run(&["--max-depth", "1", "calc", "=A1", "-f", "csv"], input);
    assert_exit(&output, 1);
    assert!(stdout(&output).contains("Maximum reference depth of 1 exceeded"));
    assert!(stderr(&output).contains("--max-depth"));
}

#[test]
fn calc_range_needs_spill() {
    let output = run(&["calc", "=A1:C1", "-f", "csv"], "1,2,3\n");
    assert_exit(&output, 1);
    assert!(stdout(&output).is_empty());
    assert!(stderr(&output).contains("--spill"));
}

#[test]
fn calc_spill_formats() {
    let output = run(&["calc", "=A1:C1", "-f", "csv", "--spill", "csv"], "1,x,\n");
    assert_exit(&output, 0);
    assert_eq!(stdout(&output), "1\nx\n\n");

    let output = run(&["calc", "=A1:C1", "-f", "csv", "--spill", "json"], "1,x,\n");
    assert_exit(&output, 0);
    let value: serde_json::Value = serde_json::from_str(stdout(&output).trim()).unwrap();
    assert_eq!(value, serde_json::json!([1.0, "x", null]));
}

#[test]
fn calc_json_output_is_typed() {
    let output = run(&["calc", "=A1>1", "-f", "csv", "--json"], "2\n");
    assert_exit(&output, 0);
    let value: serde_json::Value = serde_json::from_str(stdout(&output).trim()).unwrap();
    assert_eq!(value, serde_json::json!({"type": "boolean", "value": true}));

    let output = run(&["calc", "=A1+1", "-f", "csv", "--json"], "2\n");
    let value: serde_json::Value = serde_json::from_str(stdout(&output).trim()).unwrap();
    assert_eq!(value, serde_json::json!({"type": "number", "value": 3.0}));
}

#[test]
fn calc_search_cells_show_raw_text() {
    let output = run(&["calc", "=LEN(A1)", "-f", "csv"], "\"=SEARCH(\"\"rust\"\")\"\n");
    assert_exit(&output, 0);
    assert_eq!(stdout(&output), "15\n");
}

#[test]
fn calc_bad_into_is_usage_error() {
    let output = run(&["calc", "=1", "-f", "csv", "--into", "A0"], "1\n");
    assert_exit(&output, 2);
    assert!(stderr(&output).contains("invalid cell reference"));
}

#[test]
fn calc_missing_format_is_usage_error() {
    let output = run(&["calc", "=1"], "1\n");
    assert_exit(&output, 2);
}

#[test]
fn calc_strict_mode() {
    let output = run(&["calc", "=1 # 2", "-f", "csv"], "x\n");
    assert_exit(&output, 0);
    assert_eq!(stdout(&output), "1\n");

    let output = run(&["--strict", "calc", "=1 # 2", "-f", "csv"], "x\n");
    assert_exit(&output, 1);
    assert_eq!(stdout(&output), "#ERROR: Unexpected character: #\n");
}

// ===========================================================================
// settings
// ===========================================================================

#[test]
fn settings_file_enables_strict_syntax() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("settings.json");
    std::fs::write(&config, "{\n  // strict\n  \"formula.strictSyntax\": true\n}\n").unwrap();

    let output = run_with_config(&config, &["parse", "=1 2"], "");
    assert_exit(&output, 1);
    assert!(stderr(&output).contains("Unexpected token: number (2)"));
}

#[test]
fn settings_grid_limits() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("settings.json");
    std::fs::write(&config, r#"{ "grid.defaultColumns": 2 }"#).unwrap();

    let output = run_with_config(&config, &["calc", "=SUM(A1:C1)", "-f", "csv"], "1,2,3\n");
    assert_exit(&output, 4);
    assert!(stderr(&output).contains("grid.defaultColumns"));
}

#[test]
fn settings_range_cell_limit() {
    let output = run(&["calc", "=COUNT(A1:ZZZZ99999999)", "-f", "csv"], "1\n");
    assert_exit(&output, 1);
    assert_eq!(stdout(&output), "#ERROR: Range exceeds the maximum of 1000000 cells\n");

    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("settings.json");
    std::fs::write(&config, r#"{ "formula.maxRangeCells": 2 }"#).unwrap();

    let output = run_with_config(&config, &["calc", "=SUM(A1:C1)", "-f", "csv"], "1,2,3\n");
    assert_exit(&output, 1);
    assert!(stderr(&output).contains("formula.maxRangeCells"));
}

#[test]
fn missing_settings_file_is_not_created_by_config_flag() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("settings.json");
    let output = run_with_config(&config, &["list-functions"], "");
    assert_exit(&output, 0);
    assert!(!config.exists());
}

// ===========================================================================
// render
// ===========================================================================

#[test]
fn render_csv_file() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data.csv");
    std::fs::write(&data, "1,2,=A1+B1\n=C1*10,,hello\n").unwrap();

    let output = run(&["render", data.to_str().unwrap()], "");
    assert_exit(&output, 0);
    assert_eq!(stdout(&output), "1,2,3\n30,,hello\n");
}

#[test]
fn render_json_from_stdin() {
    let output = run(&["render", "-f", "csv", "--output", "json"], "1,=A1=1\n=B2,=A2\n");
    assert_exit(&output, 0);
    let value: serde_json::Value = serde_json::from_str(stdout(&output).trim()).unwrap();
    let rows = value.as_array().unwrap();
    assert_eq!(rows[0], serde_json::json!([1.0, true]));
    let cycle = rows[1][0].as_str().unwrap();
    assert!(cycle.starts_with("#ERROR: Circular reference detected"), "{cycle}");
}

#[test]
fn render_needs_format_for_stdin() {
    let output = run(&["render"], "1,2\n");
    assert_exit(&output, 2);
    assert!(stderr(&output).contains("--from"));
}

#[test]
fn render_missing_file_is_io_error() {
    let output = run(&["render", "/definitely/not/here.csv"], "");
    assert_exit(&output, 3);
}

// ===========================================================================
// parse / list-functions
// ===========================================================================

#[test]
fn parse_prints_canonical_form() {
    let output = run(&["parse", "=1+2*3"], "");
    assert_exit(&output, 0);
    assert_eq!(stdout(&output), "=(1+(2*3))\n");

    let output = run(&["parse", "=sum(a1:b2, \"x\")"], "");
    assert_eq!(stdout(&output), "=SUM(a1:b2,\"x\")\n");
}

#[test]
fn parse_tokens() {
    let output = run(&["parse", "--tokens", "=SUM(A1:B2)>=3"], "");
    assert_exit(&output, 0);
    assert_eq!(
        stdout(&output),
        "function\tSUM\nlparen\t(\nrange\tA1:B2\nrparen\t)\noperator\t>=\nnumber\t3\n"
    );
}

#[test]
fn parse_error_exits_one() {
    let output = run(&["parse", "=SUM(1"], "");
    assert_exit(&output, 1);
    assert!(stderr(&output).contains("Expected ')' after function SUM arguments"));
}

#[test]
fn list_functions_sorted() {
    let output = run(&["list-functions"], "");
    assert_exit(&output, 0);
    let names: Vec<String> = stdout(&output).lines().map(str::to_string).collect();
    assert_eq!(names.len(), 15);
    assert!(names.contains(&"SUM".to_string()));
    assert!(names.contains(&"CONCAT".to_string()));
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
}

// ===========================================================================
// properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig { cases: 16, failure_persistence: None, ..ProptestConfig::default() })]

    #[test]
    fn calc_sum_matches_input(values in proptest::collection::vec(-1000i64..1000, 1..20)) {
        let input: String = values.iter().map(|v| format!("{}\n", v)).collect();
        let output = run(&["calc", "=SUM(A:A)", "-f", "csv"], &input);
        prop_assert_eq!(output.status.code(), Some(0));
        prop_assert_eq!(stdout(&output), format!("{}\n", values.iter().sum::<i64>()));
    }
}
