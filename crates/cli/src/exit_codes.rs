//! CLI Exit Code Registry
//!
//! Single source of truth for the exit codes of `gridsearch`.
//! Scripts rely on them, so existing values never change meaning.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | Formula evaluated to an error value, or did not parse |
//! | 2    | Usage error (bad arguments, bad `--into` cell)       |
//! | 3    | I/O error (unreadable file, closed stdout)           |
//! | 4    | Input data could not be parsed (CSV/TSV/JSON)        |

/// Command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// The formula result is an error sentinel (`#DIV/0!`, `#ERROR: ...`).
/// The sentinel is still printed on stdout.
pub const EXIT_FORMULA_ERROR: u8 = 1;

/// Bad arguments or option values.
pub const EXIT_USAGE: u8 = 2;

/// Reading input or writing output failed.
pub const EXIT_IO: u8 = 3;

/// Input data is malformed or exceeds the configured grid size.
pub const EXIT_PARSE: u8 = 4;
