// Formula lexing, parsing and evaluation

pub mod lexer;
pub mod parser;
pub mod value;
pub mod eval;
pub mod functions;

pub(crate) mod eval_helpers;
pub(crate) mod eval_math;
pub(crate) mod eval_text;
pub(crate) mod eval_logical;
