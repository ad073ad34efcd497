// Formula parser - converts token streams into an AST
// Recursive descent, lowest to highest precedence:
//   comparison (< > <= >= == !=)  ->  + -  ->  * /  ->  ^  ->  unary + -  ->  primary
// Every binary level is left-associative, including ^ (2^3^2 = 64).

use crate::error::{FormulaError, Result};

use super::lexer::{tokenize, tokenize_strict, Token, TokenKind};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Text(String),
    /// Cell label as written (`a1` and `A1` both allowed)
    CellRef(String),
    /// Range endpoints as written; validated when expanded
    Range {
        start: String,
        end: String,
    },
    BinaryOp {
        op: Op,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Function {
        name: String,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    // Comparison
    Lt,    // <
    Gt,    // >
    LtEq,  // <=
    GtEq,  // >=
    Eq,    // == (or bare =)
    NotEq, // !=
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Neg,
}

impl Op {
    /// Map an operator token to a binary operator. Bare `=` means `==`.
    pub fn from_symbol(symbol: &str) -> Result<Op> {
        Ok(match symbol {
            "+" => Op::Add,
            "-" => Op::Sub,
            "*" => Op::Mul,
            "/" => Op::Div,
            "^" => Op::Pow,
            "<" => Op::Lt,
            ">" => Op::Gt,
            "<=" => Op::LtEq,
            ">=" => Op::GtEq,
            "==" | "=" => Op::Eq,
            "!=" => Op::NotEq,
            other => return Err(FormulaError::UnknownOperator(other.to_string())),
        })
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Pow => "^",
            Op::Lt => "<",
            Op::Gt => ">",
            Op::LtEq => "<=",
            Op::GtEq => ">=",
            Op::Eq => "==",
            Op::NotEq => "!=",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(self, Op::Lt | Op::Gt | Op::LtEq | Op::GtEq | Op::Eq | Op::NotEq)
    }
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Neg => "-",
        }
    }
}

/// Parse formula text (leading `=` optional). Trailing tokens are ignored.
pub fn parse_formula(formula: &str) -> Result<Expr> {
    parse(&tokenize(formula))
}

/// Strict variant: unknown characters and trailing tokens are errors.
pub fn parse_formula_strict(formula: &str) -> Result<Expr> {
    parse_strict(&tokenize_strict(formula)?)
}

/// Deepest chain of parentheses, function calls and prefix operators.
const MAX_NESTING: usize = 100;

/// Tallest expression tree, counting left-associative operator chains.
const MAX_HEIGHT: usize = 512;

/// Parse a token stream. Tokens after the first complete expression are ignored.
pub fn parse(tokens: &[Token]) -> Result<Expr> {
    parse_comparison(tokens, 0, 0).map(|parsed| parsed.expr)
}

/// Parse a token stream that must hold exactly one expression.
pub fn parse_strict(tokens: &[Token]) -> Result<Expr> {
    let Parsed { expr, pos, .. } = parse_comparison(tokens, 0, 0)?;
    match tokens.get(pos) {
        None => Ok(expr),
        Some(token) if token.kind == TokenKind::Operator => {
            // A known operator can't be left over here, so this reports e.g. "&&"
            Op::from_symbol(&token.text)?;
            Err(unexpected(token))
        }
        Some(token) => Err(unexpected(token)),
    }
}

/// A parsed subtree, the position after it, and its height.
struct Parsed {
    expr: Expr,
    pos: usize,
    height: usize,
}

impl Parsed {
    fn leaf(expr: Expr, pos: usize) -> Self {
        Self { expr, pos, height: 1 }
    }

    fn node(expr: Expr, pos: usize, child_height: usize) -> Result<Self> {
        let height = child_height + 1;
        if height > MAX_HEIGHT {
            return Err(too_deep());
        }
        Ok(Self { expr, pos, height })
    }
}

fn too_deep() -> FormulaError {
    FormulaError::syntax("Formula is nested too deeply")
}

/// One more level of nesting, or an error past `MAX_NESTING`.
fn descend(depth: usize) -> Result<usize> {
    if depth >= MAX_NESTING {
        return Err(too_deep());
    }
    Ok(depth + 1)
}

fn unexpected(token: &Token) -> FormulaError {
    FormulaError::Syntax(format!("Unexpected token: {}", token))
}

/// Binary operator at `pos` if it is one of `allowed`.
fn binary_op_at(tokens: &[Token], pos: usize, allowed: &[Op]) -> Option<Op> {
    let token = tokens.get(pos)?;
    if token.kind != TokenKind::Operator {
        return None;
    }
    Op::from_symbol(&token.text).ok().filter(|op| allowed.contains(op))
}

type LevelFn = fn(&[Token], usize, usize) -> Result<Parsed>;

/// One left-associative binary level.
fn parse_binary_level(tokens: &[Token], pos: usize, depth: usize, allowed: &[Op], next: LevelFn) -> Result<Parsed> {
    let mut left = next(tokens, pos, depth)?;

    while let Some(op) = binary_op_at(tokens, left.pos, allowed) {
        let right = next(tokens, left.pos + 1, depth)?;
        let height = left.height.max(right.height);
        left = Parsed::node(
            Expr::BinaryOp {
                op,
                left: Box::new(left.expr),
                right: Box::new(right.expr),
            },
            right.pos,
            height,
        )?;
    }

    Ok(left)
}

// Lowest precedence: comparison operators
fn parse_comparison(tokens: &[Token], pos: usize, depth: usize) -> Result<Parsed> {
    parse_binary_level(
        tokens,
        pos,
        depth,
        &[Op::Lt, Op::Gt, Op::LtEq, Op::GtEq, Op::Eq, Op::NotEq],
        parse_add_sub,
    )
}

fn parse_add_sub(tokens: &[Token], pos: usize, depth: usize) -> Result<Parsed> {
    parse_binary_level(tokens, pos, depth, &[Op::Add, Op::Sub], parse_mul_div)
}

fn parse_mul_div(tokens: &[Token], pos: usize, depth: usize) -> Result<Parsed> {
    parse_binary_level(tokens, pos, depth, &[Op::Mul, Op::Div], parse_power)
}

fn parse_power(tokens: &[Token], pos: usize, depth: usize) -> Result<Parsed> {
    parse_binary_level(tokens, pos, depth, &[Op::Pow], parse_unary)
}

// Prefix + and -, binding tighter than ^ (-2^2 = 4)
fn parse_unary(tokens: &[Token], pos: usize, depth: usize) -> Result<Parsed> {
    let op = match tokens.get(pos) {
        Some(t) if t.is_operator("+") => UnaryOp::Plus,
        Some(t) if t.is_operator("-") => UnaryOp::Neg,
        _ => return parse_primary(tokens, pos, depth),
    };
    let operand = parse_unary(tokens, pos + 1, descend(depth)?)?;
    Parsed::node(
        Expr::UnaryOp { op, operand: Box::new(operand.expr) },
        operand.pos,
        operand.height,
    )
}

fn parse_primary(tokens: &[Token], pos: usize, depth: usize) -> Result<Parsed> {
    let token = tokens
        .get(pos)
        .ok_or_else(|| FormulaError::syntax("Unexpected end of formula"))?;

    match token.kind {
        TokenKind::Number => {
            // Lexer guarantees a digit, so the prefix parse cannot fail ("1.2.3" -> 1.2)
            let n = super::eval_helpers::parse_float_prefix(&token.text).unwrap_or(f64::NAN);
            Ok(Parsed::leaf(Expr::Number(n), pos + 1))
        }
        TokenKind::String => Ok(Parsed::leaf(Expr::Text(token.text.clone()), pos + 1)),
        TokenKind::CellRef => Ok(Parsed::leaf(Expr::CellRef(token.text.clone()), pos + 1)),
        TokenKind::RangeRef => {
            let (start, end) = token.text.split_once(':').unwrap_or((token.text.as_str(), ""));
            Ok(Parsed::leaf(
                Expr::Range {
                    start: start.to_string(),
                    end: end.to_string(),
                },
                pos + 1,
            ))
        }
        TokenKind::FunctionName => parse_function_call(tokens, pos, depth),
        TokenKind::LParen => {
            let inner = parse_comparison(tokens, pos + 1, descend(depth)?)?;
            match tokens.get(inner.pos) {
                Some(t) if t.kind == TokenKind::RParen => Ok(Parsed { pos: inner.pos + 1, ..inner }),
                _ => Err(FormulaError::syntax("Expected ')'")),
            }
        }
        TokenKind::Operator | TokenKind::RParen | TokenKind::Comma => Err(unexpected(token)),
    }
}

// NAME ( [arg (, arg)*] )
fn parse_function_call(tokens: &[Token], pos: usize, depth: usize) -> Result<Parsed> {
    let name = tokens[pos].text.clone();
    let mut pos = pos + 1;

    if !matches!(tokens.get(pos), Some(t) if t.kind == TokenKind::LParen) {
        return Err(FormulaError::Syntax(format!("Expected '(' after function {}", name)));
    }
    pos += 1;
    let depth = descend(depth)?;

    let mut args = Vec::new();
    let mut height = 0;
    if matches!(tokens.get(pos), Some(t) if t.kind != TokenKind::RParen) {
        let arg = parse_comparison(tokens, pos, depth)?;
        height = height.max(arg.height);
        pos = arg.pos;
        args.push(arg.expr);

        while matches!(tokens.get(pos), Some(t) if t.kind == TokenKind::Comma) {
            let arg = parse_comparison(tokens, pos + 1, depth)?;
            height = height.max(arg.height);
            pos = arg.pos;
            args.push(arg.expr);
        }
    }

    match tokens.get(pos) {
        Some(t) if t.kind == TokenKind::RParen => Parsed::node(Expr::Function { name, args }, pos + 1, height),
        _ => Err(FormulaError::Syntax(format!(
            "Expected ')' after function {} arguments",
            name
        ))),
    }
}

// =============================================================================
// Formula Printing - Convert Expr back to string
// =============================================================================

/// Format an expression as a canonical formula string (with leading '=').
///
/// Binary operations are fully parenthesized and strings are double-quoted
/// with `\` escapes, so `parse_formula(&format_expr(e))` yields `e` again.
pub fn format_expr(expr: &Expr) -> String {
    format!("={}", format_expr_inner(expr))
}

/// Format an expression without the leading '='.
pub fn format_expr_inner(expr: &Expr) -> String {
    match expr {
        Expr::Number(n) => format_number_literal(*n),
        Expr::Text(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        Expr::CellRef(label) => label.clone(),
        Expr::Range { start, end } => format!("{}:{}", start, end),
        Expr::Function { name, args } => {
            let args_str: Vec<String> = args.iter().map(format_expr_inner).collect();
            format!("{}({})", name, args_str.join(","))
        }
        Expr::BinaryOp { op, left, right } => format!(
            "({}{}{})",
            format_expr_inner(left),
            op.symbol(),
            format_expr_inner(right)
        ),
        Expr::UnaryOp { op, operand } => format!("{}{}", op.symbol(), format_expr_inner(operand)),
    }
}

/// Number as literal text. Infinity is written as a digit run that overflows
/// back to it when parsed, since the lexer has no exponent form.
fn format_number_literal(n: f64) -> String {
    if n.is_infinite() {
        let digits = format!("1{}", "0".repeat(309));
        return if n > 0.0 { digits } else { format!("-{}", digits) };
    }
    format!("{}", n)
}
