// Formula lexer - splits formula text into tokens
// Supports: numbers, string literals ("..." or '...'), cell refs (A1), ranges (A1:B5),
// function names, operators (+ - * / ^ < > <= >= == != and friends), parens, commas

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use crate::cell_id::is_cell_label;
use crate::error::{FormulaError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Number,
    String,
    CellRef,
    /// `START:END` as written, e.g. `A1:B5`
    RangeRef,
    Operator,
    LParen,
    RParen,
    Comma,
    /// Upper-cased identifier that is not a cell reference
    FunctionName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self { kind, text: text.into() }
    }

    pub fn is_operator(&self, symbol: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == symbol
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Number => "number",
            TokenKind::String => "string",
            TokenKind::CellRef => "cell",
            TokenKind::RangeRef => "range",
            TokenKind::Operator => "operator",
            TokenKind::LParen => "lparen",
            TokenKind::RParen => "rparen",
            TokenKind::Comma => "comma",
            TokenKind::FunctionName => "function",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.text)
    }
}

const OPERATOR_CHARS: &str = "+-*/^<>=!&|";
const OPERATOR_SUFFIXES: &str = "=&|";

/// Tokenize a formula. Never fails: characters that start no token are skipped.
pub fn tokenize(formula: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    scan(formula, |_| None, &mut tokens);
    tokens
}

/// Like [`tokenize`], but an unrecognized character is a syntax error.
pub fn tokenize_strict(formula: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    match scan(formula, Some, &mut tokens) {
        Some(c) => Err(FormulaError::Syntax(format!("Unexpected character: {}", c))),
        None => Ok(tokens),
    }
}

/// Shared scanner. `on_unknown` decides whether an unrecognized character
/// stops the scan (returning it) or is skipped.
fn scan(formula: &str, on_unknown: impl Fn(char) -> Option<char>, tokens: &mut Vec<Token>) -> Option<char> {
    let input = formula.strip_prefix('=').unwrap_or(formula);
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        match c {
            '"' | '\'' => {
                chars.next();
                tokens.push(Token::new(TokenKind::String, read_string(&mut chars, c)));
            }
            '0'..='9' => tokens.push(Token::new(TokenKind::Number, read_number(&mut chars))),
            '.' if starts_number_after_dot(&chars) => {
                tokens.push(Token::new(TokenKind::Number, read_number(&mut chars)));
            }
            _ if OPERATOR_CHARS.contains(c) => {
                chars.next();
                let mut op = c.to_string();
                if let Some(&next) = chars.peek() {
                    if OPERATOR_SUFFIXES.contains(next) {
                        op.push(next);
                        chars.next();
                    }
                }
                tokens.push(Token::new(TokenKind::Operator, op));
            }
            '(' => {
                tokens.push(Token::new(TokenKind::LParen, "("));
                chars.next();
            }
            ')' => {
                tokens.push(Token::new(TokenKind::RParen, ")"));
                chars.next();
            }
            ',' => {
                tokens.push(Token::new(TokenKind::Comma, ","));
                chars.next();
            }
            _ if c.is_ascii_alphabetic() => tokens.push(read_identifier(&mut chars)),
            _ => {
                if let Some(bad) = on_unknown(c) {
                    return Some(bad);
                }
                chars.next();
            }
        }
    }

    None
}

fn starts_number_after_dot(chars: &Peekable<Chars<'_>>) -> bool {
    let mut ahead = chars.clone();
    ahead.next();
    matches!(ahead.peek(), Some(d) if d.is_ascii_digit())
}

/// Body of a quoted string; the opening quote is already consumed.
/// `\` escapes the next character. Unterminated strings run to the end.
fn read_string(chars: &mut Peekable<Chars<'_>>, quote: char) -> String {
    let mut s = String::new();
    while let Some(ch) = chars.next() {
        if ch == quote {
            break;
        }
        if ch == '\\' {
            if let Some(escaped) = chars.next() {
                s.push(escaped);
            }
        } else {
            s.push(ch);
        }
    }
    s
}

// Digits and dots, greedily ("1.2.3" is one token)
fn read_number(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut num = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() || c == '.' {
            num.push(c);
            chars.next();
        } else {
            break;
        }
    }
    num
}

fn read_identifier(chars: &mut Peekable<Chars<'_>>) -> Token {
    let mut ident = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_alphanumeric() || c == '_' {
            ident.push(c);
            chars.next();
        } else {
            break;
        }
    }

    match chars.peek() {
        Some('(') => Token::new(TokenKind::FunctionName, ident.to_uppercase()),
        Some(':') if is_cell_label(&ident) => {
            chars.next();
            let mut end = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_ascii_alphanumeric() {
                    end.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            Token::new(TokenKind::RangeRef, format!("{}:{}", ident, end))
        }
        _ if is_cell_label(&ident) => Token::new(TokenKind::CellRef, ident),
        _ => Token::new(TokenKind::FunctionName, ident.to_uppercase()),
    }
}
