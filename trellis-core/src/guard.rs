//! Declarative guard expressions.
//!
//! Schemas loaded from definition files cannot carry closures, so they attach
//! guards as compact boolean expressions over the context data bag:
//!
//! - `loan.insured` - dotted field access, truthy check
//! - `valuation.amount >= 10000` - numeric comparison
//! - `status == "active"`, `status != "draft"` - equality on strings,
//!   numbers, booleans, null; string literals take `\"`, `\\`, `\n`, `\t`,
//!   `\r` escapes and reject any other
//! - `!expr`, `expr && expr`, `expr || expr`, `(expr)` - boolean operators,
//!   `&&` binding tighter than `||`
//!
//! Missing fields read as null. Truthiness follows JSON conventions: null,
//! false, 0, empty strings, empty arrays, and empty objects are falsy.
//! Expressions are compiled once at schema construction; evaluation never
//! fails.

use crate::context::Context;
use crate::error::{DomainError, WorkflowError};
use crate::hooks::Guard;
use crate::state::StateId;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A guard attached to a transition: either a compiled expression (exportable
/// via the schema map) or opaque user code supplied at construction time.
#[derive(Clone)]
pub enum GuardSpec {
    Expr(GuardExpr),
    Custom(Arc<dyn Guard>),
}

impl GuardSpec {
    pub fn check(&self, state: &StateId, ctx: &Context) -> Result<bool, DomainError> {
        match self {
            GuardSpec::Expr(expr) => Ok(expr.evaluate(ctx.data())),
            GuardSpec::Custom(guard) => guard.check(state, ctx),
        }
    }

    /// The expression text, when this guard is exportable.
    pub fn expr_text(&self) -> Option<&str> {
        match self {
            GuardSpec::Expr(expr) => Some(expr.text()),
            GuardSpec::Custom(_) => None,
        }
    }
}

impl fmt::Debug for GuardSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardSpec::Expr(expr) => f.debug_tuple("Expr").field(&expr.text()).finish(),
            GuardSpec::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// A compiled guard expression.
#[derive(Debug, Clone)]
pub struct GuardExpr {
    text: String,
    root: Node,
}

impl GuardExpr {
    /// Compiles an expression, rejecting malformed input up front.
    pub fn parse(text: &str) -> Result<Self, WorkflowError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(WorkflowError::InvalidGuard {
                reason: "empty guard expression".to_string(),
            });
        }

        let tokens = lex(trimmed)?;
        let mut parser = Parser { tokens, pos: 0 };
        let root = parser.expression()?;
        if parser.pos != parser.tokens.len() {
            return Err(WorkflowError::InvalidGuard {
                reason: format!("unexpected input after expression in '{trimmed}'"),
            });
        }

        Ok(Self {
            text: trimmed.to_string(),
            root,
        })
    }

    /// Evaluates against a data bag. Total: missing fields are null.
    pub fn evaluate(&self, data: &Value) -> bool {
        self.root.evaluate(data)
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Guard for GuardExpr {
    fn check(&self, _state: &StateId, ctx: &Context) -> Result<bool, DomainError> {
        Ok(self.evaluate(ctx.data()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone)]
enum Node {
    Truthy(String),
    Compare {
        field: String,
        op: CmpOp,
        value: Value,
    },
    Not(Box<Node>),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
}

impl Node {
    fn evaluate(&self, data: &Value) -> bool {
        match self {
            Node::Truthy(field) => is_truthy(lookup(data, field)),
            Node::Compare { field, op, value } => compare(lookup(data, field), *op, value),
            Node::Not(inner) => !inner.evaluate(data),
            Node::And(left, right) => left.evaluate(data) && right.evaluate(data),
            Node::Or(left, right) => left.evaluate(data) || right.evaluate(data),
        }
    }
}

fn lookup<'a>(data: &'a Value, field: &str) -> &'a Value {
    let mut current = data;
    for part in field.split('.') {
        match current.get(part) {
            Some(next) => current = next,
            None => return &Value::Null,
        }
    }
    current
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn compare(actual: &Value, op: CmpOp, expected: &Value) -> bool {
    match op {
        CmpOp::Eq => values_equal(actual, expected),
        CmpOp::Ne => !values_equal(actual, expected),
        // Ordering is defined for numbers only; anything else fails the gate.
        _ => match (actual.as_f64(), expected.as_f64()) {
            (Some(a), Some(b)) => match op {
                CmpOp::Lt => a < b,
                CmpOp::Le => a <= b,
                CmpOp::Gt => a > b,
                CmpOp::Ge => a >= b,
                CmpOp::Eq | CmpOp::Ne => unreachable!(),
            },
            _ => false,
        },
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .zip(y.as_f64())
            .is_some_and(|(x, y)| (x - y).abs() < f64::EPSILON),
        _ => a == b,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Field(String),
    Literal(Value),
    Not,
    And,
    Or,
    LParen,
    RParen,
    Cmp(CmpOp),
}

fn lex(input: &str) -> Result<Vec<Token>, WorkflowError> {
    let mut tokens = Vec::new();
    let bytes = input.as_bytes();
    let mut i = 0;

    let bad = |reason: String| WorkflowError::InvalidGuard { reason };

    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '&' => {
                if bytes.get(i + 1) == Some(&b'&') {
                    tokens.push(Token::And);
                    i += 2;
                } else {
                    return Err(bad("expected '&&'".to_string()));
                }
            }
            '|' => {
                if bytes.get(i + 1) == Some(&b'|') {
                    tokens.push(Token::Or);
                    i += 2;
                } else {
                    return Err(bad("expected '||'".to_string()));
                }
            }
            '!' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token::Cmp(CmpOp::Ne));
                    i += 2;
                } else {
                    tokens.push(Token::Not);
                    i += 1;
                }
            }
            '=' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token::Cmp(CmpOp::Eq));
                    i += 2;
                } else {
                    return Err(bad("expected '=='".to_string()));
                }
            }
            '<' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token::Cmp(CmpOp::Le));
                    i += 2;
                } else {
                    tokens.push(Token::Cmp(CmpOp::Lt));
                    i += 1;
                }
            }
            '>' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token::Cmp(CmpOp::Ge));
                    i += 2;
                } else {
                    tokens.push(Token::Cmp(CmpOp::Gt));
                    i += 1;
                }
            }
            '"' => {
                let mut s = String::new();
                i += 1;
                loop {
                    match bytes.get(i) {
                        None => return Err(bad("unterminated string".to_string())),
                        Some(b'"') => {
                            i += 1;
                            break;
                        }
                        Some(b'\\') => {
                            match bytes.get(i + 1) {
                                Some(b'"') => s.push('"'),
                                Some(b'\\') => s.push('\\'),
                                Some(b'n') => s.push('\n'),
                                Some(b't') => s.push('\t'),
                                Some(b'r') => s.push('\r'),
                                Some(_) => {
                                    // i + 1 is a char boundary: bytes[i] is ASCII '\'.
                                    let escaped = input[i + 1..].chars().next().unwrap_or('?');
                                    return Err(bad(format!("unsupported escape '\\{escaped}'")));
                                }
                                None => return Err(bad("unterminated string".to_string())),
                            }
                            i += 2;
                        }
                        Some(_) => {
                            // Copy whole UTF-8 segments; '"' and '\' are single
                            // bytes, so both endpoints are char boundaries.
                            let start = i;
                            while i < bytes.len() && bytes[i] != b'"' && bytes[i] != b'\\' {
                                i += 1;
                            }
                            s.push_str(&input[start..i]);
                        }
                    }
                }
                tokens.push(Token::Literal(Value::String(s)));
            }
            '-' | '0'..='9' => {
                let start = i;
                if c == '-' {
                    i += 1;
                }
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                    i += 1;
                }
                let num_str = &input[start..i];
                let num: f64 = num_str.parse().map_err(|_| {
                    bad(format!("invalid number: '{num_str}'"))
                })?;
                let num = serde_json::Number::from_f64(num)
                    .ok_or_else(|| bad(format!("invalid number: '{num_str}'")))?;
                tokens.push(Token::Literal(Value::Number(num)));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < bytes.len() {
                    let b = bytes[i] as char;
                    if b.is_ascii_alphanumeric() || b == '_' || b == '.' {
                        i += 1;
                    } else {
                        break;
                    }
                }
                let word = &input[start..i];
                tokens.push(match word {
                    "true" => Token::Literal(Value::Bool(true)),
                    "false" => Token::Literal(Value::Bool(false)),
                    "null" => Token::Literal(Value::Null),
                    _ => Token::Field(word.to_string()),
                });
            }
            other => return Err(bad(format!("unexpected character '{other}'"))),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn expression(&mut self) -> Result<Node, WorkflowError> {
        let mut left = self.conjunction()?;
        while self.eat(&Token::Or) {
            let right = self.conjunction()?;
            left = Node::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn conjunction(&mut self) -> Result<Node, WorkflowError> {
        let mut left = self.unary()?;
        while self.eat(&Token::And) {
            let right = self.unary()?;
            left = Node::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Node, WorkflowError> {
        if self.eat(&Token::Not) {
            let inner = self.unary()?;
            return Ok(Node::Not(Box::new(inner)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Node, WorkflowError> {
        match self.next() {
            Some(Token::LParen) => {
                let inner = self.expression()?;
                if !self.eat(&Token::RParen) {
                    return Err(WorkflowError::InvalidGuard {
                        reason: "expected ')'".to_string(),
                    });
                }
                Ok(inner)
            }
            Some(Token::Field(field)) => {
                if let Some(Token::Cmp(op)) = self.peek().cloned() {
                    self.pos += 1;
                    match self.next() {
                        Some(Token::Literal(value)) => Ok(Node::Compare { field, op, value }),
                        _ => Err(WorkflowError::InvalidGuard {
                            reason: format!("expected literal after comparison on '{field}'"),
                        }),
                    }
                } else {
                    Ok(Node::Truthy(field))
                }
            }
            other => Err(WorkflowError::InvalidGuard {
                reason: format!("expected field or '(' but found {other:?}"),
            }),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }
}
