//! Expression and statement scripts
//!
//! A tiny language over scope variables. It serves two purposes:
//!
//! - read-only expressions for [`Backend::evaluate_expression`], e.g.
//!   `len(ROM)`, `str(ROM[3].Source)`, `STACK[-1]`
//! - `.urs` modules: one statement per line, used to preset registers and
//!   memory before (or after) a program is loaded
//!
//! ```text
//! statement := target '=' expr | expr
//! target    := NAME | NAME '[' expr ']'
//! expr      := '-' expr | postfix
//! postfix   := primary ( '[' expr ']' | '.' NAME | '(' args ')' )*
//! primary   := INT | STRING | NAME | '[' list ']' | '{' map '}' | '(' expr ')'
//! ```
//!
//! [`Backend::evaluate_expression`]: crate::backend::Backend::evaluate_expression

use super::scope::UrclScope;
use crate::backend::value::Value;
use crate::backend::EvalError;
use rustc_hash::FxHashMap;
use std::borrow::Cow;
use thiserror::Error;

/// A script line failed to parse or execute
#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}: {message}")]
pub struct ScriptError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Int(i64),
    Str(String),
    Ident(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    Eq,
    Minus,
    Eof,
}

/// Parsed expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Name(String),
    List(Vec<Expr>),
    Map(Vec<(Expr, Expr)>),
    Index(Box<Expr>, Box<Expr>),
    Field(Box<Expr>, String),
    Call(String, Vec<Expr>),
    Negate(Box<Expr>),
}

/// Parsed statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Assign {
        name: String,
        index: Option<Expr>,
        value: Expr,
    },
    Expr(Expr),
}

/// Parse an integer literal: decimal, `0x`, `0b` or `0o`, optionally negative
pub fn parse_int_literal(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let lower = digits.to_ascii_lowercase();
    let magnitude = if let Some(hex) = lower.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(bin) = lower.strip_prefix("0b") {
        i64::from_str_radix(bin, 2).ok()?
    } else if let Some(oct) = lower.strip_prefix("0o") {
        i64::from_str_radix(oct, 8).ok()?
    } else if !lower.is_empty() && lower.chars().all(|c| c.is_ascii_digit()) {
        lower.parse().ok()?
    } else {
        return None;
    };
    Some(if negative { -magnitude } else { magnitude })
}

fn tokenize(text: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\r' | '\n' => i += 1,
            '#' => break,
            '/' if chars.get(i + 1) == Some(&'/') => break,
            '(' | ')' | '[' | ']' | '{' | '}' | ',' | ':' | '.' | '=' | '-' => {
                tokens.push(match c {
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    '[' => Token::LBracket,
                    ']' => Token::RBracket,
                    '{' => Token::LBrace,
                    '}' => Token::RBrace,
                    ',' => Token::Comma,
                    ':' => Token::Colon,
                    '.' => Token::Dot,
                    '=' => Token::Eq,
                    _ => Token::Minus,
                });
                i += 1;
            }
            '"' => {
                let mut value = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err("unterminated string".to_string()),
                        Some('"') => break,
                        Some('\\') => {
                            match chars.get(i + 1) {
                                Some('n') => value.push('\n'),
                                Some('t') => value.push('\t'),
                                Some(&other) => value.push(other),
                                None => return Err("unterminated string".to_string()),
                            }
                            i += 2;
                        }
                        Some(&other) => {
                            value.push(other);
                            i += 1;
                        }
                    }
                }
                i += 1; // closing quote
                tokens.push(Token::Str(value));
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let value = parse_int_literal(&literal)
                    .ok_or_else(|| format!("invalid number \"{}\"", literal))?;
                tokens.push(Token::Int(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(format!("unexpected character '{}'", other)),
        }
    }

    tokens.push(Token::Eof);
    Ok(tokens)
}

/// Deepest expression tree the parser builds
const MAX_NESTING: usize = 128;

struct Parser {
    tokens: Vec<Token>,
    position: usize,
    depth: usize,
}

impl Parser {
    fn new(text: &str) -> Result<Self, String> {
        Ok(Parser {
            tokens: tokenize(text)?,
            position: 0,
            depth: 0,
        })
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.position < self.tokens.len() {
            self.position += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), String> {
        let token = self.advance();
        if token == expected {
            Ok(())
        } else {
            Err(format!("expected {:?}, found {:?}", expected, token))
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek(), Token::Eof)
    }

    fn statement(&mut self) -> Result<Statement, String> {
        let expr = self.expression()?;
        if *self.peek() != Token::Eq {
            return Ok(Statement::Expr(expr));
        }
        self.advance();
        let value = self.expression()?;
        match expr {
            Expr::Name(name) => Ok(Statement::Assign {
                name,
                index: None,
                value,
            }),
            Expr::Index(base, index) => match *base {
                Expr::Name(name) => Ok(Statement::Assign {
                    name,
                    index: Some(*index),
                    value,
                }),
                _ => Err("can only assign to a name or a name[index]".to_string()),
            },
            _ => Err("can only assign to a name or a name[index]".to_string()),
        }
    }

    // A failed parse is thrown away, so `depth` is only unwound on success.
    fn expression(&mut self) -> Result<Expr, String> {
        self.descend(1)?;
        let expr = if *self.peek() == Token::Minus {
            self.advance();
            Expr::Negate(Box::new(self.expression()?))
        } else {
            self.postfix()?
        };
        self.depth -= 1;
        Ok(expr)
    }

    fn descend(&mut self, levels: usize) -> Result<(), String> {
        if self.depth + levels > MAX_NESTING {
            return Err(format!("expression nested deeper than {} levels", MAX_NESTING));
        }
        self.depth += levels;
        Ok(())
    }

    fn postfix(&mut self) -> Result<Expr, String> {
        let mut expr = self.primary()?;
        let mut chained = 0;
        loop {
            match self.peek() {
                Token::LBracket => {
                    self.descend(1)?;
                    chained += 1;
                    self.advance();
                    let index = self.expression()?;
                    self.expect(Token::RBracket)?;
                    expr = Expr::Index(Box::new(expr), Box::new(index));
                }
                Token::Dot => {
                    self.descend(1)?;
                    chained += 1;
                    self.advance();
                    match self.advance() {
                        Token::Ident(field) => expr = Expr::Field(Box::new(expr), field),
                        other => return Err(format!("expected field name, found {:?}", other)),
                    }
                }
                Token::LParen => {
                    let name = match expr {
                        Expr::Name(name) => name,
                        _ => return Err("only named functions can be called".to_string()),
                    };
                    self.advance();
                    let args = self.sequence(Token::RParen)?;
                    expr = Expr::Call(name, args);
                }
                _ => {
                    self.depth -= chained;
                    return Ok(expr);
                }
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, String> {
        match self.advance() {
            Token::Int(n) => Ok(Expr::Literal(Value::Int(n))),
            Token::Str(s) => Ok(Expr::Literal(Value::Text(s))),
            Token::Ident(name) => Ok(match name.as_str() {
                "true" | "True" => Expr::Literal(Value::Bool(true)),
                "false" | "False" => Expr::Literal(Value::Bool(false)),
                "None" => Expr::Literal(Value::None),
                _ => Expr::Name(name),
            }),
            Token::LParen => {
                let expr = self.expression()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Token::LBracket => Ok(Expr::List(self.sequence(Token::RBracket)?)),
            Token::LBrace => {
                let mut entries = Vec::new();
                while *self.peek() != Token::RBrace {
                    let key = self.expression()?;
                    self.expect(Token::Colon)?;
                    let value = self.expression()?;
                    entries.push((key, value));
                    if *self.peek() == Token::Comma {
                        self.advance();
                    } else {
                        break;
                    }
                }
                self.expect(Token::RBrace)?;
                Ok(Expr::Map(entries))
            }
            other => Err(format!("unexpected {:?}", other)),
        }
    }

    /// Comma-separated expressions up to (and consuming) `close`
    fn sequence(&mut self, close: Token) -> Result<Vec<Expr>, String> {
        let mut items = Vec::new();
        while *self.peek() != close {
            items.push(self.expression()?);
            if *self.peek() == Token::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(close)?;
        Ok(items)
    }
}

/// Parse a single expression; trailing tokens are an error
pub fn parse_expression(text: &str) -> Result<Expr, String> {
    let mut parser = Parser::new(text)?;
    let expr = parser.expression()?;
    if !parser.is_at_end() {
        return Err(format!("unexpected {:?} after expression", parser.peek()));
    }
    Ok(expr)
}

/// Parse one statement line; `None` for blank and comment-only lines
pub fn parse_statement(text: &str) -> Result<Option<Statement>, String> {
    let mut parser = Parser::new(text)?;
    if parser.is_at_end() {
        return Ok(None);
    }
    let statement = parser.statement()?;
    if !parser.is_at_end() {
        return Err(format!("unexpected {:?} after statement", parser.peek()));
    }
    Ok(Some(statement))
}

fn unavailable(message: impl Into<String>) -> EvalError {
    EvalError::Unavailable(message.into())
}

/// Resolve a possibly negative list index
fn list_slot(len: usize, index: i64) -> Option<usize> {
    let resolved = if index < 0 { len as i64 + index } else { index };
    (0..len as i64).contains(&resolved).then_some(resolved as usize)
}

/// Evaluate an expression without mutating the scope
pub fn evaluate(expr: &Expr, scope: &UrclScope) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Name(_) | Expr::Index(..) | Expr::Field(..) => resolve(expr, scope).map(Cow::into_owned),
        Expr::List(items) => items
            .iter()
            .map(|item| evaluate(item, scope))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        Expr::Map(entries) => {
            let mut map = FxHashMap::default();
            for (key, value) in entries {
                let key = evaluate(key, scope)?;
                let key = key
                    .as_int()
                    .ok_or_else(|| unavailable(format!("map keys must be int, not {}", key.type_name())))?;
                map.insert(key, evaluate(value, scope)?);
            }
            Ok(Value::Map(map))
        }
        Expr::Call(name, args) => {
            let args = args
                .iter()
                .map(|arg| resolve(arg, scope))
                .collect::<Result<Vec<_>, _>>()?;
            call_builtin(name, &args)
        }
        Expr::Negate(inner) => match evaluate(inner, scope)? {
            Value::Int(n) => n
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| unavailable("integer overflow")),
            other => Err(unavailable(format!("can not negate {}", other.type_name()))),
        },
    }
}

/// Evaluate an expression, borrowing from the scope when it names stored data.
///
/// `ROM[i].Source` walks into `ROM` without copying it; only the final
/// value is cloned by the caller, if at all.
fn resolve<'a>(expr: &Expr, scope: &'a UrclScope) -> Result<Cow<'a, Value>, EvalError> {
    match expr {
        Expr::Name(name) => scope
            .get(name)
            .map(Cow::Borrowed)
            .ok_or_else(|| EvalError::Undefined(name.clone())),
        Expr::Index(base, index) => {
            let index = evaluate(index, scope)?;
            let index = index
                .as_int()
                .ok_or_else(|| unavailable(format!("indices must be int, not {}", index.type_name())))?;
            match resolve(base, scope)? {
                Cow::Borrowed(base) => index_into(base, index).map(Cow::Borrowed),
                Cow::Owned(base) => index_into(&base, index).map(|item| Cow::Owned(item.clone())),
            }
        }
        Expr::Field(base, field) => match resolve(base, scope)? {
            Cow::Borrowed(base) => field_of(base, field).map(Cow::Borrowed),
            Cow::Owned(base) => field_of(&base, field).map(|item| Cow::Owned(item.clone())),
        },
        _ => evaluate(expr, scope).map(Cow::Owned),
    }
}

fn index_into(base: &Value, index: i64) -> Result<&Value, EvalError> {
    match base {
        Value::List(items) => list_slot(items.len(), index)
            .map(|slot| &items[slot])
            .ok_or_else(|| unavailable("list index out of range")),
        Value::Map(map) => map
            .get(&index)
            .ok_or_else(|| unavailable(format!("no entry at {}", index))),
        other => Err(unavailable(format!("{} is not indexable", other.type_name()))),
    }
}

fn field_of<'v>(base: &'v Value, field: &str) -> Result<&'v Value, EvalError> {
    base.field(field)
        .ok_or_else(|| unavailable(format!("{} has no field '{}'", base.type_name(), field)))
}

fn call_builtin(name: &str, args: &[Cow<'_, Value>]) -> Result<Value, EvalError> {
    match (name, args) {
        ("len", [value]) => {
            let len = match value.as_ref() {
                Value::List(items) => items.len(),
                Value::Map(map) => map.len(),
                Value::Text(text) => text.chars().count(),
                other => return Err(unavailable(format!("{} has no length", other.type_name()))),
            };
            Ok(Value::Int(len as i64))
        }
        ("str", [value]) => Ok(Value::Text(value.render())),
        ("len" | "str", _) => Err(unavailable(format!("{}() takes exactly one argument", name))),
        _ => Err(EvalError::Undefined(name.to_string())),
    }
}

/// Execute one statement against the scope
pub fn execute(statement: &Statement, scope: &mut UrclScope) -> Result<(), EvalError> {
    match statement {
        Statement::Expr(expr) => evaluate(expr, scope).map(|_| ()),
        Statement::Assign {
            name,
            index: None,
            value,
        } => {
            let value = evaluate(value, scope)?;
            scope.set(name.as_str(), value);
            Ok(())
        }
        Statement::Assign {
            name,
            index: Some(index),
            value,
        } => {
            let index = evaluate(index, scope)?;
            let index = index
                .as_int()
                .ok_or_else(|| unavailable(format!("indices must be int, not {}", index.type_name())))?;
            let value = evaluate(value, scope)?;
            let target = scope
                .get_mut(name)
                .ok_or_else(|| EvalError::Undefined(name.clone()))?;
            match target {
                Value::List(items) => {
                    let slot = list_slot(items.len(), index)
                        .ok_or_else(|| unavailable("list assignment index out of range"))?;
                    items[slot] = value;
                }
                Value::Map(map) => {
                    map.insert(index, value);
                }
                other => {
                    return Err(unavailable(format!(
                        "{} does not support item assignment",
                        other.type_name()
                    )))
                }
            }
            Ok(())
        }
    }
}

/// Run a whole `.urs` module line by line. Lines before a failure stay applied.
pub fn run_script(source: &str, scope: &mut UrclScope) -> Result<(), ScriptError> {
    for (index, text) in source.lines().enumerate() {
        let line = index + 1;
        let statement = parse_statement(text).map_err(|message| ScriptError { line, message })?;
        if let Some(statement) = statement {
            execute(&statement, scope).map_err(|e| ScriptError {
                line,
                message: e.to_string(),
            })?;
        }
    }
    Ok(())
}
