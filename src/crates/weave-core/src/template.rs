//! `{{ … }}` expression rendering over block inputs.
//!
//! String settings may embed expressions evaluated against a context
//! composed of upstream outputs, the run trigger and the node's own
//! settings. The grammar is deliberately small — attribute/index
//! access, comparisons, boolean logic and a handful of string filters.
//! There is no code execution.
//!
//! Two modes exist: `Strict` fails on undefined variables (used for
//! agent prompts, file paths and anything where a silent blank would
//! hide a bug) and `Lenient` renders undefined values as empty strings
//! (best-effort previews).

use serde_json::{Map, Value};

use crate::block::BlockInput;
use crate::error::TemplateError;

/// How undefined variables are treated during evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Strict,
    Lenient,
}

/// Build the canonical rendering context for a block input.
///
/// Each upstream node id is bound to its output; when the output
/// carries a `data` key that value is exposed under the node id
/// instead, so `{{ node.field }}` reaches into the payload. The raw
/// upstream map stays available under `upstream`.
pub fn block_context(input: &BlockInput) -> Value {
    let mut ctx = Map::new();
    for (node_id, output) in &input.upstream {
        let exposed = match output.get("data") {
            Some(data) => data.clone(),
            None => output.clone(),
        };
        ctx.insert(node_id.clone(), exposed);
    }
    ctx.insert("settings".to_string(), input.settings.clone());
    ctx.insert("trigger".to_string(), input.trigger.clone());
    ctx.insert(
        "upstream".to_string(),
        Value::Object(input.upstream.clone()),
    );
    Value::Object(ctx)
}

/// Render a template string against a context.
pub fn render_str(
    template: &str,
    context: &Value,
    mode: RenderMode,
) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| TemplateError("unterminated '{{' expression".to_string()))?;
        let expr = &after[..end];
        let value = eval_expression(expr, context, mode)?;
        out.push_str(&value_to_string(&value));
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Render string leaves inside an arbitrary JSON value by recursive
/// descent; non-string scalars pass through untouched.
pub fn render_value(
    value: &Value,
    context: &Value,
    mode: RenderMode,
) -> Result<Value, TemplateError> {
    match value {
        Value::String(s) => Ok(Value::String(render_str(s, context, mode)?)),
        Value::Array(items) => {
            let rendered: Result<Vec<Value>, TemplateError> = items
                .iter()
                .map(|item| render_value(item, context, mode))
                .collect();
            Ok(Value::Array(rendered?))
        }
        Value::Object(map) => {
            let mut out = Map::new();
            for (k, v) in map {
                out.insert(k.clone(), render_value(v, context, mode)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

/// Evaluate a single expression (the inside of `{{ … }}`).
pub fn eval_expression(
    expr: &str,
    context: &Value,
    mode: RenderMode,
) -> Result<Value, TemplateError> {
    let tokens = lex(expr)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        context,
        mode,
    };
    let value = parser.parse_or()?;
    if parser.pos != parser.tokens.len() {
        return Err(TemplateError(format!(
            "unexpected trailing input in expression '{}'",
            expr.trim()
        )));
    }
    Ok(value)
}

/// Display form used when an expression result is spliced into a
/// string: null renders empty, integral floats render without the
/// fractional part, containers render as JSON.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    return format!("{}", f as i64);
                }
            }
            n.to_string()
        }
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Jinja-style truthiness: null, false, zero, empty strings and empty
/// containers are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Str(String),
    Dot,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Pipe,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
    True,
    False,
    Null,
}

fn lex(input: &str) -> Result<Vec<Token>, TemplateError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '|' => {
                tokens.push(Token::Pipe);
                i += 1;
            }
            '=' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Eq);
                i += 2;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Ne);
                i += 2;
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Le);
                    i += 2;
                } else {
                    tokens.push(Token::Lt);
                    i += 1;
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Ge);
                    i += 2;
                } else {
                    tokens.push(Token::Gt);
                    i += 1;
                }
            }
            '\'' | '"' => {
                let quote = c;
                let mut s = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        Some(&ch) if ch == quote => {
                            i += 1;
                            break;
                        }
                        Some(&ch) => {
                            s.push(ch);
                            i += 1;
                        }
                        None => {
                            return Err(TemplateError("unterminated string literal".to_string()))
                        }
                    }
                }
                tokens.push(Token::Str(s));
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let n = text
                    .parse::<f64>()
                    .map_err(|_| TemplateError(format!("invalid number '{text}'")))?;
                tokens.push(Token::Number(n));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '-')
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(match word.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "true" | "True" => Token::True,
                    "false" | "False" => Token::False,
                    "null" | "none" | "None" => Token::Null,
                    _ => Token::Ident(word),
                });
            }
            other => {
                return Err(TemplateError(format!(
                    "unexpected character '{other}' in expression"
                )))
            }
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    context: &'a Value,
    mode: RenderMode,
}

impl Parser<'_> {
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

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<Value, TemplateError> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::Or) {
            let right = self.parse_and()?;
            left = Value::Bool(is_truthy(&left) || is_truthy(&right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Value, TemplateError> {
        let mut left = self.parse_not()?;
        while self.eat(&Token::And) {
            let right = self.parse_not()?;
            left = Value::Bool(is_truthy(&left) && is_truthy(&right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Value, TemplateError> {
        if self.eat(&Token::Not) {
            let value = self.parse_not()?;
            return Ok(Value::Bool(!is_truthy(&value)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Value, TemplateError> {
        let left = self.parse_pipe()?;
        let op = match self.peek() {
            Some(Token::Eq) => Some(Cmp::Eq),
            Some(Token::Ne) => Some(Cmp::Ne),
            Some(Token::Lt) => Some(Cmp::Lt),
            Some(Token::Le) => Some(Cmp::Le),
            Some(Token::Gt) => Some(Cmp::Gt),
            Some(Token::Ge) => Some(Cmp::Ge),
            _ => None,
        };
        let Some(op) = op else { return Ok(left) };
        self.pos += 1;
        let right = self.parse_pipe()?;
        compare(&left, &right, op)
    }

    fn parse_pipe(&mut self) -> Result<Value, TemplateError> {
        let mut value = self.parse_postfix()?;
        while self.eat(&Token::Pipe) {
            let name = match self.next() {
                Some(Token::Ident(name)) => name,
                _ => return Err(TemplateError("expected filter name after '|'".to_string())),
            };
            value = apply_filter(&name, value)?;
        }
        Ok(value)
    }

    fn parse_postfix(&mut self) -> Result<Value, TemplateError> {
        let mut value = self.parse_primary()?;
        loop {
            if self.eat(&Token::Dot) {
                let name = match self.next() {
                    Some(Token::Ident(name)) => name,
                    // Allow keyword-looking attribute names after a dot.
                    Some(Token::And) => "and".to_string(),
                    Some(Token::Or) => "or".to_string(),
                    Some(Token::Not) => "not".to_string(),
                    _ => {
                        return Err(TemplateError(
                            "expected attribute name after '.'".to_string(),
                        ))
                    }
                };
                value = self.lookup(&value, &Value::String(name))?;
            } else if self.eat(&Token::LBracket) {
                let key = self.parse_or()?;
                if !self.eat(&Token::RBracket) {
                    return Err(TemplateError("expected ']'".to_string()));
                }
                value = self.lookup(&value, &key)?;
            } else {
                return Ok(value);
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Value, TemplateError> {
        match self.next() {
            Some(Token::Number(n)) => Ok(number(n)),
            Some(Token::Str(s)) => Ok(Value::String(s)),
            Some(Token::True) => Ok(Value::Bool(true)),
            Some(Token::False) => Ok(Value::Bool(false)),
            Some(Token::Null) => Ok(Value::Null),
            Some(Token::LParen) => {
                let value = self.parse_or()?;
                if !self.eat(&Token::RParen) {
                    return Err(TemplateError("expected ')'".to_string()));
                }
                Ok(value)
            }
            Some(Token::Ident(name)) => match self.context.get(&name) {
                Some(value) => Ok(value.clone()),
                None => self.undefined(&name),
            },
            other => Err(TemplateError(format!(
                "unexpected token in expression: {other:?}"
            ))),
        }
    }

    fn lookup(&self, base: &Value, key: &Value) -> Result<Value, TemplateError> {
        let found = match (base, key) {
            (Value::Object(map), Value::String(k)) => map.get(k).cloned(),
            (Value::Array(items), Value::Number(n)) => n
                .as_f64()
                .and_then(|f| if f >= 0.0 { Some(f as usize) } else { None })
                .and_then(|idx| items.get(idx).cloned()),
            _ => None,
        };
        match found {
            Some(value) => Ok(value),
            None => self.undefined(&value_to_string(key)),
        }
    }

    fn undefined(&self, name: &str) -> Result<Value, TemplateError> {
        match self.mode {
            RenderMode::Strict => Err(TemplateError(format!("'{name}' is undefined"))),
            RenderMode::Lenient => Ok(Value::Null),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Cmp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

fn compare(left: &Value, right: &Value, op: Cmp) -> Result<Value, TemplateError> {
    let result = match op {
        Cmp::Eq => values_equal(left, right),
        Cmp::Ne => !values_equal(left, right),
        ordering => {
            let ord = match (left, right) {
                (Value::Number(a), Value::Number(b)) => a
                    .as_f64()
                    .zip(b.as_f64())
                    .and_then(|(a, b)| a.partial_cmp(&b)),
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => None,
            }
            .ok_or_else(|| {
                TemplateError(format!(
                    "cannot order {} and {}",
                    type_name(left),
                    type_name(right)
                ))
            })?;
            match ordering {
                Cmp::Lt => ord == std::cmp::Ordering::Less,
                Cmp::Le => ord != std::cmp::Ordering::Greater,
                Cmp::Gt => ord == std::cmp::Ordering::Greater,
                Cmp::Ge => ord != std::cmp::Ordering::Less,
                Cmp::Eq | Cmp::Ne => unreachable!(),
            }
        }
    };
    Ok(Value::Bool(result))
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn apply_filter(name: &str, value: Value) -> Result<Value, TemplateError> {
    match name {
        "upper" => Ok(Value::String(value_to_string(&value).to_uppercase())),
        "lower" => Ok(Value::String(value_to_string(&value).to_lowercase())),
        "trim" => Ok(Value::String(value_to_string(&value).trim().to_string())),
        "length" => {
            let len = match &value {
                Value::String(s) => s.chars().count(),
                Value::Array(a) => a.len(),
                Value::Object(o) => o.len(),
                _ => return Err(TemplateError("length expects a string or container".to_string())),
            };
            Ok(number(len as f64))
        }
        other => Err(TemplateError(format!("unknown filter '{other}'"))),
    }
}

fn number(f: f64) -> Value {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        Value::Number((f as i64).into())
    } else {
        serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
