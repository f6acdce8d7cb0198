//! Safe arithmetic evaluator and the calculator tool block.

use async_trait::async_trait;
use serde_json::{json, Value};

use weave_core::template::value_to_string;
use weave_core::{Block, BlockError, BlockInput, RunContext};

/// Evaluate an arithmetic expression over `+ - * / % ** unary±` and
/// numeric literals. Anything else — names, calls, strings — is
/// rejected, which keeps the evaluator safe for untrusted input.
pub fn safe_eval(expr: &str) -> Result<f64, String> {
    let tokens = lex(expr)?;
    let mut parser = ExprParser { tokens, pos: 0 };
    let value = parser.parse_expr()?;
    if parser.pos != parser.tokens.len() {
        return Err("unexpected trailing input".to_string());
    }
    Ok(value)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Tok {
    Num(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Power,
    LParen,
    RParen,
}

fn lex(input: &str) -> Result<Vec<Tok>, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '+' => {
                tokens.push(Tok::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Tok::Minus);
                i += 1;
            }
            '*' => {
                if chars.get(i + 1) == Some(&'*') {
                    tokens.push(Tok::Power);
                    i += 2;
                } else {
                    tokens.push(Tok::Star);
                    i += 1;
                }
            }
            '/' => {
                tokens.push(Tok::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Tok::Percent);
                i += 1;
            }
            '(' => {
                tokens.push(Tok::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Tok::RParen);
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let n = text
                    .parse::<f64>()
                    .map_err(|_| format!("invalid number '{text}'"))?;
                tokens.push(Tok::Num(n));
            }
            other => return Err(format!("disallowed character '{other}' in expression")),
        }
    }

    Ok(tokens)
}

struct ExprParser {
    tokens: Vec<Tok>,
    pos: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<Tok> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Tok> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_expr(&mut self) -> Result<f64, String> {
        let mut value = self.parse_term()?;
        loop {
            match self.peek() {
                Some(Tok::Plus) => {
                    self.pos += 1;
                    value += self.parse_term()?;
                }
                Some(Tok::Minus) => {
                    self.pos += 1;
                    value -= self.parse_term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn parse_term(&mut self) -> Result<f64, String> {
        let mut value = self.parse_unary()?;
        loop {
            match self.peek() {
                Some(Tok::Star) => {
                    self.pos += 1;
                    value *= self.parse_unary()?;
                }
                Some(Tok::Slash) => {
                    self.pos += 1;
                    let rhs = self.parse_unary()?;
                    if rhs == 0.0 {
                        return Err("division by zero".to_string());
                    }
                    value /= rhs;
                }
                Some(Tok::Percent) => {
                    self.pos += 1;
                    let rhs = self.parse_unary()?;
                    if rhs == 0.0 {
                        return Err("modulo by zero".to_string());
                    }
                    value %= rhs;
                }
                _ => return Ok(value),
            }
        }
    }

    fn parse_unary(&mut self) -> Result<f64, String> {
        match self.peek() {
            Some(Tok::Plus) => {
                self.pos += 1;
                self.parse_unary()
            }
            Some(Tok::Minus) => {
                self.pos += 1;
                Ok(-self.parse_unary()?)
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> Result<f64, String> {
        let base = self.parse_atom()?;
        if self.peek() == Some(Tok::Power) {
            self.pos += 1;
            // Right-associative; the exponent may carry its own sign.
            let exponent = self.parse_unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn parse_atom(&mut self) -> Result<f64, String> {
        match self.advance() {
            Some(Tok::Num(n)) => Ok(n),
            Some(Tok::LParen) => {
                let value = self.parse_expr()?;
                if self.advance() != Some(Tok::RParen) {
                    return Err("expected ')'".to_string());
                }
                Ok(value)
            }
            other => Err(format!("unexpected token {other:?}")),
        }
    }
}

/// `tool.calculator` — evaluate basic arithmetic expressions. Unlike
/// the other tool blocks it also works when executed directly.
pub struct CalculatorBlock;

#[async_trait]
impl Block for CalculatorBlock {
    fn type_name(&self) -> &'static str {
        "tool.calculator"
    }

    fn summary(&self) -> &'static str {
        "Calculator tool: evaluate basic arithmetic expressions"
    }

    fn settings_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": ["string", "null"],
                    "description": "Arithmetic expression, e.g. '2 + 2 * 3'. Optional when invoked as a tool with runtime input."
                }
            }
        })
    }

    fn output_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {"result": {"type": "number"}},
            "required": ["result"]
        }))
    }

    fn tool_compatible(&self) -> bool {
        true
    }

    fn extras(&self) -> Option<Value> {
        Some(json!({"toolCompatible": true}))
    }

    async fn run(&self, input: &BlockInput, ctx: &RunContext) -> Result<Value, BlockError> {
        let expression = input
            .settings
            .get("expression")
            .and_then(Value::as_str)
            .map(str::to_string)
            .filter(|s| !s.is_empty())
            .or_else(|| {
                // Agent tool usage may route the expression through the
                // trigger or the first upstream value.
                ["expression", "input", "prompt"]
                    .iter()
                    .find_map(|key| input.trigger.get(*key))
                    .map(value_to_string)
                    .filter(|s| !s.is_empty())
            })
            .or_else(|| {
                input
                    .first_upstream()
                    .map(value_to_string)
                    .filter(|s| !s.is_empty())
            })
            .ok_or_else(|| {
                BlockError::Config("tool.calculator requires 'expression'".to_string())
            })?;

        ctx.log(
            "tool.calculator: evaluating",
            Some(json!({"expression": expression})),
            Some(&input.node_id),
        )
        .await;

        let result = safe_eval(&expression)
            .map_err(|e| BlockError::Config(format!("tool.calculator: {e}")))?;
        Ok(json!({ "result": result }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn evaluates_precedence_and_parens() {
        assert_eq!(safe_eval("2 + 2 * 3").unwrap(), 8.0);
        assert_eq!(safe_eval("(12+7)*3").unwrap(), 57.0);
        assert_eq!(safe_eval("10 % 3").unwrap(), 1.0);
        assert_eq!(safe_eval("2 ** 10").unwrap(), 1024.0);
        assert_eq!(safe_eval("-3 + 5").unwrap(), 2.0);
        assert_eq!(safe_eval("2 ** -1").unwrap(), 0.5);
    }

    #[test]
    fn rejects_anything_but_arithmetic() {
        assert!(safe_eval("__import__('os')").is_err());
        assert!(safe_eval("2 + x").is_err());
        assert!(safe_eval("1 / 0").is_err());
        assert!(safe_eval("(1").is_err());
        assert!(safe_eval("1 +").is_err());
    }

    #[tokio::test]
    async fn runs_directly_with_settings_expression() {
        let input = BlockInput::new("c", json!({"expression": "(12+7)*3"}));
        let out = CalculatorBlock.run(&input, &testing::ctx()).await.unwrap();
        assert_eq!(out["result"], 57.0);
    }

    #[tokio::test]
    async fn falls_back_to_trigger_expression() {
        let mut input = BlockInput::new("c", json!({}));
        input.trigger = json!({"expression": "1+1"});
        let out = CalculatorBlock.run(&input, &testing::ctx()).await.unwrap();
        assert_eq!(out["result"], 2.0);
    }

    #[tokio::test]
    async fn no_expression_anywhere_is_config_error() {
        let input = BlockInput::new("c", json!({}));
        let err = CalculatorBlock
            .run(&input, &testing::ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, BlockError::Config(_)));
    }
}
