//! Deterministic keyless chat model.
//!
//! When no provider API key is configured the engine still has to be
//! able to execute workflows — offline tests and local development
//! depend on it. `OfflineChatModel` speaks just enough of the
//! `Action / Action Input / Observation / Final Answer` protocol to
//! drive the internal ReAct loop to a deterministic conclusion:
//!
//! - a transcript whose last user turn carries an `Observation:` gets
//!   that observation echoed back as the final answer (numeric
//!   `result` fields are unwrapped)
//! - a fresh prompt with a calculator in the tool inventory and an
//!   arithmetic expression in the text triggers a calculator action
//! - anything else is answered with the upper-cased prompt
//!
//! The same instance never calls the network.

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use weave_core::llm::{ChatModel, ChatRequest, ChatResponse, LlmError};

pub struct OfflineChatModel {
    expression: Regex,
}

impl OfflineChatModel {
    pub fn new() -> Self {
        Self {
            // Candidate arithmetic spans; filtered below for a digit
            // plus at least one operator.
            expression: Regex::new(r"[-+*/%().\d\s]+").expect("static regex"),
        }
    }

    fn extract_expression(&self, text: &str) -> Option<String> {
        self.expression
            .find_iter(text)
            .map(|m| m.as_str().trim().to_string())
            .filter(|candidate| {
                candidate.chars().any(|c| c.is_ascii_digit())
                    && candidate.chars().any(|c| "+-*/%".contains(c))
            })
            .max_by_key(String::len)
    }

    fn tool_names(system: &str) -> Vec<String> {
        system
            .lines()
            .filter_map(|line| {
                let line = line.trim();
                let rest = line.strip_prefix("- ")?;
                Some(rest.split(':').next().unwrap_or(rest).trim().to_string())
            })
            .filter(|name| !name.is_empty())
            .collect()
    }

    fn final_from_observation(observation: &str) -> String {
        if let Ok(value) = serde_json::from_str::<Value>(observation) {
            if let Some(result) = value.get("result") {
                return scalar_to_string(result);
            }
            if let Some(text) = value.get("text").and_then(Value::as_str) {
                return text.to_string();
            }
            if let Value::String(s) = value {
                return s;
            }
        }
        observation.trim().to_string()
    }
}

impl Default for OfflineChatModel {
    fn default() -> Self {
        Self::new()
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    return format!("{}", f as i64);
                }
            }
            n.to_string()
        }
        other => other.to_string(),
    }
}

#[async_trait]
impl ChatModel for OfflineChatModel {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        let last_user = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        // Second half of a tool round trip: close it out.
        if let Some(idx) = last_user.find("Observation:") {
            let observation = last_user[idx + "Observation:".len()..].trim();
            let text = Self::final_from_observation(observation);
            return Ok(ChatResponse {
                text: format!("Final Answer: {text}"),
            });
        }

        let system = request
            .messages
            .iter()
            .find(|m| m.role == "system")
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        let calculator = Self::tool_names(system)
            .into_iter()
            .find(|name| name.to_lowercase().contains("calc"));

        if let Some(tool) = calculator {
            if let Some(expression) = self.extract_expression(last_user) {
                return Ok(ChatResponse {
                    text: format!("Action: {tool}\nAction Input: {expression}"),
                });
            }
        }

        Ok(ChatResponse {
            text: format!("Final Answer: {}", last_user.to_uppercase()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_core::llm::ChatMessage;

    fn system_with_tools() -> ChatMessage {
        ChatMessage::system(
            "You are a helpful assistant.\nAvailable tools:\n- calculator: call with JSON input.\nUse the protocol.",
        )
    }

    #[tokio::test]
    async fn calls_calculator_when_prompt_has_expression() {
        let model = OfflineChatModel::new();
        let response = model
            .chat(ChatRequest::new(vec![
                system_with_tools(),
                ChatMessage::user("compute (12+7)*3"),
            ]))
            .await
            .unwrap();
        assert!(response.text.starts_with("Action: calculator"));
        assert!(response.text.contains("(12+7)*3"));
    }

    #[tokio::test]
    async fn closes_loop_from_observation() {
        let model = OfflineChatModel::new();
        let response = model
            .chat(ChatRequest::new(vec![
                system_with_tools(),
                ChatMessage::user("compute (12+7)*3"),
                ChatMessage::assistant("Action: calculator\nAction Input: (12+7)*3"),
                ChatMessage::user("Observation: {\"result\":57.0}"),
            ]))
            .await
            .unwrap();
        assert_eq!(response.text, "Final Answer: 57");
    }

    #[tokio::test]
    async fn falls_back_to_uppercase_answer() {
        let model = OfflineChatModel::new();
        let response = model
            .chat(ChatRequest::new(vec![ChatMessage::user("hello there")]))
            .await
            .unwrap();
        assert_eq!(response.text, "Final Answer: HELLO THERE");
    }

    #[test]
    fn expression_extraction_ignores_plain_numbers() {
        let model = OfflineChatModel::new();
        assert_eq!(model.extract_expression("what is 2 plus two"), None);
        assert_eq!(
            model.extract_expression("compute (12+7)*3 please").as_deref(),
            Some("(12+7)*3")
        );
    }
}
