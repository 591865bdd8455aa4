//! Recovering a JSON object from free-form model output.
//!
//! Models often wrap their answer in a markdown fence or surround it with
//! chatter. Each [`Strategy`] is one way of digging the object out; they are
//! tried in order and the first success wins.

use std::fmt;

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// The whole text is the JSON object.
    Direct,
    /// The object sits in a ```` ```json ```` (or bare ```` ``` ````) fence.
    FencedBlock,
    /// The object is the span from the first `{` to the last `}`.
    BraceScan,
}

pub const DEFAULT_STRATEGIES: [Strategy; 3] = [Strategy::Direct, Strategy::FencedBlock, Strategy::BraceScan];

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Direct => "direct parse",
            Strategy::FencedBlock => "fenced block",
            Strategy::BraceScan => "brace scan",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub strategy: Strategy,
    pub reason: String,
}

/// Every strategy failed. Carries each attempt's reason, in order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid JSON response from AI ({})", describe(.attempts))]
pub struct ExtractError {
    pub attempts: Vec<Attempt>,
}

fn describe(attempts: &[Attempt]) -> String {
    attempts
        .iter()
        .map(|a| format!("{}: {}", a.strategy, a.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

fn parse_object(text: &str) -> Result<Value, String> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(other) => Err(format!("expected a JSON object, found {}", kind_of(&other))),
        Err(e) => Err(e.to_string()),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Every complete fenced block as `(info string, body)`, in order.
fn fenced_blocks(text: &str) -> Vec<(&str, &str)> {
    let mut blocks = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find("```") {
        let after = &rest[open + 3..];
        let Some(close) = after.find("```") else { break };
        let inner = &after[..close];
        let info_len = inner
            .find(|c: char| !(c.is_ascii_alphanumeric() || "-+._".contains(c)))
            .unwrap_or(inner.len());
        blocks.push(inner.split_at(info_len));
        rest = &after[close + 3..];
    }
    blocks
}

fn extract_fenced(text: &str) -> Result<Value, String> {
    let blocks = fenced_blocks(text);
    // A ```json block wins over a bare one, which wins over anything else.
    let block = blocks
        .iter()
        .find(|(info, _)| info.eq_ignore_ascii_case("json"))
        .or_else(|| blocks.iter().find(|(info, _)| info.is_empty()))
        .or_else(|| blocks.first());
    match block {
        Some((_, body)) => parse_object(body),
        None => Err("no fenced code block".to_string()),
    }
}

fn extract_braces(text: &str) -> Result<Value, String> {
    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        return Err("no braces found".to_string());
    };
    if end < start {
        return Err("no braces found".to_string());
    }
    parse_object(&text[start..=end])
}

impl Strategy {
    pub fn extract(self, text: &str) -> Result<Value, String> {
        match self {
            Strategy::Direct => parse_object(text),
            Strategy::FencedBlock => extract_fenced(text),
            Strategy::BraceScan => extract_braces(text),
        }
    }
}

/// Try `strategies` in order; first success wins.
pub fn recover_json_with(text: &str, strategies: &[Strategy]) -> Result<Value, ExtractError> {
    let mut attempts = Vec::with_capacity(strategies.len());
    for &strategy in strategies {
        match strategy.extract(text) {
            Ok(value) => return Ok(value),
            Err(reason) => attempts.push(Attempt { strategy, reason }),
        }
    }
    Err(ExtractError { attempts })
}

pub fn recover_json(text: &str) -> Result<Value, ExtractError> {
    recover_json_with(text, &DEFAULT_STRATEGIES)
}
