use log::debug;
use serde_json::{json, Value};

use super::{Quest, QuestError};

/// Game-side caller of the `/api/generate-quest` proxy.
#[derive(Debug, Clone)]
pub struct QuestClient {
    client: reqwest::Client,
    endpoint: String,
}

impl QuestClient {
    pub fn new(endpoint: &str) -> Self {
        Self { client: reqwest::Client::new(), endpoint: endpoint.to_string() }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn request(&self, prompt: &str) -> Result<Quest, QuestError> {
        if prompt.trim().is_empty() {
            return Err(QuestError::EmptyPrompt);
        }
        debug!("Requesting quest from {}", self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "prompt": prompt }))
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        if status != 200 {
            return Err(QuestError::Proxy { status, message: error_message(&text) });
        }
        let body: Value = serde_json::from_str(&text)?;
        Ok(Quest::from_value(body)?)
    }
}

/// Error bodies look like `{"error": ..., "details": ...}`; anything else
/// (a gateway page, plain text) is passed through trimmed.
fn error_message(text: &str) -> String {
    let Ok(body) = serde_json::from_str::<Value>(text) else {
        return text.trim().to_string();
    };
    match (body.get("error").and_then(Value::as_str), body.get("details").and_then(Value::as_str)) {
        (Some(error), Some(details)) => format!("{error}: {details}"),
        (Some(error), None) => error.to_string(),
        _ => body.to_string(),
    }
}
