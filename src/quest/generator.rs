use log::{debug, error, info, warn};
use serde_json::Value;

use super::provider::ProviderSettings;
use super::{extract, validate, QuestError};

/// Longest slice of unparseable model output written to the log.
const LOG_SNIPPET_CHARS: usize = 500;

/// One provider round trip per call. Holds no per-request state.
#[derive(Debug, Clone)]
pub struct QuestGenerator {
    client: reqwest::Client,
    settings: ProviderSettings,
}

impl QuestGenerator {
    pub fn new(settings: ProviderSettings) -> Self {
        Self { client: reqwest::Client::new(), settings }
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    /// Ask the provider for a quest and return the validated JSON object.
    pub async fn generate(&self, prompt: &str) -> Result<Value, QuestError> {
        if prompt.trim().is_empty() {
            return Err(QuestError::EmptyPrompt);
        }
        let provider = self.settings.kind.label();
        debug!("Requesting quest from {provider} ({})", self.settings.model);

        let request = self
            .client
            .post(self.settings.endpoint())
            .json(&self.settings.request_body(prompt));
        let response = self.settings.authorize(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("{provider} API error: {body}");
            return Err(QuestError::Upstream { provider, status: status.as_u16() });
        }

        let raw = response.text().await?;
        let data: Value = serde_json::from_str(&raw).map_err(|e| {
            error!("{provider} returned a non-JSON body: {e}");
            QuestError::MalformedResponse(provider)
        })?;
        let text = self
            .settings
            .generated_text(&data)
            .ok_or(QuestError::MalformedResponse(provider))?;

        let quest = extract::recover_json(text).map_err(|e| {
            let snippet: String = text.chars().take(LOG_SNIPPET_CHARS).collect();
            error!("Failed to parse quest JSON: {snippet}");
            e
        })?;

        validate::validate(&quest, self.settings.schema())?;
        for dangling in validate::dangling_references(&quest) {
            warn!("Quest references unknown entity: {dangling}");
        }

        let quest = validate::normalize(quest);
        if let Some(title) = quest.get("title").and_then(Value::as_str) {
            info!("Quest generated: {title}");
        }
        Ok(quest)
    }
}
