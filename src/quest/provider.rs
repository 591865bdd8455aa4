//! The interchangeable generation backends and their wire formats.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::prompt;
use super::validate::Schema;
use super::QuestError;
use crate::config::ProviderConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    Groq,
    OpenRouter,
}

impl ProviderKind {
    /// Selection order when several credentials are configured.
    pub const ALL: [ProviderKind; 3] = [ProviderKind::Gemini, ProviderKind::Groq, ProviderKind::OpenRouter];

    pub fn label(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "Gemini",
            ProviderKind::Groq => "Groq",
            ProviderKind::OpenRouter => "OpenRouter",
        }
    }

    pub fn env_var(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "GEMINI_API_KEY",
            ProviderKind::Groq => "GROQ_API_KEY",
            ProviderKind::OpenRouter => "OPENROUTER_API_KEY",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com",
            ProviderKind::Groq => "https://api.groq.com",
            ProviderKind::OpenRouter => "https://openrouter.ai",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini-2.5-flash",
            ProviderKind::Groq => "llama-3.3-70b-versatile",
            ProviderKind::OpenRouter => "meta-llama/llama-3.3-70b-instruct:free",
        }
    }

    pub fn default_temperature(self) -> f64 {
        match self {
            ProviderKind::Gemini => 0.6,
            ProviderKind::Groq | ProviderKind::OpenRouter => 0.8,
        }
    }

    pub fn default_max_tokens(self) -> u32 {
        match self {
            ProviderKind::Gemini => 3000,
            ProviderKind::Groq | ProviderKind::OpenRouter => 4000,
        }
    }

    pub fn schema(self) -> Schema {
        match self {
            ProviderKind::Gemini => Schema::SingleMap,
            ProviderKind::Groq | ProviderKind::OpenRouter => Schema::MultiMap,
        }
    }

    fn configured_key(self, config: &ProviderConfig) -> Option<&str> {
        let key = match self {
            ProviderKind::Gemini => &config.gemini_api_key,
            ProviderKind::Groq => &config.groq_api_key,
            ProviderKind::OpenRouter => &config.openrouter_api_key,
        };
        key.as_deref()
    }
}

/// Everything needed to talk to one provider.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub api_key: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub base_url: String,
    pub language: String,
}

impl ProviderSettings {
    /// Resolve the provider from the config, with credentials from the
    /// process environment taking precedence over the file.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, QuestError> {
        Self::resolve(config, |name| std::env::var(name).ok())
    }

    /// Resolve with an explicit environment lookup.
    ///
    /// A pinned `kind` only considers that provider; otherwise the first
    /// provider in [`ProviderKind::ALL`] with a non-empty key wins.
    pub fn resolve(config: &ProviderConfig, env: impl Fn(&str) -> Option<String>) -> Result<Self, QuestError> {
        let candidates: Vec<ProviderKind> = match config.kind {
            Some(kind) => vec![kind],
            None => ProviderKind::ALL.to_vec(),
        };

        let found = candidates.iter().find_map(|&kind| {
            env(kind.env_var())
                .filter(|k| !k.trim().is_empty())
                .or_else(|| kind.configured_key(config).filter(|k| !k.trim().is_empty()).map(str::to_string))
                .map(|key| (kind, key))
        });

        let Some((kind, api_key)) = found else {
            let names: Vec<&str> = candidates.iter().map(|k| k.env_var()).collect();
            return Err(QuestError::MissingCredential(names.join(" / ")));
        };

        Ok(Self {
            kind,
            api_key,
            model: config.model.clone().unwrap_or_else(|| kind.default_model().to_string()),
            temperature: config.temperature.unwrap_or_else(|| kind.default_temperature()),
            max_tokens: config.max_tokens.unwrap_or_else(|| kind.default_max_tokens()),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| kind.default_base_url().to_string())
                .trim_end_matches('/')
                .to_string(),
            language: config.language.clone(),
        })
    }

    pub fn schema(&self) -> Schema {
        self.kind.schema()
    }

    /// Full URL of the generation endpoint, without credentials.
    pub fn endpoint(&self) -> String {
        match self.kind {
            ProviderKind::Gemini => format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model),
            ProviderKind::Groq => format!("{}/openai/v1/chat/completions", self.base_url),
            ProviderKind::OpenRouter => format!("{}/api/v1/chat/completions", self.base_url),
        }
    }

    pub fn request_body(&self, user_prompt: &str) -> Value {
        match self.kind {
            ProviderKind::Gemini => json!({
                "contents": [{
                    "parts": [{ "text": prompt::single_map_instruction(user_prompt, &self.language) }]
                }],
                "generationConfig": {
                    "temperature": self.temperature,
                    "maxOutputTokens": self.max_tokens,
                }
            }),
            ProviderKind::Groq | ProviderKind::OpenRouter => json!({
                "model": self.model,
                "messages": [
                    { "role": "system", "content": prompt::multi_map_system(&self.language) },
                    { "role": "user", "content": user_prompt }
                ],
                "temperature": self.temperature,
                "max_tokens": self.max_tokens,
            }),
        }
    }

    /// Attach the provider's authentication to a request.
    pub fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.kind {
            ProviderKind::Gemini => request.query(&[("key", self.api_key.as_str())]),
            ProviderKind::Groq | ProviderKind::OpenRouter => request.bearer_auth(&self.api_key),
        }
    }

    /// The generated text inside a provider response.
    pub fn generated_text<'a>(&self, response: &'a Value) -> Option<&'a str> {
        let text = match self.kind {
            ProviderKind::Gemini => response.pointer("/candidates/0/content/parts/0/text"),
            ProviderKind::Groq | ProviderKind::OpenRouter => response.pointer("/choices/0/message/content"),
        };
        text?.as_str()
    }
}
