//! TOML configuration for the proxy server and the game client.
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:3000"
//!
//! [provider]
//! # kind = "groq"            # pin one provider; otherwise Gemini, Groq, OpenRouter
//! # groq_api_key = "..."     # GROQ_API_KEY in the environment wins
//! language = "Italian"
//!
//! [client]
//! proxy_url = "http://127.0.0.1:3000/api/generate-quest"
//! tileset = "tiny-dungeon"
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Every section and field has a default, so an empty file is valid.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::assets;
use crate::motion::{DEFAULT_BLOCKING_TILES, DEFAULT_SPEED};
use crate::quest::ProviderKind;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub client: ClientConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: "127.0.0.1:3000".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ProviderKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groq_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openrouter_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Overrides the provider's API origin, e.g. for a local stand-in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Language requested for player-facing quest text.
    pub language: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: None,
            gemini_api_key: None,
            groq_api_key: None,
            openrouter_api_key: None,
            model: None,
            temperature: None,
            max_tokens: None,
            base_url: None,
            language: "Italian".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub proxy_url: String,
    pub window_width: u32,
    pub window_height: u32,
    pub tileset: String,
    pub player_sprite: String,
    /// Pixels per update while walking between tiles.
    pub player_speed: f32,
    pub blocking_tiles: Vec<i32>,
    pub default_prompt: String,
    /// Local copy of the asset CDN; fetched over HTTP when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_dir: Option<PathBuf>,
    /// Fixed simulation updates per second.
    pub ups: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            proxy_url: "http://127.0.0.1:3000/api/generate-quest".to_string(),
            window_width: 800,
            window_height: 600,
            tileset: "tiny-dungeon".to_string(),
            player_sprite: "hero".to_string(),
            player_speed: DEFAULT_SPEED,
            blocking_tiles: DEFAULT_BLOCKING_TILES.to_vec(),
            default_prompt: "A short dungeon adventure to rescue a lost villager".to_string(),
            asset_dir: None,
            ups: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), file: None }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn create_default(path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(&Config::default())
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;
        fs::write(path, content).with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.bind_addr()?;
        if assets::tileset(&self.client.tileset).is_none() {
            bail!("Unknown tileset '{}'", self.client.tileset);
        }
        if assets::sprite(&self.client.player_sprite).is_none() {
            bail!("Unknown player sprite '{}'", self.client.player_sprite);
        }
        if self.client.player_speed.is_nan() || self.client.player_speed <= 0.0 {
            bail!("client.player_speed must be positive");
        }
        if self.client.ups == 0 {
            bail!("client.ups must be at least 1");
        }
        if self.client.window_width == 0 || self.client.window_height == 0 {
            bail!("client window size must be non-zero");
        }
        if let Some(t) = self.provider.temperature {
            if !(0.0..=2.0).contains(&t) {
                bail!("provider.temperature must be within 0.0..=2.0");
            }
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server
            .bind
            .parse()
            .map_err(|e| anyhow!("Invalid server.bind '{}': {}", self.server.bind, e))
    }
}
