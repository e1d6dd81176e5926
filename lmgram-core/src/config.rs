// ABOUTME: Configuration parsing from a TOML file with environment variable overrides
// ABOUTME: Validates required fields and provides defaults matching a stock LM Studio setup
use crate::inference::TranscriptFormat;
use crate::paths;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

// ─── TelegramConfig ─────────────────────────────────────────────

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
}

// Custom Debug impl to redact bot_token
impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"[REDACTED]")
            .finish()
    }
}

// ─── InferenceConfig ────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Full chat/completions URL
    #[serde(default = "default_inference_url")]
    pub url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub transcript_format: TranscriptFormat,
    /// Sent as a bearer token when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for InferenceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceConfig")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("system_prompt", &self.system_prompt)
            .field("timeout_secs", &self.timeout_secs)
            .field("transcript_format", &self.transcript_format)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            url: default_inference_url(),
            model: default_model(),
            temperature: default_temperature(),
            system_prompt: default_system_prompt(),
            timeout_secs: default_timeout_secs(),
            transcript_format: TranscriptFormat::default(),
            api_key: None,
        }
    }
}

fn default_inference_url() -> String {
    "http://localhost:1234/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "local-model".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_system_prompt() -> String {
    "You are a friendly assistant.".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

// ─── LoggingConfig ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => anyhow::bail!("Unknown log format: {} (expected \"pretty\" or \"json\")", s),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    /// Also write daily-rotated log files under the data directory
    #[serde(default)]
    pub file: bool,
}

// ─── MetricsConfig ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Address for the Prometheus scrape endpoint; disabled when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listen: Option<SocketAddr>,
}

impl Config {
    fn find_config_file() -> Option<PathBuf> {
        // LMGRAM_CONFIG_PATH first (useful for testing and deployment)
        if let Ok(env_path) = std::env::var("LMGRAM_CONFIG_PATH") {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                return Some(path);
            }
        }

        let local_config = PathBuf::from("config.toml");
        if local_config.exists() {
            return Some(local_config);
        }

        let xdg_config = paths::config_file();
        if xdg_config.exists() {
            return Some(xdg_config);
        }

        None
    }

    /// Load configuration with environment variable overrides.
    /// Searches: LMGRAM_CONFIG_PATH, ./config.toml, then ~/.config/lmgram/config.toml
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Like `load`, but an explicit path must exist and wins over the search
    pub fn load_from(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => {
                if !p.exists() {
                    anyhow::bail!("Config file not found: {}", p.display());
                }
                Some(p.to_path_buf())
            }
            None => Self::find_config_file(),
        };

        let mut config = if let Some(config_path) = path {
            tracing::info!(path = %config_path.display(), "Loading configuration from file");
            Self::from_file(&config_path)?
        } else {
            tracing::info!("No config file found, using environment variables and defaults");
            Config::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str::<Config>(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = val;
            // Clear from environment to prevent exposure via /proc or ps
            std::env::remove_var("TELEGRAM_BOT_TOKEN");
        }
        if let Ok(val) = std::env::var("INFERENCE_URL") {
            self.inference.url = val;
        }
        if let Ok(val) = std::env::var("INFERENCE_MODEL") {
            self.inference.model = val;
        }
        if let Ok(val) = std::env::var("INFERENCE_TEMPERATURE") {
            self.inference.temperature = val.parse().with_context(|| {
                format!("INFERENCE_TEMPERATURE must be a number, got: {}", val)
            })?;
        }
        if let Ok(val) = std::env::var("INFERENCE_TIMEOUT_SECS") {
            self.inference.timeout_secs = val.parse().with_context(|| {
                format!("INFERENCE_TIMEOUT_SECS must be a whole number, got: {}", val)
            })?;
        }
        if let Ok(val) = std::env::var("INFERENCE_API_KEY") {
            self.inference.api_key = Some(val);
        }
        if let Ok(val) = std::env::var("LOG_FORMAT") {
            self.logging.format = val.parse()?;
        }
        if let Ok(val) = std::env::var("METRICS_LISTEN") {
            self.metrics.listen = Some(val.parse().with_context(|| {
                format!("METRICS_LISTEN must be a socket address, got: {}", val)
            })?);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            anyhow::bail!(
                "telegram.bot_token is required (set in config.toml or TELEGRAM_BOT_TOKEN env var)"
            );
        }
        let url = self.inference.url.trim();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            anyhow::bail!(
                "inference.url must be an http(s) URL, got: {}",
                self.inference.url
            );
        }
        if self.inference.model.trim().is_empty() {
            anyhow::bail!("inference.model must not be empty");
        }
        if !(0.0..=2.0).contains(&self.inference.temperature) {
            anyhow::bail!(
                "inference.temperature must be between 0.0 and 2.0, got: {}",
                self.inference.temperature
            );
        }
        if self.inference.timeout_secs == 0 {
            anyhow::bail!("inference.timeout_secs must be greater than zero");
        }
        Ok(())
    }
}
