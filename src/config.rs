//! Configuration loading and management.
//!
//! Configuration is loaded with the following precedence:
//! 1. Environment variables (`THREADVAULT_*`)
//! 2. Config file (`~/.threadvault/config.toml`)
//! 3. Defaults
//!
//! The resulting [`Config`] is built once in `main` and handed to whatever
//! needs it.

use crate::core::{Format, SaveOptions};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

/// Main configuration struct.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,

    /// Remote store configuration.
    pub remote: RemoteConfig,

    /// Defaults applied when a tool call leaves options out.
    pub defaults: DefaultsConfig,

    /// Summarizer/tagger configuration.
    pub summarizer: SummarizerConfig,
}

/// Which backend tool calls use when they do not pick one.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Local directory (default).
    #[default]
    Local,

    /// Remote HTTP endpoint.
    Remote,
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            other => Err(Error::Validation(format!(
                "Unknown storage '{other}' (expected local or remote)"
            ))),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Default backend.
    pub backend: Backend,

    /// Directory holding the index and thread files.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Local,
            path: default_home().join("conversations"),
        }
    }
}

/// Remote store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL; the store talks to `{url}/conversations`. Empty disables it.
    pub url: String,

    /// Bearer token sent with every request.
    pub api_key: Option<String>,

    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: None,
            timeout_ms: 10_000,
        }
    }
}

impl RemoteConfig {
    /// Whether a remote endpoint is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

/// Defaults for tool calls.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Format for new saves.
    pub format: Format,

    /// Write the metadata block.
    pub include_metadata: bool,

    /// Write per-message timestamps.
    pub include_timestamps: bool,

    /// Result cap for searches.
    pub search_limit: usize,

    /// Result cap for listings.
    pub list_limit: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            format: Format::Json,
            include_metadata: true,
            include_timestamps: true,
            search_limit: 10,
            list_limit: 50,
        }
    }
}

impl DefaultsConfig {
    /// Save options built from these defaults.
    #[must_use]
    pub fn save_options(&self) -> SaveOptions {
        SaveOptions {
            format: self.format,
            include_metadata: self.include_metadata,
            include_timestamps: self.include_timestamps,
        }
    }
}

/// Summarizer/tagger configuration (OpenAI-compatible chat completions).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    /// Whether summaries and tags may be generated at all.
    pub enabled: bool,

    /// API base URL, without the `/chat/completions` suffix.
    pub api_base: String,

    /// API key.
    pub api_key: Option<String>,

    /// Model name.
    pub model: String,

    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            timeout_ms: 15_000,
        }
    }
}

impl SummarizerConfig {
    /// Whether the summarizer is switched on and has a key.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.enabled && self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

/// Get the default threadvault home directory.
fn default_home() -> PathBuf {
    dirs::home_dir().map_or_else(|| PathBuf::from(".threadvault"), |h| h.join(".threadvault"))
}

/// Get the threadvault home directory.
///
/// Uses `THREADVAULT_HOME` if set, otherwise `~/.threadvault`.
#[must_use]
pub fn get_home() -> PathBuf {
    env::var("THREADVAULT_HOME").map_or_else(|_| default_home(), PathBuf::from)
}

/// Load configuration with precedence: env vars → file → defaults.
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
pub fn load_config() -> Result<Config> {
    let mut config = Config::default();

    let config_path = get_config_path();
    if config_path.exists() {
        let contents = fs::read_to_string(&config_path).map_err(Error::Storage)?;
        config = toml::from_str(&contents).map_err(|e| Error::Config(e.to_string()))?;
    }

    apply_env_overrides(&mut config)?;

    Ok(config)
}

/// Get the path to the config file.
fn get_config_path() -> PathBuf {
    if let Ok(path) = env::var("THREADVAULT_CONFIG") {
        return PathBuf::from(path);
    }

    get_home().join("config.toml")
}

/// Apply environment variable overrides to config.
fn apply_env_overrides(config: &mut Config) -> Result<()> {
    // Storage
    if let Ok(path) = env::var("THREADVAULT_STORAGE_PATH") {
        config.storage.path = PathBuf::from(path);
    } else if let Ok(home) = env::var("THREADVAULT_HOME") {
        config.storage.path = PathBuf::from(home).join("conversations");
    }

    if let Ok(backend) = env::var("THREADVAULT_BACKEND") {
        config.storage.backend = backend
            .parse()
            .map_err(|e: Error| Error::Config(e.to_string()))?;
    }

    // Remote
    if let Ok(url) = env::var("THREADVAULT_REMOTE_URL") {
        config.remote.url = url;
    }

    if let Ok(key) = env::var("THREADVAULT_REMOTE_API_KEY") {
        config.remote.api_key = Some(key);
    }

    // Defaults
    if let Ok(format) = env::var("THREADVAULT_DEFAULT_FORMAT") {
        config.defaults.format = format
            .parse()
            .map_err(|e: Error| Error::Config(e.to_string()))?;
    }

    // Summarizer
    if let Ok(key) = env::var("THREADVAULT_SUMMARIZER_API_KEY") {
        config.summarizer.api_key = Some(key);
        config.summarizer.enabled = true;
    }

    if let Ok(model) = env::var("THREADVAULT_SUMMARIZER_MODEL") {
        config.summarizer.model = model;
    }

    if let Ok(base) = env::var("THREADVAULT_SUMMARIZER_API_BASE") {
        config.summarizer.api_base = base;
    }

    Ok(())
}
