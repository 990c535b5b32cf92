//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Provider read API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Announcement text settings
    #[serde(default)]
    pub message: MessageConfig,

    /// External publish command
    #[serde(default)]
    pub publisher: PublisherConfig,

    /// Retry budget and failure policy
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// File locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        let base = Url::parse(&self.api.base_url)?;
        if base.cannot_be_a_base() {
            return Err(AppError::validation("api.base_url cannot be a base URL"));
        }
        if self.api.user_agent.trim().is_empty() {
            return Err(AppError::validation("api.user_agent is empty"));
        }
        if self.api.timeout_secs == 0 {
            return Err(AppError::validation("api.timeout_secs must be > 0"));
        }
        if self.publisher.command.is_empty() || self.publisher.command[0].trim().is_empty() {
            return Err(AppError::validation("publisher.command is empty"));
        }
        if self.publisher.timeout_secs == Some(0) {
            return Err(AppError::validation("publisher.timeout_secs must be > 0"));
        }
        if self.delivery.max_attempts == 0 {
            return Err(AppError::validation("delivery.max_attempts must be > 0"));
        }
        if !self.message.template.contains("{name}") {
            return Err(AppError::validation(
                "message.template must contain {name}",
            ));
        }
        if self.paths.checkpoint_file.trim().is_empty() {
            return Err(AppError::validation("paths.checkpoint_file is empty"));
        }
        Ok(())
    }
}

/// Provider read API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL the `areas`, `events` and `elements` endpoints hang off
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Announcement text settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageConfig {
    /// Template with `{community}`, `{name}` and `{link}` placeholders
    #[serde(default = "defaults::template")]
    pub template: String,

    /// Prefix of the public merchant page, the element id is appended
    #[serde(default = "defaults::merchant_url")]
    pub merchant_url: String,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            template: defaults::template(),
            merchant_url: defaults::merchant_url(),
        }
    }
}

/// External publish command settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Program and leading arguments; the message is appended as one argument
    #[serde(default = "defaults::command")]
    pub command: Vec<String>,

    /// Per-invocation timeout in seconds (none by default)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            command: defaults::command(),
            timeout_secs: None,
        }
    }
}

/// Retry budget and failure policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Total attempts per message (and per provider lookup)
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Pause between attempts in milliseconds
    #[serde(default)]
    pub retry_delay_ms: u64,

    /// Exit non-zero when the checkpoint could not be advanced
    #[serde(default)]
    pub fail_on_partial: bool,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            retry_delay_ms: 0,
            fail_on_partial: false,
        }
    }
}

/// File locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "defaults::checkpoint_file")]
    pub checkpoint_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            checkpoint_file: defaults::checkpoint_file(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    // API defaults
    pub fn base_url() -> String {
        "https://api.btcmap.org/v2/".into()
    }
    pub fn user_agent() -> String {
        concat!("btcmap-notifier/", env!("CARGO_PKG_VERSION")).into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Message defaults
    pub fn template() -> String {
        "A new business accepting Bitcoin in {community}! {name} {link}".into()
    }
    pub fn merchant_url() -> String {
        "https://btcmap.org/merchant/".into()
    }

    // Publisher defaults
    pub fn command() -> Vec<String> {
        vec!["noscl".into(), "publish".into()]
    }

    pub fn max_attempts() -> u32 {
        3
    }

    pub fn checkpoint_file() -> String {
        ".last_execution_time".into()
    }

    pub fn log_level() -> String {
        "info".into()
    }
}
