use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Top-level configuration for the panel core.
///
/// Loaded from an optional `partnerlink.toml` plus `PARTNERLINK_*` environment
/// overrides (`PARTNERLINK_POLLING__MESSAGE_INTERVAL_SECS=2` etc).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PanelConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub messages: MessageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Bearer token for the remote partnership service, if it requires one.
    #[serde(default)]
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_message_interval")]
    pub message_interval_secs: u64,

    #[serde(default = "default_meeting_interval")]
    pub meeting_interval_secs: u64,

    #[serde(default = "default_countdown_tick")]
    pub countdown_tick_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageConfig {
    /// Fetch window for one refresh. The synchronizer never drops a message
    /// the remote stopped returning unless the window covers it.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json_format: bool,
}

fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_message_interval() -> u64 {
    5
}

fn default_meeting_interval() -> u64 {
    10
}

fn default_countdown_tick() -> u64 {
    1000
}

fn default_page_size() -> usize {
    50
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
            auth_token: None,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            message_interval_secs: default_message_interval(),
            meeting_interval_secs: default_meeting_interval(),
            countdown_tick_ms: default_countdown_tick(),
        }
    }
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl PanelConfig {
    /// Load configuration from `partnerlink.toml` (optional) and environment
    /// variables with the `PARTNERLINK_` prefix.
    pub fn load() -> Result<Self, ConfigLoadError> {
        dotenvy::dotenv().ok();

        let builder = ConfigBuilder::builder()
            .add_source(File::with_name("partnerlink").required(false))
            .add_source(Environment::with_prefix("PARTNERLINK").separator("__"))
            .build()?;

        let config: PanelConfig = builder.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate interval and fetch-window settings.
    ///
    /// Messages must be polled at least as often as meetings; the 5s/10s
    /// defaults give the reference 1:2 ratio.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigLoadError::InvalidValue {
                key: "api.base_url".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.polling.message_interval_secs == 0 || self.polling.meeting_interval_secs == 0 {
            return Err(ConfigLoadError::InvalidValue {
                key: "polling".to_string(),
                message: "poll intervals must be at least one second".to_string(),
            });
        }
        if self.polling.message_interval_secs > self.polling.meeting_interval_secs {
            return Err(ConfigLoadError::InvalidValue {
                key: "polling.message_interval_secs".to_string(),
                message: "messages must be polled at least as often as meetings".to_string(),
            });
        }
        if self.polling.countdown_tick_ms == 0 {
            return Err(ConfigLoadError::InvalidValue {
                key: "polling.countdown_tick_ms".to_string(),
                message: "countdown tick must be non-zero".to_string(),
            });
        }
        if self.messages.page_size == 0 {
            return Err(ConfigLoadError::InvalidValue {
                key: "messages.page_size".to_string(),
                message: "page size must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PanelConfig::default();
        assert_eq!(config.polling.message_interval_secs, 5);
        assert_eq!(config.polling.meeting_interval_secs, 10);
        assert_eq!(config.polling.countdown_tick_ms, 1000);
        assert_eq!(config.messages.page_size, 50);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_message_interval_must_not_exceed_meeting_interval() {
        let mut config = PanelConfig::default();
        config.polling.message_interval_secs = 20;
        assert!(config.validate().is_err());

        // Equal intervals are allowed; only the relative ordering is required.
        config.polling.message_interval_secs = 10;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_intervals_rejected() {
        let mut config = PanelConfig::default();
        config.polling.message_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = PanelConfig::default();
        config.polling.countdown_tick_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_base_url_rejected() {
        let mut config = PanelConfig::default();
        config.api.base_url = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let mut config = PanelConfig::default();
        config.messages.page_size = 0;
        assert!(config.validate().is_err());
    }
}
