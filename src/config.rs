//! Scraper configuration
//!
//! Every field has a default, so a partial TOML file (or none at all) is valid.
//! Environment variables override the file.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// WebDriver endpoint (chromedriver / geckodriver)
    #[serde(default = "ScraperConfig::default_webdriver_url")]
    pub webdriver_url: String,

    /// Entry-list page; the race id is appended as a query parameter
    #[serde(default = "ScraperConfig::default_entry_url")]
    pub entry_url: String,

    /// Bound on every wait, in seconds
    #[serde(default = "ScraperConfig::default_timeout_secs")]
    pub timeout_secs: u64,

    /// Delay between presence checks while waiting
    #[serde(default = "ScraperConfig::default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "ScraperConfig::default_user_agent")]
    pub user_agent: String,

    #[serde(default = "ScraperConfig::default_headless")]
    pub headless: bool,

    /// Follow handler links to read full names
    #[serde(default = "ScraperConfig::default_resolve_handlers")]
    pub resolve_handlers: bool,
}

impl ScraperConfig {
    fn default_webdriver_url() -> String {
        "http://localhost:4444".to_string()
    }

    fn default_entry_url() -> String {
        "https://race.netkeiba.com/race/shutuba.html".to_string()
    }

    const fn default_timeout_secs() -> u64 {
        10
    }

    const fn default_poll_interval_ms() -> u64 {
        250
    }

    fn default_user_agent() -> String {
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
    }

    const fn default_headless() -> bool {
        true
    }

    const fn default_resolve_handlers() -> bool {
        true
    }

    /// Load from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Apply `SHUTUBA_WEBDRIVER_URL` and `SHUTUBA_TIMEOUT_SECS`
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("SHUTUBA_WEBDRIVER_URL") {
            self.webdriver_url = url;
        }
        if let Some(value) = lookup("SHUTUBA_TIMEOUT_SECS") {
            self.timeout_secs = value.parse().map_err(|_| ConfigError::InvalidEnv {
                name: "SHUTUBA_TIMEOUT_SECS",
                value,
            })?;
        }
        Ok(self)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            webdriver_url: Self::default_webdriver_url(),
            entry_url: Self::default_entry_url(),
            timeout_secs: Self::default_timeout_secs(),
            poll_interval_ms: Self::default_poll_interval_ms(),
            user_agent: Self::default_user_agent(),
            headless: Self::default_headless(),
            resolve_handlers: Self::default_resolve_handlers(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = ScraperConfig::default();
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert!(config.resolve_handlers);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ScraperConfig::from_toml(
            r#"
            webdriver_url = "http://127.0.0.1:9515"
            timeout_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.webdriver_url, "http://127.0.0.1:9515");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.entry_url, ScraperConfig::default().entry_url);
        assert!(config.headless);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(ScraperConfig::from_toml("timeout_secs = \"soon\"").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let config = ScraperConfig::default()
            .with_overrides(|name| match name {
                "SHUTUBA_WEBDRIVER_URL" => Some("http://driver:4444".to_string()),
                "SHUTUBA_TIMEOUT_SECS" => Some("3".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.webdriver_url, "http://driver:4444");
        assert_eq!(config.timeout_secs, 3);

        let err = ScraperConfig::default()
            .with_overrides(|name| {
                (name == "SHUTUBA_TIMEOUT_SECS").then(|| "ten".to_string())
            })
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }
}
