use crate::errors::{BrowserError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub browser: BrowserConfig,
    pub wait: WaitConfig,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    pub viewport: Viewport,
    pub user_agent: Option<String>,
    pub disable_images: bool,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Timeout and poll interval for a bounded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    pub timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl WaitConfig {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout_ms: timeout.as_millis() as u64,
            poll_interval_ms: poll_interval.as_millis() as u64,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval_ms = poll_interval.as_millis() as u64;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.wait.poll_interval_ms == 0 {
            return Err(BrowserError::ConfigurationError(
                "wait.poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if let Some(base_url) = &self.base_url {
            url::Url::parse(base_url).map_err(|e| {
                BrowserError::ConfigurationError(format!("invalid base_url '{}': {}", base_url, e))
            })?;
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser: BrowserConfig::default(),
            wait: WaitConfig::default(),
            base_url: None,
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport: Viewport::default(),
            user_agent: None,
            disable_images: false,
            args: vec![],
        }
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_thirty_seconds_and_half_second_poll() {
        let wait = WaitConfig::default();
        assert_eq!(wait.timeout(), Duration::from_secs(30));
        assert_eq!(wait.poll_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{"base_url": "https://example.com", "wait": {"timeout_ms": 2000}}"#;
        let config = Config::from_json(json).unwrap();
        assert_eq!(config.wait.timeout(), Duration::from_secs(2));
        assert_eq!(config.wait.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert!(config.browser.headless);
    }

    #[test]
    fn test_validate_rejects_bad_base_url_and_zero_poll() {
        assert!(matches!(
            Config::from_json(r#"{"base_url": "not a url"}"#),
            Err(BrowserError::ConfigurationError(_))
        ));
        assert!(matches!(
            Config::from_json(r#"{"wait": {"poll_interval_ms": 0}}"#),
            Err(BrowserError::ConfigurationError(_))
        ));
    }
}
