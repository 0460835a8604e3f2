use crate::api::predict::PredictEndpoint;
use anyhow::{Context, Result};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_CHAT_PATH: &str = "/api/chat/message";
pub const DEFAULT_STORE_PATH: &str = "cache/session.json";
pub const DEFAULT_WEB_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Runtime settings, read from the environment (and `.env`)
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub chat_path: String,
    pub predict_endpoint: PredictEndpoint,
    pub timeout: Duration,
    pub store_path: String,
    pub web_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            chat_path: DEFAULT_CHAT_PATH.to_string(),
            predict_endpoint: PredictEndpoint::Simple,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            store_path: DEFAULT_STORE_PATH.to_string(),
            web_addr: DEFAULT_WEB_ADDR.to_string(),
        }
    }
}

impl Config {
    /// Load settings from `SCORESIGHT_*` environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let predict_endpoint = match lookup("SCORESIGHT_PREDICT_ENDPOINT") {
            Some(value) => value
                .parse()
                .context("SCORESIGHT_PREDICT_ENDPOINT must be simple, detailed or ai-fixed")?,
            None => defaults.predict_endpoint,
        };

        let timeout = match lookup("SCORESIGHT_TIMEOUT_SECS") {
            Some(value) => Duration::from_secs(
                value
                    .trim()
                    .parse()
                    .context("SCORESIGHT_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            None => defaults.timeout,
        };

        Ok(Self {
            api_url: lookup("SCORESIGHT_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_url),
            chat_path: lookup("SCORESIGHT_CHAT_PATH").unwrap_or(defaults.chat_path),
            predict_endpoint,
            timeout,
            store_path: lookup("SCORESIGHT_STORE").unwrap_or(defaults.store_path),
            web_addr: lookup("SCORESIGHT_ADDR").unwrap_or(defaults.web_addr),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.predict_endpoint, PredictEndpoint::Simple);
        assert_eq!(config.timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("SCORESIGHT_API_URL", "http://backend:5000/"),
            ("SCORESIGHT_PREDICT_ENDPOINT", "ai-fixed"),
            ("SCORESIGHT_TIMEOUT_SECS", "3"),
            ("SCORESIGHT_CHAT_PATH", "/chat"),
        ]
        .into_iter()
        .collect();
        let config = Config::from_lookup(|key| env.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.api_url, "http://backend:5000");
        assert_eq!(config.predict_endpoint, PredictEndpoint::AiFixed);
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.chat_path, "/chat");
    }

    #[test]
    fn test_bad_endpoint_is_an_error() {
        let result = Config::from_lookup(|key| {
            (key == "SCORESIGHT_PREDICT_ENDPOINT").then(|| "telepathy".to_string())
        });
        assert!(result.is_err());
    }
}
