//! Relay runtime configuration from environment variables

use crate::activity::ActivityObject;
use std::env;
use std::time::Duration;

#[derive(Debug)]
pub enum ConfigError {
    MissingVariable(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVariable(var) => write!(f, "Missing environment variable: {}", var),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Everything the relay binary needs besides the aggregation settings
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Root of the feed service (always ends with '/')
    pub shindig_url: String,
    /// Root of the repository, used for document URLs and the generator
    pub nuxeo_url: String,
    pub generator_id: String,
    pub generator_name: String,
    pub generator_type: String,
    /// JSONL log of delivered activities, disabled when unset
    pub activity_log_path: Option<String>,
    pub channel_buffer: usize,
    pub transport_timeout_ms: u64,
}

impl RelayConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `SHINDIG_URL` (required, http:// or https://)
    /// - `NUXEO_URL` (default: http://localhost:8080/nuxeo/)
    /// - `ACTIVITY_GENERATOR_ID` (default: nuxeo)
    /// - `ACTIVITY_GENERATOR_NAME` (default: Nuxeo)
    /// - `ACTIVITY_GENERATOR_TYPE` (default: application)
    /// - `ACTIVITY_LOG_PATH` (optional)
    /// - `EVENT_CHANNEL_BUFFER` (default: 10000)
    /// - `TRANSPORT_TIMEOUT_MS` (default: 10000)
    pub fn from_env() -> Result<Self, ConfigError> {
        let shindig_url = env::var("SHINDIG_URL")
            .map_err(|_| ConfigError::MissingVariable("SHINDIG_URL".to_string()))?;

        if !shindig_url.starts_with("http://") && !shindig_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "SHINDIG_URL must start with http:// or https://".to_string(),
            ));
        }

        let nuxeo_url = env::var("NUXEO_URL").unwrap_or_else(|_| "http://localhost:8080/nuxeo/".to_string());

        let channel_buffer = match env::var("EVENT_CHANNEL_BUFFER") {
            Ok(value) => value
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::InvalidValue(format!("EVENT_CHANNEL_BUFFER must be a positive integer, got '{}'", value)))?,
            Err(_) => 10_000,
        };

        let transport_timeout_ms = env::var("TRANSPORT_TIMEOUT_MS")
            .unwrap_or_else(|_| "10000".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidValue("TRANSPORT_TIMEOUT_MS must be a number".to_string()))?;

        Ok(Self {
            shindig_url: with_trailing_slash(shindig_url),
            nuxeo_url: with_trailing_slash(nuxeo_url),
            generator_id: env::var("ACTIVITY_GENERATOR_ID").unwrap_or_else(|_| "nuxeo".to_string()),
            generator_name: env::var("ACTIVITY_GENERATOR_NAME").unwrap_or_else(|_| "Nuxeo".to_string()),
            generator_type: env::var("ACTIVITY_GENERATOR_TYPE").unwrap_or_else(|_| "application".to_string()),
            activity_log_path: env::var("ACTIVITY_LOG_PATH").ok().filter(|p| !p.is_empty()),
            channel_buffer,
            transport_timeout_ms,
        })
    }

    pub fn transport_timeout(&self) -> Duration {
        Duration::from_millis(self.transport_timeout_ms)
    }

    /// Generator object attached to every synthesized activity
    pub fn generator(&self) -> ActivityObject {
        ActivityObject {
            id: Some(self.generator_id.clone()),
            display_name: Some(self.generator_name.clone()),
            object_type: Some(self.generator_type.clone()),
            url: Some(self.nuxeo_url.clone()),
            content: None,
        }
    }
}

fn with_trailing_slash(mut url: String) -> String {
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}
