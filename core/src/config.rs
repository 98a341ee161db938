//! Client configuration.
//!
//! A `ClientConfig` can be built in code, deserialized (every field is
//! optional), or read from `ALGORITHMIA_*` environment variables.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::client::{BASE_URL, DEFAULT_REQUEST_TIMEOUT};
use crate::error::SdkError;
use crate::transport::TransportChoice;

pub const ENV_API_KEY: &str = "ALGORITHMIA_API_KEY";
pub const ENV_API_URL: &str = "ALGORITHMIA_API";
pub const ENV_TRANSPORT: &str = "ALGORITHMIA_TRANSPORT";
pub const ENV_TIMEOUT: &str = "ALGORITHMIA_TIMEOUT";
pub const ENV_CA_BUNDLE: &str = "ALGORITHMIA_CA_BUNDLE";
pub const ENV_DEBUG: &str = "ALGORITHMIA_DEBUG";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Key sent as `Authorization: Simple <key>`. Required.
    pub default_access_token: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
    /// Transport to build; detected when absent.
    pub transport: Option<TransportChoice>,
    pub debug: bool,
    /// CA bundle for peer verification (curl transport only).
    pub ca_bundle: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_access_token: None,
            base_url: BASE_URL.to_string(),
            timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            transport: None,
            debug: false,
            ca_bundle: None,
        }
    }
}

impl ClientConfig {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            default_access_token: Some(access_token.into()),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, SdkError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SdkError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        config.default_access_token = get(ENV_API_KEY);
        if let Some(url) = get(ENV_API_URL) {
            config.base_url = url;
        }
        if let Some(choice) = get(ENV_TRANSPORT) {
            config.transport = Some(choice.parse()?);
        }
        if let Some(timeout) = get(ENV_TIMEOUT) {
            config.timeout_secs = timeout.trim().parse().map_err(|_| {
                SdkError::Config(format!("{ENV_TIMEOUT} must be a whole number of seconds, got {timeout:?}"))
            })?;
        }
        config.ca_bundle = get(ENV_CA_BUNDLE).map(PathBuf::from);
        config.debug = get(ENV_DEBUG)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(config)
    }
}
