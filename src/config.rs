//! Connection configuration.
//!
//! Defaults match the reference server (`localhost:4994`, 2 second timeout).
//! An optional JSON file can override them; the command line overrides both.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::transport::ExchangeOptions;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 4994;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Settings for one call to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Applied to the connect, the send and every read.
    pub timeout: Duration,
    /// Fail immediately on malformed JSON instead of reading on.
    pub strict: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
            strict: true,
        }
    }
}

/// Configuration file contents (JSON). Every key is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Fractional seconds are allowed.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: f64,

    #[serde(default = "default_strict")]
    pub strict: bool,
}

fn default_host() -> String {
    DEFAULT_HOST.into()
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

const fn default_timeout_seconds() -> f64 {
    2.0
}

const fn default_strict() -> bool {
    true
}

impl ClientConfig {
    /// Load settings from a JSON config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let file: ConfigFile = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        debug!(path = %path.display(), "Loaded config file");
        Self::from_config_file(&file)
    }

    pub fn from_config_file(file: &ConfigFile) -> Result<Self> {
        Ok(Self {
            host: file.host.clone(),
            port: file.port,
            timeout: timeout_from_secs(file.timeout_seconds)?,
            strict: file.strict,
        })
    }

    pub const fn exchange_options(&self) -> ExchangeOptions {
        ExchangeOptions {
            timeout: self.timeout,
            strict: self.strict,
        }
    }
}

/// Convert a timeout in seconds, rejecting zero, negative and non-finite values.
pub fn timeout_from_secs(secs: f64) -> Result<Duration> {
    anyhow::ensure!(
        secs.is_finite() && secs > 0.0,
        "Timeout must be a positive number of seconds, got {secs}"
    );
    Duration::try_from_secs_f64(secs).context("Timeout out of range")
}
