use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default endpoint placeholder, meant to be overridden
pub const DEFAULT_ENDPOINT: &str = "https://your-domain.com/api/rsvp";

/// Names of the response fields the sheet router reports back
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ResponseFields {
    /// Field holding the sheet (bucket) label
    pub bucket: String,
    /// Boolean field set when the entry landed in the current sheet
    pub current: String,
}

impl Default for ResponseFields {
    fn default() -> Self {
        Self {
            bucket: "sheet".to_string(),
            current: "currentSlot".to_string(),
        }
    }
}

/// Stress run configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RunConfig {
    /// Target endpoint receiving the POSTed entries
    pub endpoint: String,

    /// Total number of entries to submit
    pub entries: usize,

    /// Maximum number of requests in flight
    pub concurrency: usize,

    /// Per-request timeout (seconds)
    pub timeout_secs: u64,

    /// Emit a progress event every N completions
    pub progress_interval: usize,

    pub user_agent: String,

    pub response_fields: ResponseFields,

    /// Directory the results file is written to
    pub output_dir: PathBuf,

    /// Probe the endpoint once before dispatching
    pub preflight: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            entries: 250,
            concurrency: 10,
            timeout_secs: 30,
            progress_interval: 25,
            user_agent: "StressTest/1.0".to_string(),
            response_fields: ResponseFields::default(),
            output_dir: PathBuf::from("."),
            preflight: false,
        }
    }
}

impl RunConfig {
    pub fn new(endpoint: &str, entries: usize, concurrency: usize) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            entries,
            concurrency,
            ..Self::default()
        }
    }

    /// Load a configuration from a YAML file; missing keys keep their defaults
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: RunConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check the configuration without touching the network
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.entries < 1 {
            return Err(ConfigError::NoEntries);
        }
        if self.concurrency < 1 {
            return Err(ConfigError::NoConcurrency);
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        let invalid = |reason: &str| ConfigError::InvalidEndpoint {
            url: self.endpoint.clone(),
            reason: reason.to_string(),
        };
        let url = reqwest::Url::parse(&self.endpoint).map_err(|e| invalid(&e.to_string()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(invalid("scheme must be http or https"));
        }
        if url.host_str().is_none() {
            return Err(invalid("missing host"));
        }
        Ok(())
    }
}
