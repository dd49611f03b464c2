use thiserror::Error;

/// Problems with a run configuration, reported before any request is sent
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("entry count must be at least 1")]
    NoEntries,

    #[error("concurrency limit must be at least 1")]
    NoConcurrency,

    #[error("request timeout must be greater than zero")]
    ZeroTimeout,

    #[error("invalid endpoint URL '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("endpoint {url} is unreachable: {reason}")]
    Unreachable { url: String, reason: String },
}

/// Errors that stop a stress run as a whole
#[derive(Debug, Error)]
pub enum StressError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("worker task panicked: {0}")]
    WorkerPanicked(String),
}
