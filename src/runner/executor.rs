use std::time::Instant;

use async_trait::async_trait;
use log::{debug, warn};
use serde_json::{json, Value};

use super::state::Outcome;
use crate::error::ConfigError;
use crate::payload::TestPayload;
use crate::utils::config::RunConfig;

/// Performs the request for one entry
///
/// Implementations never fail: every error path ends in a failed [`Outcome`].
#[async_trait]
pub trait EntryExecutor: Send + Sync {
    async fn execute(&self, entry_number: usize, payload: &TestPayload) -> Outcome;
}

/// Executor POSTing each payload as JSON to the configured endpoint
pub struct HttpExecutor {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpExecutor {
    pub fn new(config: &RunConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Check that the endpoint answers at all; any HTTP status counts as reachable
    pub async fn preflight(&self) -> Result<(), ConfigError> {
        match self.client.head(&self.endpoint).send().await {
            Ok(res) => {
                debug!("Preflight {} -> {}", self.endpoint, res.status());
                Ok(())
            }
            Err(e) => Err(ConfigError::Unreachable {
                url: self.endpoint.clone(),
                reason: describe_error(&e),
            }),
        }
    }
}

#[async_trait]
impl EntryExecutor for HttpExecutor {
    async fn execute(&self, entry_number: usize, payload: &TestPayload) -> Outcome {
        let start = Instant::now();
        let sent = self.client.post(&self.endpoint).json(payload).send().await;

        let res = match sent {
            Ok(res) => res,
            Err(e) => {
                let reason = describe_error(&e);
                warn!("Entry {} failed: {}", entry_number, reason);
                return Outcome::transport_failure(entry_number, &reason, elapsed_ms(start));
            }
        };

        let status = res.status().as_u16();
        match res.bytes().await {
            Ok(body) => {
                debug!("Entry {} -> {} ({} bytes)", entry_number, status, body.len());
                Outcome::response(entry_number, status, parse_body(&body), elapsed_ms(start))
            }
            Err(e) => {
                let reason = describe_error(&e);
                warn!("Entry {} body unreadable ({}): {}", entry_number, status, reason);
                Outcome::unreadable_body(entry_number, status, &reason, elapsed_ms(start))
            }
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

fn describe_error(e: &reqwest::Error) -> String {
    let kind = if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connection error"
    } else if e.is_body() || e.is_decode() {
        "body error"
    } else {
        "request error"
    };
    format!("{}: {}", kind, e)
}

/// Structured view of a response body; empty bodies map to an empty object
pub fn parse_body(body: &[u8]) -> Value {
    if body.iter().all(u8::is_ascii_whitespace) {
        return json!({});
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| json!({ "raw": String::from_utf8_lossy(body).into_owned() }))
}
