pub mod console;
pub mod json;
pub mod types;

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::runner::state::{Outcome, RunState};
use crate::utils::config::ResponseFields;

/// Bucket label used when a response does not name its sheet
pub const UNKNOWN_BUCKET: &str = "unknown";

/// Number of failed outcomes kept for display
pub const FAILURE_SAMPLE_SIZE: usize = 5;

/// Statistics derived from a finished run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub total_entries: usize,
    pub completed: usize,
    pub success_count: usize,
    pub error_count: usize,
    /// Fraction of the requested entries that succeeded (0.0–1.0)
    pub success_rate: f64,
    pub duration_secs: f64,
    pub requests_per_sec: f64,
    pub bucket_distribution: BTreeMap<String, usize>,
    pub current_bucket_count: usize,
    pub failure_sample: Vec<Outcome>,
    pub mean_latency_ms: f64,
    pub max_latency_ms: u64,
    pub interrupted: bool,
}

impl RunSummary {
    pub fn success_percent(&self) -> f64 {
        self.success_rate * 100.0
    }
}

/// Summarize a run using the default response field names
pub fn summarize(state: &RunState, elapsed: Duration) -> RunSummary {
    Summarizer::default().summarize(state, elapsed)
}

/// Derives [`RunSummary`] values; never mutates the state it reads
#[derive(Debug, Clone, Default)]
pub struct Summarizer {
    fields: ResponseFields,
}

impl Summarizer {
    pub fn new(fields: ResponseFields) -> Self {
        Self { fields }
    }

    pub fn summarize(&self, state: &RunState, elapsed: Duration) -> RunSummary {
        let total = state.total_entries;
        let secs = elapsed.as_secs_f64();

        let mut bucket_distribution = BTreeMap::new();
        let mut current_bucket_count = 0;
        for outcome in state.outcomes.iter().filter(|o| o.success) {
            let label = bucket_label(outcome.response_field(&self.fields.bucket));
            *bucket_distribution.entry(label).or_insert(0) += 1;

            let current = outcome
                .response_field(&self.fields.current)
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if current {
                current_bucket_count += 1;
            }
        }

        let mut failures: Vec<&Outcome> = state.failures().collect();
        failures.sort_by_key(|o| o.entry_number);
        let failure_sample = failures
            .into_iter()
            .take(FAILURE_SAMPLE_SIZE)
            .cloned()
            .collect();

        let latency_total: u64 = state.outcomes.iter().map(|o| o.latency_ms).sum();
        let mean_latency_ms = if state.outcomes.is_empty() {
            0.0
        } else {
            latency_total as f64 / state.outcomes.len() as f64
        };

        RunSummary {
            total_entries: total,
            completed: state.completed(),
            success_count: state.success_count,
            error_count: state.error_count,
            success_rate: ratio(state.success_count as f64, total as f64),
            duration_secs: secs,
            requests_per_sec: ratio(total as f64, secs),
            bucket_distribution,
            current_bucket_count,
            failure_sample,
            mean_latency_ms,
            max_latency_ms: state.outcomes.iter().map(|o| o.latency_ms).max().unwrap_or(0),
            interrupted: state.interrupted,
        }
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

fn bucket_label(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => UNKNOWN_BUCKET.to_string(),
        Some(Value::String(label)) => label.clone(),
        Some(other) => other.to_string(),
    }
}

/// Re-summarize a saved results file and print it
pub async fn generate_report(results_path: &Path, format: &str) -> Result<()> {
    let results = json::load(results_path)?;
    let summary = results.resummarize();

    match format {
        "text" => console::print_summary(&summary),
        "json" => println!("{}", serde_json::to_string_pretty(&summary)?),
        _ => anyhow::bail!("Unknown format: {}", format),
    }
    Ok(())
}
