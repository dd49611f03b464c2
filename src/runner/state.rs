use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Finalized result of a single entry's request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Outcome {
    pub entry_number: usize,
    /// Absent when the request never produced an HTTP response
    pub status_code: Option<u16>,
    pub response_data: Value,
    pub success: bool,
    /// Completion time
    pub timestamp: DateTime<Local>,
    #[serde(default)]
    pub latency_ms: u64,
}

impl Outcome {
    /// Outcome for an HTTP response that was received
    pub fn response(
        entry_number: usize,
        status: u16,
        response_data: Value,
        latency_ms: u64,
    ) -> Self {
        Self {
            entry_number,
            status_code: Some(status),
            response_data,
            success: status == 200,
            timestamp: Local::now(),
            latency_ms,
        }
    }

    /// Outcome for a request that failed before a response arrived
    pub fn transport_failure(entry_number: usize, error: &str, latency_ms: u64) -> Self {
        Self {
            entry_number,
            status_code: None,
            response_data: serde_json::json!({ "error": error }),
            success: false,
            timestamp: Local::now(),
            latency_ms,
        }
    }

    /// Outcome for a response whose body could not be read to the end
    pub fn unreadable_body(entry_number: usize, status: u16, error: &str, latency_ms: u64) -> Self {
        Self {
            entry_number,
            status_code: Some(status),
            response_data: serde_json::json!({ "error": error }),
            success: false,
            timestamp: Local::now(),
            latency_ms,
        }
    }

    /// Field of the response body, if the body is an object carrying it
    pub fn response_field(&self, name: &str) -> Option<&Value> {
        self.response_data.as_object()?.get(name)
    }
}

/// Accumulated state of one stress run
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunState {
    /// Number of entries the run was asked to submit
    pub total_entries: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub outcomes: Vec<Outcome>,
    /// Set when the run stopped before every entry was submitted
    #[serde(default)]
    pub interrupted: bool,
}

impl RunState {
    pub fn new(total_entries: usize) -> Self {
        Self {
            total_entries,
            ..Self::default()
        }
    }

    pub fn completed(&self) -> usize {
        self.outcomes.len()
    }

    /// Record one outcome, keeping the counters in step with `outcomes`
    pub(crate) fn record(&mut self, outcome: Outcome) {
        if outcome.success {
            self.success_count += 1;
        } else {
            self.error_count += 1;
        }
        self.outcomes.push(outcome);
    }

    /// Rebuild a state from stored outcomes, recomputing the counters
    pub fn from_outcomes(total_entries: usize, outcomes: Vec<Outcome>) -> Self {
        let mut state = Self::new(total_entries);
        for outcome in outcomes {
            state.record(outcome);
        }
        state.outcomes.sort_by_key(|o| o.entry_number);
        state.interrupted = state.completed() < total_entries;
        state
    }

    pub fn failures(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(|o| !o.success)
    }

    /// Entry numbers in `[1, total_entries]` with no recorded outcome
    pub fn missing_entries(&self) -> Vec<usize> {
        let mut seen = vec![false; self.total_entries + 1];
        for outcome in &self.outcomes {
            if let Some(slot) = seen.get_mut(outcome.entry_number) {
                *slot = true;
            }
        }
        (1..=self.total_entries).filter(|&n| !seen[n]).collect()
    }
}
