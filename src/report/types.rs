use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{RunSummary, Summarizer};
use crate::runner::state::{Outcome, RunState};
use crate::utils::config::{ResponseFields, RunConfig};

/// Configuration echoed into the results file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestConfig {
    pub api_endpoint: String,
    pub num_entries: usize,
    pub concurrent_requests: usize,
    #[serde(default)]
    pub response_fields: ResponseFields,
}

impl From<&RunConfig> for TestConfig {
    fn from(config: &RunConfig) -> Self {
        Self {
            api_endpoint: config.endpoint.clone(),
            num_entries: config.entries,
            concurrent_requests: config.concurrency,
            response_fields: config.response_fields.clone(),
        }
    }
}

/// Stress run results for persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressResults {
    pub run_id: String,
    pub generated_at: String,
    pub test_config: TestConfig,
    pub summary: RunSummary,
    pub detailed_responses: Vec<Outcome>,
}

impl StressResults {
    pub fn new(run_id: &str, config: &RunConfig, state: &RunState, summary: RunSummary) -> Self {
        Self {
            run_id: run_id.to_string(),
            generated_at: chrono::Local::now().to_rfc3339(),
            test_config: TestConfig::from(config),
            summary,
            detailed_responses: state.outcomes.clone(),
        }
    }

    /// Rebuild the run state from the stored outcomes
    pub fn run_state(&self) -> RunState {
        RunState::from_outcomes(self.test_config.num_entries, self.detailed_responses.clone())
    }

    /// Recompute the summary from the stored outcomes and duration
    pub fn resummarize(&self) -> RunSummary {
        let elapsed = Duration::try_from_secs_f64(self.summary.duration_secs).unwrap_or_default();
        Summarizer::new(self.test_config.response_fields.clone())
            .summarize(&self.run_state(), elapsed)
    }
}
