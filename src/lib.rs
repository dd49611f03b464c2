pub mod error;
pub mod payload;
pub mod report;
pub mod runner;
pub mod utils;

// Re-export common items
pub use error::{ConfigError, StressError};
pub use report::{generate_report, summarize, RunSummary};
pub use runner::{run, run_stress_test, Outcome, RunState};
