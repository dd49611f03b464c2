pub mod aggregator;
pub mod events;
pub mod executor;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use log::{debug, info, warn};
use tokio::task::JoinHandle;
use uuid::Uuid;

pub use aggregator::Aggregator;
pub use events::*;
pub use executor::{EntryExecutor, HttpExecutor};
pub use state::*;

use crate::error::StressError;
use crate::payload;
use crate::report::{self, types::StressResults, RunSummary, Summarizer};
use crate::utils::config::RunConfig;

/// Submit entries `1..=config.entries` through a pool of `config.concurrency` workers
///
/// Workers claim entry numbers from a shared counter, so every entry is executed
/// exactly once whatever order the requests complete in. Setting `stop` makes
/// workers stop claiming new entries; requests already in flight still finish
/// and are merged.
pub async fn run<E>(
    config: &RunConfig,
    executor: Arc<E>,
    emitter: &EventEmitter,
    stop: Arc<AtomicBool>,
) -> Result<RunState, StressError>
where
    E: EntryExecutor + 'static,
{
    config.validate()?;

    let total = config.entries;
    let interval = config.progress_interval.max(1);
    let next_entry = Arc::new(AtomicUsize::new(1));
    let aggregator = Arc::new(Aggregator::new(total));

    let workers = config.concurrency.min(total);
    let mut handles = Vec::with_capacity(workers);
    for worker_id in 0..workers {
        let executor = Arc::clone(&executor);
        let aggregator = Arc::clone(&aggregator);
        let next_entry = Arc::clone(&next_entry);
        let stop = Arc::clone(&stop);
        let emitter = emitter.clone();

        handles.push(tokio::spawn(async move {
            let mut handled = 0usize;
            while !stop.load(Ordering::SeqCst) {
                let entry = next_entry.fetch_add(1, Ordering::SeqCst);
                if entry > total {
                    break;
                }

                let payload = payload::generate(entry);
                let outcome = executor.execute(entry, &payload).await;
                aggregator.merge_then(outcome, |completed| {
                    if completed % interval == 0 || completed == total {
                        emitter.emit(RunEvent::Progress { completed, total });
                    }
                });
                handled += 1;
            }
            debug!("Worker {} finished after {} entries", worker_id, handled);
        }));
    }

    let mut panicked = None;
    for handle in handles {
        if let Err(e) = handle.await {
            panicked.get_or_insert_with(|| e.to_string());
        }
    }
    if let Some(reason) = panicked {
        return Err(StressError::WorkerPanicked(reason));
    }

    let completed = aggregator.completed();
    if completed < total {
        aggregator.mark_interrupted();
        warn!("Run stopped after {}/{} entries", completed, total);
        emitter.emit(RunEvent::Interrupted { completed, total });
    }
    Ok(Aggregator::finish_shared(aggregator))
}

/// Wait for the console listener to drain its events
async fn join_listener(listener: JoinHandle<()>) {
    if let Err(e) = listener.await {
        warn!("Console listener failed: {}", e);
    }
}

/// Everything a finished stress run produced
#[derive(Debug)]
pub struct StressRun {
    pub run_id: String,
    pub state: RunState,
    pub summary: RunSummary,
    pub results_path: Option<PathBuf>,
}

/// Run a full stress test against the configured endpoint
///
/// Validates the configuration (and optionally probes the endpoint) before any
/// entry is sent, streams progress to the console, then summarizes the run and
/// saves the detailed results unless `save` is false.
pub async fn run_stress_test(
    config: &RunConfig,
    save: bool,
    stop: Arc<AtomicBool>,
) -> Result<StressRun> {
    config.validate().map_err(StressError::from)?;

    let executor = Arc::new(HttpExecutor::new(config).map_err(StressError::from)?);
    if config.preflight {
        executor.preflight().await.map_err(StressError::from)?;
        info!("Preflight check passed for {}", executor.endpoint());
    }

    let run_id = Uuid::new_v4().to_string();
    let (emitter, receiver) = EventEmitter::new();
    let listener = tokio::spawn(ConsoleEventListener::listen(receiver));

    emitter.emit(RunEvent::RunStarted {
        run_id: run_id.clone(),
        endpoint: config.endpoint.clone(),
        total: config.entries,
        concurrency: config.concurrency,
    });

    let started = Instant::now();
    let outcome = run(config, executor, &emitter, stop).await;
    let elapsed = started.elapsed();

    let state = match outcome {
        Ok(state) => state,
        Err(e) => {
            drop(emitter);
            join_listener(listener).await;
            return Err(e.into());
        }
    };

    let summary = Summarizer::new(config.response_fields.clone()).summarize(&state, elapsed);
    emitter.emit(RunEvent::RunFinished {
        summary: Box::new(summary.clone()),
    });
    drop(emitter);
    join_listener(listener).await;

    let results_path = if save {
        let results = StressResults::new(&run_id, config, &state, summary.clone());
        let path = report::json::save(&results, &config.output_dir)?;
        println!("\nDetailed results saved to: {}", path.display());
        Some(path)
    } else {
        None
    };

    Ok(StressRun {
        run_id,
        state,
        summary,
        results_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::payload::TestPayload;
    use crate::report::summarize;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::time::Duration;
    use super::test_support::{counting_stub, refused_endpoint, serve};

    fn no_stop() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(false))
    }

    async fn run_http(endpoint: &str, entries: usize, concurrency: usize) -> RunState {
        let config = RunConfig::new(endpoint, entries, concurrency);
        let executor = Arc::new(HttpExecutor::new(&config).unwrap());
        run(&config, executor, &EventEmitter::default(), no_stop())
            .await
            .unwrap()
    }

    fn assert_complete(state: &RunState, n: usize) {
        assert_eq!(state.outcomes.len(), n);
        assert_eq!(state.success_count + state.error_count, n);
        let entries: Vec<usize> = state.outcomes.iter().map(|o| o.entry_number).collect();
        assert_eq!(entries, (1..=n).collect::<Vec<_>>());
        assert!(!state.interrupted);
    }

    /// In-process executor: fails entries divisible by `fail_every`, tracks concurrency
    #[derive(Default)]
    struct ScriptedExecutor {
        fail_every: usize,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl EntryExecutor for ScriptedExecutor {
        async fn execute(&self, entry_number: usize, payload: &TestPayload) -> Outcome {
            assert_eq!(payload.email, format!("test{}@example.com", entry_number));
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            // Vary completion order
            tokio::time::sleep(Duration::from_millis((entry_number % 4) as u64 * 3)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if self.fail_every > 0 && entry_number % self.fail_every == 0 {
                Outcome::response(entry_number, 503, json!({"error": "busy"}), 1)
            } else {
                Outcome::response(entry_number, 200, json!({"sheet": "S1", "currentSlot": true}), 1)
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_every_entry_recorded_once() {
        for (n, limit) in [(1, 1), (7, 3), (20, 20), (5, 16), (64, 8)] {
            let executor = Arc::new(ScriptedExecutor {
                fail_every: 4,
                ..Default::default()
            });
            let config = RunConfig::new("http://127.0.0.1:9/api/rsvp", n, limit);

            let state = run(&config, Arc::clone(&executor), &EventEmitter::default(), no_stop())
                .await
                .unwrap();

            assert_complete(&state, n);
            assert_eq!(state.error_count, n / 4);
            assert_eq!(executor.calls.load(Ordering::SeqCst), n);
            assert!(executor.peak.load(Ordering::SeqCst) <= limit);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_limit_of_one_is_sequential() {
        let executor = Arc::new(ScriptedExecutor::default());
        let config = RunConfig::new("http://127.0.0.1:9/api/rsvp", 12, 1);

        let state = run(&config, Arc::clone(&executor), &EventEmitter::default(), no_stop())
            .await
            .unwrap();

        assert_complete(&state, 12);
        assert_eq!(executor.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_all_ok_sheet1_scenario() {
        let endpoint = serve(counting_stub(|_| {
            (StatusCode::OK, json!({"sheet": "Sheet1", "currentSlot": true}))
        }))
        .await;

        let state = run_http(&endpoint, 10, 3).await;
        let summary = summarize(&state, Duration::from_secs(1));

        assert_complete(&state, 10);
        assert_eq!(summary.success_count, 10);
        assert_eq!(summary.error_count, 0);
        assert_eq!(
            summary.bucket_distribution,
            BTreeMap::from([("Sheet1".to_string(), 10)])
        );
        assert_eq!(summary.current_bucket_count, 10);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_unreachable_endpoint_scenario() {
        let endpoint = refused_endpoint().await;

        let state = run_http(&endpoint, 5, 2).await;
        let summary = summarize(&state, Duration::from_secs(1));

        assert_complete(&state, 5);
        assert_eq!(state.success_count, 0);
        assert_eq!(state.error_count, 5);
        assert!(state.outcomes.iter().all(|o| o.status_code.is_none()));
        assert_eq!(summary.failure_sample.len(), 5);
        assert!(summary.bucket_distribution.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_alternating_failures_scenario() {
        let endpoint = serve(counting_stub(|n| {
            if n % 2 == 1 {
                (StatusCode::OK, json!({"sheet": "Sheet2", "currentSlot": false}))
            } else {
                (StatusCode::INTERNAL_SERVER_ERROR, json!({"error": "Failed to submit RSVP"}))
            }
        }))
        .await;

        let state = run_http(&endpoint, 100, 10).await;
        let summary = summarize(&state, Duration::from_secs(1));

        assert_complete(&state, 100);
        assert_eq!(summary.success_rate, 0.5);
        assert_eq!(
            summary.bucket_distribution,
            BTreeMap::from([("Sheet2".to_string(), 50)])
        );
        assert_eq!(summary.current_bucket_count, 0);
        assert!(summary.failure_sample.iter().all(|o| o.status_code == Some(500)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_every_third_request_fails() {
        let endpoint = serve(counting_stub(|n| {
            if n % 3 == 0 {
                (StatusCode::BAD_GATEWAY, json!({}))
            } else {
                (StatusCode::OK, json!({"sheet": "Sheet1"}))
            }
        }))
        .await;

        let state = run_http(&endpoint, 20, 4).await;

        assert_complete(&state, 20);
        assert_eq!(state.success_count, 14);
        assert_eq!(state.error_count, 6);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_result_independent_of_concurrency() {
        let endpoint = serve(counting_stub(|_| (StatusCode::OK, json!({"sheet": "S1"})))).await;

        let sequential = run_http(&endpoint, 24, 1).await;
        let parallel = run_http(&endpoint, 24, 8).await;

        let a = summarize(&sequential, Duration::from_secs(1));
        let b = summarize(&parallel, Duration::from_secs(1));
        assert_eq!(a.success_count, b.success_count);
        assert_eq!(a.error_count, b.error_count);
        assert_eq!(a.bucket_distribution, b.bucket_distribution);
        assert_eq!(a.bucket_distribution.get("S1"), Some(&24));
    }

    #[tokio::test]
    async fn test_invalid_config_sends_nothing() {
        let executor = Arc::new(ScriptedExecutor::default());
        let config = RunConfig::new("http://127.0.0.1:9/api/rsvp", 5, 0);

        let result = run(&config, Arc::clone(&executor), &EventEmitter::default(), no_stop()).await;

        assert!(matches!(
            result,
            Err(StressError::Config(ConfigError::NoConcurrency))
        ));
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stopped_run_is_consistent() {
        let executor = Arc::new(ScriptedExecutor::default());
        let config = RunConfig::new("http://127.0.0.1:9/api/rsvp", 30, 4);
        let (emitter, mut receiver) = EventEmitter::new();

        let state = run(&config, executor, &emitter, Arc::new(AtomicBool::new(true)))
            .await
            .unwrap();

        assert!(state.outcomes.is_empty());
        assert_eq!(state.success_count + state.error_count, 0);
        assert!(state.interrupted);
        assert!(matches!(
            receiver.recv().await,
            Ok(RunEvent::Interrupted {
                completed: 0,
                total: 30
            })
        ));

        let summary = summarize(&state, Duration::from_secs(1));
        assert_eq!(summary.success_rate, 0.0);
        assert_eq!(summary.total_entries, 30);
    }

    /// Executor that raises the stop flag once a given entry has been sent
    struct StopAfter {
        entry: usize,
        stop: Arc<AtomicBool>,
    }

    #[async_trait]
    impl EntryExecutor for StopAfter {
        async fn execute(&self, entry_number: usize, _payload: &TestPayload) -> Outcome {
            if entry_number == self.entry {
                self.stop.store(true, Ordering::SeqCst);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            Outcome::response(entry_number, 200, json!({"sheet": "Sheet1"}), 20)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_stop_mid_run_drains_in_flight_entries() {
        let stop = no_stop();
        let executor = Arc::new(StopAfter {
            entry: 10,
            stop: Arc::clone(&stop),
        });
        let config = RunConfig::new("http://127.0.0.1:9/api/rsvp", 100, 4);
        let (emitter, mut receiver) = EventEmitter::new();

        let state = run(&config, executor, &emitter, stop).await.unwrap();
        drop(emitter);

        // Entry 10 and whatever the other workers had already claimed
        let completed = state.completed();
        assert!((10..10 + 4).contains(&completed), "completed {}", completed);
        assert!(state.interrupted);
        assert_eq!(state.success_count + state.error_count, completed);
        let entries: Vec<usize> = state.outcomes.iter().map(|o| o.entry_number).collect();
        assert_eq!(entries, (1..=completed).collect::<Vec<_>>());

        let mut interrupted_at = None;
        while let Ok(event) = receiver.recv().await {
            if let RunEvent::Interrupted { completed, .. } = event {
                interrupted_at = Some(completed);
            }
        }
        assert_eq!(interrupted_at, Some(completed));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_progress_events_at_interval() {
        let executor = Arc::new(ScriptedExecutor::default());
        let mut config = RunConfig::new("http://127.0.0.1:9/api/rsvp", 12, 3);
        config.progress_interval = 5;
        let (emitter, mut receiver) = EventEmitter::new();

        run(&config, executor, &emitter, no_stop()).await.unwrap();
        drop(emitter);

        let mut seen = Vec::new();
        while let Ok(event) = receiver.recv().await {
            if let RunEvent::Progress { completed, .. } = event {
                seen.push(completed);
            }
        }
        assert_eq!(seen, vec![5, 10, 12]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_run_stress_test_saves_results() {
        let endpoint = serve(counting_stub(|_| {
            (StatusCode::OK, json!({"sheet": "Sheet1", "currentSlot": true}))
        }))
        .await;
        let mut config = RunConfig::new(&endpoint, 6, 2);
        config.output_dir = std::env::temp_dir().join(format!("sheet-stress-{}", Uuid::new_v4()));
        config.preflight = true;

        let finished = run_stress_test(&config, true, no_stop()).await.unwrap();

        assert_eq!(finished.summary.success_count, 6);
        let path = finished.results_path.unwrap();
        let loaded = report::json::load(&path).unwrap();
        assert_eq!(loaded.run_id, finished.run_id);
        assert_eq!(loaded.detailed_responses.len(), 6);
        assert_eq!(
            loaded.resummarize().bucket_distribution,
            finished.summary.bucket_distribution
        );

        std::fs::remove_dir_all(&config.output_dir).ok();
    }

    #[tokio::test]
    async fn test_run_stress_test_rejects_unreachable_preflight() {
        let mut config = RunConfig::new(&refused_endpoint().await, 3, 1);
        config.preflight = true;

        let err = run_stress_test(&config, false, no_stop()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StressError>(),
            Some(StressError::Config(ConfigError::Unreachable { .. }))
        ));
    }
}
