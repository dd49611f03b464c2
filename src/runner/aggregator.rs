use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::state::{Outcome, RunState};

/// Serializes every mutation of a run's [`RunState`]
///
/// Counters and the outcome list are only touched inside one critical section,
/// so `success_count + error_count == outcomes.len()` holds for every reader.
#[derive(Debug)]
pub struct Aggregator {
    state: Mutex<RunState>,
}

impl Aggregator {
    pub fn new(total_entries: usize) -> Self {
        Self {
            state: Mutex::new(RunState::new(total_entries)),
        }
    }

    // `record` cannot panic between the counter update and the push, so a poisoned
    // lock still guards a consistent state.
    fn lock(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Merge one outcome and return how many entries have completed so far
    pub fn merge(&self, outcome: Outcome) -> usize {
        self.merge_then(outcome, |_| {})
    }

    /// Merge one outcome and call `on_merged` with the completed count before the
    /// lock is released, so callbacks observe counts in increasing order
    pub fn merge_then<F>(&self, outcome: Outcome, on_merged: F) -> usize
    where
        F: FnOnce(usize),
    {
        let mut state = self.lock();
        state.record(outcome);
        let completed = state.completed();
        on_merged(completed);
        completed
    }

    pub fn completed(&self) -> usize {
        self.lock().completed()
    }

    /// Consistent copy of the current state
    pub fn snapshot(&self) -> RunState {
        self.lock().clone()
    }

    pub fn mark_interrupted(&self) {
        self.lock().interrupted = true;
    }

    /// Final state with outcomes in entry-number order
    pub fn finish(self) -> RunState {
        let mut state = self.state.into_inner().unwrap_or_else(PoisonError::into_inner);
        state.outcomes.sort_by_key(|o| o.entry_number);
        state
    }

    /// Final state of a shared aggregator whose writers have all finished
    pub fn finish_shared(this: Arc<Self>) -> RunState {
        match Arc::try_unwrap(this) {
            Ok(aggregator) => aggregator.finish(),
            Err(shared) => {
                let mut state = shared.snapshot();
                state.outcomes.sort_by_key(|o| o.entry_number);
                state
            }
        }
    }
}
