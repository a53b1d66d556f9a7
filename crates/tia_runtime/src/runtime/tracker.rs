//! Per-sequence completion tracking.

use crate::engine::TestEngineJob;
use crate::report::TestRun;
use std::sync::Mutex;

/// Client callback fired once per completed test target with the running
/// `(completed, total)` counts for the whole sequence.
pub type TestRunCompleteCallback = Box<dyn FnMut(TestRun, usize, usize) + Send>;

struct TrackerState {
    completed: usize,
    callback: Option<TestRunCompleteCallback>,
}

/// Counts job completions across every phase of a sequence so progress is
/// presented as one continuous run.
///
/// The engine invokes completions from its own threads; the counter and the
/// client callback sit behind a mutex, which also makes the delivered
/// `(completed, total)` pairs strictly monotonic.
pub struct CompletionTracker {
    total: usize,
    state: Mutex<TrackerState>,
}

impl CompletionTracker {
    /// `total` is the number of test targets the whole sequence will run.
    pub fn new(total: usize, callback: Option<TestRunCompleteCallback>) -> Self {
        Self {
            total,
            state: Mutex::new(TrackerState {
                completed: 0,
                callback,
            }),
        }
    }

    /// Records one completion and forwards it to the client callback, if any.
    pub fn on_job_complete(&self, job: &TestEngineJob) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        state.completed += 1;
        let completed = state.completed;
        if let Some(callback) = state.callback.as_mut() {
            callback(TestRun::from(job), completed, self.total);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::engine::TestResult;
    use std::sync::mpsc;
    use std::time::{Duration, SystemTime};

    fn job(name: &str) -> TestEngineJob {
        TestEngineJob {
            target_name: name.into(),
            command: format!("./{name}"),
            start_time: SystemTime::UNIX_EPOCH,
            duration: Duration::from_millis(1),
            result: TestResult::AllTestsPass,
        }
    }

    #[test]
    fn counts_are_monotonic_and_total_is_constant() {
        let (tx, rx) = mpsc::channel();
        let tracker = CompletionTracker::new(
            3,
            Some(Box::new(move |run, completed, total| {
                tx.send((run.target_name, completed, total)).unwrap();
            })),
        );

        tracker.on_job_complete(&job("a"));
        tracker.on_job_complete(&job("b"));
        tracker.on_job_complete(&job("c"));

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 3);
        for (index, (_, completed, total)) in events.iter().enumerate() {
            assert_eq!(*completed, index + 1);
            assert_eq!(*total, 3);
        }
    }

    #[test]
    fn absent_callback_is_safe() {
        let tracker = CompletionTracker::new(1, None);
        tracker.on_job_complete(&job("a"));
    }

    #[test]
    fn completions_from_other_threads_are_serialized() {
        let (tx, rx) = mpsc::channel();
        let tracker = CompletionTracker::new(
            8,
            Some(Box::new(move |_, completed, _| {
                tx.send(completed).unwrap();
            })),
        );

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| tracker.on_job_complete(&job("t")));
            }
        });

        let mut counts: Vec<_> = rx.try_iter().collect();
        counts.sort_unstable();
        assert_eq!(counts, (1..=8).collect::<Vec<_>>());
    }
}
