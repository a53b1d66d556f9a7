//! Test engine contract.
//!
//! The engine is an external collaborator: it spawns test target processes,
//! applies per-target timeouts, captures output, and parses coverage
//! artifacts. The runtime only depends on the two synchronous entry points
//! defined here.
//!
//! Contract highlights the runtime relies on:
//! - `on_job_complete` fires exactly once per target, in completion order,
//!   possibly from engine-owned threads.
//! - A zero remaining global timeout aborts every target as `Timeout` and
//!   returns promptly; completed targets keep their results.
//! - The returned sequence result is the worst-case status across jobs.

use crate::policy::{ExecutionFailure, IntegrityFailure, TargetOutputCapture, TestFailure};
use crate::target::TestTarget;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

/// Outcome of one test target run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestResult {
    AllTestsPass,
    TestFailures,
    Timeout,
    NotRun,
    FailedToExecute,
}

/// Worst-case status across the jobs of one engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestSequenceResult {
    Success,
    TestFailures,
    Timeout,
    Failure,
}

impl TestSequenceResult {
    fn severity(self) -> u8 {
        match self {
            TestSequenceResult::Success => 0,
            TestSequenceResult::TestFailures => 1,
            TestSequenceResult::Timeout => 2,
            TestSequenceResult::Failure => 3,
        }
    }

    /// The more severe of the two results.
    pub fn worst(self, other: Self) -> Self {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }
}

/// Sources executed during a test target's run, as reported by the
/// instrumentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCoverage {
    pub sources_covered: Vec<PathBuf>,
}

/// Per-target output of an engine run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestEngineJob {
    pub target_name: String,
    pub command: String,
    pub start_time: SystemTime,
    pub duration: Duration,
    pub result: TestResult,
}

/// Per-target output of an instrumented run: the job plus its coverage
/// artifact, when one was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestEngineInstrumentedRun {
    pub job: TestEngineJob,
    pub coverage: Option<TestCoverage>,
}

/// Completion callback handed to the engine. May be invoked from any
/// engine-owned thread, exactly once per target, in completion order.
pub type JobCompletionCallback<'a> = &'a (dyn Fn(&TestEngineJob) + Sync);

/// Synchronous test execution interface the runtime drives.
pub trait TestEngine {
    /// Runs `targets` without instrumentation, blocking until the process
    /// pool drains or the global timeout fires.
    #[allow(clippy::too_many_arguments)]
    fn regular_run(
        &self,
        targets: &[&TestTarget],
        execution_failure: ExecutionFailure,
        test_failure: TestFailure,
        target_output_capture: TargetOutputCapture,
        target_timeout: Option<Duration>,
        global_timeout: Option<Duration>,
        on_job_complete: JobCompletionCallback<'_>,
    ) -> (TestSequenceResult, Vec<TestEngineJob>);

    /// Runs `targets` under coverage instrumentation.
    #[allow(clippy::too_many_arguments)]
    fn instrumented_run(
        &self,
        targets: &[&TestTarget],
        execution_failure: ExecutionFailure,
        integrity_failure: IntegrityFailure,
        test_failure: TestFailure,
        target_output_capture: TargetOutputCapture,
        target_timeout: Option<Duration>,
        global_timeout: Option<Duration>,
        on_job_complete: JobCompletionCallback<'_>,
    ) -> (TestSequenceResult, Vec<TestEngineInstrumentedRun>);
}
