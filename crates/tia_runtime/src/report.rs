//! Client-facing sequence reports.
//!
//! A sequence report is an immutable snapshot of one sequence: the policies
//! in force, the name sets the selection produced, and one report per phase
//! with its jobs partitioned by outcome.

use crate::engine::{TestEngineJob, TestResult, TestSequenceResult};
use crate::policy::{
    ImpactAnalysisSequencePolicyState, SafeImpactAnalysisSequencePolicyState, SequencePolicyState,
};
use crate::target::SuiteType;
use serde::Serialize;
use std::time::{Duration, SystemTime};

/// One completed test target run, as presented to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestRun {
    pub target_name: String,
    pub command: String,
    pub start_time: SystemTime,
    pub duration: Duration,
    pub result: TestResult,
}

impl From<&TestEngineJob> for TestRun {
    fn from(job: &TestEngineJob) -> Self {
        Self {
            target_name: job.target_name.clone(),
            command: job.command.clone(),
            start_time: job.start_time,
            duration: job.duration,
            result: job.result,
        }
    }
}

/// The test targets a sequence will run and the ones its exclude list
/// filtered out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TestRunSelection {
    pub included: Vec<String>,
    pub excluded: Vec<String>,
}

impl TestRunSelection {
    pub fn new(included: Vec<String>, excluded: Vec<String>) -> Self {
        Self { included, excluded }
    }

    pub fn num_included(&self) -> usize {
        self.included.len()
    }

    pub fn num_excluded(&self) -> usize {
        self.excluded.len()
    }
}

/// Report for one phase of a sequence: the engine result, timing relative to
/// the sequence start, and the jobs partitioned by outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestRunReport {
    pub result: TestSequenceResult,
    pub relative_start: Duration,
    pub duration: Duration,
    pub passing_test_runs: Vec<TestRun>,
    pub failing_test_runs: Vec<TestRun>,
    pub execution_failure_test_runs: Vec<TestRun>,
    pub timed_out_test_runs: Vec<TestRun>,
    pub unexecuted_test_runs: Vec<TestRun>,
}

impl TestRunReport {
    pub fn new<'a>(
        result: TestSequenceResult,
        relative_start: Duration,
        duration: Duration,
        jobs: impl IntoIterator<Item = &'a TestEngineJob>,
    ) -> Self {
        let mut report = Self {
            result,
            relative_start,
            duration,
            ..Self::default()
        };
        for job in jobs {
            let run = TestRun::from(job);
            match job.result {
                TestResult::AllTestsPass => report.passing_test_runs.push(run),
                TestResult::TestFailures => report.failing_test_runs.push(run),
                TestResult::FailedToExecute => report.execution_failure_test_runs.push(run),
                TestResult::Timeout => report.timed_out_test_runs.push(run),
                TestResult::NotRun => report.unexecuted_test_runs.push(run),
            }
        }
        report
    }

    pub fn total_runs(&self) -> usize {
        self.passing_test_runs.len()
            + self.failing_test_runs.len()
            + self.execution_failure_test_runs.len()
            + self.timed_out_test_runs.len()
            + self.unexecuted_test_runs.len()
    }
}

impl Default for TestRunReport {
    /// An empty report for a phase that had no targets to run.
    fn default() -> Self {
        Self {
            result: TestSequenceResult::Success,
            relative_start: Duration::ZERO,
            duration: Duration::ZERO,
            passing_test_runs: Vec::new(),
            failing_test_runs: Vec::new(),
            execution_failure_test_runs: Vec::new(),
            timed_out_test_runs: Vec::new(),
            unexecuted_test_runs: Vec::new(),
        }
    }
}

/// Report of a regular (non-instrumented) sequence.
#[derive(Debug, Clone, Serialize)]
pub struct RegularSequenceReport {
    pub max_concurrency: usize,
    pub target_timeout: Option<Duration>,
    pub global_timeout: Option<Duration>,
    pub policy_state: SequencePolicyState,
    pub suite: SuiteType,
    pub selected: TestRunSelection,
    pub selected_run_report: TestRunReport,
}

impl RegularSequenceReport {
    pub fn result(&self) -> TestSequenceResult {
        self.selected_run_report.result
    }
}

/// Report of a seeded sequence (instrumented full reseed).
#[derive(Debug, Clone, Serialize)]
pub struct SeedSequenceReport {
    pub max_concurrency: usize,
    pub target_timeout: Option<Duration>,
    pub global_timeout: Option<Duration>,
    pub policy_state: SequencePolicyState,
    pub suite: SuiteType,
    pub selected: TestRunSelection,
    pub selected_run_report: TestRunReport,
}

impl SeedSequenceReport {
    pub fn result(&self) -> TestSequenceResult {
        self.selected_run_report.result
    }
}

/// Report of an impact-analysis sequence: selected phase plus drafted phase.
#[derive(Debug, Clone, Serialize)]
pub struct ImpactAnalysisSequenceReport {
    pub max_concurrency: usize,
    pub target_timeout: Option<Duration>,
    pub global_timeout: Option<Duration>,
    pub policy_state: ImpactAnalysisSequencePolicyState,
    pub suite: SuiteType,
    pub selected: TestRunSelection,
    pub discarded: Vec<String>,
    pub drafted: Vec<String>,
    pub selected_run_report: TestRunReport,
    pub drafted_run_report: TestRunReport,
}

impl ImpactAnalysisSequenceReport {
    pub fn result(&self) -> TestSequenceResult {
        self.selected_run_report
            .result
            .worst(self.drafted_run_report.result)
    }
}

/// Report of a safe impact-analysis sequence: selected (instrumented),
/// discarded (regular), and drafted (instrumented) phases.
#[derive(Debug, Clone, Serialize)]
pub struct SafeImpactAnalysisSequenceReport {
    pub max_concurrency: usize,
    pub target_timeout: Option<Duration>,
    pub global_timeout: Option<Duration>,
    pub policy_state: SafeImpactAnalysisSequencePolicyState,
    pub suite: SuiteType,
    pub selected: TestRunSelection,
    pub discarded: TestRunSelection,
    pub drafted: Vec<String>,
    pub selected_run_report: TestRunReport,
    pub discarded_run_report: TestRunReport,
    pub drafted_run_report: TestRunReport,
}

impl SafeImpactAnalysisSequenceReport {
    pub fn result(&self) -> TestSequenceResult {
        self.selected_run_report
            .result
            .worst(self.discarded_run_report.result)
            .worst(self.drafted_run_report.result)
    }
}
