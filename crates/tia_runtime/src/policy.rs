//! Sequence policies.
//!
//! Policies decide how a test sequence reacts to failures and what gets
//! captured or persisted along the way. A snapshot of the policies in force
//! is embedded in every sequence report.

use serde::{Deserialize, Serialize};

/// How the sequence reacts to test targets that fail to launch or crash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionFailure {
    /// Abort the sequence on the first execution failure.
    Abort,
    /// Keep running the remaining targets and report the failure.
    Continue,
    /// Keep running and treat the failure as benign.
    Ignore,
}

/// What to do with the coverage produced by a test target with failing tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailedTestCoverage {
    /// Ingest the coverage even though some tests failed.
    Keep,
    /// Drop the coverage of failing targets.
    Discard,
}

/// How the sequence reacts to failing tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestFailure {
    /// Abort the sequence on the first failing test target.
    Abort,
    /// Keep running and report the failures at the end.
    Continue,
}

/// How the runtime reacts to inconsistencies between the coverage data and
/// the build graph, and to coverage persistence failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrityFailure {
    /// Raise an error to the caller.
    Abort,
    /// Log the anomaly and continue with degraded data.
    Continue,
}

/// Whether test targets may be split into shards by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestSharding {
    Never,
    Always,
}

/// Where the engine routes the standard output of test targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetOutputCapture {
    /// Discard target output.
    None,
    /// Forward to the runtime's stdout.
    StdOut,
    /// Write to per-target files.
    File,
    /// Both of the above.
    StdOutAndFile,
}

/// Ordering applied to the selected test targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestPrioritization {
    /// Stable name order.
    None,
    /// Targets closest in the build graph to the changed sources run first.
    DependencyLocality,
}

/// Whether an impact-analysis sequence refreshes the coverage index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DynamicDependencyMapPolicy {
    /// Run without instrumentation and leave the index untouched.
    Discard,
    /// Run instrumented and persist the refreshed coverage.
    Update,
}

/// The six policies in force for a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyState {
    pub execution_failure: ExecutionFailure,
    pub failed_test_coverage: FailedTestCoverage,
    pub test_failure: TestFailure,
    pub integrity_failure: IntegrityFailure,
    pub test_sharding: TestSharding,
    pub target_output_capture: TargetOutputCapture,
}

/// Policy snapshot carried by regular and seeded sequence reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencePolicyState {
    pub base: PolicyState,
}

/// Policy snapshot carried by impact-analysis sequence reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactAnalysisSequencePolicyState {
    pub base: PolicyState,
    pub test_prioritization: TestPrioritization,
    pub dynamic_dependency_map: DynamicDependencyMapPolicy,
}

/// Policy snapshot carried by safe impact-analysis sequence reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeImpactAnalysisSequencePolicyState {
    pub base: PolicyState,
    pub test_prioritization: TestPrioritization,
}
