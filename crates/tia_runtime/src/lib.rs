//! Test impact analysis runtime.
//!
//! Given a source-level change set, decides which test targets to execute,
//! drives them through an external test engine (optionally under coverage
//! instrumentation), and persists an updated source-to-test coverage index
//! for later invocations.
//!
//! The [`runtime::Runtime`] is the public entry point; it composes the
//! dependency map, selector, exclude lists, and the [`engine::TestEngine`]
//! collaborator into the four sequence modes.

pub mod config;
pub mod coverage;
pub mod dependency;
pub mod engine;
pub mod normalize;
pub mod policy;
pub mod report;
pub mod runtime;
pub mod selection;
pub mod target;

pub use config::RuntimeConfig;
pub use coverage::{CoverageIndex, SourceCoveringTests, SourceCoveringTestsList};
pub use dependency::{ChangeDependencyList, ChangeList, DynamicDependencyMap};
pub use engine::{
    TestCoverage, TestEngine, TestEngineInstrumentedRun, TestEngineJob, TestResult,
    TestSequenceResult,
};
pub use policy::{
    DynamicDependencyMapPolicy, ExecutionFailure, FailedTestCoverage, IntegrityFailure,
    PolicyState, TargetOutputCapture, TestFailure, TestPrioritization, TestSharding,
};
pub use report::{
    ImpactAnalysisSequenceReport, RegularSequenceReport, SafeImpactAnalysisSequenceReport,
    SeedSequenceReport, TestRun, TestRunReport, TestRunSelection,
};
pub use runtime::{Runtime, RuntimeError};
pub use target::{ExcludedTarget, SuiteType, TargetDescriptor, TestTargetDescriptor};
