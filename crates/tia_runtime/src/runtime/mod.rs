//! Sequence orchestration.
//!
//! [`Runtime`] is the public entry point: it owns the dependency map, the
//! selector, and the exclude lists, drives the external test engine through
//! the four sequence modes, and persists refreshed coverage after
//! instrumented runs.
#![allow(clippy::print_stderr)]

pub mod timer;
pub mod tracker;


pub use timer::Timer;
pub use tracker::{CompletionTracker, TestRunCompleteCallback};

use crate::config::RuntimeConfig;
use crate::coverage::{
    deserialize_source_covering_tests_list, serialize_source_covering_tests_list, SerializeError,
    SourceCoveringTests, SourceCoveringTestsList,
};
use crate::dependency::{ChangeList, DependencyError, DynamicDependencyMap};
use crate::engine::{
    TestEngine, TestEngineInstrumentedRun, TestEngineJob, TestResult, TestSequenceResult,
};
use crate::normalize;
use crate::policy::{
    DynamicDependencyMapPolicy, ExecutionFailure, FailedTestCoverage,
    ImpactAnalysisSequencePolicyState, IntegrityFailure, PolicyState,
    SafeImpactAnalysisSequencePolicyState, SequencePolicyState, TargetOutputCapture, TestFailure,
    TestPrioritization, TestSharding,
};
use crate::report::{
    ImpactAnalysisSequenceReport, RegularSequenceReport, SafeImpactAnalysisSequenceReport,
    SeedSequenceReport, TestRunReport, TestRunSelection,
};
use crate::selection::TestSelectorAndPrioritizer;
use crate::target::{
    BuildTarget, BuildTargetList, ExcludedTarget, SuiteType, TargetError, TestTarget,
    TestTargetExcludeList,
};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Fired after selection, before any test runs.
pub type TestSequenceStartCallback = Box<dyn FnMut(SuiteType, &TestRunSelection)>;

/// Fired after selection for impact-analysis sequences, with the discarded
/// and drafted target names.
pub type ImpactAnalysisSequenceStartCallback =
    Box<dyn FnMut(SuiteType, &TestRunSelection, &[String], &[String])>;

/// Fired after selection for safe impact-analysis sequences.
pub type SafeImpactAnalysisSequenceStartCallback =
    Box<dyn FnMut(SuiteType, &TestRunSelection, &TestRunSelection, &[String])>;

/// Fired with the assembled report once the sequence has completed.
pub type TestSequenceCompleteCallback<R> = Box<dyn FnMut(&R)>;

/// Catastrophic runtime failures surfaced to the caller.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Target(#[from] TargetError),
    #[error(transparent)]
    Dependency(#[from] DependencyError),
    #[error(transparent)]
    Coverage(#[from] SerializeError),
    #[error("test target '{target}' passed but produced no coverage data (command: '{command}')")]
    MissingCoverage { target: String, command: String },
    #[error("failed to write coverage data to '{path}'")]
    CoverageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result of one engine invocation plus its timing within the sequence.
struct TestRunData<J> {
    result: TestSequenceResult,
    jobs: Vec<J>,
    relative_start: Duration,
    duration: Duration,
}

impl<J> Default for TestRunData<J> {
    fn default() -> Self {
        Self {
            result: TestSequenceResult::Success,
            jobs: Vec::new(),
            relative_start: Duration::ZERO,
            duration: Duration::ZERO,
        }
    }
}

impl TestRunData<TestEngineJob> {
    fn report(&self) -> TestRunReport {
        TestRunReport::new(self.result, self.relative_start, self.duration, &self.jobs)
    }
}

impl TestRunData<TestEngineInstrumentedRun> {
    fn report(&self) -> TestRunReport {
        TestRunReport::new(
            self.result,
            self.relative_start,
            self.duration,
            self.jobs.iter().map(|run| &run.job),
        )
    }
}

/// The test impact analysis runtime.
pub struct Runtime<E: TestEngine> {
    config: RuntimeConfig,
    engine: E,
    suite: SuiteType,
    execution_failure_policy: ExecutionFailure,
    failed_test_coverage_policy: FailedTestCoverage,
    test_failure_policy: TestFailure,
    integrity_failure_policy: IntegrityFailure,
    test_sharding_policy: TestSharding,
    target_output_capture: TargetOutputCapture,
    max_concurrency: usize,
    dependency_map: DynamicDependencyMap,
    selector: TestSelectorAndPrioritizer,
    regular_exclude_list: TestTargetExcludeList,
    instrumented_exclude_list: TestTargetExcludeList,
    data_file_path: PathBuf,
    last_written_digest: Option<blake3::Hash>,
    has_impact_analysis_data: bool,
}

impl<E: TestEngine> Runtime<E> {
    /// Constructs the runtime and attempts to load existing coverage data.
    ///
    /// A missing or empty data file starts the runtime without impact
    /// analysis data. A file that fails to decode or is inconsistent with
    /// the build graph fails construction under the `Abort` integrity
    /// policy, and starts empty otherwise.
    ///
    /// When `tests_to_exclude` is non-empty it overrides both configured
    /// exclude lists. `previous_run_data_file` is accepted for callers that
    /// retain it but is not consumed by any current sequence.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: RuntimeConfig,
        engine: E,
        data_file: Option<PathBuf>,
        _previous_run_data_file: Option<PathBuf>,
        tests_to_exclude: &[ExcludedTarget],
        suite: SuiteType,
        execution_failure_policy: ExecutionFailure,
        failed_test_coverage_policy: FailedTestCoverage,
        test_failure_policy: TestFailure,
        integrity_failure_policy: IntegrityFailure,
        test_sharding_policy: TestSharding,
        target_output_capture: TargetOutputCapture,
        max_concurrency: Option<usize>,
    ) -> Result<Self, RuntimeError> {
        let build_targets = BuildTargetList::new(
            config.targets.test_targets.clone(),
            config.targets.production_targets.clone(),
            suite,
        )?;
        let dependency_map = DynamicDependencyMap::new(build_targets);
        let selector = TestSelectorAndPrioritizer::new(dependency_map.build_targets());

        let test_targets = dependency_map.build_targets().test_targets();
        let (regular_exclude_list, instrumented_exclude_list) = if tests_to_exclude.is_empty() {
            (
                TestTargetExcludeList::new(
                    test_targets,
                    &config.targets.excluded_regular_test_targets,
                ),
                TestTargetExcludeList::new(
                    test_targets,
                    &config.targets.excluded_instrumented_test_targets,
                ),
            )
        } else {
            (
                TestTargetExcludeList::new(test_targets, tests_to_exclude),
                TestTargetExcludeList::new(test_targets, tests_to_exclude),
            )
        };

        let data_file_path = data_file.unwrap_or_else(|| {
            config
                .workspace
                .active_root
                .join(suite.as_str())
                .join(&config.workspace.data_file_name)
        });

        let max_concurrency = max_concurrency.unwrap_or_else(|| {
            std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
        });

        let mut runtime = Self {
            config,
            engine,
            suite,
            execution_failure_policy,
            failed_test_coverage_policy,
            test_failure_policy,
            integrity_failure_policy,
            test_sharding_policy,
            target_output_capture,
            max_concurrency,
            dependency_map,
            selector,
            regular_exclude_list,
            instrumented_exclude_list,
            data_file_path,
            last_written_digest: None,
            has_impact_analysis_data: false,
        };
        runtime.load_coverage_data()?;
        Ok(runtime)
    }

    /// True once the runtime holds coverage data usable for impact analysis.
    pub fn has_impact_analysis_data(&self) -> bool {
        self.has_impact_analysis_data
    }

    /// Runs every non-excluded test target without instrumentation.
    pub fn regular_test_sequence(
        &mut self,
        target_timeout: Option<Duration>,
        global_timeout: Option<Duration>,
        mut start_callback: Option<TestSequenceStartCallback>,
        mut end_callback: Option<TestSequenceCompleteCallback<RegularSequenceReport>>,
        test_complete_callback: Option<TestRunCompleteCallback>,
    ) -> Result<RegularSequenceReport, RuntimeError> {
        let sequence_timer = Timer::start();

        let (included, excluded) = partition_by_exclude_list(
            self.dependency_map.build_targets().test_targets().targets(),
            &self.regular_exclude_list,
        );
        let selected =
            TestRunSelection::new(extract_target_names(&included), extract_target_names(&excluded));

        if let Some(callback) = start_callback.as_mut() {
            callback(self.suite, &selected);
        }

        let tracker = CompletionTracker::new(included.len(), test_complete_callback);
        let run = self.gather_regular_run(
            &included,
            target_timeout,
            global_timeout,
            &tracker,
            &sequence_timer,
        );

        let report = RegularSequenceReport {
            max_concurrency: self.max_concurrency,
            target_timeout,
            global_timeout,
            policy_state: self.sequence_policy_state(),
            suite: self.suite,
            selected,
            selected_run_report: run.report(),
        };

        if let Some(callback) = end_callback.as_mut() {
            callback(&report);
        }
        Ok(report)
    }

    /// Runs every non-excluded test target instrumented and reseeds the
    /// coverage index from scratch with the results.
    pub fn seeded_test_sequence(
        &mut self,
        target_timeout: Option<Duration>,
        global_timeout: Option<Duration>,
        mut start_callback: Option<TestSequenceStartCallback>,
        mut end_callback: Option<TestSequenceCompleteCallback<SeedSequenceReport>>,
        test_complete_callback: Option<TestRunCompleteCallback>,
    ) -> Result<SeedSequenceReport, RuntimeError> {
        let sequence_timer = Timer::start();

        let (included, excluded) = partition_by_exclude_list(
            self.dependency_map.build_targets().test_targets().targets(),
            &self.instrumented_exclude_list,
        );
        let selected =
            TestRunSelection::new(extract_target_names(&included), extract_target_names(&excluded));

        if let Some(callback) = start_callback.as_mut() {
            callback(self.suite, &selected);
        }

        let tracker = CompletionTracker::new(included.len(), test_complete_callback);
        let run = self.gather_instrumented_run(
            &included,
            target_timeout,
            global_timeout,
            &tracker,
            &sequence_timer,
        );

        let report = SeedSequenceReport {
            max_concurrency: self.max_concurrency,
            target_timeout,
            global_timeout,
            policy_state: self.sequence_policy_state(),
            suite: self.suite,
            selected,
            selected_run_report: run.report(),
        };

        if let Some(callback) = end_callback.as_mut() {
            callback(&report);
        }

        self.clear_coverage_and_remove_data_file();
        if let Some(has_data) = self.update_and_serialize_coverage(&run.jobs)? {
            self.has_impact_analysis_data = has_data;
        }
        Ok(report)
    }

    /// Runs the test targets selected for `change_list`, then the drafted
    /// targets whose coverage footprint is unknown. Both phases run
    /// instrumented when the dependency map policy is `Update`, regular
    /// otherwise. Discarded targets are not executed.
    #[allow(clippy::too_many_arguments)]
    pub fn impact_analysis_test_sequence(
        &mut self,
        change_list: &ChangeList,
        test_prioritization: TestPrioritization,
        dynamic_dependency_map_policy: DynamicDependencyMapPolicy,
        target_timeout: Option<Duration>,
        global_timeout: Option<Duration>,
        mut start_callback: Option<ImpactAnalysisSequenceStartCallback>,
        mut end_callback: Option<TestSequenceCompleteCallback<ImpactAnalysisSequenceReport>>,
        test_complete_callback: Option<TestRunCompleteCallback>,
    ) -> Result<ImpactAnalysisSequenceReport, RuntimeError> {
        let sequence_timer = Timer::start();

        // Draft before resolution: resolving may drop orphaned entries and
        // the drafted set must reflect the index the change list ran against.
        let drafted_names = self.not_covering_test_names();
        let changes = self.dependency_map.apply_and_resolve(
            change_list,
            &self.config.repo.root,
            self.integrity_failure_policy,
        )?;

        let selected_targets =
            self.selector
                .select_test_targets(&self.dependency_map, &changes, test_prioritization);
        let discarded_targets = self.discarded_test_targets(&selected_targets, &drafted_names);
        let drafted_targets = self.test_targets_by_name(&drafted_names);

        let (included_selected, excluded_selected) =
            partition_by_exclude_list(selected_targets, &self.instrumented_exclude_list);
        let selected = TestRunSelection::new(
            extract_target_names(&included_selected),
            extract_target_names(&excluded_selected),
        );
        let discarded_names = extract_target_names(&discarded_targets);

        if let Some(callback) = start_callback.as_mut() {
            callback(self.suite, &selected, &discarded_names, &drafted_names);
        }

        let total = included_selected.len() + drafted_targets.len();
        let tracker = CompletionTracker::new(total, test_complete_callback);

        let instrumented =
            dynamic_dependency_map_policy == DynamicDependencyMapPolicy::Update;
        let (selected_run_report, drafted_run_report, instrumented_jobs) = if instrumented {
            let selected_run = self.gather_instrumented_run(
                &included_selected,
                target_timeout,
                global_timeout,
                &tracker,
                &sequence_timer,
            );
            let remaining = remaining_budget(global_timeout, selected_run.duration);
            let drafted_run = self.gather_instrumented_run(
                &drafted_targets,
                target_timeout,
                remaining,
                &tracker,
                &sequence_timer,
            );
            let reports = (selected_run.report(), drafted_run.report());
            let mut jobs = selected_run.jobs;
            jobs.extend(drafted_run.jobs);
            (reports.0, reports.1, Some(jobs))
        } else {
            let selected_run = self.gather_regular_run(
                &included_selected,
                target_timeout,
                global_timeout,
                &tracker,
                &sequence_timer,
            );
            let remaining = remaining_budget(global_timeout, selected_run.duration);
            let drafted_run = self.gather_regular_run(
                &drafted_targets,
                target_timeout,
                remaining,
                &tracker,
                &sequence_timer,
            );
            (selected_run.report(), drafted_run.report(), None)
        };

        let report = ImpactAnalysisSequenceReport {
            max_concurrency: self.max_concurrency,
            target_timeout,
            global_timeout,
            policy_state: self.impact_analysis_policy_state(
                test_prioritization,
                dynamic_dependency_map_policy,
            ),
            suite: self.suite,
            selected,
            discarded: discarded_names,
            drafted: drafted_names,
            selected_run_report,
            drafted_run_report,
        };

        if let Some(callback) = end_callback.as_mut() {
            callback(&report);
        }

        if let Some(jobs) = instrumented_jobs {
            if let Some(has_data) = self.update_and_serialize_coverage(&jobs)? {
                self.has_impact_analysis_data = has_data;
            }
        }
        Ok(report)
    }

    /// Like the impact-analysis sequence, but additionally runs the
    /// discarded targets without instrumentation between the selected and
    /// drafted phases, so a mis-predicting coverage index cannot hide
    /// regressions.
    #[allow(clippy::too_many_arguments)]
    pub fn safe_impact_analysis_test_sequence(
        &mut self,
        change_list: &ChangeList,
        test_prioritization: TestPrioritization,
        target_timeout: Option<Duration>,
        global_timeout: Option<Duration>,
        mut start_callback: Option<SafeImpactAnalysisSequenceStartCallback>,
        mut end_callback: Option<TestSequenceCompleteCallback<SafeImpactAnalysisSequenceReport>>,
        test_complete_callback: Option<TestRunCompleteCallback>,
    ) -> Result<SafeImpactAnalysisSequenceReport, RuntimeError> {
        let sequence_timer = Timer::start();

        let drafted_names = self.not_covering_test_names();
        let changes = self.dependency_map.apply_and_resolve(
            change_list,
            &self.config.repo.root,
            self.integrity_failure_policy,
        )?;

        let selected_targets =
            self.selector
                .select_test_targets(&self.dependency_map, &changes, test_prioritization);
        let discarded_targets = self.discarded_test_targets(&selected_targets, &drafted_names);
        let drafted_targets = self.test_targets_by_name(&drafted_names);

        let (included_selected, excluded_selected) =
            partition_by_exclude_list(selected_targets, &self.instrumented_exclude_list);
        let (included_discarded, excluded_discarded) =
            partition_by_exclude_list(discarded_targets, &self.regular_exclude_list);

        let selected = TestRunSelection::new(
            extract_target_names(&included_selected),
            extract_target_names(&excluded_selected),
        );
        let discarded = TestRunSelection::new(
            extract_target_names(&included_discarded),
            extract_target_names(&excluded_discarded),
        );

        if let Some(callback) = start_callback.as_mut() {
            callback(self.suite, &selected, &discarded, &drafted_names);
        }

        let total = included_selected.len() + included_discarded.len() + drafted_targets.len();
        let tracker = CompletionTracker::new(total, test_complete_callback);

        let selected_run = self.gather_instrumented_run(
            &included_selected,
            target_timeout,
            global_timeout,
            &tracker,
            &sequence_timer,
        );
        let mut remaining = remaining_budget(global_timeout, selected_run.duration);
        let discarded_run = self.gather_regular_run(
            &included_discarded,
            target_timeout,
            remaining,
            &tracker,
            &sequence_timer,
        );
        remaining = remaining_budget(
            global_timeout,
            selected_run.duration + discarded_run.duration,
        );
        let drafted_run = self.gather_instrumented_run(
            &drafted_targets,
            target_timeout,
            remaining,
            &tracker,
            &sequence_timer,
        );

        let report = SafeImpactAnalysisSequenceReport {
            max_concurrency: self.max_concurrency,
            target_timeout,
            global_timeout,
            policy_state: self.safe_impact_analysis_policy_state(test_prioritization),
            suite: self.suite,
            selected,
            discarded,
            drafted: drafted_names,
            selected_run_report: selected_run.report(),
            discarded_run_report: discarded_run.report(),
            drafted_run_report: drafted_run.report(),
        };

        if let Some(callback) = end_callback.as_mut() {
            callback(&report);
        }

        let mut jobs = selected_run.jobs;
        jobs.extend(drafted_run.jobs);
        if let Some(has_data) = self.update_and_serialize_coverage(&jobs)? {
            self.has_impact_analysis_data = has_data;
        }
        Ok(report)
    }

    fn policy_state(&self) -> PolicyState {
        PolicyState {
            execution_failure: self.execution_failure_policy,
            failed_test_coverage: self.failed_test_coverage_policy,
            test_failure: self.test_failure_policy,
            integrity_failure: self.integrity_failure_policy,
            test_sharding: self.test_sharding_policy,
            target_output_capture: self.target_output_capture,
        }
    }

    fn sequence_policy_state(&self) -> SequencePolicyState {
        SequencePolicyState {
            base: self.policy_state(),
        }
    }

    fn impact_analysis_policy_state(
        &self,
        test_prioritization: TestPrioritization,
        dynamic_dependency_map: DynamicDependencyMapPolicy,
    ) -> ImpactAnalysisSequencePolicyState {
        ImpactAnalysisSequencePolicyState {
            base: self.policy_state(),
            test_prioritization,
            dynamic_dependency_map,
        }
    }

    fn safe_impact_analysis_policy_state(
        &self,
        test_prioritization: TestPrioritization,
    ) -> SafeImpactAnalysisSequencePolicyState {
        SafeImpactAnalysisSequencePolicyState {
            base: self.policy_state(),
            test_prioritization,
        }
    }

    fn not_covering_test_names(&self) -> Vec<String> {
        self.dependency_map
            .get_not_covering_tests()
            .iter()
            .map(|target| target.name().to_string())
            .collect()
    }

    /// Universe minus selected minus drafted.
    fn discarded_test_targets(
        &self,
        selected: &[&TestTarget],
        drafted_names: &[String],
    ) -> Vec<&TestTarget> {
        let selected_names: BTreeSet<&str> = selected.iter().map(|t| t.name()).collect();
        let drafted: BTreeSet<&str> = drafted_names.iter().map(String::as_str).collect();
        self.dependency_map
            .build_targets()
            .test_targets()
            .targets()
            .iter()
            .filter(|target| {
                !selected_names.contains(target.name()) && !drafted.contains(target.name())
            })
            .collect()
    }

    fn test_targets_by_name(&self, names: &[String]) -> Vec<&TestTarget> {
        names
            .iter()
            .filter_map(|name| self.dependency_map.build_targets().test_targets().get(name))
            .collect()
    }

    fn gather_regular_run(
        &self,
        targets: &[&TestTarget],
        target_timeout: Option<Duration>,
        global_timeout: Option<Duration>,
        tracker: &CompletionTracker,
        sequence_timer: &Timer,
    ) -> TestRunData<TestEngineJob> {
        if targets.is_empty() {
            return TestRunData::default();
        }
        let phase_timer = Timer::start();
        let relative_start = phase_timer.start_relative_to(sequence_timer);
        let (result, jobs) = self.engine.regular_run(
            targets,
            self.execution_failure_policy,
            self.test_failure_policy,
            self.target_output_capture,
            target_timeout,
            global_timeout,
            &|job| tracker.on_job_complete(job),
        );
        TestRunData {
            result,
            jobs,
            relative_start,
            duration: phase_timer.elapsed(),
        }
    }

    fn gather_instrumented_run(
        &self,
        targets: &[&TestTarget],
        target_timeout: Option<Duration>,
        global_timeout: Option<Duration>,
        tracker: &CompletionTracker,
        sequence_timer: &Timer,
    ) -> TestRunData<TestEngineInstrumentedRun> {
        if targets.is_empty() {
            return TestRunData::default();
        }
        let phase_timer = Timer::start();
        let relative_start = phase_timer.start_relative_to(sequence_timer);
        let (result, jobs) = self.engine.instrumented_run(
            targets,
            self.execution_failure_policy,
            self.integrity_failure_policy,
            self.test_failure_policy,
            self.target_output_capture,
            target_timeout,
            global_timeout,
            &|job| tracker.on_job_complete(job),
        );
        TestRunData {
            result,
            jobs,
            relative_start,
            duration: phase_timer.elapsed(),
        }
    }

    fn load_coverage_data(&mut self) -> Result<(), RuntimeError> {
        match self.try_load_coverage_data() {
            Ok(true) => {
                self.has_impact_analysis_data = true;
                Ok(())
            }
            Ok(false) => {
                eprintln!(
                    "[runtime] INFO: no test impact analysis data found for suite '{}' at '{}'",
                    self.suite.as_str(),
                    self.data_file_path.display()
                );
                Ok(())
            }
            Err(e) => {
                if self.integrity_failure_policy == IntegrityFailure::Abort {
                    return Err(e);
                }
                eprintln!(
                    "[runtime] WARN: discarding unusable test impact analysis data at '{}': {e}",
                    self.data_file_path.display()
                );
                self.dependency_map.clear_all();
                self.last_written_digest = None;
                Ok(())
            }
        }
    }

    fn try_load_coverage_data(&mut self) -> Result<bool, RuntimeError> {
        let Ok(raw) = fs::read_to_string(&self.data_file_path) else {
            return Ok(false);
        };
        if raw.trim().is_empty() {
            return Ok(false);
        }
        let list = deserialize_source_covering_tests_list(&raw)?;
        if list.is_empty() {
            return Ok(false);
        }
        self.dependency_map.replace_source_coverage(&list)?;
        self.last_written_digest = Some(blake3::hash(raw.as_bytes()));
        Ok(true)
    }

    fn clear_coverage_and_remove_data_file(&mut self) {
        self.dependency_map.clear_all();
        self.has_impact_analysis_data = false;
        self.last_written_digest = None;
        if let Err(e) = fs::remove_file(&self.data_file_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                eprintln!(
                    "[runtime] WARN: failed to remove coverage data file '{}': {e}",
                    self.data_file_path.display()
                );
            }
        }
    }

    /// Reconciles the coverage of the instrumented jobs into the dependency
    /// map and persists the result.
    ///
    /// Returns `Ok(Some(true))` when the index was replaced and persisted,
    /// `Ok(None)` when the jobs yielded no usable coverage. Failures obey
    /// the integrity policy: `Abort` propagates, `Continue` logs and leaves
    /// the on-disk data untouched.
    fn update_and_serialize_coverage(
        &mut self,
        jobs: &[TestEngineInstrumentedRun],
    ) -> Result<Option<bool>, RuntimeError> {
        match self.try_update_coverage(jobs) {
            Ok(updated) => Ok(updated),
            Err(e) => {
                if self.integrity_failure_policy == IntegrityFailure::Abort {
                    return Err(e);
                }
                eprintln!("[runtime] ERROR: coverage update failed: {e}");
                Ok(None)
            }
        }
    }

    fn try_update_coverage(
        &mut self,
        jobs: &[TestEngineInstrumentedRun],
    ) -> Result<Option<bool>, RuntimeError> {
        let fresh = self.build_source_covering_tests(jobs)?;
        if fresh.is_empty() {
            return Ok(None);
        }

        // Merge with what survived the per-test pruning: targets that were
        // not part of this run keep their footprint.
        let mut entries: Vec<SourceCoveringTests> =
            self.dependency_map.export().sources().to_vec();
        entries.extend(fresh.sources().iter().cloned());
        let merged = SourceCoveringTestsList::new(entries);

        self.dependency_map.replace_source_coverage(&merged)?;

        let payload = serialize_source_covering_tests_list(&self.dependency_map.export());
        let digest = blake3::hash(payload.as_bytes());
        if self.last_written_digest == Some(digest) {
            eprintln!(
                "[runtime] INFO: coverage data unchanged, skipping write to '{}'",
                self.data_file_path.display()
            );
            return Ok(Some(true));
        }

        write_file_atomically(&self.data_file_path, &payload).map_err(|source| {
            RuntimeError::CoverageWrite {
                path: self.data_file_path.clone(),
                source,
            }
        })?;
        self.last_written_digest = Some(digest);
        Ok(Some(true))
    }

    /// Prunes each job's previous footprint, then accumulates the fresh
    /// `(source, test)` pairs of the jobs whose coverage is ingestible.
    fn build_source_covering_tests(
        &mut self,
        jobs: &[TestEngineInstrumentedRun],
    ) -> Result<SourceCoveringTestsList, RuntimeError> {
        let mut accumulated: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for run in jobs {
            // Unconditional: stale sources from a previous build of this
            // target must never leak forward.
            self.dependency_map
                .remove_test_from_source_coverage(&run.job.target_name);

            if run.job.result == TestResult::TestFailures
                && self.failed_test_coverage_policy == FailedTestCoverage::Discard
            {
                continue;
            }
            if !matches!(
                run.job.result,
                TestResult::AllTestsPass | TestResult::TestFailures
            ) {
                continue;
            }

            let Some(coverage) = run.coverage.as_ref() else {
                if run.job.result == TestResult::AllTestsPass {
                    return Err(RuntimeError::MissingCoverage {
                        target: run.job.target_name.clone(),
                        command: run.job.command.clone(),
                    });
                }
                // A failing target without an artifact typically aborted
                // mid-run; the failure report picks it up.
                continue;
            };

            for source in &coverage.sources_covered {
                match normalize::to_repo_relative(source, &self.config.repo.root) {
                    Some(path) => {
                        accumulated
                            .entry(path)
                            .or_default()
                            .insert(run.job.target_name.clone());
                    }
                    None => {
                        eprintln!(
                            "[runtime] WARN: ignoring covered source outside of repo: '{}'",
                            source.display()
                        );
                    }
                }
            }
        }

        Ok(SourceCoveringTestsList::new(
            accumulated
                .into_iter()
                .map(|(source, tests)| SourceCoveringTests {
                    source,
                    covering_tests: tests.into_iter().collect(),
                })
                .collect(),
        ))
    }
}

/// Splits targets into those the exclude list lets run and those it filters
/// out entirely.
fn partition_by_exclude_list<'a>(
    targets: impl IntoIterator<Item = &'a TestTarget>,
    exclude_list: &TestTargetExcludeList,
) -> (Vec<&'a TestTarget>, Vec<&'a TestTarget>) {
    let mut included = Vec::new();
    let mut excluded = Vec::new();
    for target in targets {
        if exclude_list.is_test_target_fully_excluded(target) {
            excluded.push(target);
        } else {
            included.push(target);
        }
    }
    (included, excluded)
}

fn extract_target_names(targets: &[&TestTarget]) -> Vec<String> {
    targets
        .iter()
        .map(|target| target.name().to_string())
        .collect()
}

fn remaining_budget(global_timeout: Option<Duration>, elapsed: Duration) -> Option<Duration> {
    global_timeout.map(|budget| budget.saturating_sub(elapsed))
}

fn write_file_atomically(path: &Path, payload: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, payload)?;
    fs::rename(&tmp, path)
}
