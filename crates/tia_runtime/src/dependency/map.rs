//! Dynamic dependency map.
//!
//! Owns the build target universe and the coverage index, and resolves
//! change lists into classified dependency lists.
#![allow(clippy::print_stderr)]

use super::change_list::{ChangeDependencyList, ChangeList, SourceDependency};
use super::DependencyError;
use crate::coverage::{CoverageIndex, SourceCoveringTestsList};
use crate::normalize;
use crate::policy::IntegrityFailure;
use crate::target::{BuildTarget, BuildTargetList, TestTarget};
use std::collections::BTreeMap;
use std::path::Path;

enum ChangeOperation {
    Created,
    Updated,
    Deleted,
}

/// Build graph view plus coverage index.
#[derive(Debug)]
pub struct DynamicDependencyMap {
    build_targets: BuildTargetList,
    /// Normalized source path to the names of targets listing it.
    source_owners: BTreeMap<String, Vec<String>>,
    coverage: CoverageIndex,
}

impl DynamicDependencyMap {
    pub fn new(build_targets: BuildTargetList) -> Self {
        let mut source_owners: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let tests = build_targets.test_targets().targets().iter();
        let productions = build_targets.production_targets().targets().iter();
        let all: Vec<(&str, &[String])> = tests
            .map(|t| (t.name(), t.sources()))
            .chain(productions.map(|t| (t.name(), t.sources())))
            .collect();
        for (name, sources) in all {
            for source in sources {
                source_owners
                    .entry(normalize::normalize_separators(source))
                    .or_default()
                    .push(name.to_string());
            }
        }

        Self {
            build_targets,
            source_owners,
            coverage: CoverageIndex::new(),
        }
    }

    pub fn build_targets(&self) -> &BuildTargetList {
        &self.build_targets
    }

    pub fn coverage(&self) -> &CoverageIndex {
        &self.coverage
    }

    /// Classifies every path in `changes` against the build graph and the
    /// coverage index.
    ///
    /// Stale coverage (a created source that already has entries, or a
    /// deleted source covered but no longer referenced by any descriptor)
    /// fails with [`DependencyError`] under the `Abort` policy; otherwise the
    /// anomaly is logged, reported as orphaned, and the stale entry dropped.
    /// Paths outside the repo are logged and skipped. Coverage entries of
    /// deleted sources are removed.
    pub fn apply_and_resolve(
        &mut self,
        changes: &ChangeList,
        repo_root: &Path,
        integrity_failure: IntegrityFailure,
    ) -> Result<ChangeDependencyList, DependencyError> {
        let mut resolved = ChangeDependencyList::default();

        let operations = [
            (&changes.created, ChangeOperation::Created),
            (&changes.updated, ChangeOperation::Updated),
            (&changes.deleted, ChangeOperation::Deleted),
        ];
        for (paths, operation) in operations {
            for raw_path in paths {
                let Some(path) = normalize::normalize_change_path(raw_path, repo_root) else {
                    eprintln!(
                        "[dependency] WARN: ignoring changed source outside of repo: '{}'",
                        raw_path.display()
                    );
                    continue;
                };
                self.resolve_source(&path, &operation, integrity_failure, &mut resolved)?;
            }
        }

        Ok(resolved)
    }

    fn resolve_source(
        &mut self,
        path: &str,
        operation: &ChangeOperation,
        integrity_failure: IntegrityFailure,
        resolved: &mut ChangeDependencyList,
    ) -> Result<(), DependencyError> {
        let parent_targets = self.source_owners.get(path).cloned().unwrap_or_default();
        let covering_tests: Vec<String> = self
            .coverage
            .covering_tests(path)
            .map(|tests| tests.iter().cloned().collect())
            .unwrap_or_default();
        let dependency = SourceDependency {
            path: path.to_string(),
            parent_targets: parent_targets.clone(),
            covering_tests: covering_tests.clone(),
        };

        match operation {
            ChangeOperation::Created => {
                if !covering_tests.is_empty() {
                    // Coverage predating the file's existence is stale by definition.
                    if integrity_failure == IntegrityFailure::Abort {
                        return Err(DependencyError::CreatedSourceCovered {
                            path: path.to_string(),
                        });
                    }
                    eprintln!(
                        "[dependency] WARN: created source '{path}' already has coverage, dropping stale entry"
                    );
                    self.coverage.remove_source(path);
                    resolved.push_orphaned(dependency);
                } else if parent_targets.is_empty() {
                    resolved.push_new_source(dependency);
                } else {
                    resolved.push_uncovered(dependency);
                }
            }
            ChangeOperation::Updated => {
                if !covering_tests.is_empty() {
                    resolved.push_covered(dependency);
                } else if parent_targets.is_empty() {
                    resolved.push_new_source(dependency);
                } else {
                    resolved.push_uncovered(dependency);
                }
            }
            ChangeOperation::Deleted => {
                if !covering_tests.is_empty() && parent_targets.is_empty() {
                    if integrity_failure == IntegrityFailure::Abort {
                        return Err(DependencyError::OrphanedSourceCoverage {
                            path: path.to_string(),
                        });
                    }
                    eprintln!(
                        "[dependency] WARN: deleted source '{path}' has stale coverage, dropping entry"
                    );
                    resolved.push_orphaned(dependency);
                } else if !covering_tests.is_empty() {
                    // Still referenced by a descriptor: run the tests that covered it.
                    resolved.push_covered(dependency);
                } else if !parent_targets.is_empty() {
                    resolved.push_uncovered(dependency);
                }
                // Unknown and uncovered deletions resolve to nothing.
                self.coverage.remove_source(path);
            }
        }

        Ok(())
    }

    /// Atomically replaces the coverage index.
    ///
    /// Every covering test must name a test target in the universe.
    pub fn replace_source_coverage(
        &mut self,
        list: &SourceCoveringTestsList,
    ) -> Result<(), DependencyError> {
        for entry in list.sources() {
            for test in &entry.covering_tests {
                if !self.build_targets.test_targets().has(test) {
                    return Err(DependencyError::UnknownCoveringTest { name: test.clone() });
                }
            }
        }
        self.coverage = CoverageIndex::from(list);
        Ok(())
    }

    /// Test targets with no entry in any source's covering set, in name
    /// order. These have an unknown coverage footprint and must be drafted.
    pub fn get_not_covering_tests(&self) -> Vec<&TestTarget> {
        self.build_targets
            .test_targets()
            .targets()
            .iter()
            .filter(|target| !self.coverage.is_covering_test(target.name()))
            .collect()
    }

    /// Erases `test` from every source's covering set.
    pub fn remove_test_from_source_coverage(&mut self, test: &str) {
        self.coverage.remove_test(test);
    }

    /// Empties the coverage index.
    pub fn clear_all(&mut self) {
        self.coverage.clear();
    }

    /// Deterministic serializable view of the coverage index.
    pub fn export(&self) -> SourceCoveringTestsList {
        self.coverage.export()
    }
}
