//! Change lists and their resolved form.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A source-level change set: three disjoint sets of paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeList {
    #[serde(default)]
    pub created: Vec<PathBuf>,
    #[serde(default)]
    pub updated: Vec<PathBuf>,
    #[serde(default)]
    pub deleted: Vec<PathBuf>,
}

impl ChangeList {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}

/// One changed source after resolution: its normalized path, the build
/// targets whose descriptors list it, and the tests covering it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDependency {
    pub path: String,
    pub parent_targets: Vec<String>,
    pub covering_tests: Vec<String>,
}

/// A change list resolved against the build graph and coverage index.
///
/// Every changed source lands in exactly one bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeDependencyList {
    covered: Vec<SourceDependency>,
    uncovered: Vec<SourceDependency>,
    new_sources: Vec<SourceDependency>,
    orphaned: Vec<SourceDependency>,
}

impl ChangeDependencyList {
    /// Sources known to the build graph with coverage entries. Their
    /// covering tests drive selection.
    pub fn covered(&self) -> &[SourceDependency] {
        &self.covered
    }

    /// Sources known to the build graph but absent from the coverage index.
    pub fn uncovered(&self) -> &[SourceDependency] {
        &self.uncovered
    }

    /// Sources unknown to the build graph.
    pub fn new_sources(&self) -> &[SourceDependency] {
        &self.new_sources
    }

    /// Sources whose coverage entries turned out to be stale.
    pub fn orphaned(&self) -> &[SourceDependency] {
        &self.orphaned
    }

    pub fn is_empty(&self) -> bool {
        self.covered.is_empty()
            && self.uncovered.is_empty()
            && self.new_sources.is_empty()
            && self.orphaned.is_empty()
    }

    pub(crate) fn push_covered(&mut self, dependency: SourceDependency) {
        self.covered.push(dependency);
    }

    pub(crate) fn push_uncovered(&mut self, dependency: SourceDependency) {
        self.uncovered.push(dependency);
    }

    pub(crate) fn push_new_source(&mut self, dependency: SourceDependency) {
        self.new_sources.push(dependency);
    }

    pub(crate) fn push_orphaned(&mut self, dependency: SourceDependency) {
        self.orphaned.push(dependency);
    }
}
