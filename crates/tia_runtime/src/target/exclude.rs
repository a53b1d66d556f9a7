//! Test target exclusion rules.
//!
//! An excluded target with no individual test entries is fully excluded and
//! never launched. A non-empty entry list is a partial exclusion: the engine
//! filters the named tests but the target itself still runs.
#![allow(clippy::print_stderr)]

use super::{BuildTarget, TargetList, TestTarget};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Exclusion rule for one test target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludedTarget {
    pub target: String,
    /// Individual tests filtered out. Empty means the whole target.
    #[serde(default)]
    pub excluded_tests: Vec<String>,
}

/// Per-suite set of fully-excluded test targets.
#[derive(Debug, Clone, Default)]
pub struct TestTargetExcludeList {
    fully_excluded: BTreeSet<String>,
}

impl TestTargetExcludeList {
    /// Builds the exclude list, keeping only rules that name targets present
    /// in `test_targets`. Unknown names are logged and dropped.
    pub fn new(test_targets: &TargetList<TestTarget>, excluded: &[ExcludedTarget]) -> Self {
        let mut fully_excluded = BTreeSet::new();
        for rule in excluded {
            if !test_targets.has(&rule.target) {
                eprintln!(
                    "[target] WARN: exclude rule names unknown test target '{}'",
                    rule.target
                );
                continue;
            }
            if rule.excluded_tests.is_empty() {
                fully_excluded.insert(rule.target.clone());
            }
        }
        Self { fully_excluded }
    }

    /// True when every sub-test of the target is filtered out.
    pub fn is_test_target_fully_excluded(&self, target: &TestTarget) -> bool {
        self.fully_excluded.contains(target.name())
    }

    pub fn len(&self) -> usize {
        self.fully_excluded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fully_excluded.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::target::{SuiteType, TargetDescriptor, TestTargetDescriptor};

    fn test_targets(names: &[&str]) -> TargetList<TestTarget> {
        TargetList::new(
            names
                .iter()
                .map(|name| {
                    TestTarget::new(TestTargetDescriptor {
                        target: TargetDescriptor {
                            name: (*name).into(),
                            sources: Vec::new(),
                            dependencies: Vec::new(),
                        },
                        suite: SuiteType::Main,
                    })
                })
                .collect(),
        )
        .unwrap()
    }

    fn rule(target: &str, tests: &[&str]) -> ExcludedTarget {
        ExcludedTarget {
            target: target.into(),
            excluded_tests: tests.iter().map(|t| (*t).into()).collect(),
        }
    }

    #[test]
    fn empty_rule_set_excludes_nothing() {
        let targets = test_targets(&["a", "b"]);
        let list = TestTargetExcludeList::new(&targets, &[]);
        assert!(list.is_empty());
        assert!(!list.is_test_target_fully_excluded(targets.get("a").unwrap()));
    }

    #[test]
    fn rule_without_tests_fully_excludes_target() {
        let targets = test_targets(&["a", "b"]);
        let list = TestTargetExcludeList::new(&targets, &[rule("a", &[])]);
        assert!(list.is_test_target_fully_excluded(targets.get("a").unwrap()));
        assert!(!list.is_test_target_fully_excluded(targets.get("b").unwrap()));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn partial_rule_does_not_fully_exclude() {
        let targets = test_targets(&["a"]);
        let list = TestTargetExcludeList::new(&targets, &[rule("a", &["SomeTest.case"])]);
        assert!(!list.is_test_target_fully_excluded(targets.get("a").unwrap()));
    }

    #[test]
    fn unknown_target_rule_is_dropped() {
        let targets = test_targets(&["a"]);
        let list = TestTargetExcludeList::new(&targets, &[rule("ghost", &[])]);
        assert!(list.is_empty());
    }
}
