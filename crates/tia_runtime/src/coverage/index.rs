//! Bidirectional source/test coverage map.

use super::serialize::{SourceCoveringTests, SourceCoveringTestsList};
use std::collections::{BTreeMap, BTreeSet};

/// Maps each source to the set of test targets covering it, with the inverse
/// map maintained consistently.
///
/// Sources with an empty covering set are removed eagerly, so every key has
/// at least one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageIndex {
    source_to_tests: BTreeMap<String, BTreeSet<String>>,
    test_to_sources: BTreeMap<String, BTreeSet<String>>,
}

impl CoverageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `test` covers `source`.
    pub fn insert(&mut self, source: &str, test: &str) {
        self.source_to_tests
            .entry(source.to_string())
            .or_default()
            .insert(test.to_string());
        self.test_to_sources
            .entry(test.to_string())
            .or_default()
            .insert(source.to_string());
    }

    /// The test targets covering `source`, if any.
    pub fn covering_tests(&self, source: &str) -> Option<&BTreeSet<String>> {
        self.source_to_tests.get(source)
    }

    /// The sources covered by `test`, if any.
    pub fn covered_sources(&self, test: &str) -> Option<&BTreeSet<String>> {
        self.test_to_sources.get(test)
    }

    /// True when `test` appears in at least one source's covering set.
    pub fn is_covering_test(&self, test: &str) -> bool {
        self.test_to_sources.contains_key(test)
    }

    /// Removes `test` from every source's covering set. Sources left with an
    /// empty set are removed.
    pub fn remove_test(&mut self, test: &str) {
        let Some(sources) = self.test_to_sources.remove(test) else {
            return;
        };
        for source in sources {
            if let Some(tests) = self.source_to_tests.get_mut(&source) {
                tests.remove(test);
                if tests.is_empty() {
                    self.source_to_tests.remove(&source);
                }
            }
        }
    }

    /// Removes `source` and its entry from every covering test's source set.
    pub fn remove_source(&mut self, source: &str) {
        let Some(tests) = self.source_to_tests.remove(source) else {
            return;
        };
        for test in tests {
            if let Some(sources) = self.test_to_sources.get_mut(&test) {
                sources.remove(source);
                if sources.is_empty() {
                    self.test_to_sources.remove(&test);
                }
            }
        }
    }

    /// Number of sources with a non-empty covering set.
    pub fn num_sources(&self) -> usize {
        self.source_to_tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source_to_tests.is_empty()
    }

    pub fn clear(&mut self) {
        self.source_to_tests.clear();
        self.test_to_sources.clear();
    }

    /// Deterministic serializable view: sources ascending, test names
    /// ascending within each source.
    pub fn export(&self) -> SourceCoveringTestsList {
        SourceCoveringTestsList::new(
            self.source_to_tests
                .iter()
                .map(|(source, tests)| SourceCoveringTests {
                    source: source.clone(),
                    covering_tests: tests.iter().cloned().collect(),
                })
                .collect(),
        )
    }
}

impl From<&SourceCoveringTestsList> for CoverageIndex {
    fn from(list: &SourceCoveringTestsList) -> Self {
        let mut index = Self::new();
        for entry in list.sources() {
            for test in &entry.covering_tests {
                index.insert(&entry.source, test);
            }
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CoverageIndex {
        let mut index = CoverageIndex::new();
        index.insert("src/a.cpp", "TestA");
        index.insert("src/a.cpp", "TestB");
        index.insert("src/b.cpp", "TestB");
        index
    }

    #[test]
    fn insert_maintains_both_directions() {
        let index = sample();
        assert_eq!(
            index.covering_tests("src/a.cpp").map(BTreeSet::len),
            Some(2)
        );
        assert_eq!(
            index.covered_sources("TestB").map(BTreeSet::len),
            Some(2)
        );
        assert!(index.is_covering_test("TestA"));
        assert_eq!(index.num_sources(), 2);
    }

    #[test]
    fn remove_test_drops_empty_sources() {
        let mut index = sample();
        index.remove_test("TestB");

        assert!(!index.is_covering_test("TestB"));
        assert!(index.covering_tests("src/b.cpp").is_none());
        assert_eq!(
            index.covering_tests("src/a.cpp").map(BTreeSet::len),
            Some(1)
        );
        assert_eq!(index.num_sources(), 1);
    }

    #[test]
    fn remove_source_drops_empty_tests() {
        let mut index = sample();
        index.remove_source("src/b.cpp");

        assert!(index.covering_tests("src/b.cpp").is_none());
        // TestB still covers src/a.cpp.
        assert!(index.is_covering_test("TestB"));

        index.remove_source("src/a.cpp");
        assert!(!index.is_covering_test("TestA"));
        assert!(!index.is_covering_test("TestB"));
        assert!(index.is_empty());
    }

    #[test]
    fn remove_then_insert_yields_only_new_coverage() {
        let mut index = sample();
        index.remove_test("TestA");
        index.insert("src/c.cpp", "TestA");

        assert_eq!(
            index.covering_tests("src/c.cpp"),
            Some(&BTreeSet::from(["TestA".to_string()]))
        );
        assert_eq!(
            index.covered_sources("TestA"),
            Some(&BTreeSet::from(["src/c.cpp".to_string()]))
        );
    }

    #[test]
    fn removing_unknown_entries_is_a_noop() {
        let mut index = sample();
        index.remove_test("Ghost");
        index.remove_source("src/ghost.cpp");
        assert_eq!(index, sample());
    }

    #[test]
    fn export_round_trips_through_list() {
        let index = sample();
        let list = index.export();
        assert_eq!(CoverageIndex::from(&list), index);
    }

    #[test]
    fn clear_empties_everything() {
        let mut index = sample();
        index.clear();
        assert!(index.is_empty());
        assert_eq!(index.num_sources(), 0);
    }
}
