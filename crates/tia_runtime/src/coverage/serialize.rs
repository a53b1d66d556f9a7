//! Deterministic serialization of coverage data.
//!
//! The on-disk test impact analysis file is a JSON rendering of a
//! [`SourceCoveringTestsList`]. Construction canonicalizes ordering, so
//! serializing equal indices is byte-for-byte identical.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Errors that can occur while decoding a coverage data file.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("invalid coverage data: {0}")]
    InvalidJson(String),
}

impl From<serde_json::Error> for SerializeError {
    fn from(e: serde_json::Error) -> Self {
        SerializeError::InvalidJson(e.to_string())
    }
}

/// One source and the test targets covering it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCoveringTests {
    pub source: String,
    pub covering_tests: Vec<String>,
}

/// Canonical list of per-source coverage: sources ascending and unique,
/// test names ascending and unique within each source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCoveringTestsList {
    sources: Vec<SourceCoveringTests>,
}

impl SourceCoveringTestsList {
    /// Builds the canonical form: duplicate sources are merged and all
    /// orderings normalized.
    pub fn new(entries: Vec<SourceCoveringTests>) -> Self {
        let mut merged: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for entry in entries {
            merged
                .entry(entry.source)
                .or_default()
                .extend(entry.covering_tests);
        }
        Self {
            sources: merged
                .into_iter()
                .filter(|(_, tests)| !tests.is_empty())
                .map(|(source, tests)| SourceCoveringTests {
                    source,
                    covering_tests: tests.into_iter().collect(),
                })
                .collect(),
        }
    }

    pub fn sources(&self) -> &[SourceCoveringTests] {
        &self.sources
    }

    pub fn num_sources(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Serializes the list to its canonical JSON form.
pub fn serialize_source_covering_tests_list(list: &SourceCoveringTestsList) -> String {
    // Cannot fail: the type contains only strings and vectors.
    serde_json::to_string_pretty(list).unwrap_or_default()
}

/// Decodes a coverage data file, re-canonicalizing the ordering.
pub fn deserialize_source_covering_tests_list(
    data: &str,
) -> Result<SourceCoveringTestsList, SerializeError> {
    let raw: SourceCoveringTestsList = serde_json::from_str(data)?;
    Ok(SourceCoveringTestsList::new(raw.sources))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn entry(source: &str, tests: &[&str]) -> SourceCoveringTests {
        SourceCoveringTests {
            source: source.into(),
            covering_tests: tests.iter().map(|t| (*t).into()).collect(),
        }
    }

    #[test]
    fn construction_sorts_and_merges() {
        let list = SourceCoveringTestsList::new(vec![
            entry("b.cpp", &["T2"]),
            entry("a.cpp", &["T3", "T1"]),
            entry("b.cpp", &["T1", "T2"]),
        ]);

        assert_eq!(
            list.sources(),
            &[entry("a.cpp", &["T1", "T3"]), entry("b.cpp", &["T1", "T2"])]
        );
    }

    #[test]
    fn construction_drops_entries_without_tests() {
        let list = SourceCoveringTestsList::new(vec![entry("a.cpp", &[]), entry("b.cpp", &["T"])]);
        assert_eq!(list.num_sources(), 1);
    }

    #[test]
    fn round_trip_preserves_content() {
        let list = SourceCoveringTestsList::new(vec![
            entry("src/a.cpp", &["TestA", "TestB"]),
            entry("src/b.cpp", &["TestB"]),
        ]);

        let data = serialize_source_covering_tests_list(&list);
        let decoded = deserialize_source_covering_tests_list(&data).unwrap();
        assert_eq!(decoded, list);
    }

    #[test]
    fn serialization_is_deterministic_for_equal_content() {
        let first = SourceCoveringTestsList::new(vec![
            entry("b.cpp", &["T2", "T1"]),
            entry("a.cpp", &["T1"]),
        ]);
        let second = SourceCoveringTestsList::new(vec![
            entry("a.cpp", &["T1"]),
            entry("b.cpp", &["T1", "T2"]),
        ]);

        assert_eq!(
            serialize_source_covering_tests_list(&first),
            serialize_source_covering_tests_list(&second)
        );
    }

    #[test]
    fn deserialize_rejects_malformed_input() {
        assert!(matches!(
            deserialize_source_covering_tests_list("not json"),
            Err(SerializeError::InvalidJson(_))
        ));
        assert!(matches!(
            deserialize_source_covering_tests_list(r#"{"sources": 7}"#),
            Err(SerializeError::InvalidJson(_))
        ));
    }

    #[test]
    fn deserialize_canonicalizes_unordered_input() {
        let data = r#"{"sources":[
            {"source":"z.cpp","covering_tests":["T2","T1"]},
            {"source":"a.cpp","covering_tests":["T9"]}
        ]}"#;
        let list = deserialize_source_covering_tests_list(data).unwrap();
        assert_eq!(list.sources()[0].source, "a.cpp");
        assert_eq!(list.sources()[1].covering_tests, vec!["T1", "T2"]);
    }
}
