//! Test selection and prioritization.
//!
//! Turns a resolved change list into an ordered, duplicate-free list of test
//! targets. The prioritization policy reorders the selection but never adds
//! or drops members.

pub mod build_graph;

pub use build_graph::BuildGraph;

use crate::dependency::{ChangeDependencyList, DynamicDependencyMap};
use crate::policy::TestPrioritization;
use crate::target::{BuildTarget, BuildTargetList, TestTarget};
use std::collections::BTreeSet;

/// Selects the test targets pertinent to a change list and orders them
/// according to the prioritization policy.
#[derive(Debug)]
pub struct TestSelectorAndPrioritizer {
    build_graph: BuildGraph,
}

impl TestSelectorAndPrioritizer {
    pub fn new(build_targets: &BuildTargetList) -> Self {
        Self {
            build_graph: BuildGraph::new(build_targets),
        }
    }

    /// Every test target covering any covered source in `changes` is
    /// selected exactly once.
    ///
    /// `TestPrioritization::None` yields stable name order;
    /// `DependencyLocality` orders by build graph distance from the targets
    /// owning the changed sources, ties broken by name.
    pub fn select_test_targets<'a>(
        &self,
        dependency_map: &'a DynamicDependencyMap,
        changes: &ChangeDependencyList,
        prioritization: TestPrioritization,
    ) -> Vec<&'a TestTarget> {
        let test_names: BTreeSet<&str> = changes
            .covered()
            .iter()
            .flat_map(|dependency| dependency.covering_tests.iter().map(String::as_str))
            .collect();

        let test_targets = dependency_map.build_targets().test_targets();
        let mut selected: Vec<&TestTarget> = test_names
            .iter()
            .filter_map(|name| test_targets.get(name))
            .collect();

        match prioritization {
            TestPrioritization::None => {}
            TestPrioritization::DependencyLocality => {
                let seeds: BTreeSet<&str> = changes
                    .covered()
                    .iter()
                    .chain(changes.uncovered().iter())
                    .flat_map(|dependency| dependency.parent_targets.iter().map(String::as_str))
                    .collect();
                let distances = self.build_graph.distances_from(seeds);
                selected.sort_by(|lhs, rhs| {
                    let lhs_distance = distances.get(lhs.name()).copied().unwrap_or(u32::MAX);
                    let rhs_distance = distances.get(rhs.name()).copied().unwrap_or(u32::MAX);
                    lhs_distance
                        .cmp(&rhs_distance)
                        .then_with(|| lhs.name().cmp(rhs.name()))
                });
            }
        }

        selected
    }
}
