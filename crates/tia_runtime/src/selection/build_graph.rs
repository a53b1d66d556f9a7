//! Build target dependency graph.
//!
//! Directed graph over the target universe where an edge A→B means "B
//! depends on A". Distances from the targets owning changed sources drive
//! the locality prioritization policy.

use crate::target::{BuildTarget, BuildTargetList};
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::Direction;
use std::collections::{HashMap, VecDeque};

/// Dependency graph over test and production targets, keyed by name.
#[derive(Debug)]
pub struct BuildGraph {
    graph: StableDiGraph<String, ()>,
    name_to_idx: HashMap<String, NodeIndex>,
}

impl BuildGraph {
    /// Builds the graph from target descriptors. Dependency names that match
    /// no target in the universe are ignored.
    pub fn new(build_targets: &BuildTargetList) -> Self {
        let mut graph = StableDiGraph::new();
        let mut name_to_idx = HashMap::new();

        let names = build_targets
            .test_targets()
            .targets()
            .iter()
            .map(|t| t.name())
            .chain(
                build_targets
                    .production_targets()
                    .targets()
                    .iter()
                    .map(|t| t.name()),
            );
        for name in names {
            let idx = graph.add_node(name.to_string());
            name_to_idx.insert(name.to_string(), idx);
        }

        let edges = build_targets
            .test_targets()
            .targets()
            .iter()
            .map(|t| (t.name(), t.dependencies()))
            .chain(
                build_targets
                    .production_targets()
                    .targets()
                    .iter()
                    .map(|t| (t.name(), t.dependencies())),
            );
        for (name, dependencies) in edges {
            let Some(&target_idx) = name_to_idx.get(name) else {
                continue;
            };
            for dependency in dependencies {
                if let Some(&dependency_idx) = name_to_idx.get(dependency.as_str()) {
                    graph.add_edge(dependency_idx, target_idx, ());
                }
            }
        }

        Self { graph, name_to_idx }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.name_to_idx.contains_key(name)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// BFS distance from any seed to every reachable target. Seeds have
    /// distance zero; unknown seed names are ignored.
    pub fn distances_from<'a>(
        &self,
        seeds: impl IntoIterator<Item = &'a str>,
    ) -> HashMap<String, u32> {
        let mut distances = HashMap::new();
        let mut queue = VecDeque::new();

        for seed in seeds {
            if let Some(&idx) = self.name_to_idx.get(seed) {
                if !distances.contains_key(&self.graph[idx]) {
                    distances.insert(self.graph[idx].clone(), 0);
                    queue.push_back(idx);
                }
            }
        }

        while let Some(current) = queue.pop_front() {
            let current_distance = distances[&self.graph[current]];
            for dependent in self.graph.neighbors_directed(current, Direction::Outgoing) {
                let name = &self.graph[dependent];
                if !distances.contains_key(name) {
                    distances.insert(name.clone(), current_distance + 1);
                    queue.push_back(dependent);
                }
            }
        }

        distances
    }
}
