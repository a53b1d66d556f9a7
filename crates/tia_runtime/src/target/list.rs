//! Sorted, unique target collections.

use super::{
    BuildTarget, ProductionTarget, SuiteType, TargetDescriptor, TargetError, TestTarget,
    TestTargetDescriptor,
};

/// Immutable collection of targets, sorted ascending by name.
///
/// Names are unique; construction fails on duplicates or empty input.
#[derive(Debug, Clone)]
pub struct TargetList<T: BuildTarget> {
    targets: Vec<T>,
}

impl<T: BuildTarget> TargetList<T> {
    pub fn new(mut targets: Vec<T>) -> Result<Self, TargetError> {
        if targets.is_empty() {
            return Err(TargetError::EmptyTargetList);
        }
        if targets.iter().any(|t| t.name().is_empty()) {
            return Err(TargetError::EmptyTargetName);
        }

        targets.sort_by(|lhs, rhs| lhs.name().cmp(rhs.name()));

        if let Some(duplicate) = targets.windows(2).find(|w| w[0].name() == w[1].name()) {
            return Err(TargetError::DuplicateTargetName {
                name: duplicate[0].name().to_string(),
            });
        }

        Ok(Self { targets })
    }

    /// All targets, in name order.
    pub fn targets(&self) -> &[T] {
        &self.targets
    }

    /// Returns the target with the specified name, or `None` on miss.
    pub fn get(&self, name: &str) -> Option<&T> {
        self.targets
            .binary_search_by(|t| t.name().cmp(name))
            .ok()
            .map(|index| &self.targets[index])
    }

    /// Returns the target with the specified name, or fails if absent.
    pub fn get_or_fail(&self, name: &str) -> Result<&T, TargetError> {
        self.get(name).ok_or_else(|| TargetError::TargetNotFound {
            name: name.to_string(),
        })
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// The build target universe for one suite: all test targets tagged with the
/// suite plus every production target.
#[derive(Debug, Clone)]
pub struct BuildTargetList {
    test_targets: TargetList<TestTarget>,
    production_targets: TargetList<ProductionTarget>,
}

impl BuildTargetList {
    pub fn new(
        test_descriptors: Vec<TestTargetDescriptor>,
        production_descriptors: Vec<TargetDescriptor>,
        suite: SuiteType,
    ) -> Result<Self, TargetError> {
        let test_targets = test_descriptors
            .into_iter()
            .filter(|d| d.suite == suite)
            .map(TestTarget::new)
            .collect();
        let production_targets = production_descriptors
            .into_iter()
            .map(ProductionTarget::new)
            .collect();

        Ok(Self {
            test_targets: TargetList::new(test_targets)?,
            production_targets: TargetList::new(production_targets)?,
        })
    }

    pub fn test_targets(&self) -> &TargetList<TestTarget> {
        &self.test_targets
    }

    pub fn production_targets(&self) -> &TargetList<ProductionTarget> {
        &self.production_targets
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn production(name: &str) -> ProductionTarget {
        ProductionTarget::new(TargetDescriptor {
            name: name.into(),
            sources: Vec::new(),
            dependencies: Vec::new(),
        })
    }

    fn test_target(name: &str, suite: SuiteType) -> TestTargetDescriptor {
        TestTargetDescriptor {
            target: TargetDescriptor {
                name: name.into(),
                sources: Vec::new(),
                dependencies: Vec::new(),
            },
            suite,
        }
    }

    #[test]
    fn construction_sorts_by_name() {
        let list = TargetList::new(vec![production("c"), production("a"), production("b")]).unwrap();
        let names: Vec<_> = list.targets().iter().map(BuildTarget::name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn construction_rejects_empty_input() {
        let targets: Vec<ProductionTarget> = Vec::new();
        assert!(matches!(
            TargetList::new(targets),
            Err(TargetError::EmptyTargetList)
        ));
    }

    #[test]
    fn construction_rejects_duplicate_names() {
        let result = TargetList::new(vec![production("a"), production("b"), production("a")]);
        assert!(matches!(
            result,
            Err(TargetError::DuplicateTargetName { ref name }) if name == "a"
        ));
    }

    #[test]
    fn construction_rejects_empty_name() {
        let result = TargetList::new(vec![production("")]);
        assert!(matches!(result, Err(TargetError::EmptyTargetName)));
    }

    #[test]
    fn get_finds_existing_target() {
        let list = TargetList::new(vec![production("b"), production("a")]).unwrap();
        assert_eq!(list.get("b").map(BuildTarget::name), Some("b"));
        assert!(list.has("a"));
    }

    #[test]
    fn get_returns_none_on_miss() {
        let list = TargetList::new(vec![production("b"), production("d")]).unwrap();
        // "c" sorts between the two entries; a lower-bound result must not leak out.
        assert!(list.get("c").is_none());
        assert!(list.get("a").is_none());
        assert!(list.get("e").is_none());
    }

    #[test]
    fn get_or_fail_reports_missing_target() {
        let list = TargetList::new(vec![production("a")]).unwrap();
        assert_eq!(
            list.get_or_fail("z"),
            Err(TargetError::TargetNotFound { name: "z".into() })
        );
    }

    #[test]
    fn build_target_list_filters_by_suite() {
        let list = BuildTargetList::new(
            vec![
                test_target("unit", SuiteType::Main),
                test_target("nightly", SuiteType::Periodic),
                test_target("smoke", SuiteType::Main),
            ],
            vec![TargetDescriptor {
                name: "core".into(),
                sources: Vec::new(),
                dependencies: Vec::new(),
            }],
            SuiteType::Main,
        )
        .unwrap();

        let names: Vec<_> = list
            .test_targets()
            .targets()
            .iter()
            .map(BuildTarget::name)
            .collect();
        assert_eq!(names, vec!["smoke", "unit"]);
    }

    #[test]
    fn build_target_list_fails_when_suite_is_empty() {
        let result = BuildTargetList::new(
            vec![test_target("nightly", SuiteType::Periodic)],
            vec![TargetDescriptor {
                name: "core".into(),
                sources: Vec::new(),
                dependencies: Vec::new(),
            }],
            SuiteType::Main,
        );
        assert!(matches!(result, Err(TargetError::EmptyTargetList)));
    }
}
