//! Build target model.
//!
//! Targets are immutable descriptions of build artifacts: test targets run
//! groups of tests, production targets are the code under test. Collections
//! live in [`list`], exclusion rules in [`exclude`].

pub mod exclude;
pub mod list;

pub use exclude::{ExcludedTarget, TestTargetExcludeList};
pub use list::{BuildTargetList, TargetList};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while constructing or querying target collections.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("target list is empty")]
    EmptyTargetList,
    #[error("target list contains duplicate target '{name}'")]
    DuplicateTargetName { name: String },
    #[error("target descriptor has an empty name")]
    EmptyTargetName,
    #[error("couldn't find target '{name}'")]
    TargetNotFound { name: String },
}

/// Named partition of the test target universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuiteType {
    Main,
    Periodic,
    Sandbox,
}

impl SuiteType {
    /// Directory-safe name of the suite.
    pub fn as_str(self) -> &'static str {
        match self {
            SuiteType::Main => "main",
            SuiteType::Periodic => "periodic",
            SuiteType::Sandbox => "sandbox",
        }
    }
}

/// Raw build target description as produced by the build system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDescriptor {
    pub name: String,
    /// Repo-relative sources compiled into the target.
    #[serde(default)]
    pub sources: Vec<String>,
    /// Names of build targets this target links against.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// Test target description: a [`TargetDescriptor`] plus its suite tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestTargetDescriptor {
    #[serde(flatten)]
    pub target: TargetDescriptor,
    pub suite: SuiteType,
}

/// Common interface over test and production targets.
pub trait BuildTarget {
    fn name(&self) -> &str;
    fn sources(&self) -> &[String];
    fn dependencies(&self) -> &[String];
}

/// A build artifact that runs a group of tests when executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestTarget {
    descriptor: TargetDescriptor,
    suite: SuiteType,
}

impl TestTarget {
    pub(crate) fn new(descriptor: TestTargetDescriptor) -> Self {
        Self {
            descriptor: descriptor.target,
            suite: descriptor.suite,
        }
    }

    pub fn suite(&self) -> SuiteType {
        self.suite
    }
}

impl BuildTarget for TestTarget {
    fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn sources(&self) -> &[String] {
        &self.descriptor.sources
    }

    fn dependencies(&self) -> &[String] {
        &self.descriptor.dependencies
    }
}

/// A non-test build artifact consumed by test targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductionTarget {
    descriptor: TargetDescriptor,
}

impl ProductionTarget {
    pub(crate) fn new(descriptor: TargetDescriptor) -> Self {
        Self { descriptor }
    }
}

impl BuildTarget for ProductionTarget {
    fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn sources(&self) -> &[String] {
        &self.descriptor.sources
    }

    fn dependencies(&self) -> &[String] {
        &self.descriptor.dependencies
    }
}
