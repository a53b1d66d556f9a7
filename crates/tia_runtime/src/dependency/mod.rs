//! Change-list resolution against the build graph and coverage index.

pub mod change_list;
pub mod map;

pub use change_list::{ChangeDependencyList, ChangeList, SourceDependency};
pub use map::DynamicDependencyMap;

use thiserror::Error;

/// Errors raised while resolving change lists or replacing coverage data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DependencyError {
    #[error("source '{path}' was created but already has coverage entries")]
    CreatedSourceCovered { path: String },
    #[error("deleted source '{path}' is still covered but no build target references it")]
    OrphanedSourceCoverage { path: String },
    #[error("coverage data references unknown test target '{name}'")]
    UnknownCoveringTest { name: String },
}
