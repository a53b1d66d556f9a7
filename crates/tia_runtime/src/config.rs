//! Runtime configuration.
//!
//! Plain deserializable structs; loading and CLI surfaces live outside the
//! runtime.

use crate::target::{ExcludedTarget, TargetDescriptor, TestTargetDescriptor};
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while decoding a runtime configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid runtime config: {0}")]
    InvalidJson(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::InvalidJson(e.to_string())
    }
}

fn default_data_file_name() -> String {
    "source_covering_tests.tia.json".to_string()
}

/// Repository location.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoConfig {
    /// Absolute path to the repository root.
    pub root: PathBuf,
}

/// Workspace the runtime persists its data into.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceConfig {
    /// Root of the active persisted workspace; the coverage data file lives
    /// at `<active_root>/<suite>/<data_file_name>`.
    pub active_root: PathBuf,
    #[serde(default = "default_data_file_name")]
    pub data_file_name: String,
}

/// Build target universe and configured exclusions.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    pub test_targets: Vec<TestTargetDescriptor>,
    pub production_targets: Vec<TargetDescriptor>,
    #[serde(default)]
    pub excluded_regular_test_targets: Vec<ExcludedTarget>,
    #[serde(default)]
    pub excluded_instrumented_test_targets: Vec<ExcludedTarget>,
}

/// Full runtime configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    pub repo: RepoConfig,
    pub workspace: WorkspaceConfig,
    pub targets: TargetConfig,
}

impl RuntimeConfig {
    /// Decodes a configuration from its JSON form.
    pub fn from_json(data: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(data)?)
    }
}
