//! Configuration types deserialized from `sift.toml`.

use serde::Deserialize;

/// The top-level project configuration parsed from `sift.toml`.
///
/// Contains project metadata and the settings that drive a checking session.
/// The incremental environment layers do not interpret these fields beyond
/// the debug flag; the worker count is consumed by the scheduler.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// Core project metadata (name, version, source roots).
    pub project: ProjectMeta,
    /// Checking session settings (worker count, debug output).
    #[serde(default)]
    pub check: CheckConfig,
}

/// Core project metadata required in every `sift.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// The project version string.
    pub version: String,
    /// A brief description of the project.
    #[serde(default)]
    pub description: String,
    /// List of project authors.
    #[serde(default)]
    pub authors: Vec<String>,
    /// Directories searched for source modules, relative to the project root.
    #[serde(default = "default_source_roots")]
    pub source_roots: Vec<String>,
}

fn default_source_roots() -> Vec<String> {
    vec![".".to_string()]
}

/// Settings for a checking session.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckConfig {
    /// Number of worker threads for parallel checking and update
    /// partitioning. `None` lets the scheduler pick one per logical core.
    #[serde(default)]
    pub workers: Option<usize>,
    /// Emit verbose invalidation traces during incremental updates.
    #[serde(default)]
    pub debug: bool,
    /// Extra directories searched for dependency stubs.
    #[serde(default)]
    pub search_paths: Vec<String>,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            workers: None,
            debug: false,
            search_paths: Vec::new(),
        }
    }
}
