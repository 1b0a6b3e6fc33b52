//! Project configuration file (`testplanner.toml`)
//!
//! ```toml
//! project_root = "../.."
//! source_url_prefix = "https://example.com/repo/blob/main"
//! docs_url_prefix = "https://example.com/docs"
//! resource_map = "resource_map.yml"
//! merge_policy = "keep-existing"
//! ```
//!
//! Relative paths are taken relative to the directory holding the file.

use crate::loader::LoaderConfig;
use crate::merge::MergePolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use testplanner_model::{Result, TestplanError};
use tracing::debug;

/// Default name of the project configuration file
pub const CONFIG_FILE_NAME: &str = "testplanner.toml";

/// Defaults read from `testplanner.toml`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    pub project_root: Option<PathBuf>,
    pub source_url_prefix: Option<String>,
    pub docs_url_prefix: Option<String>,
    pub resource_map: Option<PathBuf>,
    #[serde(default)]
    pub merge_policy: MergePolicy,
}

impl ProjectConfig {
    /// Parse a configuration file
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| TestplanError::io(path, e))?;
        let mut config = Self::parse(&contents, path)?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        config.project_root = config.project_root.map(|p| base.join(p));
        config.resource_map = config.resource_map.map(|p| base.join(p));
        debug!("Loaded project config {:?}: {:?}", path, config);
        Ok(config)
    }

    /// Parse configuration text; `origin` names it in errors
    pub fn parse(contents: &str, origin: &Path) -> Result<Self> {
        toml::from_str(contents).map_err(|e| TestplanError::malformed_document(origin, e))
    }

    /// Look for `testplanner.toml` in `dir`
    pub fn discover(dir: &Path) -> Result<Option<Self>> {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            Self::from_path(&candidate).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Loader settings with the configured defaults
    pub fn loader_config(&self) -> LoaderConfig {
        let root = self
            .project_root
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        LoaderConfig::new(root).with_merge_policy(self.merge_policy)
    }
}
