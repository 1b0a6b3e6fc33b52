//! Testplan loading
//!
//! Reads testplan documents, follows their imports, builds the element
//! lists and loads the result sets and resource maps reported against them.

pub mod config;
pub mod document;
pub mod import;
pub mod loader;
pub mod merge;
pub mod resource_map;
pub mod results;

pub use config::{ProjectConfig, CONFIG_FILE_NAME};
pub use document::{parse_document, read_document, Document, DocumentFormat};
pub use import::{ImportResolver, IMPORT_KEY};
pub use loader::{LoaderConfig, TestplanLoader, TestplanSpec};
pub use merge::{merge_documents, MergePolicy};
pub use resource_map::{
    find_unique_file, Level, ResourceMap, ResourceQuery, DOCS_RESOURCE, RESOURCE_MAP_KEYWORDS,
    SOURCE_RESOURCE,
};
pub use results::{CoverageResult, ResultSet};

use std::path::Path;
use testplanner_model::{Result, TagFilter, Testplan};

/// Load a testplan with default settings
pub fn load_testplan(path: impl AsRef<Path>, tags: &TagFilter) -> Result<Testplan> {
    TestplanLoader::new(LoaderConfig::default()).load(path.as_ref(), tags)
}
