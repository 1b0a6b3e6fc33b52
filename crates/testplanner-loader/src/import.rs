//! Import resolution for `import_testplans`

use crate::document::{read_document, Document};
use crate::merge::{merge_documents, MergePolicy};
use serde_json::Value;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use testplanner_model::{Result, TestplanError};
use tracing::{debug, info};

/// Top-level key listing imported testplans
pub const IMPORT_KEY: &str = "import_testplans";

/// Resolves import paths and folds imported documents into the root one
#[derive(Debug, Clone)]
pub struct ImportResolver {
    /// Root directory of the project, tried first for every import
    project_root: PathBuf,

    policy: MergePolicy,
}

impl ImportResolver {
    pub fn new(project_root: impl Into<PathBuf>, policy: MergePolicy) -> Self {
        Self {
            project_root: project_root.into(),
            policy,
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Resolve one import path
    ///
    /// Tried in order: relative to the project root, relative to the
    /// importing document's directory, then as given.
    pub fn resolve(&self, import: &str, parent: &Path) -> Result<PathBuf> {
        let from_root = self.project_root.join(import);
        if from_root.exists() {
            debug!("Import '{}' resolved against project root", import);
            return Ok(from_root);
        }

        let parent_dir = parent.parent().unwrap_or_else(|| Path::new(""));
        let from_parent = parent_dir.join(import);
        if from_parent.exists() {
            debug!("Import '{}' resolved against {:?}", import, parent_dir);
            return Ok(from_parent);
        }

        let literal = PathBuf::from(import);
        if literal.exists() {
            debug!("Import '{}' resolved as given", import);
            return Ok(literal);
        }

        Err(TestplanError::TestplanNotFound {
            import: import.to_string(),
            parent: parent.to_path_buf(),
        })
    }

    /// Resolve every entry of a document's `import_testplans` list
    pub fn imports_of(&self, document: &Document, path: &Path) -> Result<Vec<PathBuf>> {
        let imports = match document.get(IMPORT_KEY) {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(TestplanError::malformed_document(
                    path,
                    format!("'{}' must be a list of paths", IMPORT_KEY),
                ))
            }
        };

        imports
            .iter()
            .map(|item| match item {
                Value::String(import) => self.resolve(import, path),
                other => Err(TestplanError::malformed_document(
                    path,
                    format!("import entry {} is not a path", other),
                )),
            })
            .collect()
    }

    /// Merge every document reachable through imports into `root`
    ///
    /// Imports are visited breadth first. Reaching a document a second
    /// time, the root included, is a [`TestplanError::CircularImport`].
    pub fn merge_imports(&self, root: &mut Document, root_path: &Path) -> Result<()> {
        let mut visited: HashSet<PathBuf> = HashSet::new();
        visited.insert(canonical(root_path));

        let mut pending: VecDeque<PathBuf> = self.imports_of(root, root_path)?.into();
        while let Some(path) = pending.pop_front() {
            if !visited.insert(canonical(&path)) {
                return Err(TestplanError::CircularImport { path });
            }

            info!("Importing testplan {:?}", path);
            let imported = read_document(&path)?;
            pending.extend(self.imports_of(&imported, &path)?);
            merge_documents(root, imported, self.policy)?;
        }
        Ok(())
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
