//! Error types for testplan loading and result reconciliation

use std::path::PathBuf;
use thiserror::Error;

/// Result type for testplan operations
pub type Result<T> = std::result::Result<T, TestplanError>;

/// Errors that can occur while building or reconciling a testplan
///
/// Every variant is fatal for the testplan being processed.
#[derive(Debug, Error)]
pub enum TestplanError {
    /// I/O error reading a document
    #[error("I/O error on {path}: {message}")]
    Io { path: PathBuf, message: String },

    /// Document could not be parsed
    #[error("Failed to parse {path}: {message}")]
    MalformedDocument { path: PathBuf, message: String },

    /// Testpoint or covergroup record is missing a field or has a bad value
    #[error("Malformed {kind} '{name}': {message}")]
    MalformedElement {
        kind: &'static str,
        name: String,
        message: String,
    },

    /// Two elements of the same kind share a name
    #[error("Duplicate {kind} item found with name: {name}")]
    DuplicateElement { kind: &'static str, name: String },

    /// Imported testplan could not be located
    #[error("Testplan {import} imported by {parent} does not exist")]
    TestplanNotFound { import: String, parent: PathBuf },

    /// Import graph reaches an already merged document
    #[error("Encountered testplan {path} again, which was already parsed (circular import)")]
    CircularImport { path: PathBuf },

    /// Merge of two values with incompatible types
    #[error("Cannot merge key '{key}': conflicting types ({existing} in importer; {incoming} in import)")]
    TypeConflict {
        key: String,
        existing: &'static str,
        incoming: &'static str,
    },

    /// Result entry is missing required keys
    #[error("Test results in {source_name} are malformed: {message}")]
    MalformedResult {
        source_name: String,
        message: String,
    },

    /// A resource glob matched more than one file
    #[error("Multiple files assigned to {target} by '{pattern}': {matches:?}")]
    AmbiguousResource {
        target: String,
        pattern: String,
        matches: Vec<PathBuf>,
    },

    /// A name or test pattern is not a valid regular expression
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Resource map queried for one of its structural keys
    #[error("Resource type cannot be one of {reserved:?}, got '{resource_type}'")]
    ReservedResourceType {
        resource_type: String,
        reserved: &'static [&'static str],
    },

    /// No testpoints and no covergroups left to report on
    #[error("No testpoints or covergroups found in {path}")]
    EmptyTestplan { path: PathBuf },

    /// Testplan has no name and none was supplied
    #[error("The testplan 'name' is not set in {path}")]
    MissingName { path: PathBuf },

    /// A projection was requested before results were mapped
    #[error("Testplan '{0}' has not been reconciled with test results")]
    NotReconciled(String),

    /// Results were mapped onto the same testplan twice
    #[error("Testplan '{0}' has already been reconciled with test results")]
    AlreadyReconciled(String),
}

impl TestplanError {
    /// Shorthand for a malformed document error
    pub fn malformed_document(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        TestplanError::MalformedDocument {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Shorthand for an I/O error on a path
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        TestplanError::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
