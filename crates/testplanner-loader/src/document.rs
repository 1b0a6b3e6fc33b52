//! Parsing of testplan, result-set and resource-map documents
//!
//! Every document is read into an order-preserving JSON map. Testplans are
//! written in Hjson; other JSON files are tried as JSON first and fall back
//! to YAML.

use serde_json::{Map, Value};
use std::path::Path;
use testplanner_model::{Result, TestplanError};
use tracing::debug;

/// A parsed document, keys in file order
pub type Document = Map<String, Value>;

/// Syntax a document is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// Hjson: comments, quoteless strings, optional commas
    Hjson,
    /// JSON with YAML fallback
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Pick the syntax from the file extension
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("hjson") => DocumentFormat::Hjson,
            Some("yml") | Some("yaml") => DocumentFormat::Yaml,
            _ => DocumentFormat::Json,
        }
    }
}

/// Read and parse a document from disk
pub fn read_document(path: &Path) -> Result<Document> {
    debug!("Reading document {:?}", path);
    let contents = std::fs::read_to_string(path).map_err(|e| TestplanError::io(path, e))?;
    parse_document(&contents, DocumentFormat::from_path(path), path)
}

/// Parse document text; `origin` is used in error messages
pub fn parse_document(text: &str, format: DocumentFormat, origin: &Path) -> Result<Document> {
    let value = match format {
        DocumentFormat::Hjson => deser_hjson::from_str::<Value>(text)
            .map_err(|e| TestplanError::malformed_document(origin, e))?,
        DocumentFormat::Json => match serde_json::from_str::<Value>(text) {
            Ok(value) => value,
            Err(json_err) => serde_yaml::from_str::<Value>(text).map_err(|yaml_err| {
                TestplanError::malformed_document(
                    origin,
                    format!("{} (as YAML: {})", json_err, yaml_err),
                )
            })?,
        },
        DocumentFormat::Yaml => serde_yaml::from_str::<Value>(text)
            .map_err(|e| TestplanError::malformed_document(origin, e))?,
    };

    match value {
        Value::Object(map) => Ok(map),
        other => Err(TestplanError::malformed_document(
            origin,
            format!("top level must be a mapping, found {}", kind_name(&other)),
        )),
    }
}

/// Human readable name of a value's type
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}
