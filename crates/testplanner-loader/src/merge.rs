//! Merging of imported testplan documents

use crate::document::{kind_name, Document};
use serde::Deserialize;
use serde_json::Value;
use std::mem::discriminant;
use testplanner_model::{Result, TestplanError};
use tracing::debug;

/// Which side keeps a scalar when both documents set it with the same type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergePolicy {
    /// The importing document wins
    #[default]
    KeepExisting,
    /// The imported document wins
    TakeIncoming,
}

/// Merge `incoming` into `existing`
///
/// Lists concatenate, mappings merge key by key, scalars of the same type
/// are resolved by `policy` and anything else is a [`TestplanError::TypeConflict`].
pub fn merge_documents(existing: &mut Document, incoming: Document, policy: MergePolicy) -> Result<()> {
    merge_maps(existing, incoming, policy, "")
}

fn merge_maps(existing: &mut Document, incoming: Document, policy: MergePolicy, path: &str) -> Result<()> {
    for (key, item2) in incoming {
        let key_path = if path.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", path, key)
        };

        let Some(item1) = existing.get_mut(&key) else {
            existing.insert(key, item2);
            continue;
        };

        match (item1, item2) {
            (slot @ Value::Null, item2) => *slot = item2,
            (Value::Array(list1), Value::Array(list2)) => list1.extend(list2),
            (Value::Object(map1), Value::Object(map2)) => {
                merge_maps(map1, map2, policy, &key_path)?;
            }
            (item1, item2) if same_scalar_type(item1, &item2) => {
                if policy == MergePolicy::TakeIncoming {
                    debug!("Import overrides '{}'", key_path);
                    *item1 = item2;
                }
            }
            (item1, item2) => {
                return Err(TestplanError::TypeConflict {
                    key: key_path,
                    existing: kind_name(item1),
                    incoming: kind_name(&item2),
                });
            }
        }
    }
    Ok(())
}

fn same_scalar_type(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => kind_name(a) == kind_name(b),
        (Value::Array(_), _) | (Value::Object(_), _) => false,
        _ => discriminant(a) == discriminant(b),
    }
}
