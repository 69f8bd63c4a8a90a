use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::core::models::change_set::{ChangeDescriptor, ChangeMap, M2mOperation};

/// Stand-in text for a field value that is absent or null in a state.
const MISSING_VALUE: &str = "None";

/// Compares two serialized record states and produces structured,
/// field-level change maps. Pure and stateless; safe to call from any
/// number of executions concurrently.
pub struct DiffEngine;

impl DiffEngine {
    /// Compare two serialized states restricted to `tracked` fields.
    ///
    /// - Fields equal in both states are omitted
    /// - Fields outside `tracked` are never considered
    /// - Both sides of each change are stringified; absent or null
    ///   values render as `None`
    ///
    /// Returns `None` when no tracked field differs, so callers can
    /// suppress record creation entirely instead of storing an empty
    /// change map.
    pub fn compute_change(
        &self,
        prior: &Map<String, Value>,
        new: &Map<String, Value>,
        tracked: &BTreeSet<String>,
    ) -> Option<ChangeMap> {
        let mut changes = ChangeMap::new();

        for field in tracked {
            let old_value = prior.get(field);
            let new_value = new.get(field);

            if old_value == new_value {
                continue;
            }

            changes.insert(
                field.clone(),
                ChangeDescriptor::atomic(stringify(old_value), stringify(new_value)),
            );
        }

        if changes.is_empty() { None } else { Some(changes) }
    }

    /// Build the change map for a single many-to-many field: one entry
    /// carrying the operation and the affected objects' display forms.
    pub fn compute_m2m_change(
        &self,
        field: &str,
        operation: M2mOperation,
        objects: &[String],
    ) -> ChangeMap {
        let mut changes = ChangeMap::new();
        changes.insert(
            field.to_string(),
            ChangeDescriptor::m2m(operation, objects.to_vec()),
        );
        changes
    }

    /// Mask the string values of `mask` fields in a serialized state.
    ///
    /// Applied to both states before diffing, so masked plaintext
    /// never appears in a change descriptor, not even transiently.
    /// Non-string and absent fields pass through unchanged.
    pub fn mask_fields(
        &self,
        fields: Map<String, Value>,
        mask: &BTreeSet<String>,
    ) -> Map<String, Value> {
        fields
            .into_iter()
            .map(|(key, value)| match value {
                Value::String(text) if mask.contains(&key) => {
                    (key, Value::String(mask_str(&text)))
                }
                other => (key, other),
            })
            .collect()
    }
}

/// Mask the leading half of a string with asterisks. Deterministic for
/// a given input, so equal plaintexts still diff as equal.
pub fn mask_str(value: &str) -> String {
    let limit = value.chars().count() / 2;
    let tail: String = value.chars().skip(limit).collect();
    "*".repeat(limit) + &tail
}

fn stringify(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => MISSING_VALUE.to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}
