use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The fields of one record mapped to how each of them changed.
///
/// Keys are field names; ordering is stable so serialized change maps
/// are deterministic.
pub type ChangeMap = BTreeMap<String, ChangeDescriptor>;

/// Direction of a many-to-many relationship change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum M2mOperation {
    Add,
    Remove,
}

impl std::fmt::Display for M2mOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            M2mOperation::Add => write!(f, "add"),
            M2mOperation::Remove => write!(f, "remove"),
        }
    }
}

/// Marker for the relationship descriptor's `"type"` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    M2m,
}

/// A many-to-many relationship change on a single field.
///
/// Serialized as `{"type": "m2m", "operation": "add", "objects": [..]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct M2mChange {
    #[serde(rename = "type")]
    pub kind: RelationKind,
    pub operation: M2mOperation,
    pub objects: Vec<String>,
}

/// How a single field changed.
///
/// Atomic changes serialize as an `["old", "new"]` pair; relationship
/// changes serialize as the tagged m2m object. A field's descriptor
/// shape is fixed within one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChangeDescriptor {
    Atomic(String, String),
    ManyToMany(M2mChange),
}

impl ChangeDescriptor {
    pub fn atomic(old: impl Into<String>, new: impl Into<String>) -> Self {
        ChangeDescriptor::Atomic(old.into(), new.into())
    }

    pub fn m2m(operation: M2mOperation, objects: Vec<String>) -> Self {
        ChangeDescriptor::ManyToMany(M2mChange {
            kind: RelationKind::M2m,
            operation,
            objects,
        })
    }
}
