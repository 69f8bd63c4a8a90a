use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::models::actor::Principal;
use crate::core::models::change_set::ChangeMap;

/// Placeholder representation used when a target's display form
/// cannot be produced at logging time.
pub const DEFAULT_OBJECT_REPR: &str = "<error forming object repr>";

/// The mutation kinds that Vestige distinguishes. `Access` records a
/// logged read; it is not a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Update,
    Delete,
    Access,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Create => write!(f, "create"),
            Action::Update => write!(f, "update"),
            Action::Delete => write!(f, "delete"),
            Action::Access => write!(f, "access"),
        }
    }
}

/// Identity and display form of the record a change applies to, as
/// resolved by the host's content-type layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDescriptor {
    /// Model identifier used for field-metadata lookups.
    pub model: String,
    /// String form of the target's primary key.
    pub identifier: String,
    /// Name of the storage table the target belongs to.
    pub event_table: String,
    /// Display form of the target at logging time.
    pub event_column: String,
}

impl TargetDescriptor {
    pub fn new(
        model: impl Into<String>,
        identifier: impl Into<String>,
        event_table: impl Into<String>,
        event_column: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            identifier: identifier.into(),
            event_table: event_table.into(),
            event_column: event_column.into(),
        }
    }

    /// Like `new`, but falls back to the fixed error marker when the
    /// display form is unavailable.
    pub fn with_repr_fallback(
        model: impl Into<String>,
        identifier: impl Into<String>,
        event_table: impl Into<String>,
        event_column: Option<String>,
    ) -> Self {
        Self {
            model: model.into(),
            identifier: identifier.into(),
            event_table: event_table.into(),
            event_column: event_column.unwrap_or_else(|| DEFAULT_OBJECT_REPR.to_string()),
        }
    }
}

/// One append-only audit entry describing a single mutation event.
///
/// `source`, `remote_addr` and `remote_port` are written exactly once,
/// by the attribution pass at creation time. Entries are never updated
/// after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Model identifier of the changed record.
    pub model: String,
    /// String form of the changed record's primary key.
    pub identifier: String,
    /// Storage table the changed record belongs to.
    pub event_table: String,
    /// Display form of the changed record at logging time.
    pub event_column: String,
    pub action: Action,
    /// Structured field-level changes; `None` when the entry was
    /// forced through without differences.
    pub change_value: Option<ChangeMap>,
    /// Legacy text-format changes, consulted only when the
    /// `use_text_changes_fallback` option is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Principal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_addr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_port: Option<u16>,
    pub timestamp: DateTime<Utc>,
}

impl ChangeRecord {
    /// Build an unattributed record for the given target. Attribution
    /// fills `source` and origin fields before the record is stored.
    pub fn new(target: &TargetDescriptor, action: Action, change_value: Option<ChangeMap>) -> Self {
        Self {
            model: target.model.clone(),
            identifier: target.identifier.clone(),
            event_table: target.event_table.clone(),
            event_column: target.event_column.clone(),
            action,
            change_value,
            changes_text: None,
            source: None,
            source_email: None,
            remote_addr: None,
            remote_port: None,
            timestamp: Utc::now(),
        }
    }

    /// The changes recorded in this entry.
    ///
    /// When `use_text_fallback` is set and no structured changes are
    /// present, the legacy text format is parsed instead. Returns an
    /// empty map when neither is usable.
    pub fn changes(&self, use_text_fallback: bool) -> ChangeMap {
        if let Some(changes) = &self.change_value {
            return changes.clone();
        }
        if use_text_fallback
            && let Some(text) = &self.changes_text
            && let Ok(parsed) = serde_json::from_str::<ChangeMap>(text)
        {
            return parsed;
        }
        ChangeMap::new()
    }

    /// A readable one-line rendering of the atomic changes, e.g.
    /// `status: draft → published; title: Old → New`.
    pub fn changes_str(&self, use_text_fallback: bool) -> String {
        use crate::core::models::change_set::ChangeDescriptor;

        let substrings: Vec<String> = self
            .changes(use_text_fallback)
            .iter()
            .filter_map(|(field, descriptor)| match descriptor {
                ChangeDescriptor::Atomic(old, new) => {
                    Some(format!("{field}: {old} \u{2192} {new}"))
                }
                ChangeDescriptor::ManyToMany(_) => None,
            })
            .collect();

        substrings.join("; ")
    }

    /// Short human summary of the event, e.g. `Updated Article #7`.
    pub fn summary(&self) -> String {
        let verb = match self.action {
            Action::Create => "Created",
            Action::Update => "Updated",
            Action::Delete => "Deleted",
            Action::Access => "Accessed",
        };
        format!("{verb} {}", self.event_column)
    }
}
