use std::collections::{BTreeMap, BTreeSet};

/// Display-relevant kind of a tracked field, resolved once through the
/// field-metadata provider. The formatter dispatches on this tag
/// instead of inspecting live model state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Plain,
    /// Raw stored value to human label.
    Choice(BTreeMap<String, String>),
    DateTime,
    Date,
    Time,
    /// Single-reference relation to another tracked model.
    Relation { target: String },
}

/// Which fields of a model participate in change tracking, and how.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackedFields {
    /// Allow-list; empty means all fields.
    pub include: BTreeSet<String>,
    /// Deny-list, subtracted from the allow-list.
    pub exclude: BTreeSet<String>,
    /// Fields whose string values are masked before diffing.
    pub mask: BTreeSet<String>,
    /// Display-label overrides by field name.
    pub label_overrides: BTreeMap<String, String>,
}

impl TrackedFields {
    /// Resolve the effective tracked set for a record with the given
    /// field names: (include or all) minus exclude.
    pub fn applicable(&self, all_fields: &BTreeSet<String>) -> BTreeSet<String> {
        let base: BTreeSet<String> = if self.include.is_empty() {
            all_fields.clone()
        } else {
            self.include.intersection(all_fields).cloned().collect()
        };

        base.difference(&self.exclude).cloned().collect()
    }
}

/// Turn a field name into a presentable label: `first_name` becomes
/// `First name`.
pub fn pretty_name(field: &str) -> String {
    let spaced = field.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => spaced,
    }
}
