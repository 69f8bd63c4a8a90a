use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, Utc};

use crate::core::models::change_set::{ChangeDescriptor, ChangeMap, M2mOperation};
use crate::core::models::field_meta::{FieldKind, TrackedFields, pretty_name};
use crate::core::traits::field_metadata::FieldMetadataProvider;

/// Rendered values longer than this are cut off with an ellipsis.
pub const DISPLAY_TRUNCATE_AT: usize = 140;

/// Fixed marker shown for password-like fields, regardless of what the
/// stored descriptor contains.
const MASKED_DISPLAY: &str = "***";

/// Label shown for a raw choice value with no matching entry.
const UNKNOWN_CHOICE_LABEL: &str = "None";

/// Stringified "no value" marker as written by the diff engine.
const NONE_VALUE: &str = "None";

/// A change map rendered for human consumption: display label to
/// rendered change.
pub type DisplayMap = BTreeMap<String, DisplayedChange>;

/// One rendered entry of a display map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayedChange {
    Atomic { old: String, new: String },
    Relationship {
        operation: M2mOperation,
        objects: Vec<String>,
    },
}

impl std::fmt::Display for DisplayedChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisplayedChange::Atomic { old, new } => write!(f, "{old} \u{2192} {new}"),
            DisplayedChange::Relationship { operation, objects } => {
                write!(f, "{operation}")?;
                for object in objects {
                    write!(f, "\n{object}")?;
                }
                Ok(())
            }
        }
    }
}

/// Renders change maps into human-readable form: labels resolved,
/// choice values mapped, temporal values localized, references looked
/// up. Rendering never fails; every problem degrades to a raw or
/// placeholder value.
pub struct DisplayFormatter {
    time_zone: FixedOffset,
}

impl Default for DisplayFormatter {
    fn default() -> Self {
        Self::new(Utc.fix())
    }
}

impl DisplayFormatter {
    /// A formatter localizing temporal values into `time_zone`.
    pub fn new(time_zone: FixedOffset) -> Self {
        Self { time_zone }
    }

    /// Render a change map for display.
    ///
    /// Every entry of `changes` appears in the result. Fields with no
    /// resolvable metadata keep their raw name and values; everything
    /// else gets a resolved label and per-kind rendering.
    pub fn render(
        &self,
        changes: &ChangeMap,
        model: &str,
        provider: &dyn FieldMetadataProvider,
    ) -> DisplayMap {
        let tracked = provider.tracked_fields(model);
        let mut display = DisplayMap::new();

        for (field, descriptor) in changes {
            match descriptor {
                ChangeDescriptor::ManyToMany(change) => {
                    display.insert(
                        self.label(model, field, provider, &tracked),
                        DisplayedChange::Relationship {
                            operation: change.operation,
                            objects: change.objects.iter().map(|o| truncate(o)).collect(),
                        },
                    );
                }
                ChangeDescriptor::Atomic(old, new) => {
                    if tracked.mask.contains(field) {
                        display.insert(
                            self.label(model, field, provider, &tracked),
                            DisplayedChange::Atomic {
                                old: MASKED_DISPLAY.to_string(),
                                new: MASKED_DISPLAY.to_string(),
                            },
                        );
                        continue;
                    }

                    let Some(kind) = provider.field_kind(model, field) else {
                        // Metadata gone (e.g. field removed from the
                        // model since logging): raw passthrough.
                        display.insert(
                            field.clone(),
                            DisplayedChange::Atomic {
                                old: truncate(old),
                                new: truncate(new),
                            },
                        );
                        continue;
                    };

                    display.insert(
                        self.label(model, field, provider, &tracked),
                        DisplayedChange::Atomic {
                            old: truncate(&self.render_value(old, &kind, provider)),
                            new: truncate(&self.render_value(new, &kind, provider)),
                        },
                    );
                }
            }
        }

        display
    }

    fn render_value(
        &self,
        value: &str,
        kind: &FieldKind,
        provider: &dyn FieldMetadataProvider,
    ) -> String {
        match kind {
            FieldKind::Plain => value.to_string(),
            FieldKind::Choice(labels) => render_choice(value, labels),
            FieldKind::DateTime => self.render_datetime(value),
            FieldKind::Date => render_date(value),
            FieldKind::Time => render_time(value),
            FieldKind::Relation { target } => {
                if value == NONE_VALUE {
                    return value.to_string();
                }
                match provider.resolve_display(target, value) {
                    Ok(Some(representation)) => representation,
                    Ok(None) => format!("Deleted '{target}' ({value})"),
                    // The stored key could not be interpreted at all;
                    // show it as stored.
                    Err(_) => value.to_string(),
                }
            }
        }
    }

    fn render_datetime(&self, value: &str) -> String {
        let parsed = DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| {
                NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                    .map(|naive| naive.and_utc())
            });

        match parsed {
            Ok(dt) => dt
                .with_timezone(&self.time_zone)
                .format("%b %d, %Y %H:%M")
                .to_string(),
            Err(_) => value.to_string(),
        }
    }

    fn label(
        &self,
        model: &str,
        field: &str,
        provider: &dyn FieldMetadataProvider,
        tracked: &TrackedFields,
    ) -> String {
        if let Some(label) = tracked.label_overrides.get(field) {
            return label.clone();
        }
        match provider.verbose_name(model, field) {
            Some(name) => pretty_name(&name),
            None => pretty_name(field),
        }
    }
}

fn render_choice(value: &str, labels: &BTreeMap<String, String>) -> String {
    // A stored sequence of choice values renders as a joined label
    // list; anything unparseable is treated as a single raw value.
    if let Ok(values) = serde_json::from_str::<Vec<String>>(value) {
        return values
            .iter()
            .map(|v| {
                labels
                    .get(v)
                    .map(|l| l.as_str())
                    .unwrap_or(UNKNOWN_CHOICE_LABEL)
            })
            .collect::<Vec<_>>()
            .join(", ");
    }

    labels
        .get(value)
        .cloned()
        .unwrap_or_else(|| UNKNOWN_CHOICE_LABEL.to_string())
}

fn render_date(value: &str) -> String {
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(date) => date.format("%b %d, %Y").to_string(),
        Err(_) => value.to_string(),
    }
}

fn render_time(value: &str) -> String {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map(|time| time.format("%H:%M").to_string())
        .unwrap_or_else(|_| value.to_string())
}

fn truncate(value: &str) -> String {
    if value.chars().count() > DISPLAY_TRUNCATE_AT {
        let head: String = value.chars().take(DISPLAY_TRUNCATE_AT).collect();
        format!("{head}...")
    } else {
        value.to_string()
    }
}
