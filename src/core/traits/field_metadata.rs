use crate::core::errors::Result;
use crate::core::models::field_meta::{FieldKind, TrackedFields};

/// Port for model field metadata: which fields are tracked, how they
/// display, and how referenced objects are represented.
pub trait FieldMetadataProvider: Send + Sync {
    /// Tracking configuration for a model.
    fn tracked_fields(&self, model: &str) -> TrackedFields;

    /// Display kind of one field. `None` when the field has no
    /// resolvable metadata (e.g. it was removed from the model after
    /// the record was written); the formatter then passes the raw
    /// values through.
    fn field_kind(&self, model: &str, field: &str) -> Option<FieldKind>;

    /// Human label for a field, when the model declares one.
    fn verbose_name(&self, model: &str, field: &str) -> Option<String>;

    /// Current display string of the object `key` refers to in
    /// `target_model`. `Ok(None)` means the object no longer exists;
    /// an error means the key could not be interpreted at all, and
    /// the formatter falls back to the raw stored value.
    fn resolve_display(&self, target_model: &str, key: &str) -> Result<Option<String>>;
}
