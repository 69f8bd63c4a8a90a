use crate::core::errors::Result;
use crate::core::models::change_record::ChangeRecord;

/// Port for the append-only change store.
///
/// `create` persists an already-attributed record and returns the
/// stored form; implementations must never update a record in place.
pub trait ChangeStore: Send + Sync {
    /// Append one record to the store.
    fn create(&self, record: ChangeRecord) -> Result<ChangeRecord>;

    /// All records logged against the given target identifier,
    /// oldest first.
    fn query_by_target(&self, identifier: &str) -> Result<Vec<ChangeRecord>>;
}
