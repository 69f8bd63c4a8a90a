use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::config::app_config::AppConfig;
use crate::core::dispatch;
use crate::core::errors::Result;
use crate::core::models::change_record::{Action, ChangeRecord, TargetDescriptor};
use crate::core::models::change_set::{ChangeMap, M2mOperation};
use crate::core::scope::{self, Origin, Scope, ScopeGuard};
use crate::core::services::diff_service::DiffEngine;
use crate::core::traits::field_metadata::FieldMetadataProvider;
use crate::core::traits::principal::PrincipalResolver;
use crate::core::traits::store::ChangeStore;

/// Turns state-change events into attributed, persisted change
/// records.
///
/// This is the write-side entry point of the crate: it masks, diffs,
/// applies the creation-suppression rule, runs attribution, and
/// appends through the store port. Store failures propagate to the
/// caller; there is no retry or buffering.
pub struct ChangeRecorder {
    store: Arc<dyn ChangeStore>,
    metadata: Arc<dyn FieldMetadataProvider>,
    config: AppConfig,
    diff: DiffEngine,
}

impl ChangeRecorder {
    pub fn new(
        store: Arc<dyn ChangeStore>,
        metadata: Arc<dyn FieldMetadataProvider>,
        config: AppConfig,
    ) -> Self {
        Self {
            store,
            metadata,
            config,
            diff: DiffEngine,
        }
    }

    /// Enter an attribution scope honoring this recorder's
    /// configuration: with `disable_remote_address` set, origin
    /// metadata is not captured at all.
    pub fn enter_scope(&self, resolver: Arc<dyn PrincipalResolver>, origin: Origin) -> ScopeGuard {
        let origin = if self.config.vestige.disable_remote_address {
            Origin::default()
        } else {
            origin
        };
        Scope::enter(resolver, origin)
    }

    /// Log a create/update/delete of a tracked record.
    ///
    /// Returns `Ok(None)` without touching the store when logging is
    /// suppressed (disabled scope, store disabled) or when no tracked
    /// field differs and `force_log` is unset. With `force_log` set
    /// and no differences, a record with `change_value = None` is
    /// stored.
    pub fn log_state_change(
        &self,
        target: &TargetDescriptor,
        prior: &Map<String, Value>,
        new: &Map<String, Value>,
        action: Action,
        force_log: bool,
    ) -> Result<Option<ChangeRecord>> {
        if self.suppressed() {
            return Ok(None);
        }

        let tracked = self.metadata.tracked_fields(&target.model);

        let mut all_fields: BTreeSet<String> = prior.keys().cloned().collect();
        all_fields.extend(new.keys().cloned());
        let applicable = tracked.applicable(&all_fields);

        let prior = self.diff.mask_fields(prior.clone(), &tracked.mask);
        let new = self.diff.mask_fields(new.clone(), &tracked.mask);

        let changes = self.diff.compute_change(&prior, &new, &applicable);

        if changes.is_none() && !force_log {
            tracing::debug!(
                model = %target.model,
                identifier = %target.identifier,
                "no tracked changes, suppressing record"
            );
            return Ok(None);
        }

        self.append(ChangeRecord::new(target, action, changes))
            .map(Some)
    }

    /// Log an add/remove on a many-to-many relationship field.
    ///
    /// An empty related set produces no record.
    pub fn log_m2m_change(
        &self,
        target: &TargetDescriptor,
        field: &str,
        operation: M2mOperation,
        objects: &[String],
    ) -> Result<Option<ChangeRecord>> {
        if self.suppressed() || objects.is_empty() {
            return Ok(None);
        }

        let changes = self.diff.compute_m2m_change(field, operation, objects);
        self.append(ChangeRecord::new(target, Action::Update, Some(changes)))
            .map(Some)
    }

    /// Log a read of a tracked record. Access entries carry no change
    /// map.
    pub fn log_access(&self, target: &TargetDescriptor) -> Result<Option<ChangeRecord>> {
        if self.suppressed() {
            return Ok(None);
        }

        self.append(ChangeRecord::new(target, Action::Access, None))
            .map(Some)
    }

    /// The changes of a record under this recorder's configuration,
    /// consulting the legacy text format when enabled.
    pub fn changes_for(&self, record: &ChangeRecord) -> ChangeMap {
        record.changes(self.config.vestige.use_text_changes_fallback)
    }

    /// All records logged against a target identifier.
    pub fn history(&self, identifier: &str) -> Result<Vec<ChangeRecord>> {
        self.store.query_by_target(identifier)
    }

    fn suppressed(&self) -> bool {
        if scope::is_disabled() {
            tracing::debug!("change logging disabled for this scope");
            return true;
        }
        !self.config.store.enabled
    }

    fn append(&self, mut record: ChangeRecord) -> Result<ChangeRecord> {
        dispatch::apply_attribution(&mut record);
        self.store.create(record)
    }
}
