//! Attribute every change. Diff every field. Trust your audit trail.
//!
//! Vestige instruments data mutations so every create, update and
//! delete of a tracked record produces an immutable change record
//! describing what changed, who caused it, and from where. Attribution
//! is scope-based and safe under concurrency: each execution enters an
//! attribution scope, and a token check at record-creation time
//! guarantees that interleaved scopes never cross-attribute.

pub mod adapters;
pub mod config;
pub mod core;

pub use crate::config::app_config::AppConfig;
pub use crate::core::errors::{Result, VestigeError};
pub use crate::core::models::actor::{Actor, Principal};
pub use crate::core::models::change_record::{Action, ChangeRecord, TargetDescriptor};
pub use crate::core::models::change_set::{ChangeDescriptor, ChangeMap, M2mOperation};
pub use crate::core::models::field_meta::{FieldKind, TrackedFields};
pub use crate::core::scope::{Origin, Scope, ScopeGuard, current_actor, current_origin};
pub use crate::core::services::diff_service::DiffEngine;
pub use crate::core::services::display_service::{DisplayFormatter, DisplayMap, DisplayedChange};
pub use crate::core::services::record_service::ChangeRecorder;
pub use crate::core::traits::field_metadata::FieldMetadataProvider;
pub use crate::core::traits::principal::PrincipalResolver;
pub use crate::core::traits::store::ChangeStore;
