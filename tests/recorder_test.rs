use std::sync::Arc;

use serde_json::{Map, Value, json};
use tempfile::TempDir;

use vestige::adapters::store::json_store::JsonChangeStore;
use vestige::{
    Action, Actor, AppConfig, ChangeRecorder, FieldKind, FieldMetadataProvider, M2mOperation,
    Origin, Principal, Scope, TargetDescriptor, TrackedFields,
};

/// Metadata provider tracking everything except `updated_at`, with
/// `password` masked.
struct ArticleMetadata;

impl FieldMetadataProvider for ArticleMetadata {
    fn tracked_fields(&self, _model: &str) -> TrackedFields {
        TrackedFields {
            exclude: ["updated_at".to_string()].into_iter().collect(),
            mask: ["password".to_string()].into_iter().collect(),
            ..TrackedFields::default()
        }
    }

    fn field_kind(&self, _model: &str, _field: &str) -> Option<FieldKind> {
        Some(FieldKind::Plain)
    }

    fn verbose_name(&self, _model: &str, _field: &str) -> Option<String> {
        None
    }

    fn resolve_display(&self, _target_model: &str, _key: &str) -> vestige::Result<Option<String>> {
        Ok(None)
    }
}

fn make_recorder(dir: &TempDir) -> ChangeRecorder {
    let store = JsonChangeStore::new(dir.path(), "changes.log");
    ChangeRecorder::new(Arc::new(store), Arc::new(ArticleMetadata), AppConfig::default())
}

fn state(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn article(identifier: &str) -> TargetDescriptor {
    TargetDescriptor::new(
        "article",
        identifier,
        "articles",
        format!("Article #{identifier}"),
    )
}

// ─── End-to-end logging through the JSONL store ──────────────────

#[test]
fn attributed_update_round_trips_through_the_file() {
    let dir = TempDir::new().unwrap();
    let recorder = make_recorder(&dir);

    {
        let alice = Actor::Resolved(Principal {
            id: "1".to_string(),
            username: "alice".to_string(),
            email: None,
        });
        let _guard = Scope::enter(Arc::new(alice), Origin::new("10.0.0.1", 443));

        recorder
            .log_state_change(
                &article("7"),
                &state(&[("status", json!("draft"))]),
                &state(&[("status", json!("published"))]),
                Action::Update,
                false,
            )
            .unwrap()
            .expect("a record should be created");
    }

    let history = recorder.history("7").unwrap();
    assert_eq!(history.len(), 1);

    let record = &history[0];
    assert_eq!(record.action, Action::Update);
    assert_eq!(record.event_table, "articles");
    assert_eq!(record.event_column, "Article #7");
    assert_eq!(
        record.source.as_ref().map(|p| p.username.as_str()),
        Some("alice")
    );
    assert_eq!(record.remote_addr.as_deref(), Some("10.0.0.1"));
    assert_eq!(record.remote_port, Some(443));
}

#[test]
fn file_content_is_one_json_line_per_record() {
    let dir = TempDir::new().unwrap();
    let recorder = make_recorder(&dir);

    recorder
        .log_state_change(
            &article("1"),
            &state(&[]),
            &state(&[("status", json!("draft"))]),
            Action::Create,
            false,
        )
        .unwrap();
    recorder
        .log_m2m_change(
            &article("1"),
            "tags",
            M2mOperation::Add,
            &["Obj1".to_string(), "Obj2".to_string()],
        )
        .unwrap();

    let content = std::fs::read_to_string(dir.path().join("changes.log")).unwrap();
    assert_eq!(content.lines().count(), 2);
    assert!(content.contains("\"action\":\"create\""));
    assert!(content.contains("\"type\":\"m2m\""));
    assert!(content.contains("\"operation\":\"add\""));
}

// ─── Creation suppression ────────────────────────────────────────

#[test]
fn no_diff_and_no_force_log_means_no_record() {
    let dir = TempDir::new().unwrap();
    let recorder = make_recorder(&dir);
    let same = state(&[("status", json!("draft"))]);

    let result = recorder
        .log_state_change(&article("1"), &same, &same, Action::Update, false)
        .unwrap();

    assert!(result.is_none());
    assert!(!dir.path().join("changes.log").exists());
}

#[test]
fn force_log_records_null_change_value() {
    let dir = TempDir::new().unwrap();
    let recorder = make_recorder(&dir);
    let same = state(&[("status", json!("draft"))]);

    recorder
        .log_state_change(&article("1"), &same, &same, Action::Update, true)
        .unwrap()
        .expect("forced record");

    let history = recorder.history("1").unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].change_value.is_none());
}

#[test]
fn changes_limited_to_excluded_fields_create_nothing() {
    let dir = TempDir::new().unwrap();
    let recorder = make_recorder(&dir);

    let result = recorder
        .log_state_change(
            &article("1"),
            &state(&[("updated_at", json!("2024-01-01"))]),
            &state(&[("updated_at", json!("2024-02-01"))]),
            Action::Update,
            false,
        )
        .unwrap();

    assert!(result.is_none());
}

// ─── Masking ─────────────────────────────────────────────────────

#[test]
fn masked_fields_never_hit_the_disk_in_plaintext() {
    let dir = TempDir::new().unwrap();
    let recorder = make_recorder(&dir);

    recorder
        .log_state_change(
            &article("1"),
            &state(&[("password", json!("correct-horse-battery"))]),
            &state(&[("password", json!("staple-battery-horse"))]),
            Action::Update,
            false,
        )
        .unwrap()
        .expect("a record should be created");

    let content = std::fs::read_to_string(dir.path().join("changes.log")).unwrap();
    assert!(!content.contains("correct-horse-battery"));
    assert!(!content.contains("staple-battery-horse"));
    assert!(content.contains("**"));
}

// ─── Many-to-many ────────────────────────────────────────────────

#[test]
fn m2m_add_produces_one_update_record() {
    let dir = TempDir::new().unwrap();
    let recorder = make_recorder(&dir);

    let record = recorder
        .log_m2m_change(
            &article("1"),
            "tags",
            M2mOperation::Add,
            &["Obj1".to_string(), "Obj2".to_string()],
        )
        .unwrap()
        .expect("m2m record");

    assert_eq!(record.action, Action::Update);

    let value = serde_json::to_value(record.change_value.unwrap()).unwrap();
    assert_eq!(
        value,
        json!({"tags": {"type": "m2m", "operation": "add", "objects": ["Obj1", "Obj2"]}})
    );
}

#[test]
fn m2m_remove_with_empty_set_is_suppressed() {
    let dir = TempDir::new().unwrap();
    let recorder = make_recorder(&dir);

    let result = recorder
        .log_m2m_change(&article("1"), "tags", M2mOperation::Remove, &[])
        .unwrap();

    assert!(result.is_none());
}

// ─── Access logging and history ──────────────────────────────────

#[test]
fn history_interleaves_actions_for_one_target() {
    let dir = TempDir::new().unwrap();
    let recorder = make_recorder(&dir);

    recorder
        .log_state_change(
            &article("1"),
            &state(&[]),
            &state(&[("status", json!("draft"))]),
            Action::Create,
            false,
        )
        .unwrap();
    recorder.log_access(&article("1")).unwrap();
    recorder
        .log_state_change(
            &article("1"),
            &state(&[("status", json!("draft"))]),
            &state(&[]),
            Action::Delete,
            true,
        )
        .unwrap();

    let history = recorder.history("1").unwrap();
    let actions: Vec<Action> = history.iter().map(|r| r.action).collect();
    assert_eq!(actions, vec![Action::Create, Action::Access, Action::Delete]);
}
