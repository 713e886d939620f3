//! Tests for the SQLite session store: uniqueness, atomic appends under
//! concurrency, and finalize semantics.

use chrono::{Duration, Utc};
use serde_json::{json, Map};
use std::sync::Arc;
use tempfile::TempDir;

use dialplane_flow_engine::config::DatabaseConfig;
use dialplane_flow_engine::database;
use dialplane_flow_engine::error::FlowEngineError;
use dialplane_flow_engine::session::{
    CallDirection, CallMetrics, CallStatus, FinalizeRecord, NewCallSession, PathStep, SessionStore,
    SqliteSessionStore,
};

async fn create_test_store() -> (SqliteSessionStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("sessions.db");
    let config = DatabaseConfig {
        database_url: format!("sqlite://{}?mode=rwc", db_path.display()),
        max_connections: 5,
    };
    let pool = database::connect(&config)
        .await
        .expect("Failed to create test database");
    (SqliteSessionStore::new(pool), temp_dir)
}

fn new_session(call_id: &str) -> NewCallSession {
    NewCallSession {
        tenant_id: "T1".to_string(),
        call_id: call_id.to_string(),
        from_number: "+15559876543".to_string(),
        to_number: "+15551230000".to_string(),
        did: "+15551230000".to_string(),
        direction: CallDirection::Inbound,
        started_at: Utc::now(),
    }
}

fn entry_step() -> PathStep {
    let mut data = Map::new();
    data.insert("did".to_string(), json!("+15551230000"));
    PathStep::new("entry", "call_received", data)
}

#[tokio::test]
async fn create_and_get_roundtrip() {
    let (store, _dir) = create_test_store().await;

    let created = store.create(new_session("c1"), entry_step()).await.unwrap();
    assert_eq!(created.status, CallStatus::Active);

    let fetched = store.get("T1", "c1").await.unwrap();
    assert_eq!(fetched.call_id, "c1");
    assert_eq!(fetched.from_number, "+15559876543");
    assert_eq!(fetched.path.len(), 1);
    assert_eq!(fetched.path[0].action, "call_received");
    assert!(fetched.outcome.is_none());
    assert!(fetched.ended_at.is_none());
}

#[tokio::test]
async fn duplicate_create_is_conflict() {
    let (store, _dir) = create_test_store().await;

    store.create(new_session("c1"), entry_step()).await.unwrap();
    let err = store
        .create(new_session("c1"), entry_step())
        .await
        .unwrap_err();
    assert!(matches!(err, FlowEngineError::Conflict { .. }));

    // Same call id under another tenant is fine.
    let mut other = new_session("c1");
    other.tenant_id = "T2".to_string();
    store.create(other, entry_step()).await.unwrap();
}

#[tokio::test]
async fn append_to_missing_session_is_not_found() {
    let (store, _dir) = create_test_store().await;
    let err = store
        .append_step("T1", "ghost", entry_step())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn concurrent_appends_for_one_call_lose_nothing() {
    let (store, _dir) = create_test_store().await;
    let store = Arc::new(store);
    store.create(new_session("c1"), entry_step()).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..20 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let step = PathStep::new("ivr_event", format!("event_{i}"), Map::new());
            store.append_step("T1", "c1", step).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let session = store.get("T1", "c1").await.unwrap();
    assert_eq!(session.path.len(), 21); // entry + 20 concurrent appends
    assert_eq!(session.version, 20);
}

#[tokio::test]
async fn path_length_is_non_decreasing_across_appends() {
    let (store, _dir) = create_test_store().await;
    store.create(new_session("c1"), entry_step()).await.unwrap();

    let mut previous = store.get("T1", "c1").await.unwrap().path.len();
    for i in 0..5 {
        let step = PathStep::new("ivr_event", format!("event_{i}"), Map::new());
        store.append_step("T1", "c1", step).await.unwrap();
        let current = store.get("T1", "c1").await.unwrap().path.len();
        assert_eq!(current, previous + 1);
        previous = current;
    }
}

#[tokio::test]
async fn finalize_writes_outcome_and_metrics() {
    let (store, _dir) = create_test_store().await;
    store.create(new_session("c1"), entry_step()).await.unwrap();

    let ended_at = Utc::now() + Duration::seconds(42);
    store
        .finalize(
            "T1",
            "c1",
            FinalizeRecord {
                outcome: "voicemail".to_string(),
                tags: vec!["voicemail".to_string()],
                cdr: Some(json!({"provider_id": "abc-123"})),
                metrics: CallMetrics {
                    total_steps: 3,
                    ai_steps: 0,
                    api_calls: 0,
                    duration_seconds: 42,
                },
                ended_at,
            },
        )
        .await
        .unwrap();

    let session = store.get("T1", "c1").await.unwrap();
    assert_eq!(session.status, CallStatus::Completed);
    assert_eq!(session.outcome.as_deref(), Some("voicemail"));
    assert_eq!(session.tags, vec!["voicemail"]);
    assert_eq!(session.total_steps, 3);
    assert_eq!(session.duration_seconds, Some(42));
    assert_eq!(session.cdr.unwrap()["provider_id"], "abc-123");
    assert!(session.ended_at.is_some());
}

#[tokio::test]
async fn finalize_missing_session_is_not_found() {
    let (store, _dir) = create_test_store().await;
    let err = store
        .finalize(
            "T1",
            "ghost",
            FinalizeRecord {
                outcome: "answered".to_string(),
                tags: vec![],
                cdr: None,
                metrics: CallMetrics::default(),
                ended_at: Utc::now(),
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn second_finalize_overwrites_first() {
    // The terminal log webhook is expected once; a redelivery rewrites the
    // outcome rather than erroring. Documented store behavior.
    let (store, _dir) = create_test_store().await;
    store.create(new_session("c1"), entry_step()).await.unwrap();

    let record = |outcome: &str, duration: i64| FinalizeRecord {
        outcome: outcome.to_string(),
        tags: vec![],
        cdr: None,
        metrics: CallMetrics {
            total_steps: 1,
            ai_steps: 0,
            api_calls: 0,
            duration_seconds: duration,
        },
        ended_at: Utc::now(),
    };

    store.finalize("T1", "c1", record("answered", 10)).await.unwrap();
    store.finalize("T1", "c1", record("voicemail", 99)).await.unwrap();

    let session = store.get("T1", "c1").await.unwrap();
    assert_eq!(session.outcome.as_deref(), Some("voicemail"));
    assert_eq!(session.duration_seconds, Some(99));
}

#[tokio::test]
async fn external_ref_and_active_count() {
    let (store, _dir) = create_test_store().await;
    store.create(new_session("c1"), entry_step()).await.unwrap();
    store.create(new_session("c2"), entry_step()).await.unwrap();
    assert_eq!(store.count_active().await.unwrap(), 2);

    store
        .set_external_ref("T1", "c1", "provider-ref-9")
        .await
        .unwrap();
    let session = store.get("T1", "c1").await.unwrap();
    assert_eq!(session.external_call_ref.as_deref(), Some("provider-ref-9"));

    store
        .finalize(
            "T1",
            "c1",
            FinalizeRecord {
                outcome: "answered".to_string(),
                tags: vec![],
                cdr: None,
                metrics: CallMetrics::default(),
                ended_at: Utc::now(),
            },
        )
        .await
        .unwrap();
    assert_eq!(store.count_active().await.unwrap(), 1);
}
