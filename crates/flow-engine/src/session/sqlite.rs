//! SQLite-backed session store
//!
//! Path, tags and CDR are stored as JSON text columns; everything the engine
//! matches on is a plain column. Appends use optimistic versioning: the row's
//! `version` is read with the path, the update is guarded by
//! `WHERE version = ?`, and a lost race re-reads and retries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::{FlowEngineError, Result};
use crate::session::types::{
    CallDirection, CallSession, CallStatus, FinalizeRecord, NewCallSession, PathStep,
};
use crate::session::SessionStore;

/// How many times a lost append race is retried before giving up.
///
/// Exhausting the budget surfaces `VersionConflict`, which the webhook layer
/// reports as a server error; the provider redelivers the event and the
/// append starts fresh. Each retry re-reads the row, so the budget bounds
/// latency under same-call contention rather than correctness.
const MAX_APPEND_ATTEMPTS: u32 = 8;

#[derive(Clone)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    tenant_id: String,
    call_id: String,
    from_number: String,
    to_number: String,
    did: String,
    direction: String,
    status: String,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    path: String,
    outcome: Option<String>,
    tags: String,
    cdr: Option<String>,
    total_steps: i64,
    ai_steps: i64,
    api_calls: i64,
    duration_seconds: Option<i64>,
    external_call_ref: Option<String>,
    version: i64,
}

impl SessionRow {
    fn into_session(self) -> Result<CallSession> {
        let direction = CallDirection::parse(&self.direction).ok_or_else(|| {
            FlowEngineError::Internal(format!("invalid direction in row: {}", self.direction))
        })?;
        let status = CallStatus::parse(&self.status).ok_or_else(|| {
            FlowEngineError::Internal(format!("invalid status in row: {}", self.status))
        })?;
        let path: Vec<PathStep> = serde_json::from_str(&self.path)?;
        let tags: Vec<String> = serde_json::from_str(&self.tags)?;
        let cdr: Option<Value> = match self.cdr {
            Some(raw) => Some(serde_json::from_str(&raw)?),
            None => None,
        };
        Ok(CallSession {
            tenant_id: self.tenant_id,
            call_id: self.call_id,
            from_number: self.from_number,
            to_number: self.to_number,
            did: self.did,
            direction,
            status,
            started_at: self.started_at,
            ended_at: self.ended_at,
            path,
            outcome: self.outcome,
            tags,
            cdr,
            total_steps: self.total_steps as u32,
            ai_steps: self.ai_steps as u32,
            api_calls: self.api_calls as u32,
            duration_seconds: self.duration_seconds,
            external_call_ref: self.external_call_ref,
            version: self.version,
        })
    }
}

impl SqliteSessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_path_and_version(
        &self,
        tenant_id: &str,
        call_id: &str,
    ) -> Result<Option<(Vec<PathStep>, i64)>> {
        let row: Option<(String, i64)> = sqlx::query_as(
            "SELECT path, version FROM call_sessions WHERE tenant_id = ? AND call_id = ?",
        )
        .bind(tenant_id)
        .bind(call_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((raw, version)) => {
                let path: Vec<PathStep> = serde_json::from_str(&raw)?;
                Ok(Some((path, version)))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn create(&self, new: NewCallSession, entry_step: PathStep) -> Result<CallSession> {
        let session = new.into_session(entry_step);
        let path_json = serde_json::to_string(&session.path)?;

        let result = sqlx::query(
            "INSERT INTO call_sessions
                (tenant_id, call_id, from_number, to_number, did, direction,
                 status, started_at, path, tags, version)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, '[]', 0)",
        )
        .bind(&session.tenant_id)
        .bind(&session.call_id)
        .bind(&session.from_number)
        .bind(&session.to_number)
        .bind(&session.did)
        .bind(session.direction.as_str())
        .bind(session.status.as_str())
        .bind(session.started_at)
        .bind(&path_json)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                debug!(
                    tenant_id = %session.tenant_id,
                    call_id = %session.call_id,
                    "Created call session"
                );
                Ok(session)
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(FlowEngineError::conflict(&session.tenant_id, &session.call_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn append_step(&self, tenant_id: &str, call_id: &str, step: PathStep) -> Result<()> {
        for attempt in 1..=MAX_APPEND_ATTEMPTS {
            let (mut path, version) = match self.fetch_path_and_version(tenant_id, call_id).await? {
                Some(found) => found,
                None => return Err(FlowEngineError::not_found(tenant_id, call_id)),
            };

            path.push(step.clone());
            let path_json = serde_json::to_string(&path)?;

            let updated = sqlx::query(
                "UPDATE call_sessions
                 SET path = ?, version = version + 1
                 WHERE tenant_id = ? AND call_id = ? AND version = ?",
            )
            .bind(&path_json)
            .bind(tenant_id)
            .bind(call_id)
            .bind(version)
            .execute(&self.pool)
            .await?;

            if updated.rows_affected() > 0 {
                return Ok(());
            }

            warn!(
                tenant_id, call_id, attempt,
                "Lost append race on call session, retrying"
            );
        }

        Err(FlowEngineError::VersionConflict {
            tenant_id: tenant_id.to_string(),
            call_id: call_id.to_string(),
            attempts: MAX_APPEND_ATTEMPTS,
        })
    }

    async fn finalize(&self, tenant_id: &str, call_id: &str, record: FinalizeRecord) -> Result<()> {
        let tags_json = serde_json::to_string(&record.tags)?;
        let cdr_json = match &record.cdr {
            Some(cdr) => Some(serde_json::to_string(cdr)?),
            None => None,
        };

        let updated = sqlx::query(
            "UPDATE call_sessions
             SET status = 'completed', ended_at = ?, outcome = ?, tags = ?, cdr = ?,
                 total_steps = ?, ai_steps = ?, api_calls = ?, duration_seconds = ?,
                 version = version + 1
             WHERE tenant_id = ? AND call_id = ?",
        )
        .bind(record.ended_at)
        .bind(&record.outcome)
        .bind(&tags_json)
        .bind(&cdr_json)
        .bind(record.metrics.total_steps as i64)
        .bind(record.metrics.ai_steps as i64)
        .bind(record.metrics.api_calls as i64)
        .bind(record.metrics.duration_seconds)
        .bind(tenant_id)
        .bind(call_id)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(FlowEngineError::not_found(tenant_id, call_id));
        }
        Ok(())
    }

    async fn get(&self, tenant_id: &str, call_id: &str) -> Result<CallSession> {
        let row: Option<SessionRow> = sqlx::query_as(
            "SELECT tenant_id, call_id, from_number, to_number, did, direction,
                    status, started_at, ended_at, path, outcome, tags, cdr,
                    total_steps, ai_steps, api_calls, duration_seconds,
                    external_call_ref, version
             FROM call_sessions WHERE tenant_id = ? AND call_id = ?",
        )
        .bind(tenant_id)
        .bind(call_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.into_session(),
            None => Err(FlowEngineError::not_found(tenant_id, call_id)),
        }
    }

    async fn set_external_ref(
        &self,
        tenant_id: &str,
        call_id: &str,
        external_ref: &str,
    ) -> Result<()> {
        let updated = sqlx::query(
            "UPDATE call_sessions SET external_call_ref = ?
             WHERE tenant_id = ? AND call_id = ?",
        )
        .bind(external_ref)
        .bind(tenant_id)
        .bind(call_id)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(FlowEngineError::not_found(tenant_id, call_id));
        }
        Ok(())
    }

    async fn count_active(&self) -> Result<u64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM call_sessions WHERE status = 'active'")
                .fetch_one(&self.pool)
                .await?;
        Ok(count as u64)
    }
}
