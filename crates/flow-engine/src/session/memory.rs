//! In-memory session store
//!
//! Backed by a concurrent map; mutations happen under the map's per-entry
//! lock, so appends for the same call serialize without a version loop.
//! Used by unit tests and ephemeral deployments.

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::error::{FlowEngineError, Result};
use crate::session::types::{CallSession, CallStatus, FinalizeRecord, NewCallSession, PathStep};
use crate::session::SessionStore;

type SessionKey = (String, String);

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: DashMap<SessionKey, CallSession>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, new: NewCallSession, entry_step: PathStep) -> Result<CallSession> {
        let key = (new.tenant_id.clone(), new.call_id.clone());
        match self.sessions.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(FlowEngineError::conflict(&new.tenant_id, &new.call_id))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let session = new.into_session(entry_step);
                debug!(
                    tenant_id = %session.tenant_id,
                    call_id = %session.call_id,
                    "Created call session"
                );
                slot.insert(session.clone());
                Ok(session)
            }
        }
    }

    async fn append_step(&self, tenant_id: &str, call_id: &str, step: PathStep) -> Result<()> {
        let key = (tenant_id.to_string(), call_id.to_string());
        match self.sessions.get_mut(&key) {
            Some(mut session) => {
                session.path.push(step);
                session.version += 1;
                Ok(())
            }
            None => Err(FlowEngineError::not_found(tenant_id, call_id)),
        }
    }

    async fn finalize(&self, tenant_id: &str, call_id: &str, record: FinalizeRecord) -> Result<()> {
        let key = (tenant_id.to_string(), call_id.to_string());
        match self.sessions.get_mut(&key) {
            Some(mut session) => {
                session.status = CallStatus::Completed;
                session.ended_at = Some(record.ended_at);
                session.outcome = Some(record.outcome);
                session.tags = record.tags;
                session.cdr = record.cdr;
                session.total_steps = record.metrics.total_steps;
                session.ai_steps = record.metrics.ai_steps;
                session.api_calls = record.metrics.api_calls;
                session.duration_seconds = Some(record.metrics.duration_seconds);
                session.version += 1;
                Ok(())
            }
            None => Err(FlowEngineError::not_found(tenant_id, call_id)),
        }
    }

    async fn get(&self, tenant_id: &str, call_id: &str) -> Result<CallSession> {
        let key = (tenant_id.to_string(), call_id.to_string());
        self.sessions
            .get(&key)
            .map(|s| s.clone())
            .ok_or_else(|| FlowEngineError::not_found(tenant_id, call_id))
    }

    async fn set_external_ref(
        &self,
        tenant_id: &str,
        call_id: &str,
        external_ref: &str,
    ) -> Result<()> {
        let key = (tenant_id.to_string(), call_id.to_string());
        match self.sessions.get_mut(&key) {
            Some(mut session) => {
                session.external_call_ref = Some(external_ref.to_string());
                Ok(())
            }
            None => Err(FlowEngineError::not_found(tenant_id, call_id)),
        }
    }

    async fn count_active(&self) -> Result<u64> {
        let count = self
            .sessions
            .iter()
            .filter(|entry| entry.status == CallStatus::Active)
            .count();
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::types::CallDirection;
    use chrono::Utc;
    use serde_json::Map;
    use std::sync::Arc;

    fn new_session(call_id: &str) -> NewCallSession {
        NewCallSession {
            tenant_id: "T1".into(),
            call_id: call_id.into(),
            from_number: "+15559876543".into(),
            to_number: "+15551230000".into(),
            did: "+15551230000".into(),
            direction: CallDirection::Inbound,
            started_at: Utc::now(),
        }
    }

    fn entry_step() -> PathStep {
        PathStep::new("entry", "call_received", Map::new())
    }

    #[tokio::test]
    async fn create_then_duplicate_conflicts() {
        let store = MemorySessionStore::new();
        store.create(new_session("c1"), entry_step()).await.unwrap();

        let err = store
            .create(new_session("c1"), entry_step())
            .await
            .unwrap_err();
        assert!(matches!(err, FlowEngineError::Conflict { .. }));
    }

    #[tokio::test]
    async fn concurrent_appends_lose_no_steps() {
        let store = Arc::new(MemorySessionStore::new());
        store.create(new_session("c2"), entry_step()).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let step = PathStep::new("ivr_event", format!("event_{i}"), Map::new());
                store.append_step("T1", "c2", step).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let session = store.get("T1", "c2").await.unwrap();
        assert_eq!(session.path.len(), 33); // entry + 32 appends
    }

    #[tokio::test]
    async fn append_to_unknown_session_is_not_found() {
        let store = MemorySessionStore::new();
        let err = store
            .append_step("T1", "nope", entry_step())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
