//! # Call Session Store
//!
//! Durable, per-call records with an append-only audit path. One
//! [`CallSession`] exists per call attempt, keyed by `(tenant_id, call_id)`;
//! it is created on the first entry event, grows one [`PathStep`] per
//! received event, and is finalized exactly once when the terminal log event
//! arrives.
//!
//! ## Concurrency
//!
//! Webhooks for the same call can arrive concurrently (providers retry, and
//! ordering is not guaranteed). A naive read-modify-write of the path array
//! loses updates, so both store implementations serialize mutations per call:
//!
//! - [`SqliteSessionStore`] uses optimistic versioning: reads carry a
//!   `version`, writes are compare-and-swap on that version, and a lost race
//!   re-reads and retries a bounded number of times.
//! - [`MemorySessionStore`] mutates under the map's per-entry lock.
//!
//! Calls for *different* sessions never contend beyond the storage layer.

pub mod memory;
pub mod sqlite;
pub mod types;

pub use memory::MemorySessionStore;
pub use sqlite::SqliteSessionStore;
pub use types::{
    CallDirection, CallMetrics, CallSession, CallStatus, FinalizeRecord, NewCallSession, PathStep,
};

use async_trait::async_trait;

use crate::error::Result;

/// Storage interface for call sessions.
///
/// Injected into the dispatcher and classifier at construction; there is no
/// process-wide storage handle.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a new session with the given entry step as its first path
    /// entry. Fails with `Conflict` if `(tenant_id, call_id)` already exists.
    async fn create(&self, new: NewCallSession, entry_step: PathStep) -> Result<CallSession>;

    /// Atomically append one step to the session's path.
    /// Fails with `NotFound` if the session does not exist.
    async fn append_step(&self, tenant_id: &str, call_id: &str, step: PathStep) -> Result<()>;

    /// Write the terminal outcome, metrics and CDR, and mark the session
    /// completed. A second finalize overwrites the first (the terminal log
    /// webhook is expected exactly once; redelivery rewrites the same data).
    /// Fails with `NotFound` if the session does not exist.
    async fn finalize(&self, tenant_id: &str, call_id: &str, record: FinalizeRecord) -> Result<()>;

    /// Fetch a session. Fails with `NotFound` if absent.
    async fn get(&self, tenant_id: &str, call_id: &str) -> Result<CallSession>;

    /// Record the correlation id assigned by the telephony provider.
    async fn set_external_ref(
        &self,
        tenant_id: &str,
        call_id: &str,
        external_ref: &str,
    ) -> Result<()>;

    /// Number of sessions still in `active` status, across all tenants.
    async fn count_active(&self) -> Result<u64>;
}
