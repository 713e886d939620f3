//! # IVR Flow Configuration
//!
//! Tenant-scoped menu configuration: greeting, digit options, and fallback
//! behavior. At most one flow per tenant is meant to be active at a time;
//! that is a soft invariant enforced by newest-wins ordering, not a
//! uniqueness constraint, so resolution always sorts by creation time.
//!
//! Flows are owned by the administrative surface; the engine only reads them.
//! A tenant with no active flow gets [`FlowConfig::builtin_default`], so a
//! missing flow is never an error.
//!
//! The persisted `options` column is free-form JSON; it is parsed into typed
//! [`FlowOption`] values here, at the storage boundary, so the dispatcher
//! never handles opaque blobs.

pub mod sqlite;

pub use sqlite::SqliteFlowStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::error::Result;

/// Default gather parameters used by the built-in flow.
pub const DEFAULT_TIMEOUT_SECONDS: u32 = 10;
pub const DEFAULT_MAX_DIGITS: u32 = 4;
pub const DEFAULT_RETRIES: u32 = 3;

/// Greeting played by the built-in flow when a tenant has none configured.
pub const BUILTIN_GREETING: &str =
    "Thank you for calling. Press 1 for Sales, press 2 for Support, or press 3 for Billing.";

/// One routable menu choice: the advisory action name plus its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowOption {
    pub action: String,
    #[serde(default)]
    pub params: Value,
}

impl FlowOption {
    pub fn new(action: impl Into<String>, params: Value) -> Self {
        Self {
            action: action.into(),
            params,
        }
    }
}

/// A resolved IVR flow configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowConfig {
    pub name: String,
    pub greeting: String,
    pub timeout_seconds: u32,
    pub max_digits: u32,
    pub retries: u32,
    /// Digit string to option mapping, ordered for stable serialization.
    pub options: BTreeMap<String, FlowOption>,
    /// Used by the call-control collaborator when no digit matches.
    pub default_option: Option<FlowOption>,
    /// Used by the call-control collaborator when nothing else applies.
    pub fallback: Option<FlowOption>,
}

impl FlowConfig {
    /// The fixed flow used when a tenant has no active configuration.
    pub fn builtin_default() -> Self {
        let mut options = BTreeMap::new();
        options.insert(
            "1".to_string(),
            FlowOption::new("dept", json!({"department": "Sales"})),
        );
        options.insert(
            "2".to_string(),
            FlowOption::new("dept", json!({"department": "Support"})),
        );
        options.insert(
            "3".to_string(),
            FlowOption::new("dept", json!({"department": "Billing"})),
        );

        Self {
            name: "builtin_default".to_string(),
            greeting: BUILTIN_GREETING.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            max_digits: DEFAULT_MAX_DIGITS,
            retries: DEFAULT_RETRIES,
            options,
            default_option: Some(FlowOption::new(
                "ai",
                json!({"prompt": "I can help you with that. What can I do for you today?"}),
            )),
            fallback: Some(FlowOption::new(
                "voicemail",
                json!({"message": "Please leave a message after the tone."}),
            )),
        }
    }
}

/// Where a resolved flow came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowSource {
    /// The tenant's most recently created active flow.
    Tenant,
    /// The built-in default; the tenant has no active flow.
    Builtin,
}

impl FlowSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowSource::Tenant => "tenant",
            FlowSource::Builtin => "builtin",
        }
    }
}

/// A flow together with its provenance, recorded in the audit path.
#[derive(Debug, Clone)]
pub struct ResolvedFlow {
    pub flow: FlowConfig,
    pub source: FlowSource,
}

/// Read access to tenant flow configuration.
#[async_trait]
pub trait FlowStore: Send + Sync {
    /// The most recently created flow marked active for the tenant, if any.
    async fn get_active_flow(&self, tenant_id: &str) -> Result<Option<FlowConfig>>;
}

/// Resolve the flow that governs calls for this tenant, falling back to the
/// built-in default when none is configured.
pub async fn resolve_active_flow(store: &dyn FlowStore, tenant_id: &str) -> Result<ResolvedFlow> {
    match store.get_active_flow(tenant_id).await? {
        Some(flow) => Ok(ResolvedFlow {
            flow,
            source: FlowSource::Tenant,
        }),
        None => Ok(ResolvedFlow {
            flow: FlowConfig::builtin_default(),
            source: FlowSource::Builtin,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_default_has_standard_gather_parameters() {
        let flow = FlowConfig::builtin_default();
        assert_eq!(flow.timeout_seconds, 10);
        assert_eq!(flow.max_digits, 4);
        assert_eq!(flow.retries, 3);
        assert_eq!(flow.greeting, BUILTIN_GREETING);
    }

    #[test]
    fn builtin_default_routes_digits_to_departments() {
        let flow = FlowConfig::builtin_default();
        assert_eq!(flow.options.len(), 3);
        assert_eq!(flow.options["1"].action, "dept");
        assert_eq!(flow.options["1"].params["department"], "Sales");
        assert_eq!(flow.options["2"].params["department"], "Support");
        assert_eq!(flow.options["3"].params["department"], "Billing");

        assert_eq!(flow.default_option.as_ref().unwrap().action, "ai");
        assert_eq!(flow.fallback.as_ref().unwrap().action, "voicemail");
    }
}
