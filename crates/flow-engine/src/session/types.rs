//! Core types for call sessions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Direction of a call attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallDirection {
    Inbound,
    Outbound,
}

impl CallDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallDirection::Inbound => "inbound",
            CallDirection::Outbound => "outbound",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "inbound" => Some(CallDirection::Inbound),
            "outbound" => Some(CallDirection::Outbound),
            _ => None,
        }
    }
}

/// Lifecycle status of a call session.
///
/// Inbound calls start `Active`, outbound calls start `Initiating`;
/// `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Initiating,
    Active,
    Completed,
    Failed,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Initiating => "initiating",
            CallStatus::Active => "active",
            CallStatus::Completed => "completed",
            CallStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "initiating" => Some(CallStatus::Initiating),
            "active" => Some(CallStatus::Active),
            "completed" => Some(CallStatus::Completed),
            "failed" => Some(CallStatus::Failed),
            _ => None,
        }
    }
}

/// One entry in a session's audit path. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathStep {
    pub node_id: String,
    pub action: String,
    pub at: DateTime<Utc>,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl PathStep {
    pub fn new(
        node_id: impl Into<String>,
        action: impl Into<String>,
        data: Map<String, Value>,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            action: action.into(),
            at: Utc::now(),
            data,
        }
    }

    /// True when this step records the same event name and payload as
    /// `other`. Timestamps are ignored; provider retries carry fresh ones.
    pub fn same_event(&self, other: &PathStep) -> bool {
        self.node_id == other.node_id && self.action == other.action && self.data == other.data
    }
}

/// One call attempt, with its full append-only path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSession {
    pub tenant_id: String,
    pub call_id: String,
    pub from_number: String,
    pub to_number: String,
    pub did: String,
    pub direction: CallDirection,
    pub status: CallStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub path: Vec<PathStep>,
    pub outcome: Option<String>,
    pub tags: Vec<String>,
    pub cdr: Option<Value>,
    pub total_steps: u32,
    pub ai_steps: u32,
    pub api_calls: u32,
    pub duration_seconds: Option<i64>,
    pub external_call_ref: Option<String>,
    /// Storage-level optimistic concurrency counter.
    pub version: i64,
}

/// Parameters for creating a session.
#[derive(Debug, Clone)]
pub struct NewCallSession {
    pub tenant_id: String,
    pub call_id: String,
    pub from_number: String,
    pub to_number: String,
    pub did: String,
    pub direction: CallDirection,
    pub started_at: DateTime<Utc>,
}

impl NewCallSession {
    /// Initial status per direction: inbound calls are already ringing when
    /// the entry webhook fires, outbound calls are still being set up.
    pub fn initial_status(&self) -> CallStatus {
        match self.direction {
            CallDirection::Inbound => CallStatus::Active,
            CallDirection::Outbound => CallStatus::Initiating,
        }
    }

    pub fn into_session(self, entry_step: PathStep) -> CallSession {
        let status = self.initial_status();
        CallSession {
            tenant_id: self.tenant_id,
            call_id: self.call_id,
            from_number: self.from_number,
            to_number: self.to_number,
            did: self.did,
            direction: self.direction,
            status,
            started_at: self.started_at,
            ended_at: None,
            path: vec![entry_step],
            outcome: None,
            tags: Vec::new(),
            cdr: None,
            total_steps: 0,
            ai_steps: 0,
            api_calls: 0,
            duration_seconds: None,
            external_call_ref: None,
            version: 0,
        }
    }
}

/// Derived metrics computed at call completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CallMetrics {
    pub total_steps: u32,
    pub ai_steps: u32,
    pub api_calls: u32,
    pub duration_seconds: i64,
}

/// Everything written back at finalize time.
#[derive(Debug, Clone)]
pub struct FinalizeRecord {
    pub outcome: String,
    pub tags: Vec<String>,
    pub cdr: Option<Value>,
    pub metrics: CallMetrics,
    pub ended_at: DateTime<Utc>,
}
