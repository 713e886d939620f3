//! # Outcome Classifier
//!
//! Runs once per call, when the terminal log event arrives. Reads the full
//! audit path, derives the outcome from the last recorded step, computes
//! summary metrics, and persists everything through the session store's
//! finalize operation.
//!
//! The last path step carries the raw event name, so classification accepts
//! both resolved action names (`voicemail`, `extension`, ...) and the
//! terminal event names that resolve to them (`no_answer` and friends all
//! end in voicemail).

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::error::Result;
use crate::session::{CallMetrics, FinalizeRecord, SessionStore};

/// Result of classifying a completed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOutcome {
    pub call_id: String,
    pub outcome: String,
    pub tags: Vec<String>,
    pub metrics: CallMetrics,
}

/// Map a final path-step action to `(outcome, optional tag)`.
fn classify_action(action: &str) -> (&'static str, Option<&'static str>) {
    match action {
        "answered" => ("answered", None),
        "voicemail" | "no_answer" | "busy" | "failed" | "timeout" => {
            ("voicemail", Some("voicemail"))
        }
        "extension" | "extension_dial" => ("extension_answered", Some("extension")),
        "dept" | "dept_dial" => ("dept_answered", Some("department")),
        "ai" | "ai_handoff" => ("ai_handled", Some("ai")),
        "hangup" => ("caller_hung_up", None),
        _ => ("unknown", None),
    }
}

pub struct OutcomeClassifier {
    sessions: Arc<dyn SessionStore>,
}

impl OutcomeClassifier {
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        Self { sessions }
    }

    /// Classify and finalize a call.
    ///
    /// Fails with `NotFound` when no session exists: a CDR for a call that
    /// never entered indicates a protocol violation upstream. Calling twice
    /// overwrites the first outcome (provider retries of the log webhook).
    pub async fn finalize_call(
        &self,
        tenant_id: &str,
        call_id: &str,
        cdr: Option<Value>,
    ) -> Result<CallOutcome> {
        let session = self.sessions.get(tenant_id, call_id).await?;

        let last_action = session
            .path
            .last()
            .map(|step| step.action.as_str())
            .unwrap_or_default();
        let (outcome, tag) = classify_action(last_action);
        let tags: Vec<String> = tag.map(str::to_string).into_iter().collect();

        let ended_at = Utc::now();
        // Substring counts are historical: "voicemail" itself contains "ai".
        let metrics = CallMetrics {
            total_steps: session.path.len() as u32,
            ai_steps: session
                .path
                .iter()
                .filter(|step| step.action.contains("ai"))
                .count() as u32,
            api_calls: session
                .path
                .iter()
                .filter(|step| step.action.contains("api"))
                .count() as u32,
            duration_seconds: ((ended_at - session.started_at).num_milliseconds() as f64 / 1000.0)
                .round() as i64,
        };

        self.sessions
            .finalize(
                tenant_id,
                call_id,
                FinalizeRecord {
                    outcome: outcome.to_string(),
                    tags: tags.clone(),
                    cdr,
                    metrics,
                    ended_at,
                },
            )
            .await?;

        info!(
            tenant_id, call_id, outcome,
            total_steps = metrics.total_steps,
            duration_seconds = metrics.duration_seconds,
            "✅ Call finalized"
        );

        Ok(CallOutcome {
            call_id: call_id.to_string(),
            outcome: outcome.to_string(),
            tags,
            metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_actions_map_to_outcomes() {
        assert_eq!(classify_action("answered"), ("answered", None));
        assert_eq!(classify_action("voicemail"), ("voicemail", Some("voicemail")));
        assert_eq!(classify_action("no_answer"), ("voicemail", Some("voicemail")));
        assert_eq!(
            classify_action("extension"),
            ("extension_answered", Some("extension"))
        );
        assert_eq!(classify_action("dept"), ("dept_answered", Some("department")));
        assert_eq!(classify_action("ai"), ("ai_handled", Some("ai")));
        assert_eq!(classify_action("hangup"), ("caller_hung_up", None));
        assert_eq!(classify_action("dtmf_menu"), ("unknown", None));
    }
}
