//! # Event Dispatcher
//!
//! The webhook-driven state machine at the center of the engine. Each
//! inbound event is (1) durably appended to the session's audit path,
//! (2) resolved to a routing action by consulting tenant configuration, and
//! (3) returned to the call-control collaborator as an advisory decision.
//!
//! The dispatcher itself is stateless between invocations; everything it
//! knows about a call lives in the session's path and status. Conceptually
//! the call moves through
//!
//! ```text
//! Entry → Gathering → {ExtensionRouting, DepartmentRouting, AIHandoff, Voicemail}
//!       → Terminal(Answered | Hangup | Voicemail | Failed)
//! ```
//!
//! but no state variable encodes this; the path *is* the state.
//!
//! ## Ordering guarantees
//!
//! The audit append happens before any routing resolution, so the trail
//! reflects every received event even when resolution falls back. Missing
//! configuration (no flow, unknown extension, unknown department) is never
//! an error; it selects the documented fallback action instead.

pub mod actions;
pub mod events;

pub use actions::RoutingAction;
pub use events::CallEvent;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{DispatcherConfig, DuplicatePolicy};
use crate::directory::DirectoryStore;
use crate::dispatcher::actions::{
    BUSY_MESSAGE, DEFAULT_AI_PROMPT, DEPT_NOT_AVAILABLE_MESSAGE, EXTENSION_NOT_FOUND_PROMPT,
    FAILED_MESSAGE, NO_ANSWER_MESSAGE, TIMEOUT_MESSAGE, UNRECOGNIZED_OPTION_PROMPT,
};
use crate::error::Result;
use crate::flow::{resolve_active_flow, FlowStore};
use crate::session::{CallDirection, NewCallSession, PathStep, SessionStore};

/// The call-flow state machine. All collaborators are injected.
pub struct EventDispatcher {
    sessions: Arc<dyn SessionStore>,
    flows: Arc<dyn FlowStore>,
    directory: Arc<dyn DirectoryStore>,
    config: DispatcherConfig,
}

impl EventDispatcher {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        flows: Arc<dyn FlowStore>,
        directory: Arc<dyn DirectoryStore>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            sessions,
            flows,
            directory,
            config,
        }
    }

    /// Handle the entry event for a new inbound call.
    ///
    /// Creates the session with its entry step, records which flow was
    /// selected, and returns a gather action built from that flow.
    pub async fn handle_entry(
        &self,
        tenant_id: &str,
        did: &str,
        from: &str,
        to: &str,
        ts: Option<DateTime<Utc>>,
    ) -> Result<(String, RoutingAction)> {
        let call_id = Uuid::new_v4().to_string();
        let started_at = ts.unwrap_or_else(Utc::now);

        let mut entry_data = Map::new();
        entry_data.insert("did".to_string(), Value::String(did.to_string()));
        entry_data.insert("from".to_string(), Value::String(from.to_string()));
        entry_data.insert("to".to_string(), Value::String(to.to_string()));
        let entry_step = PathStep::new("entry", "call_received", entry_data);

        let new = NewCallSession {
            tenant_id: tenant_id.to_string(),
            call_id: call_id.clone(),
            from_number: from.to_string(),
            to_number: to.to_string(),
            did: did.to_string(),
            direction: CallDirection::Inbound,
            started_at,
        };
        self.sessions.create(new, entry_step).await?;

        let resolved = resolve_active_flow(self.flows.as_ref(), tenant_id).await?;
        let mut flow_data = Map::new();
        flow_data.insert(
            "flow".to_string(),
            Value::String(resolved.flow.name.clone()),
        );
        flow_data.insert(
            "source".to_string(),
            Value::String(resolved.source.as_str().to_string()),
        );
        self.sessions
            .append_step(
                tenant_id,
                &call_id,
                PathStep::new("flow_select", "flow_selected", flow_data),
            )
            .await?;

        info!(
            tenant_id, call_id = %call_id, flow = %resolved.flow.name,
            "📞 Call entry routed to gather"
        );
        Ok((call_id, RoutingAction::Gather { flow: resolved.flow }))
    }

    /// Handle a mid-call event.
    ///
    /// The audit step is appended first, unconditionally; resolution happens
    /// after, so the trail records events whose routing falls back. An
    /// unknown call is tolerated for the append (logged and skipped) since
    /// resolution only needs tenant configuration.
    pub async fn handle_event(
        &self,
        tenant_id: &str,
        call_id: &str,
        event: &str,
        data: Map<String, Value>,
    ) -> Result<RoutingAction> {
        let step = PathStep::new("ivr_event", event, data.clone());

        if self.should_append(tenant_id, call_id, &step).await {
            match self.sessions.append_step(tenant_id, call_id, step).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {
                    warn!(tenant_id, call_id, event, "Event for unknown call session, skipping audit append");
                }
                Err(e) => return Err(e),
            }
        }

        let action = self
            .resolve(tenant_id, CallEvent::parse(event, &data))
            .await?;
        info!(tenant_id, call_id, event, action = action.name(), "Resolved call event");
        Ok(action)
    }

    /// Duplicate policy gate. Append-all always passes; drop-exact-repeat
    /// compares against the last recorded step.
    async fn should_append(&self, tenant_id: &str, call_id: &str, step: &PathStep) -> bool {
        match self.config.duplicate_policy {
            DuplicatePolicy::AppendAll => true,
            DuplicatePolicy::DropExactRepeat => {
                match self.sessions.get(tenant_id, call_id).await {
                    Ok(session) => {
                        let repeat = session
                            .path
                            .last()
                            .map(|last| last.same_event(step))
                            .unwrap_or(false);
                        if repeat {
                            debug!(tenant_id, call_id, action = %step.action, "Dropping exact repeat delivery");
                        }
                        !repeat
                    }
                    // Let append_step surface (and tolerate) the missing session.
                    Err(_) => true,
                }
            }
        }
    }

    async fn resolve(&self, tenant_id: &str, event: CallEvent) -> Result<RoutingAction> {
        let action = match event {
            CallEvent::DtmfMenu { digit } => {
                let resolved = resolve_active_flow(self.flows.as_ref(), tenant_id).await?;
                if let Some(option) = resolved.flow.options.get(&digit) {
                    RoutingAction::Flow(option.clone())
                } else if let Some(extension) =
                    self.directory.find_extension(tenant_id, &digit).await?
                {
                    RoutingAction::Extension { extension }
                } else {
                    RoutingAction::Ai {
                        prompt: UNRECOGNIZED_OPTION_PROMPT.to_string(),
                        model: self.config.default_ai_model.clone(),
                    }
                }
            }
            CallEvent::ExtensionDial { extension } => {
                match self.directory.find_extension(tenant_id, &extension).await? {
                    Some(extension) => RoutingAction::Extension { extension },
                    None => RoutingAction::Ai {
                        prompt: EXTENSION_NOT_FOUND_PROMPT.to_string(),
                        model: self.config.default_ai_model.clone(),
                    },
                }
            }
            CallEvent::DeptDial { department } => {
                match self.directory.find_department(tenant_id, &department).await? {
                    Some(dept) => {
                        let greeting = dept
                            .greeting
                            .clone()
                            .unwrap_or_else(|| format!("Connecting you to {}", dept.name));
                        RoutingAction::Department {
                            name: dept.name,
                            greeting,
                            extensions: dept.extensions,
                        }
                    }
                    None => RoutingAction::Voicemail {
                        message: DEPT_NOT_AVAILABLE_MESSAGE.to_string(),
                    },
                }
            }
            CallEvent::AiHandoff { prompt, model } => RoutingAction::Ai {
                prompt: prompt.unwrap_or_else(|| DEFAULT_AI_PROMPT.to_string()),
                model: model.unwrap_or_else(|| self.config.default_ai_model.clone()),
            },
            CallEvent::Answered {
                duration,
                answered_by,
            } => RoutingAction::Answered {
                duration,
                answered_by: answered_by.unwrap_or_else(|| "unknown".to_string()),
            },
            CallEvent::NoAnswer => RoutingAction::Voicemail {
                message: NO_ANSWER_MESSAGE.to_string(),
            },
            CallEvent::Busy => RoutingAction::Voicemail {
                message: BUSY_MESSAGE.to_string(),
            },
            CallEvent::Failed => RoutingAction::Voicemail {
                message: FAILED_MESSAGE.to_string(),
            },
            CallEvent::Timeout => RoutingAction::Voicemail {
                message: TIMEOUT_MESSAGE.to_string(),
            },
            CallEvent::Unknown { name } => {
                warn!(tenant_id, event = %name, "Unknown event kind, hanging up");
                RoutingAction::Hangup {
                    reason: "unknown_event".to_string(),
                }
            }
        };
        Ok(action)
    }
}
