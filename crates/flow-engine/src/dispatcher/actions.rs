//! Routing actions returned to the call-control collaborator
//!
//! The engine decides and records; it never performs call control. Each
//! action is advisory: the webhook response carries its name and parameters,
//! and the telephony-facing collaborator executes it.

use serde_json::{json, Value};

use crate::directory::Extension;
use crate::flow::{FlowConfig, FlowOption};

/// Canned prompt when a menu digit matches nothing.
pub const UNRECOGNIZED_OPTION_PROMPT: &str =
    "Sorry, I didn't recognize that option. How can I help you instead?";

/// Canned prompt when a dialed extension does not exist or is inactive.
pub const EXTENSION_NOT_FOUND_PROMPT: &str =
    "Sorry, that extension was not found. How can I help you instead?";

/// Canned voicemail message when a requested department does not exist.
pub const DEPT_NOT_AVAILABLE_MESSAGE: &str =
    "That department is not available right now. Please leave a message after the tone.";

/// Default prompt for an AI handoff that carries none.
pub const DEFAULT_AI_PROMPT: &str = "How can I help you today?";

/// Event-specific voicemail messages for terminal fallbacks.
pub const NO_ANSWER_MESSAGE: &str =
    "No one is available to take your call right now. Please leave a message after the tone.";
pub const BUSY_MESSAGE: &str =
    "The line is busy at the moment. Please leave a message after the tone.";
pub const FAILED_MESSAGE: &str =
    "We were unable to connect your call. Please leave a message after the tone.";
pub const TIMEOUT_MESSAGE: &str =
    "We did not receive a response. Please leave a message after the tone.";

/// The routing decision for one webhook invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutingAction {
    /// Collect menu digits using the resolved flow.
    Gather { flow: FlowConfig },
    /// An option taken verbatim from the tenant's flow configuration.
    Flow(FlowOption),
    /// Ring an extension according to its dial plan.
    Extension { extension: Extension },
    /// Connect to a department's extensions.
    Department {
        name: String,
        greeting: String,
        extensions: Vec<Extension>,
    },
    /// Hand the caller to the AI delegate.
    Ai { prompt: String, model: String },
    /// Send the caller to voicemail.
    Voicemail { message: String },
    /// The call was answered (terminal).
    Answered { duration: u64, answered_by: String },
    /// Drop the call (terminal).
    Hangup { reason: String },
}

impl RoutingAction {
    /// Wire name of the action.
    pub fn name(&self) -> &str {
        match self {
            RoutingAction::Gather { .. } => "gather",
            RoutingAction::Flow(option) => &option.action,
            RoutingAction::Extension { .. } => "extension",
            RoutingAction::Department { .. } => "dept",
            RoutingAction::Ai { .. } => "ai",
            RoutingAction::Voicemail { .. } => "voicemail",
            RoutingAction::Answered { .. } => "answered",
            RoutingAction::Hangup { .. } => "hangup",
        }
    }

    /// Wire parameters of the action.
    ///
    /// The gather payload keeps its historical key casing (`max_digits`
    /// among camelCase siblings elsewhere); consumers parse it as-is.
    pub fn params(&self) -> Value {
        match self {
            RoutingAction::Gather { flow } => json!({
                "greeting": flow.greeting,
                "timeout": flow.timeout_seconds,
                "max_digits": flow.max_digits,
                "retries": flow.retries,
                "options": flow.options,
            }),
            RoutingAction::Flow(option) => option.params.clone(),
            RoutingAction::Extension { extension } => json!({
                "extension": extension.extension_number,
                "name": extension.name,
                "dial_plan": extension.dial_plan,
            }),
            RoutingAction::Department {
                name,
                greeting,
                extensions,
            } => json!({
                "department": name,
                "greeting": greeting,
                "extensions": extensions
                    .iter()
                    .map(|ext| json!({
                        "extension": ext.extension_number,
                        "name": ext.name,
                        "dial_plan": ext.dial_plan,
                    }))
                    .collect::<Vec<_>>(),
            }),
            RoutingAction::Ai { prompt, model } => json!({
                "prompt": prompt,
                "model": model,
            }),
            RoutingAction::Voicemail { message } => json!({
                "message": message,
            }),
            RoutingAction::Answered {
                duration,
                answered_by,
            } => json!({
                "duration": duration,
                "answeredBy": answered_by,
            }),
            RoutingAction::Hangup { reason } => json!({
                "reason": reason,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gather_params_carry_flow_configuration() {
        let action = RoutingAction::Gather {
            flow: FlowConfig::builtin_default(),
        };
        assert_eq!(action.name(), "gather");

        let params = action.params();
        assert_eq!(params["timeout"], 10);
        assert_eq!(params["max_digits"], 4);
        assert_eq!(params["retries"], 3);
        assert_eq!(params["options"]["1"]["action"], "dept");
    }

    #[test]
    fn flow_option_passes_through_verbatim() {
        let action = RoutingAction::Flow(FlowOption::new(
            "dept",
            json!({"department": "Sales"}),
        ));
        assert_eq!(action.name(), "dept");
        assert_eq!(action.params(), json!({"department": "Sales"}));
    }

    #[test]
    fn hangup_carries_reason() {
        let action = RoutingAction::Hangup {
            reason: "unknown_event".into(),
        };
        assert_eq!(action.params()["reason"], "unknown_event");
    }
}
