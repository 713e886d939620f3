//! Inbound call lifecycle events
//!
//! Webhook events arrive as a name string plus a free-form data object. They
//! are parsed into an exhaustive enum before any routing decision, so every
//! event kind is handled by a compile-time-checked match; only genuinely
//! unrecognized names fall into [`CallEvent::Unknown`].

use serde_json::{Map, Value};

/// A parsed call lifecycle event.
#[derive(Debug, Clone, PartialEq)]
pub enum CallEvent {
    /// Caller pressed a menu digit.
    DtmfMenu { digit: String },
    /// Caller dialed an extension directly.
    ExtensionDial { extension: String },
    /// Caller asked for a department.
    DeptDial { department: String },
    /// Handoff to the AI delegate.
    AiHandoff {
        prompt: Option<String>,
        model: Option<String>,
    },
    /// The call was answered (terminal).
    Answered {
        duration: u64,
        answered_by: Option<String>,
    },
    /// Ring-out with no pickup (terminal fallback).
    NoAnswer,
    /// Destination busy (terminal fallback).
    Busy,
    /// Call setup failed (terminal fallback).
    Failed,
    /// Gather or dial timed out (terminal fallback).
    Timeout,
    /// Anything the engine does not recognize (terminal).
    Unknown { name: String },
}

fn string_field(data: &Map<String, Value>, key: &str) -> Option<String> {
    data.get(key).and_then(Value::as_str).map(str::to_string)
}

impl CallEvent {
    /// Parse a wire event name and payload.
    pub fn parse(event: &str, data: &Map<String, Value>) -> Self {
        match event {
            "dtmf_menu" => CallEvent::DtmfMenu {
                digit: string_field(data, "digit").unwrap_or_default(),
            },
            "extension_dial" => CallEvent::ExtensionDial {
                extension: string_field(data, "extension").unwrap_or_default(),
            },
            "dept_dial" => CallEvent::DeptDial {
                department: string_field(data, "department").unwrap_or_default(),
            },
            "ai_handoff" => CallEvent::AiHandoff {
                prompt: string_field(data, "prompt"),
                model: string_field(data, "model"),
            },
            "answered" => CallEvent::Answered {
                duration: data.get("duration").and_then(Value::as_u64).unwrap_or(0),
                answered_by: string_field(data, "answeredBy"),
            },
            "no_answer" => CallEvent::NoAnswer,
            "busy" => CallEvent::Busy,
            "failed" => CallEvent::Failed,
            "timeout" => CallEvent::Timeout,
            other => CallEvent::Unknown {
                name: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn parses_known_events() {
        assert_eq!(
            CallEvent::parse("dtmf_menu", &data(json!({"digit": "1"}))),
            CallEvent::DtmfMenu { digit: "1".into() }
        );
        assert_eq!(
            CallEvent::parse("answered", &data(json!({"duration": 42, "answeredBy": "human"}))),
            CallEvent::Answered {
                duration: 42,
                answered_by: Some("human".into())
            }
        );
        assert_eq!(CallEvent::parse("busy", &Map::new()), CallEvent::Busy);
    }

    #[test]
    fn missing_payload_fields_default() {
        assert_eq!(
            CallEvent::parse("dtmf_menu", &Map::new()),
            CallEvent::DtmfMenu { digit: String::new() }
        );
        assert_eq!(
            CallEvent::parse("answered", &Map::new()),
            CallEvent::Answered {
                duration: 0,
                answered_by: None
            }
        );
    }

    #[test]
    fn unrecognized_name_is_unknown() {
        assert_eq!(
            CallEvent::parse("transfer_to_mars", &Map::new()),
            CallEvent::Unknown {
                name: "transfer_to_mars".into()
            }
        );
    }
}
