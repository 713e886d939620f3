//! Wire types for the webhook API
//!
//! Field names are load-bearing: the telephony provider integration was
//! built against this exact casing (camelCase bodies, and the gather params
//! emitted by the dispatcher keep their historical keys).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{FieldError, FlowEngineError, Result};

/// Entry webhook request. All fields but `ts` are required; requirements are
/// checked after deserialization so a 400 can carry the full field list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryRequest {
    pub tenant_id: Option<String>,
    pub did: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    /// ISO-8601; defaults to receipt time. Deserialized loosely so a wrong
    /// JSON type lands in the field-level error list, not an extractor 422.
    pub ts: Option<Value>,
}

/// Validated entry parameters.
#[derive(Debug, Clone)]
pub struct ValidEntry {
    pub tenant_id: String,
    pub did: String,
    pub from: String,
    pub to: String,
    pub ts: Option<DateTime<Utc>>,
}

fn require(
    errors: &mut Vec<FieldError>,
    field: &str,
    value: Option<String>,
) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => {
            errors.push(FieldError::new(field, "required"));
            String::new()
        }
    }
}

impl EntryRequest {
    pub fn validate(self) -> Result<ValidEntry> {
        let mut errors = Vec::new();
        let tenant_id = require(&mut errors, "tenantId", self.tenant_id);
        let did = require(&mut errors, "did", self.did);
        let from = require(&mut errors, "from", self.from);
        let to = require(&mut errors, "to", self.to);

        let ts = match self.ts {
            None | Some(Value::Null) => None,
            Some(Value::String(raw)) => match DateTime::parse_from_rfc3339(&raw) {
                Ok(parsed) => Some(parsed.with_timezone(&Utc)),
                Err(_) => {
                    errors.push(FieldError::new("ts", "must be an ISO-8601 timestamp"));
                    None
                }
            },
            Some(_) => {
                errors.push(FieldError::new("ts", "must be an ISO-8601 timestamp"));
                None
            }
        };

        if !errors.is_empty() {
            return Err(FlowEngineError::Validation(errors));
        }
        Ok(ValidEntry {
            tenant_id,
            did,
            from,
            to,
            ts,
        })
    }
}

/// Event webhook request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    pub tenant_id: Option<String>,
    pub call_id: Option<String>,
    pub event: Option<String>,
    pub data: Option<Map<String, Value>>,
}

#[derive(Debug, Clone)]
pub struct ValidEvent {
    pub tenant_id: String,
    pub call_id: String,
    pub event: String,
    pub data: Map<String, Value>,
}

impl EventRequest {
    pub fn validate(self) -> Result<ValidEvent> {
        let mut errors = Vec::new();
        let tenant_id = require(&mut errors, "tenantId", self.tenant_id);
        let call_id = require(&mut errors, "callId", self.call_id);
        let event = require(&mut errors, "event", self.event);

        if !errors.is_empty() {
            return Err(FlowEngineError::Validation(errors));
        }
        Ok(ValidEvent {
            tenant_id,
            call_id,
            event,
            data: self.data.unwrap_or_default(),
        })
    }
}

/// Terminal log webhook request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRequest {
    pub tenant_id: Option<String>,
    pub call_id: Option<String>,
    pub cdr: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct ValidLog {
    pub tenant_id: String,
    pub call_id: String,
    pub cdr: Option<Value>,
}

impl LogRequest {
    pub fn validate(self) -> Result<ValidLog> {
        let mut errors = Vec::new();
        let tenant_id = require(&mut errors, "tenantId", self.tenant_id);
        let call_id = require(&mut errors, "callId", self.call_id);

        if !errors.is_empty() {
            return Err(FlowEngineError::Validation(errors));
        }
        Ok(ValidLog {
            tenant_id,
            call_id,
            cdr: self.cdr,
        })
    }
}

/// Routing decision response for entry and event webhooks.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingResponse {
    pub success: bool,
    pub call_id: String,
    pub action: String,
    pub params: Value,
}

/// Terminal log response.
#[derive(Debug, Clone, Serialize)]
pub struct LogResponse {
    pub success: bool,
    pub data: LogResponseData,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogResponseData {
    pub call_id: String,
    pub outcome: String,
    pub duration: i64,
    pub tags: Vec<String>,
    pub total_steps: u32,
    pub ai_steps: u32,
    pub api_calls: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_missing_fields_collects_all_errors() {
        let request = EntryRequest {
            tenant_id: None,
            did: Some("+15551230000".into()),
            from: None,
            to: Some("+15551230000".into()),
            ts: None,
        };
        let err = request.validate().unwrap_err();
        match err {
            FlowEngineError::Validation(errors) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["tenantId", "from"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn entry_rejects_malformed_timestamp() {
        let request = EntryRequest {
            tenant_id: Some("T1".into()),
            did: Some("+15551230000".into()),
            from: Some("+15559876543".into()),
            to: Some("+15551230000".into()),
            ts: Some("yesterday".into()),
        };
        let err = request.validate().unwrap_err();
        match err {
            FlowEngineError::Validation(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "ts");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn entry_rejects_non_string_timestamp() {
        let request = EntryRequest {
            tenant_id: Some("T1".into()),
            did: Some("+15551230000".into()),
            from: Some("+15559876543".into()),
            to: Some("+15551230000".into()),
            ts: Some(serde_json::json!(1756500000)),
        };
        let err = request.validate().unwrap_err();
        match err {
            FlowEngineError::Validation(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "ts");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn entry_accepts_rfc3339_timestamp() {
        let request = EntryRequest {
            tenant_id: Some("T1".into()),
            did: Some("+15551230000".into()),
            from: Some("+15559876543".into()),
            to: Some("+15551230000".into()),
            ts: Some("2026-08-30T12:00:00Z".into()),
        };
        let valid = request.validate().unwrap();
        assert_eq!(valid.ts.unwrap().to_rfc3339(), "2026-08-30T12:00:00+00:00");
    }
}
