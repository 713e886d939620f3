//! Error types for the flow engine

use thiserror::Error;

/// A single field-level validation failure, reported back to the webhook
/// caller as part of a 400 response.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum FlowEngineError {
    /// A call session with the same `(tenant_id, call_id)` already exists.
    #[error("Call session already exists: {tenant_id}/{call_id}")]
    Conflict { tenant_id: String, call_id: String },

    /// The referenced call session does not exist.
    #[error("Call session not found: {tenant_id}/{call_id}")]
    NotFound { tenant_id: String, call_id: String },

    /// Request rejected before any state mutation.
    #[error("Validation failed: {0:?}")]
    Validation(Vec<FieldError>),

    /// Optimistic append lost the version race too many times.
    #[error("Concurrent update conflict on {tenant_id}/{call_id} after {attempts} attempts")]
    VersionConflict {
        tenant_id: String,
        call_id: String,
        attempts: u32,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FlowEngineError {
    pub fn not_found(tenant_id: &str, call_id: &str) -> Self {
        Self::NotFound {
            tenant_id: tenant_id.to_string(),
            call_id: call_id.to_string(),
        }
    }

    pub fn conflict(tenant_id: &str, call_id: &str) -> Self {
        Self::Conflict {
            tenant_id: tenant_id.to_string(),
            call_id: call_id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, FlowEngineError>;
