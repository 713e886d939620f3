//! # Webhook API
//!
//! The three inbound webhook operations the telephony provider calls:
//!
//! - `POST /webhooks/call/entry`: a call has arrived; create the session
//!   and return the gather decision.
//! - `POST /webhooks/call/event`: a mid-call lifecycle event; record it and
//!   return the next routing decision.
//! - `POST /webhooks/call/log`: the call ended; classify the outcome and
//!   return the summary.
//!
//! Plus `GET /health` for liveness.
//!
//! Validation failures are rejected before any state mutation with a 400 and
//! a per-field error list. Storage failures surface as 500; the provider is
//! expected to retry, and redelivery is tolerated by the dispatcher's
//! duplicate policy. No failure is retried internally.

pub mod types;

pub use types::{
    EntryRequest, EventRequest, LogRequest, LogResponse, LogResponseData, RoutingResponse,
};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::classifier::OutcomeClassifier;
use crate::dispatcher::EventDispatcher;
use crate::error::FlowEngineError;
use crate::session::SessionStore;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<EventDispatcher>,
    pub classifier: Arc<OutcomeClassifier>,
    pub sessions: Arc<dyn SessionStore>,
}

/// Build the webhook router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/webhooks/call/entry", post(call_entry))
        .route("/webhooks/call/event", post(call_event))
        .route("/webhooks/call/log", post(call_log))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Maps engine errors onto webhook status codes.
struct ApiError(FlowEngineError);

impl From<FlowEngineError> for ApiError {
    fn from(err: FlowEngineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            FlowEngineError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                Json(json!({"success": false, "errors": errors})),
            )
                .into_response(),
            err @ FlowEngineError::NotFound { .. } => (
                StatusCode::NOT_FOUND,
                Json(json!({"success": false, "error": err.to_string()})),
            )
                .into_response(),
            err @ FlowEngineError::Conflict { .. } => (
                StatusCode::CONFLICT,
                Json(json!({"success": false, "error": err.to_string()})),
            )
                .into_response(),
            err => {
                error!("Webhook handler failed: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"success": false, "error": "internal error"})),
                )
                    .into_response()
            }
        }
    }
}

async fn call_entry(
    State(state): State<AppState>,
    Json(request): Json<EntryRequest>,
) -> Result<Json<RoutingResponse>, ApiError> {
    let entry = request.validate()?;
    let (call_id, action) = state
        .dispatcher
        .handle_entry(&entry.tenant_id, &entry.did, &entry.from, &entry.to, entry.ts)
        .await?;

    Ok(Json(RoutingResponse {
        success: true,
        call_id,
        action: action.name().to_string(),
        params: action.params(),
    }))
}

async fn call_event(
    State(state): State<AppState>,
    Json(request): Json<EventRequest>,
) -> Result<Json<RoutingResponse>, ApiError> {
    let event = request.validate()?;
    let action = state
        .dispatcher
        .handle_event(&event.tenant_id, &event.call_id, &event.event, event.data)
        .await?;

    Ok(Json(RoutingResponse {
        success: true,
        call_id: event.call_id,
        action: action.name().to_string(),
        params: action.params(),
    }))
}

async fn call_log(
    State(state): State<AppState>,
    Json(request): Json<LogRequest>,
) -> Result<Json<LogResponse>, ApiError> {
    let log = request.validate()?;
    let outcome = state
        .classifier
        .finalize_call(&log.tenant_id, &log.call_id, log.cdr)
        .await?;

    Ok(Json(LogResponse {
        success: true,
        data: LogResponseData {
            call_id: outcome.call_id,
            outcome: outcome.outcome,
            duration: outcome.metrics.duration_seconds,
            tags: outcome.tags,
            total_steps: outcome.metrics.total_steps,
            ai_steps: outcome.metrics.ai_steps,
            api_calls: outcome.metrics.api_calls,
        },
    }))
}

async fn health(State(state): State<AppState>) -> Response {
    match state.sessions.count_active().await {
        Ok(active) => Json(json!({"status": "ok", "activeSessions": active})).into_response(),
        Err(err) => {
            error!("Health check failed: {err}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "degraded"})),
            )
                .into_response()
        }
    }
}
