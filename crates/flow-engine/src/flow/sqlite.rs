//! SQLite-backed flow store

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::{FlowEngineError, Result};
use crate::flow::{FlowConfig, FlowOption, FlowStore};

#[derive(Clone)]
pub struct SqliteFlowStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct FlowRow {
    name: String,
    greeting: String,
    timeout_seconds: i64,
    max_digits: i64,
    retries: i64,
    options: String,
    default_option: Option<String>,
    fallback: Option<String>,
}

impl FlowRow {
    fn into_flow(self) -> Result<FlowConfig> {
        let options: BTreeMap<String, FlowOption> =
            serde_json::from_str(&self.options).map_err(|e| {
                FlowEngineError::Configuration(format!(
                    "flow '{}' has malformed options: {e}",
                    self.name
                ))
            })?;
        let default_option = self
            .default_option
            .as_deref()
            .map(serde_json::from_str::<FlowOption>)
            .transpose()?;
        let fallback = self
            .fallback
            .as_deref()
            .map(serde_json::from_str::<FlowOption>)
            .transpose()?;

        Ok(FlowConfig {
            name: self.name,
            greeting: self.greeting,
            timeout_seconds: self.timeout_seconds as u32,
            max_digits: self.max_digits as u32,
            retries: self.retries as u32,
            options,
            default_option,
            fallback,
        })
    }
}

impl SqliteFlowStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a flow for a tenant. Provisioning belongs to the
    /// administrative surface; this exists for tests and tooling.
    pub async fn insert_flow(
        &self,
        tenant_id: &str,
        flow: &FlowConfig,
        active: bool,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let options_json = serde_json::to_string(&flow.options)?;
        let default_json = flow
            .default_option
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let fallback_json = flow.fallback.as_ref().map(serde_json::to_string).transpose()?;

        sqlx::query(
            "INSERT INTO ivr_flows
                (id, tenant_id, name, greeting, timeout_seconds, max_digits,
                 retries, options, default_option, fallback, active, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(tenant_id)
        .bind(&flow.name)
        .bind(&flow.greeting)
        .bind(flow.timeout_seconds as i64)
        .bind(flow.max_digits as i64)
        .bind(flow.retries as i64)
        .bind(&options_json)
        .bind(&default_json)
        .bind(&fallback_json)
        .bind(active as i64)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(id)
    }
}

#[async_trait]
impl FlowStore for SqliteFlowStore {
    async fn get_active_flow(&self, tenant_id: &str) -> Result<Option<FlowConfig>> {
        // Newest wins if multiple flows are marked active.
        let row: Option<FlowRow> = sqlx::query_as(
            "SELECT name, greeting, timeout_seconds, max_digits, retries,
                    options, default_option, fallback
             FROM ivr_flows
             WHERE tenant_id = ? AND active = 1
             ORDER BY created_at DESC
             LIMIT 1",
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(FlowRow::into_flow).transpose()
    }
}
