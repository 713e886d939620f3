//! SQLite-backed directory store

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::directory::{Department, DialPlan, DirectoryStore, Extension, ExtensionStatus};
use crate::error::{FlowEngineError, Result};

#[derive(Clone)]
pub struct SqliteDirectoryStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct ExtensionRow {
    tenant_id: String,
    extension_number: String,
    name: String,
    status: String,
    department_id: Option<String>,
    dial_plan: String,
}

impl ExtensionRow {
    fn into_extension(self) -> Result<Extension> {
        let status = ExtensionStatus::parse(&self.status).ok_or_else(|| {
            FlowEngineError::Internal(format!("invalid extension status: {}", self.status))
        })?;
        let dial_plan: DialPlan = serde_json::from_str(&self.dial_plan)?;
        Ok(Extension {
            tenant_id: self.tenant_id,
            extension_number: self.extension_number,
            name: self.name,
            status,
            department_id: self.department_id,
            dial_plan,
        })
    }
}

impl SqliteDirectoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert an extension. Provisioning belongs to the administrative
    /// surface; this exists for tests and tooling.
    pub async fn insert_extension(&self, extension: &Extension) -> Result<()> {
        let dial_plan_json = serde_json::to_string(&extension.dial_plan)?;
        sqlx::query(
            "INSERT INTO extensions
                (tenant_id, extension_number, name, status, department_id, dial_plan)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&extension.tenant_id)
        .bind(&extension.extension_number)
        .bind(&extension.name)
        .bind(extension.status.as_str())
        .bind(&extension.department_id)
        .bind(&dial_plan_json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert a department and return its id. For tests and tooling.
    pub async fn insert_department(
        &self,
        tenant_id: &str,
        name: &str,
        greeting: Option<&str>,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO departments (id, tenant_id, name, greeting) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(tenant_id)
            .bind(name)
            .bind(greeting)
            .execute(&self.pool)
            .await?;
        Ok(id)
    }
}

#[async_trait]
impl DirectoryStore for SqliteDirectoryStore {
    async fn find_extension(&self, tenant_id: &str, number: &str) -> Result<Option<Extension>> {
        let row: Option<ExtensionRow> = sqlx::query_as(
            "SELECT tenant_id, extension_number, name, status, department_id, dial_plan
             FROM extensions
             WHERE tenant_id = ? AND extension_number = ? AND status = 'active'",
        )
        .bind(tenant_id)
        .bind(number)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ExtensionRow::into_extension).transpose()
    }

    async fn find_department(&self, tenant_id: &str, name: &str) -> Result<Option<Department>> {
        let dept: Option<(String, String, Option<String>)> = sqlx::query_as(
            "SELECT id, name, greeting FROM departments WHERE tenant_id = ? AND name = ?",
        )
        .bind(tenant_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        let (id, name, greeting) = match dept {
            Some(found) => found,
            None => return Ok(None),
        };

        let rows: Vec<ExtensionRow> = sqlx::query_as(
            "SELECT tenant_id, extension_number, name, status, department_id, dial_plan
             FROM extensions
             WHERE tenant_id = ? AND department_id = ? AND status = 'active'
             ORDER BY extension_number",
        )
        .bind(tenant_id)
        .bind(&id)
        .fetch_all(&self.pool)
        .await?;

        let extensions = rows
            .into_iter()
            .map(ExtensionRow::into_extension)
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(Department {
            id,
            tenant_id: tenant_id.to_string(),
            name,
            greeting,
            extensions,
        }))
    }
}
