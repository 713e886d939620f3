//! # Directory Lookups
//!
//! Read-only resolution of extensions and departments by tenant. The
//! directory is owned by the administrative surface; the engine consults it
//! while routing and never writes to it. Inactive extensions are invisible
//! here: a matching number on an inactive extension resolves as not found.

pub mod sqlite;

pub use sqlite::SqliteDirectoryStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Whether an extension can receive calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionStatus {
    Active,
    Inactive,
}

impl ExtensionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtensionStatus::Active => "active",
            ExtensionStatus::Inactive => "inactive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(ExtensionStatus::Active),
            "inactive" => Some(ExtensionStatus::Inactive),
            _ => None,
        }
    }
}

/// How destinations ring when an extension is dialed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialStrategy {
    Simultaneous,
    Sequential,
}

/// Ring plan for an extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialPlan {
    #[serde(rename = "type")]
    pub strategy: DialStrategy,
    pub destinations: Vec<String>,
    pub timeout: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

impl Default for DialPlan {
    fn default() -> Self {
        Self {
            strategy: DialStrategy::Simultaneous,
            destinations: Vec::new(),
            timeout: 20,
            fallback: None,
        }
    }
}

/// A directory extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extension {
    pub tenant_id: String,
    pub extension_number: String,
    pub name: String,
    pub status: ExtensionStatus,
    pub department_id: Option<String>,
    pub dial_plan: DialPlan,
}

/// A department, with its active member extensions attached on lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub greeting: Option<String>,
    pub extensions: Vec<Extension>,
}

/// Read access to the tenant directory.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Find an *active* extension by number. Inactive matches resolve to
    /// `None`.
    async fn find_extension(&self, tenant_id: &str, number: &str) -> Result<Option<Extension>>;

    /// Find a department by name, including its active extensions.
    async fn find_department(&self, tenant_id: &str, name: &str) -> Result<Option<Department>>;
}
