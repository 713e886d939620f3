//! Configuration for the flow engine
//!
//! Mirrors the deployment shape of the rest of the dialplane stack: a top
//! level config struct with nested sections, each with sensible defaults so
//! an in-memory engine can be built with `FlowEngineConfig::default()`.

use serde::Deserialize;

/// Main configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlowEngineConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
}

/// General server settings
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Address the webhook API listens on
    pub bind_address: String,
    /// Domain used in operator-facing log output
    pub domain: String,
    /// Interval in seconds between monitor log lines (0 disables the monitor)
    pub monitor_interval_seconds: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8085".to_string(),
            domain: "dialplane.local".to_string(),
            monitor_interval_seconds: 60,
        }
    }
}

/// Database settings
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database URL; `sqlite::memory:` for ephemeral deployments
    pub database_url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 5,
        }
    }
}

/// Policy for events redelivered by the telephony provider.
///
/// Providers deliver webhooks at-least-once, so exact duplicates are normal.
/// The audit trail historically records every delivery; dropping repeats is
/// opt-in because it changes step counts and derived metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Append every received event, including exact provider retries.
    #[default]
    AppendAll,
    /// Skip the append when event name and payload equal the last path step.
    DropExactRepeat,
}

/// Dispatcher settings
#[derive(Debug, Clone, Deserialize)]
pub struct DispatcherConfig {
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
    /// Model name used when an AI handoff does not specify one
    pub default_ai_model: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::AppendAll,
            default_ai_model: "default".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_in_memory() {
        let config = FlowEngineConfig::default();
        assert_eq!(config.database.database_url, "sqlite::memory:");
        assert_eq!(config.dispatcher.duplicate_policy, DuplicatePolicy::AppendAll);
    }

    #[test]
    fn duplicate_policy_deserializes_snake_case() {
        let config: DispatcherConfig =
            serde_json::from_str(r#"{"duplicate_policy":"drop_exact_repeat","default_ai_model":"fast"}"#)
                .unwrap();
        assert_eq!(config.duplicate_policy, DuplicatePolicy::DropExactRepeat);
        assert_eq!(config.default_ai_model, "fast");
    }
}
