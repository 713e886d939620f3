//! # Flow Engine Server
//!
//! High-level lifecycle management for the routing engine: builds the
//! storage layer, wires the dispatcher and classifier, serves the webhook
//! API, and runs a background monitor that periodically logs the active
//! session count (sessions whose terminal event never arrives stay active
//! indefinitely; the monitor makes that drift visible to operators).

use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{error, info};

use crate::api::{create_router, AppState};
use crate::classifier::OutcomeClassifier;
use crate::config::FlowEngineConfig;
use crate::database;
use crate::directory::SqliteDirectoryStore;
use crate::dispatcher::EventDispatcher;
use crate::error::{FlowEngineError, Result};
use crate::flow::SqliteFlowStore;
use crate::session::{SessionStore, SqliteSessionStore};

/// A complete flow-engine server: storage, dispatcher, classifier, API.
pub struct FlowEngineServer {
    config: FlowEngineConfig,
    pool: SqlitePool,
    state: AppState,
    flows: SqliteFlowStore,
    directory: SqliteDirectoryStore,
    monitor_handle: Option<JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl FlowEngineServer {
    /// Create a server from configuration, connecting to the configured
    /// database and initializing the schema.
    pub async fn new(config: FlowEngineConfig) -> Result<Self> {
        let pool = database::connect(&config.database).await?;

        let sessions: Arc<dyn SessionStore> = Arc::new(SqliteSessionStore::new(pool.clone()));
        let flows = SqliteFlowStore::new(pool.clone());
        let directory = SqliteDirectoryStore::new(pool.clone());

        let dispatcher = Arc::new(EventDispatcher::new(
            sessions.clone(),
            Arc::new(flows.clone()),
            Arc::new(directory.clone()),
            config.dispatcher.clone(),
        ));
        let classifier = Arc::new(OutcomeClassifier::new(sessions.clone()));

        let state = AppState {
            dispatcher,
            classifier,
            sessions,
        };

        info!("✅ Flow engine initialized for domain {}", config.general.domain);
        Ok(Self {
            config,
            pool,
            state,
            flows,
            directory,
            monitor_handle: None,
            shutdown_tx: None,
        })
    }

    /// Create a server backed by an in-memory database.
    pub async fn new_in_memory(mut config: FlowEngineConfig) -> Result<Self> {
        config.database.database_url = "sqlite::memory:".to_string();
        Self::new(config).await
    }

    /// Start background tasks.
    pub fn start(&mut self) {
        let seconds = self.config.general.monitor_interval_seconds;
        if seconds == 0 {
            return;
        }
        let sessions = self.state.sessions.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(seconds));
            loop {
                ticker.tick().await;
                match sessions.count_active().await {
                    Ok(active) => info!("📊 Active call sessions: {active}"),
                    Err(e) => error!("Monitor failed to count sessions: {e}"),
                }
            }
        });
        self.monitor_handle = Some(handle);
    }

    /// Serve the webhook API until [`stop`](Self::stop) is called.
    pub async fn run(&mut self) -> Result<()> {
        let addr = self.config.general.bind_address.clone();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| FlowEngineError::Configuration(format!("cannot bind {addr}: {e}")))?;

        let (tx, rx) = oneshot::channel();
        self.shutdown_tx = Some(tx);

        info!("🚀 Flow engine webhook API listening on {addr}");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async {
                rx.await.ok();
            })
            .await
            .map_err(|e| FlowEngineError::Internal(format!("server error: {e}")))?;

        info!("🛑 Flow engine server stopped");
        Ok(())
    }

    /// Stop the server and its background tasks.
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            tx.send(()).ok();
        }
        if let Some(handle) = self.monitor_handle.take() {
            handle.abort();
        }
    }

    /// The webhook router, for serving or in-process testing.
    pub fn router(&self) -> axum::Router {
        create_router(self.state.clone())
    }

    pub fn dispatcher(&self) -> Arc<EventDispatcher> {
        self.state.dispatcher.clone()
    }

    pub fn classifier(&self) -> Arc<OutcomeClassifier> {
        self.state.classifier.clone()
    }

    pub fn sessions(&self) -> Arc<dyn SessionStore> {
        self.state.sessions.clone()
    }

    /// Flow store handle, for provisioning tooling and tests.
    pub fn flows(&self) -> &SqliteFlowStore {
        &self.flows
    }

    /// Directory store handle, for provisioning tooling and tests.
    pub fn directory(&self) -> &SqliteDirectoryStore {
        &self.directory
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Builder for [`FlowEngineServer`] with a fluent API.
pub struct FlowEngineServerBuilder {
    config: FlowEngineConfig,
}

impl FlowEngineServerBuilder {
    pub fn new() -> Self {
        Self {
            config: FlowEngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: FlowEngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.config.database.database_url = url.into();
        self
    }

    pub fn with_in_memory_database(mut self) -> Self {
        self.config.database.database_url = "sqlite::memory:".to_string();
        self
    }

    pub fn with_bind_address(mut self, addr: impl Into<String>) -> Self {
        self.config.general.bind_address = addr.into();
        self
    }

    pub async fn build(self) -> Result<FlowEngineServer> {
        FlowEngineServer::new(self.config).await
    }
}

impl Default for FlowEngineServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
