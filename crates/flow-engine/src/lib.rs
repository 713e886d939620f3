//! # Dialplane Flow Engine
//!
//! Webhook-driven call-flow routing for the dialplane stack. The engine
//! receives call lifecycle events from the telephony provider and, for each
//! one, durably records the event in an ordered per-call audit trail and
//! resolves the next routing action from tenant configuration. At call
//! completion it classifies the outcome and computes summary metrics.
//!
//! The engine *decides and records*; it never performs call control. Every
//! returned action is advisory, executed by the telephony-facing
//! collaborator.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            FlowEngineServer             │
//! ├─────────────────────────────────────────┤
//! │      Webhook API (entry/event/log)      │
//! ├────────────────────┬────────────────────┤
//! │  EventDispatcher   │  OutcomeClassifier │
//! ├──────────┬─────────┴─┬──────────────────┤
//! │ FlowStore│ Directory │   SessionStore   │
//! ├──────────┴───────────┴──────────────────┤
//! │               SQLite (sqlx)             │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use dialplane_flow_engine::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let mut server = FlowEngineServerBuilder::new()
//!     .with_in_memory_database()
//!     .with_bind_address("127.0.0.1:8085")
//!     .build()
//!     .await?;
//!
//! server.start();
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod classifier;
pub mod config;
pub mod database;
pub mod directory;
pub mod dispatcher;
pub mod error;
pub mod flow;
pub mod prelude;
pub mod server;
pub mod session;

pub use classifier::OutcomeClassifier;
pub use config::FlowEngineConfig;
pub use dispatcher::EventDispatcher;
pub use error::{FlowEngineError, Result};
pub use server::{FlowEngineServer, FlowEngineServerBuilder};
