//! Common imports for working with the flow engine.

pub use crate::classifier::{CallOutcome, OutcomeClassifier};
pub use crate::config::{DispatcherConfig, DuplicatePolicy, FlowEngineConfig};
pub use crate::directory::{
    Department, DialPlan, DialStrategy, DirectoryStore, Extension, ExtensionStatus,
    SqliteDirectoryStore,
};
pub use crate::dispatcher::{CallEvent, EventDispatcher, RoutingAction};
pub use crate::error::{FieldError, FlowEngineError, Result};
pub use crate::flow::{FlowConfig, FlowOption, FlowStore, SqliteFlowStore};
pub use crate::server::{FlowEngineServer, FlowEngineServerBuilder};
pub use crate::session::{
    CallDirection, CallMetrics, CallSession, CallStatus, FinalizeRecord, MemorySessionStore,
    NewCallSession, PathStep, SessionStore, SqliteSessionStore,
};
