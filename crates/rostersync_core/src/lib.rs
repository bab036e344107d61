//! Durable roster bookkeeping for one-way identity provisioning.
//! Tracks which users and groups exist downstream across runs, because the
//! downstream listing call cannot be trusted to enumerate them all.

pub mod backend;
pub mod config;
pub mod downstream;
pub mod engine;
pub mod error;
pub mod logging;
pub mod model;
pub mod roster;

pub use backend::{open_backend, Backend, PersistError, PersistOperation, PersistenceBackend};
pub use config::{parse_backend_kind, BackendKind, RosterConfig};
pub use downstream::{DownstreamLookup, DownstreamMutate, DownstreamRecord};
pub use engine::{Reconciliation, ReconciliationEngine};
pub use error::{RosterError, RosterResult};
pub use logging::{default_log_level, init_logging, logging_status, LogSink};
pub use model::{parse_entity_kind, validate_name, EntityKind};
pub use roster::RosterStore;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
