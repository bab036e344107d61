//! Pluggable persistence for roster snapshots.
//!
//! # Responsibility
//! - Define the `{load, store}` capability shared by every backend variant.
//! - Apply snapshot encoding, per-kind independence and logging once, on top
//!   of each variant's byte-level read/write primitives.
//! - Build the configured variant (`open_backend`).
//!
//! # Invariants
//! - Missing snapshot => empty roster for that kind, never an error.
//! - Unparsable snapshot => `CorruptState`, never an empty roster.
//! - Unreachable backend => `TransientIo`.
//! - A failure on one kind never blocks or undoes the other kind.

mod file;
mod http;
mod kv;
mod null;
mod object_store;

pub use file::FileBackend;
pub use kv::{ConsulKvClient, KeyValueBackend, KvClient};
pub use null::NullBackend;
pub use object_store::{HttpObjectStoreClient, ObjectStoreBackend, ObjectStoreClient};

use crate::config::{BackendKind, RosterConfig};
use crate::error::{RosterError, RosterResult};
use crate::logging::LogSink;
use crate::model::EntityKind;
use crate::roster::{decode_snapshot, encode_snapshot, RosterStore};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Whole-roster operation that produced a `PersistError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOperation {
    Load,
    Store,
}

impl PersistOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Store => "store",
        }
    }
}

/// Per-kind failures from a whole-roster load or store.
///
/// Kinds absent from `failures` completed successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistError {
    pub operation: PersistOperation,
    pub failures: Vec<(EntityKind, RosterError)>,
}

impl PersistError {
    pub fn error_for(&self, kind: EntityKind) -> Option<&RosterError> {
        self.failures
            .iter()
            .find(|(failed, _)| *failed == kind)
            .map(|(_, err)| err)
    }

    pub fn failed_kinds(&self) -> Vec<EntityKind> {
        self.failures.iter().map(|(kind, _)| *kind).collect()
    }
}

impl Display for PersistError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "roster {} failed", self.operation.as_str())?;
        for (index, (kind, err)) in self.failures.iter().enumerate() {
            let separator = if index == 0 { ": " } else { "; " };
            write!(f, "{separator}{kind}: {err}")?;
        }
        Ok(())
    }
}

impl Error for PersistError {}

/// Durable home for roster snapshots.
///
/// Variants implement the byte-level primitives; the provided methods carry
/// the shared load/store semantics.
pub trait PersistenceBackend {
    fn backend_kind(&self) -> BackendKind;

    /// Human-readable location of one kind's snapshot (path, key, object).
    fn location(&self, kind: EntityKind) -> String;

    fn log_sink(&self) -> &LogSink;

    /// Raw snapshot bytes, or `None` when nothing has been stored yet.
    fn read_snapshot(&self, kind: EntityKind) -> RosterResult<Option<Vec<u8>>>;

    /// Replaces one kind's snapshot.
    fn write_snapshot(&self, kind: EntityKind, bytes: &[u8]) -> RosterResult<()>;

    /// Decoded names for one kind; `None` on first run.
    fn load_kind(&self, kind: EntityKind) -> RosterResult<Option<BTreeSet<String>>> {
        let location = self.location(kind);
        match self.read_snapshot(kind)? {
            Some(bytes) => decode_snapshot(&bytes, &location).map(Some),
            None => Ok(None),
        }
    }

    /// Encodes and writes one kind of `roster`.
    fn store_kind(&self, kind: EntityKind, roster: &RosterStore) -> RosterResult<()> {
        let location = self.location(kind);
        let bytes = encode_snapshot(roster.names(kind), &location)?;
        let result = self.write_snapshot(kind, &bytes);
        let log = self.log_sink();
        match &result {
            Ok(()) => log.debug(format_args!(
                "event=roster_store module=backend status=ok backend={} kind={} count={} location={}",
                self.backend_kind(),
                kind,
                roster.len(kind),
                location
            )),
            Err(err) => log.error(format_args!(
                "event=roster_store module=backend status=error backend={} kind={} location={} error_code={} error={}",
                self.backend_kind(),
                kind,
                location,
                err.code(),
                err
            )),
        }
        result
    }

    /// Hydrates `roster` from every kind's snapshot.
    ///
    /// Succeeding kinds are applied even when another kind fails; failing
    /// kinds are left untouched in `roster` and reported in the error.
    fn load(&self, roster: &mut RosterStore) -> Result<(), PersistError> {
        let log = self.log_sink();
        let mut failures = Vec::new();
        for kind in EntityKind::ALL {
            let location = self.location(kind);
            match self.load_kind(kind) {
                Ok(Some(names)) => {
                    log.info(format_args!(
                        "event=roster_load module=backend status=ok backend={} kind={} count={} location={}",
                        self.backend_kind(),
                        kind,
                        names.len(),
                        location
                    ));
                    roster.replace(kind, names);
                }
                Ok(None) => {
                    log.warn(format_args!(
                        "event=roster_load module=backend status=missing backend={} kind={} location={}",
                        self.backend_kind(),
                        kind,
                        location
                    ));
                    roster.replace(kind, Vec::new());
                }
                Err(err) => {
                    log.error(format_args!(
                        "event=roster_load module=backend status=error backend={} kind={} location={} error_code={} error={}",
                        self.backend_kind(),
                        kind,
                        location,
                        err.code(),
                        err
                    ));
                    failures.push((kind, err));
                }
            }
        }
        finish(PersistOperation::Load, failures)
    }

    /// Writes every kind; a failing kind does not stop the others.
    fn store(&self, roster: &RosterStore) -> Result<(), PersistError> {
        let failures = EntityKind::ALL
            .into_iter()
            .filter_map(|kind| self.store_kind(kind, roster).err().map(|err| (kind, err)))
            .collect();
        finish(PersistOperation::Store, failures)
    }
}

fn finish(
    operation: PersistOperation,
    failures: Vec<(EntityKind, RosterError)>,
) -> Result<(), PersistError> {
    if failures.is_empty() {
        Ok(())
    } else {
        Err(PersistError {
            operation,
            failures,
        })
    }
}

/// The closed set of backend variants selectable by configuration.
#[derive(Debug)]
pub enum Backend {
    File(FileBackend),
    ObjectStore(ObjectStoreBackend<HttpObjectStoreClient>),
    KeyValue(KeyValueBackend<ConsulKvClient>),
    Null(NullBackend),
}

impl Backend {
    fn as_dyn(&self) -> &dyn PersistenceBackend {
        match self {
            Self::File(backend) => backend,
            Self::ObjectStore(backend) => backend,
            Self::KeyValue(backend) => backend,
            Self::Null(backend) => backend,
        }
    }
}

impl PersistenceBackend for Backend {
    fn backend_kind(&self) -> BackendKind {
        self.as_dyn().backend_kind()
    }

    fn location(&self, kind: EntityKind) -> String {
        self.as_dyn().location(kind)
    }

    fn log_sink(&self) -> &LogSink {
        self.as_dyn().log_sink()
    }

    fn read_snapshot(&self, kind: EntityKind) -> RosterResult<Option<Vec<u8>>> {
        self.as_dyn().read_snapshot(kind)
    }

    fn write_snapshot(&self, kind: EntityKind, bytes: &[u8]) -> RosterResult<()> {
        self.as_dyn().write_snapshot(kind, bytes)
    }

    fn load_kind(&self, kind: EntityKind) -> RosterResult<Option<BTreeSet<String>>> {
        self.as_dyn().load_kind(kind)
    }

    fn store_kind(&self, kind: EntityKind, roster: &RosterStore) -> RosterResult<()> {
        self.as_dyn().store_kind(kind, roster)
    }

    fn load(&self, roster: &mut RosterStore) -> Result<(), PersistError> {
        self.as_dyn().load(roster)
    }

    fn store(&self, roster: &RosterStore) -> Result<(), PersistError> {
        self.as_dyn().store(roster)
    }
}

/// Builds the backend named by `config`.
///
/// Configuration is validated first, so an unknown backend tag or a missing
/// bucket is rejected before any client is constructed.
pub fn open_backend(config: &RosterConfig, log: LogSink) -> RosterResult<Backend> {
    config.validate()?;
    let log = log.with_target("rostersync::backend");
    let backend = match config.backend_kind()? {
        BackendKind::File => Backend::File(FileBackend::new(
            &config.prefix,
            &config.user_object,
            &config.group_object,
            log,
        )),
        BackendKind::ObjectStore => {
            let endpoint = config.endpoint.as_deref().unwrap_or_default();
            let bucket = config.bucket.as_deref().unwrap_or_default();
            let client = HttpObjectStoreClient::new(endpoint, config.token.clone())?;
            Backend::ObjectStore(ObjectStoreBackend::new(
                client,
                bucket,
                &config.prefix,
                &config.user_object,
                &config.group_object,
                log,
            ))
        }
        BackendKind::KeyValue => {
            let client = ConsulKvClient::from_env_defaults(
                config.endpoint.as_deref(),
                config.token.clone(),
            )?;
            Backend::KeyValue(KeyValueBackend::new(
                client,
                &config.prefix,
                &config.user_object,
                &config.group_object,
                log,
            ))
        }
        BackendKind::Null => Backend::Null(NullBackend::new(log)),
    };

    backend.log_sink().info(format_args!(
        "event=backend_open module=backend status=ok backend={} users={} groups={}",
        backend.backend_kind(),
        backend.location(EntityKind::User),
        backend.location(EntityKind::Group)
    ));
    Ok(backend)
}
