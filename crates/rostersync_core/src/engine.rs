//! Roster reconciliation against the downstream directory.
//!
//! # Responsibility
//! - Hydrate the roster from the backend at start.
//! - Validate, heal and extend the roster in a reconciliation pass
//!   (`get_all`).
//! - Keep roster and backend in step with downstream create/delete.
//!
//! # Invariants
//! - Only `NotFound` during per-name validation becomes a state change;
//!   every other error aborts the pass and propagates unchanged.
//! - A failed pass leaves the roster exactly as it was.
//! - `create` records and persists intent before the remote call.
//! - `delete` touches the roster only after the remote delete succeeded.
//! - A kind that failed to load is never written back.

use crate::backend::{PersistError, PersistOperation, PersistenceBackend};
use crate::downstream::{DownstreamLookup, DownstreamMutate, DownstreamRecord};
use crate::error::{RosterError, RosterResult};
use crate::logging::LogSink;
use crate::model::{validate_name, EntityKind};
use crate::roster::RosterStore;
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation<R> {
    /// De-duplicated union of validated and discovered records, unordered.
    pub records: Vec<R>,
    /// Roster names dropped because downstream no longer has them.
    pub pruned: Vec<String>,
    /// Names found in the downstream listing that the roster lacked.
    pub discovered: Vec<String>,
}

/// Single-owner engine over one roster, one backend and one downstream.
///
/// Not synchronized; concurrent callers must serialize access themselves.
pub struct ReconciliationEngine<B, D> {
    backend: B,
    downstream: D,
    roster: RosterStore,
    unavailable: BTreeMap<EntityKind, RosterError>,
    log: LogSink,
}

impl<B: PersistenceBackend, D: DownstreamLookup> ReconciliationEngine<B, D> {
    /// Loads every kind; kinds that fail to load are fenced off.
    pub fn start(backend: B, downstream: D, log: LogSink) -> Self {
        let log = log.with_target("rostersync::engine");
        let mut roster = RosterStore::new();
        let unavailable: BTreeMap<EntityKind, RosterError> = match backend.load(&mut roster) {
            Ok(()) => BTreeMap::new(),
            Err(err) => err.failures.into_iter().collect(),
        };

        for kind in EntityKind::ALL {
            match unavailable.get(&kind) {
                Some(err) => log.warn(format_args!(
                    "event=engine_start module=engine status=degraded kind={} error_code={}",
                    kind,
                    err.code()
                )),
                None => log.info(format_args!(
                    "event=engine_start module=engine status=ok kind={} count={}",
                    kind,
                    roster.len(kind)
                )),
            }
        }

        Self {
            backend,
            downstream,
            roster,
            unavailable,
            log,
        }
    }

    /// Like `start`, but any load failure aborts.
    pub fn start_strict(backend: B, downstream: D, log: LogSink) -> RosterResult<Self> {
        let engine = Self::start(backend, downstream, log);
        if engine.unavailable.is_empty() {
            return Ok(engine);
        }
        Err(RosterError::Persist(PersistError {
            operation: PersistOperation::Load,
            failures: engine.unavailable.into_iter().collect(),
        }))
    }

    pub fn roster(&self) -> &RosterStore {
        &self.roster
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn downstream(&self) -> &D {
        &self.downstream
    }

    pub fn is_available(&self, kind: EntityKind) -> bool {
        !self.unavailable.contains_key(&kind)
    }

    /// Load errors of fenced-off kinds.
    pub fn load_failures(&self) -> &BTreeMap<EntityKind, RosterError> {
        &self.unavailable
    }

    /// One reconciliation pass for `kind`.
    ///
    /// Every roster name is checked with an exact-match lookup, then the
    /// downstream listing fills in names the roster never captured. Prunes
    /// and discoveries are applied to the in-memory roster only after the
    /// whole pass succeeded; call `persist` to make them durable.
    pub fn get_all(&mut self, kind: EntityKind) -> RosterResult<Reconciliation<D::Record>> {
        self.require_available(kind)?;
        let started_at = Instant::now();

        let names = self.roster.list(kind);
        let mut known: HashSet<String> = HashSet::with_capacity(names.len());
        let mut records = Vec::with_capacity(names.len());
        let mut pruned = Vec::new();

        for name in names {
            match self.downstream.find_by_name(kind, &name) {
                Ok(record) => {
                    let fresh = known.insert(record.name().to_string());
                    known.insert(name);
                    if fresh {
                        records.push(record);
                    }
                }
                Err(err) if err.is_not_found() => pruned.push(name),
                Err(err) => {
                    self.log.error(format_args!(
                        "event=reconcile module=engine status=error stage=lookup kind={} name={} error_code={} error={}",
                        kind,
                        name,
                        err.code(),
                        err
                    ));
                    return Err(err);
                }
            }
        }

        let listed = match self.downstream.list_all(kind) {
            Ok(listed) => listed,
            Err(err) => {
                self.log.error(format_args!(
                    "event=reconcile module=engine status=error stage=list kind={} error_code={} error={}",
                    kind,
                    err.code(),
                    err
                ));
                return Err(err);
            }
        };

        let mut discovered = Vec::new();
        for record in listed {
            let name = record.name();
            if name.trim().is_empty() {
                self.log.warn(format_args!(
                    "event=reconcile module=engine status=skipped stage=list kind={} reason=blank_name",
                    kind
                ));
                continue;
            }
            if known.insert(name.to_string()) {
                discovered.push(name.to_string());
                records.push(record);
            }
        }

        for name in &pruned {
            self.roster.delete_name(kind, name);
            self.log.info(format_args!(
                "event=roster_prune module=engine status=ok kind={} name={}",
                kind, name
            ));
        }
        for name in &discovered {
            self.roster.add_name(kind, name.clone());
            self.log.info(format_args!(
                "event=roster_discover module=engine status=ok kind={} name={}",
                kind, name
            ));
        }

        self.log.info(format_args!(
            "event=reconcile module=engine status=ok kind={} records={} pruned={} discovered={} duration_ms={}",
            kind,
            records.len(),
            pruned.len(),
            discovered.len(),
            started_at.elapsed().as_millis()
        ));

        Ok(Reconciliation {
            records,
            pruned,
            discovered,
        })
    }

    /// Stores every available kind; fenced-off kinds are skipped.
    pub fn persist(&self) -> RosterResult<()> {
        let failures: Vec<(EntityKind, RosterError)> = EntityKind::ALL
            .into_iter()
            .filter(|kind| self.is_available(*kind))
            .filter_map(|kind| {
                self.backend
                    .store_kind(kind, &self.roster)
                    .err()
                    .map(|err| (kind, err))
            })
            .collect();

        if failures.is_empty() {
            return Ok(());
        }
        Err(RosterError::Persist(PersistError {
            operation: PersistOperation::Store,
            failures,
        }))
    }

    fn require_available(&self, kind: EntityKind) -> RosterResult<()> {
        match self.unavailable.get(&kind) {
            Some(cause) => Err(RosterError::Unavailable {
                kind,
                cause: Box::new(cause.clone()),
            }),
            None => Ok(()),
        }
    }
}

impl<B: PersistenceBackend, D: DownstreamMutate> ReconciliationEngine<B, D> {
    /// Records `record` in the roster, persists, then creates it downstream.
    ///
    /// If persisting fails nothing is sent downstream and a newly added name
    /// is rolled back. If the downstream create fails the roster entry stays
    /// as an orphan; the next `get_all` prunes it when the lookup says
    /// `NotFound`.
    pub fn create(&mut self, kind: EntityKind, record: &D::Record) -> RosterResult<D::Record> {
        self.require_available(kind)?;
        let name = validate_name(record.name())?.to_string();

        let added = self.roster.add_name(kind, name.clone());
        if let Err(err) = self.backend.store_kind(kind, &self.roster) {
            if added {
                self.roster.delete_name(kind, &name);
            }
            self.log.error(format_args!(
                "event=roster_create module=engine status=error stage=persist kind={} name={} error_code={}",
                kind,
                name,
                err.code()
            ));
            return Err(err);
        }

        match self.downstream.create(kind, record) {
            Ok(created) => {
                self.log.info(format_args!(
                    "event=roster_create module=engine status=ok kind={} name={}",
                    kind, name
                ));
                Ok(created)
            }
            Err(err) => {
                self.log.warn(format_args!(
                    "event=roster_create module=engine status=orphaned kind={} name={} error_code={} error={}",
                    kind,
                    name,
                    err.code(),
                    err
                ));
                Err(err)
            }
        }
    }

    /// Deletes `name` downstream, then drops it from the roster and persists.
    ///
    /// A failed downstream delete leaves the roster untouched.
    pub fn delete(&mut self, kind: EntityKind, name: &str) -> RosterResult<()> {
        self.require_available(kind)?;
        let name = validate_name(name)?;

        if let Err(err) = self.downstream.delete(kind, name) {
            self.log.error(format_args!(
                "event=roster_delete module=engine status=error stage=downstream kind={} name={} error_code={} error={}",
                kind,
                name,
                err.code(),
                err
            ));
            return Err(err);
        }

        self.roster.delete_name(kind, name);
        match self.backend.store_kind(kind, &self.roster) {
            Ok(()) => {
                self.log.info(format_args!(
                    "event=roster_delete module=engine status=ok kind={} name={}",
                    kind, name
                ));
                Ok(())
            }
            Err(err) => {
                self.log.error(format_args!(
                    "event=roster_delete module=engine status=error stage=persist kind={} name={} error_code={}",
                    kind,
                    name,
                    err.code()
                ));
                Err(err)
            }
        }
    }
}
