//! Seams to the downstream directory service.
//!
//! The core never sees wire details: collaborators report an absent entity
//! as `RosterError::NotFound` and every other failure as any other variant
//! (normally `Downstream` or `TransientIo`).

use crate::error::RosterResult;
use crate::model::EntityKind;

/// Downstream data confirming an entity exists.
pub trait DownstreamRecord {
    /// Roster key of the entity (user name or group display name).
    fn name(&self) -> &str;
}

/// Read side of the downstream directory.
pub trait DownstreamLookup {
    type Record: DownstreamRecord;

    /// Exact-match lookup. `NotFound` when absent.
    fn find_by_name(&self, kind: EntityKind, name: &str) -> RosterResult<Self::Record>;

    /// Native listing; may be capped and silently incomplete.
    fn list_all(&self, kind: EntityKind) -> RosterResult<Vec<Self::Record>>;
}

/// Write side of the downstream directory.
pub trait DownstreamMutate: DownstreamLookup {
    fn create(&self, kind: EntityKind, record: &Self::Record) -> RosterResult<Self::Record>;

    fn delete(&self, kind: EntityKind, name: &str) -> RosterResult<()>;
}

impl DownstreamRecord for String {
    fn name(&self) -> &str {
        self
    }
}
