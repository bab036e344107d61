//! No-tracking backend: nothing is read or written.

use super::{PersistError, PersistenceBackend};
use crate::config::BackendKind;
use crate::error::RosterResult;
use crate::logging::LogSink;
use crate::model::EntityKind;
use crate::roster::RosterStore;

#[derive(Debug)]
pub struct NullBackend {
    log: LogSink,
}

impl NullBackend {
    pub fn new(log: LogSink) -> Self {
        Self { log }
    }
}

impl PersistenceBackend for NullBackend {
    fn backend_kind(&self) -> BackendKind {
        BackendKind::Null
    }

    fn location(&self, _kind: EntityKind) -> String {
        "null".to_string()
    }

    fn log_sink(&self) -> &LogSink {
        &self.log
    }

    fn read_snapshot(&self, _kind: EntityKind) -> RosterResult<Option<Vec<u8>>> {
        Ok(None)
    }

    fn write_snapshot(&self, _kind: EntityKind, _bytes: &[u8]) -> RosterResult<()> {
        Ok(())
    }

    fn load(&self, _roster: &mut RosterStore) -> Result<(), PersistError> {
        Ok(())
    }

    fn store(&self, _roster: &RosterStore) -> Result<(), PersistError> {
        Ok(())
    }
}
