//! Local-file backend: one JSON file per kind under a path prefix.
//!
//! Writes land in a temporary sibling file first and are renamed over the
//! target, so a failed write leaves the previous snapshot intact.

use super::PersistenceBackend;
use crate::config::BackendKind;
use crate::error::{RosterError, RosterResult};
use crate::logging::LogSink;
use crate::model::EntityKind;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug)]
pub struct FileBackend {
    user_path: PathBuf,
    group_path: PathBuf,
    log: LogSink,
}

impl FileBackend {
    /// Snapshot files are `<prefix><user_object>` and `<prefix><group_object>`.
    pub fn new(prefix: &str, user_object: &str, group_object: &str, log: LogSink) -> Self {
        Self {
            user_path: PathBuf::from(format!("{prefix}{user_object}")),
            group_path: PathBuf::from(format!("{prefix}{group_object}")),
            log,
        }
    }

    pub fn path(&self, kind: EntityKind) -> &Path {
        match kind {
            EntityKind::User => &self.user_path,
            EntityKind::Group => &self.group_path,
        }
    }
}

impl PersistenceBackend for FileBackend {
    fn backend_kind(&self) -> BackendKind {
        BackendKind::File
    }

    fn location(&self, kind: EntityKind) -> String {
        self.path(kind).display().to_string()
    }

    fn log_sink(&self) -> &LogSink {
        &self.log
    }

    fn read_snapshot(&self, kind: EntityKind) -> RosterResult<Option<Vec<u8>>> {
        let path = self.path(kind);
        match std::fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(RosterError::transient(path.display().to_string(), err)),
        }
    }

    fn write_snapshot(&self, kind: EntityKind, bytes: &[u8]) -> RosterResult<()> {
        let path = self.path(kind);
        let target = path.display().to_string();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut staged = NamedTempFile::new_in(dir)
            .map_err(|err| {
                RosterError::transient(&target, format!("failed to stage write: {err}"))
            })?;
        staged
            .write_all(bytes)
            .and_then(|()| staged.as_file().sync_all())
            .map_err(|err| RosterError::transient(&target, err))?;
        staged
            .persist(path)
            .map_err(|err| RosterError::transient(&target, err.error))?;
        Ok(())
    }
}
