//! Roster persistence configuration.
//!
//! # Responsibility
//! - Name the recognized options and their defaults.
//! - Parse backend tags into the closed `BackendKind` set.
//! - Validate backend-specific requirements before any client is built.
//!
//! # Invariants
//! - Unknown backend tags are `Validation` errors, never a silent default.
//! - User and group snapshots never share one file/key/object.

use crate::error::{RosterError, RosterResult};
use serde::Deserialize;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DEFAULT_BACKEND: &str = "file";
pub const DEFAULT_PREFIX: &str = "rostersync-";
pub const DEFAULT_USER_OBJECT: &str = "Users.json";
pub const DEFAULT_GROUP_OBJECT: &str = "Groups.json";
pub const DEFAULT_LOG_LEVEL: &str = "info";

const ENV_PREFIX: &str = "ROSTERSYNC_";

/// Backend variants selectable by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    File,
    ObjectStore,
    KeyValue,
    Null,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::ObjectStore => "object-store",
            Self::KeyValue => "distributed-kv",
            Self::Null => "null",
        }
    }
}

impl Display for BackendKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a backend tag. `s3` and `consul` are accepted as aliases.
pub fn parse_backend_kind(value: &str) -> RosterResult<BackendKind> {
    match value.trim().to_ascii_lowercase().as_str() {
        "file" => Ok(BackendKind::File),
        "object-store" | "object_store" | "s3" => Ok(BackendKind::ObjectStore),
        "distributed-kv" | "distributed_kv" | "kv" | "consul" => Ok(BackendKind::KeyValue),
        "null" | "none" => Ok(BackendKind::Null),
        "" => Err(RosterError::validation("backend kind cannot be empty")),
        other => Err(RosterError::validation(format!(
            "unknown backend kind `{other}`; expected file|object-store|distributed-kv|null"
        ))),
    }
}

/// Recognized roster options.
///
/// `prefix` is a path prefix for `file`, a key prefix for `object-store` and
/// the namespace for `distributed-kv`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    pub backend: String,
    pub prefix: String,
    pub user_object: String,
    pub group_object: String,
    /// Required for `object-store`.
    pub bucket: Option<String>,
    /// Object-store base URL (required) or Consul agent address (optional).
    pub endpoint: Option<String>,
    /// Bearer token for object-store, ACL token for Consul.
    pub token: Option<String>,
    pub log_level: String,
    /// File logging is enabled only when set.
    pub log_dir: Option<PathBuf>,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            backend: DEFAULT_BACKEND.to_string(),
            prefix: DEFAULT_PREFIX.to_string(),
            user_object: DEFAULT_USER_OBJECT.to_string(),
            group_object: DEFAULT_GROUP_OBJECT.to_string(),
            bucket: None,
            endpoint: None,
            token: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_dir: None,
        }
    }
}

impl RosterConfig {
    /// Defaults overlaid with `ROSTERSYNC_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overlaid with values from `lookup`, keyed by full variable name.
    ///
    /// Blank values are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |suffix: &str| {
            lookup(&format!("{ENV_PREFIX}{suffix}")).filter(|value| !value.trim().is_empty())
        };

        let defaults = Self::default();
        Self {
            backend: get("BACKEND").unwrap_or(defaults.backend),
            prefix: get("PREFIX").unwrap_or(defaults.prefix),
            user_object: get("USER_OBJECT").unwrap_or(defaults.user_object),
            group_object: get("GROUP_OBJECT").unwrap_or(defaults.group_object),
            bucket: get("BUCKET"),
            endpoint: get("ENDPOINT"),
            token: get("TOKEN"),
            log_level: get("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_dir: get("LOG_DIR").map(PathBuf::from),
        }
    }

    /// Parses a JSON document; absent fields keep their defaults.
    pub fn from_json(text: &str) -> RosterResult<Self> {
        serde_json::from_str(text)
            .map_err(|err| RosterError::validation(format!("invalid roster config: {err}")))
    }

    pub fn backend_kind(&self) -> RosterResult<BackendKind> {
        parse_backend_kind(&self.backend)
    }

    /// Checks the options the selected backend needs.
    pub fn validate(&self) -> RosterResult<()> {
        let kind = self.backend_kind()?;
        if kind == BackendKind::Null {
            return Ok(());
        }

        if self.user_object.trim().is_empty() || self.group_object.trim().is_empty() {
            return Err(RosterError::validation(
                "user_object and group_object cannot be empty",
            ));
        }
        if self.user_object == self.group_object {
            return Err(RosterError::validation(format!(
                "user_object and group_object must differ, both are `{}`",
                self.user_object
            )));
        }

        match kind {
            BackendKind::ObjectStore => {
                require(self.bucket.as_deref(), "bucket", kind)?;
                require(self.endpoint.as_deref(), "endpoint", kind)?;
            }
            BackendKind::KeyValue => {
                require(Some(self.prefix.as_str()), "prefix", kind)?;
            }
            BackendKind::File | BackendKind::Null => {}
        }
        Ok(())
    }
}

fn require(value: Option<&str>, field: &str, kind: BackendKind) -> RosterResult<()> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(()),
        _ => Err(RosterError::validation(format!(
            "`{field}` is required for the {kind} backend"
        ))),
    }
}
