//! Error taxonomy shared by roster, backends and the reconciliation engine.
//!
//! # Responsibility
//! - Give every failure one closed, structurally matchable kind.
//! - Keep "absent downstream" distinct from every real failure.
//!
//! # Invariants
//! - `NotFound` is an expected downstream signal; backends never return it.
//! - A missing snapshot is not an error at all (`Ok(None)` at the byte level).
//! - Variants carry rendered messages only, so errors stay `Clone + Eq`.

use crate::backend::PersistError;
use crate::model::EntityKind;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RosterResult<T> = Result<T, RosterError>;

/// Closed failure enumeration for roster bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterError {
    /// The named entity does not exist downstream.
    NotFound { kind: EntityKind, name: String },
    /// Backend or network unreachable, credentials rejected, or local I/O failed.
    TransientIo { target: String, message: String },
    /// A snapshot exists but cannot be decoded.
    CorruptState { target: String, message: String },
    /// Input rejected before any I/O happened.
    Validation(String),
    /// Downstream collaborator failure other than not-found.
    Downstream(String),
    /// The kind failed to load at engine start and is fenced off.
    Unavailable {
        kind: EntityKind,
        cause: Box<RosterError>,
    },
    /// One or more kinds failed a whole-roster load or store.
    Persist(PersistError),
}

impl RosterError {
    pub fn not_found(kind: EntityKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn transient(target: impl Into<String>, message: impl Display) -> Self {
        Self::TransientIo {
            target: target.into(),
            message: message.to_string(),
        }
    }

    pub fn corrupt(target: impl Into<String>, message: impl Display) -> Self {
        Self::CorruptState {
            target: target.into(),
            message: message.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn downstream(message: impl Display) -> Self {
        Self::Downstream(message.to_string())
    }

    /// True only for the downstream "entity absent" signal.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientIo { .. })
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::CorruptState { .. })
    }

    /// Stable short code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::TransientIo { .. } => "transient_io",
            Self::CorruptState { .. } => "corrupt_state",
            Self::Validation(_) => "validation",
            Self::Downstream(_) => "downstream",
            Self::Unavailable { .. } => "unavailable",
            Self::Persist(_) => "persist",
        }
    }
}

impl Display for RosterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { kind, name } => write!(f, "{kind} not found downstream: `{name}`"),
            Self::TransientIo { target, message } => {
                write!(f, "backend unreachable at `{target}`: {message}")
            }
            Self::CorruptState { target, message } => {
                write!(f, "snapshot at `{target}` is corrupt: {message}")
            }
            Self::Validation(message) => write!(f, "invalid input: {message}"),
            Self::Downstream(message) => write!(f, "downstream failure: {message}"),
            Self::Unavailable { kind, cause } => {
                write!(f, "{kind} roster unavailable after failed load: {cause}")
            }
            Self::Persist(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RosterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unavailable { cause, .. } => Some(cause.as_ref()),
            Self::Persist(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PersistError> for RosterError {
    fn from(value: PersistError) -> Self {
        Self::Persist(value)
    }
}
