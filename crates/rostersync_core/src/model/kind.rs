//! Entity kinds and name validation.

use crate::error::{RosterError, RosterResult};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Entity kind with its own independent roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Identified by user name (usually an email address).
    User,
    /// Identified by display name.
    Group,
}

impl EntityKind {
    /// Every kind, in the order rosters are loaded and stored.
    pub const ALL: [EntityKind; 2] = [EntityKind::User, EntityKind::Group];

    /// Stable string id used in logs and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a kind from user input; plural forms are accepted.
pub fn parse_entity_kind(value: &str) -> RosterResult<EntityKind> {
    match value.trim().to_ascii_lowercase().as_str() {
        "user" | "users" => Ok(EntityKind::User),
        "group" | "groups" => Ok(EntityKind::Group),
        "" => Err(RosterError::validation("entity kind cannot be empty")),
        other => Err(RosterError::validation(format!(
            "unknown entity kind `{other}`; expected user|group"
        ))),
    }
}

/// Rejects a blank name. Any other name is returned unchanged.
///
/// Lookups downstream are exact-match, so the roster keeps names byte for
/// byte, surrounding whitespace included.
pub fn validate_name(name: &str) -> RosterResult<&str> {
    if name.trim().is_empty() {
        return Err(RosterError::validation("entity name cannot be empty"));
    }
    Ok(name)
}
