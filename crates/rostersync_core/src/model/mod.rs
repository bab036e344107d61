//! Roster domain vocabulary.
//!
//! # Responsibility
//! - Name the two independent entity kinds tracked by a roster.
//! - Reject unusable entity names before any I/O.
//!
//! # Invariants
//! - User and group names live in separate namespaces.
//! - Names are opaque strings, stored exactly as downstream reports them.

pub mod kind;

pub use kind::{parse_entity_kind, validate_name, EntityKind};
