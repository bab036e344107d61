//! In-memory roster and its snapshot encoding.
//!
//! # Responsibility
//! - Hold the set of names believed to exist downstream, per entity kind.
//! - Convert one kind's names to and from the persisted JSON snapshot.
//!
//! # Invariants
//! - Names are unique within a kind; mutation is idempotent and infallible.
//! - Decoding never treats unparsable content as an empty roster.

mod snapshot;
mod store;

pub use snapshot::{decode_snapshot, encode_snapshot};
pub use store::RosterStore;
