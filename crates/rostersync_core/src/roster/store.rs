use crate::model::EntityKind;
use std::collections::BTreeSet;

/// Names previously known to exist downstream, one set per kind.
///
/// Not internally synchronized: one owner mutates it at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterStore {
    users: BTreeSet<String>,
    groups: BTreeSet<String>,
}

impl RosterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a name; returns `true` when it was not already present.
    pub fn add_name(&mut self, kind: EntityKind, name: impl Into<String>) -> bool {
        self.names_mut(kind).insert(name.into())
    }

    /// Removes a name; returns `true` when it was present.
    pub fn delete_name(&mut self, kind: EntityKind, name: &str) -> bool {
        self.names_mut(kind).remove(name)
    }

    /// Returns an owned copy of one kind's names.
    ///
    /// Callers may mutate the returned list freely. No ordering is promised.
    pub fn list(&self, kind: EntityKind) -> Vec<String> {
        self.names(kind).iter().cloned().collect()
    }

    pub fn contains(&self, kind: EntityKind, name: &str) -> bool {
        self.names(kind).contains(name)
    }

    pub fn len(&self, kind: EntityKind) -> usize {
        self.names(kind).len()
    }

    pub fn is_empty(&self, kind: EntityKind) -> bool {
        self.names(kind).is_empty()
    }

    /// Swaps one kind's contents wholesale, as a load does.
    pub fn replace(&mut self, kind: EntityKind, names: impl IntoIterator<Item = String>) {
        *self.names_mut(kind) = names.into_iter().collect();
    }

    /// Borrowed view used by snapshot encoding.
    pub fn names(&self, kind: EntityKind) -> &BTreeSet<String> {
        match kind {
            EntityKind::User => &self.users,
            EntityKind::Group => &self.groups,
        }
    }

    fn names_mut(&mut self, kind: EntityKind) -> &mut BTreeSet<String> {
        match kind {
            EntityKind::User => &mut self.users,
            EntityKind::Group => &mut self.groups,
        }
    }
}
