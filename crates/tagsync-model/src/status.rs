//! Per-entry error state and derived status

use crate::entry::Entry;
use crate::error_tree::ErrorTree;
use crate::ids::ClientId;
use std::collections::HashMap;

/// Where an entry's error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorOrigin {
    /// Local validation
    Local,
    /// Rejected by the remote store
    Remote,
}

/// Error slot shown next to an entry
///
/// The UI renders `tree` the same way regardless of `origin`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorSlot {
    /// Field errors
    pub tree: ErrorTree,
    /// Origin, used for status only
    pub origin: ErrorOrigin,
}

/// Error slots keyed by entry client id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryErrors {
    slots: HashMap<ClientId, ErrorSlot>,
}

impl EntryErrors {
    /// Create empty map
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (replace) an entry's error
    pub fn set(&mut self, client_id: ClientId, tree: ErrorTree, origin: ErrorOrigin) {
        if tree.is_empty() {
            self.slots.remove(&client_id);
        } else {
            self.slots.insert(client_id, ErrorSlot { tree, origin });
        }
    }

    /// Merge a remote error into the entry's slot
    pub fn merge_remote(&mut self, client_id: ClientId, tree: ErrorTree) {
        let slot = self.slots.entry(client_id).or_insert_with(|| ErrorSlot {
            tree: ErrorTree::new(),
            origin: ErrorOrigin::Remote,
        });
        slot.tree.merge(tree);
        slot.origin = ErrorOrigin::Remote;
    }

    /// Error for an entry
    #[inline]
    #[must_use]
    pub fn get(&self, client_id: &ClientId) -> Option<&ErrorSlot> {
        self.slots.get(client_id)
    }

    /// Clear an entry's error
    pub fn clear(&mut self, client_id: &ClientId) -> Option<ErrorSlot> {
        self.slots.remove(client_id)
    }

    /// Clear only a remote error
    pub fn clear_remote(&mut self, client_id: &ClientId) {
        if self
            .slots
            .get(client_id)
            .is_some_and(|s| s.origin == ErrorOrigin::Remote)
        {
            self.slots.remove(client_id);
        }
    }

    /// Drop slots for entries that no longer exist
    pub fn retain(&mut self, mut keep: impl FnMut(&ClientId) -> bool) {
        self.slots.retain(|id, _| keep(id));
    }

    /// Number of entries with errors
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if no entry has errors
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Display status of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// A save is in flight
    Requesting,
    /// Rejected by the remote store
    ServerError,
    /// Fails local validation
    LocalError,
    /// Modified since last save
    NonPristine,
    /// Saved and unchanged
    Complete,
    /// Never saved, never touched
    Pristine,
}

/// Derive an entry's status; earlier rules win
#[must_use]
pub fn entry_status(entry: &Entry, error: Option<&ErrorSlot>, request_pending: bool) -> EntryStatus {
    if request_pending {
        return EntryStatus::Requesting;
    }
    match error.map(|e| e.origin) {
        Some(ErrorOrigin::Remote) => EntryStatus::ServerError,
        Some(ErrorOrigin::Local) => EntryStatus::LocalError,
        None if entry.stale => EntryStatus::NonPristine,
        None if entry.is_persisted() => EntryStatus::Complete,
        None => EntryStatus::Pristine,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ServerId;

    #[test]
    fn status_priority() {
        let mut entry = Entry::new(ClientId::from("e"));
        assert_eq!(entry_status(&entry, None, false), EntryStatus::Pristine);

        entry.server_id = Some(ServerId(1));
        assert_eq!(entry_status(&entry, None, false), EntryStatus::Complete);

        entry.stale = true;
        assert_eq!(entry_status(&entry, None, false), EntryStatus::NonPristine);

        let local = ErrorSlot {
            tree: ErrorTree::message("bad"),
            origin: ErrorOrigin::Local,
        };
        assert_eq!(entry_status(&entry, Some(&local), false), EntryStatus::LocalError);
        assert_eq!(entry_status(&entry, Some(&local), true), EntryStatus::Requesting);
    }

    #[test]
    fn empty_tree_clears_slot() {
        let mut errors = EntryErrors::new();
        let id = ClientId::from("e");
        errors.set(id.clone(), ErrorTree::message("x"), ErrorOrigin::Local);
        assert_eq!(errors.len(), 1);

        errors.set(id.clone(), ErrorTree::new(), ErrorOrigin::Local);
        assert!(errors.get(&id).is_none());
    }

    #[test]
    fn clear_remote_keeps_local_errors() {
        let mut errors = EntryErrors::new();
        let id = ClientId::from("e");
        errors.set(id.clone(), ErrorTree::message("x"), ErrorOrigin::Local);
        errors.clear_remote(&id);
        assert!(errors.get(&id).is_some());

        errors.merge_remote(id.clone(), ErrorTree::message("server"));
        assert_eq!(errors.get(&id).unwrap().origin, ErrorOrigin::Remote);
        errors.clear_remote(&id);
        assert!(errors.is_empty());
    }
}
