//! Entity registry
//!
//! The canonical, ordered collection of entries for one editing session,
//! addressed by [`ClientId`]. The registry is a plain value: cloning it is how
//! restore points snapshot it, and no live reference is ever shared with a
//! snapshot.

use crate::entry::{Entry, EntryPatch};
use crate::error::ModelError;
use crate::ids::{ClientId, ServerId};
use indexmap::IndexMap;

/// What a record needs from the next save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveKind {
    /// Delete remotely (locally deleted, previously persisted)
    Delete(ServerId),
    /// Create or update remotely (stale, not deleted)
    Update,
}

impl Entry {
    /// Classify whether this record needs a network round trip
    #[must_use]
    pub fn save_kind(&self) -> Option<SaveKind> {
        match (self.deleted, self.server_id) {
            (true, Some(id)) => Some(SaveKind::Delete(id)),
            (true, None) => None,
            (false, _) if self.stale => Some(SaveKind::Update),
            (false, _) => None,
        }
    }
}

/// Result of soft-deleting a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    /// Never persisted: will be purged locally, no network call
    LocalOnly,
    /// Persisted: will be deleted remotely on next save
    Remote(ServerId),
}

/// Ordered arena of entries keyed by client id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityRegistry {
    entries: IndexMap<ClientId, Entry>,
}

impl EntityRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from entries, keeping their order
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = Entry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|e| (e.client_id.clone(), e))
                .collect(),
        }
    }

    /// Number of records (including soft-deleted ones)
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get record
    #[inline]
    #[must_use]
    pub fn get(&self, client_id: &ClientId) -> Option<&Entry> {
        self.entries.get(client_id)
    }

    /// Get mutable record
    #[inline]
    pub fn get_mut(&mut self, client_id: &ClientId) -> Option<&mut Entry> {
        self.entries.get_mut(client_id)
    }

    /// Check membership
    #[inline]
    #[must_use]
    pub fn contains(&self, client_id: &ClientId) -> bool {
        self.entries.contains_key(client_id)
    }

    /// Position of a record in display order
    #[inline]
    #[must_use]
    pub fn position(&self, client_id: &ClientId) -> Option<usize> {
        self.entries.get_index_of(client_id)
    }

    /// Iterate records in order
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    /// Iterate records mutably in order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entry> {
        self.entries.values_mut()
    }

    /// Find a record by server id
    #[must_use]
    pub fn find_by_server_id(&self, server_id: ServerId) -> Option<&Entry> {
        self.entries
            .values()
            .find(|e| e.server_id == Some(server_id))
    }

    /// Add a brand new record
    ///
    /// # Errors
    /// - `ModelError::DuplicateEntry` if the client id is taken
    pub fn insert(&mut self, entry: Entry) -> Result<(), ModelError> {
        if self.entries.contains_key(&entry.client_id) {
            return Err(ModelError::DuplicateEntry(entry.client_id));
        }
        self.entries.insert(entry.client_id.clone(), entry);
        Ok(())
    }

    /// Merge a user edit into a record, creating it if absent
    ///
    /// User edits always mark the record stale.
    pub fn upsert(&mut self, client_id: &ClientId, patch: &EntryPatch) -> &Entry {
        let entry = self
            .entries
            .entry(client_id.clone())
            .or_insert_with(|| Entry::new(client_id.clone()));
        entry.apply_patch(patch);
        entry.stale = true;
        entry
    }

    /// Overwrite (or add) a record with remote-sourced data
    ///
    /// Keeps the record's position; never marks it stale.
    pub fn replace_from_remote(&mut self, entry: Entry) {
        debug_assert!(!entry.stale);
        self.entries.insert(entry.client_id.clone(), entry);
    }

    /// Soft-delete a record
    ///
    /// # Errors
    /// - `ModelError::EntryNotFound` if the record does not exist
    pub fn mark_deleted(&mut self, client_id: &ClientId) -> Result<Deletion, ModelError> {
        let entry = self
            .entries
            .get_mut(client_id)
            .ok_or_else(|| ModelError::EntryNotFound(client_id.clone()))?;
        entry.deleted = true;
        Ok(entry.server_id.map_or(Deletion::LocalOnly, Deletion::Remote))
    }

    /// Undo a soft delete
    ///
    /// # Errors
    /// - `ModelError::EntryNotFound` if the record does not exist
    pub fn restore(&mut self, client_id: &ClientId) -> Result<(), ModelError> {
        let entry = self
            .entries
            .get_mut(client_id)
            .ok_or_else(|| ModelError::EntryNotFound(client_id.clone()))?;
        entry.deleted = false;
        Ok(())
    }

    /// Physically drop a record, keeping the order of the rest
    pub fn remove(&mut self, client_id: &ClientId) -> Option<Entry> {
        self.entries.shift_remove(client_id)
    }

    /// Drop soft-deleted records the remote store never saw
    pub fn purge_unsaved_deleted(&mut self) -> Vec<ClientId> {
        let purged: Vec<ClientId> = self
            .entries
            .values()
            .filter(|e| e.deleted && !e.is_persisted())
            .map(|e| e.client_id.clone())
            .collect();
        for id in &purged {
            self.entries.shift_remove(id);
        }
        purged
    }

    /// Records that need a network round trip, in order
    pub fn filter_savable(&self) -> impl Iterator<Item = (&Entry, SaveKind)> {
        self.entries
            .values()
            .filter_map(|e| e.save_kind().map(|kind| (e, kind)))
    }

    /// Whether any record needs saving
    #[must_use]
    pub fn has_pending_changes(&self) -> bool {
        self.filter_savable().next().is_some()
    }

    /// Re-sort by `order`, then creation time
    pub fn sort_by_order(&mut self) {
        self.entries.sort_by(|_, a, _, b| {
            a.order
                .cmp(&b.order)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
    }
}

impl<'a> IntoIterator for &'a EntityRegistry {
    type Item = &'a Entry;
    type IntoIter = indexmap::map::Values<'a, ClientId, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}
