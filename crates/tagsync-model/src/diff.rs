//! Remote refresh diff
//!
//! Reconciles the local registry with the entry list returned when the parent
//! document is reloaded. Records are matched by server id first and by the
//! echoed client id second, which also catches records that were saved
//! remotely but whose server id never made it back to the client.

use crate::entry::{Entry, RemoteEntry};
use crate::ids::{ClientId, ServerId};
use crate::registry::EntityRegistry;
use std::collections::{HashMap, HashSet};

/// Action for one record
#[derive(Debug, Clone, PartialEq)]
pub enum EntryDiff {
    /// New on the server
    Add(Entry),
    /// Changed on the server; local copy is replaced
    Replace {
        /// Local record
        client_id: ClientId,
        /// Remote version, keyed by the local client id
        entry: Entry,
    },
    /// Gone from the server
    Remove {
        /// Local record
        client_id: ClientId,
        /// Server id it had
        server_id: ServerId,
    },
    /// Unchanged remotely, or never saved
    Noop {
        /// Local record
        client_id: ClientId,
    },
}

impl EntryDiff {
    /// Whether applying this changes the registry
    #[inline]
    #[must_use]
    pub fn is_applicable(&self) -> bool {
        !matches!(self, Self::Noop { .. })
    }

    /// Whether this overwrites or drops a record the user already had
    #[inline]
    #[must_use]
    pub fn is_modifying(&self) -> bool {
        matches!(self, Self::Replace { .. } | Self::Remove { .. })
    }
}

/// Counts of applicable actions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Added records
    pub added: usize,
    /// Replaced records
    pub replaced: usize,
    /// Removed records
    pub removed: usize,
}

impl DiffSummary {
    /// Summarize a diff
    #[must_use]
    pub fn of(diffs: &[EntryDiff]) -> Self {
        diffs.iter().fold(Self::default(), |mut acc, d| {
            match d {
                EntryDiff::Add(_) => acc.added += 1,
                EntryDiff::Replace { .. } => acc.replaced += 1,
                EntryDiff::Remove { .. } => acc.removed += 1,
                EntryDiff::Noop { .. } => {}
            }
            acc
        })
    }

    /// Number of replaced or removed records
    #[inline]
    #[must_use]
    pub fn modifying(&self) -> usize {
        self.replaced + self.removed
    }
}

/// Compute actions that bring `local` in line with `remotes`
#[must_use]
pub fn create_diff(local: &EntityRegistry, remotes: &[RemoteEntry]) -> Vec<EntryDiff> {
    let local_server_ids: HashSet<ServerId> = local.iter().filter_map(|e| e.server_id).collect();
    let remote_by_server_id: HashMap<ServerId, &RemoteEntry> =
        remotes.iter().map(|r| (r.id, r)).collect();
    let remote_by_client_id: HashMap<&ClientId, &RemoteEntry> = remotes
        .iter()
        .filter_map(|r| r.client_id.as_ref().map(|c| (c, r)))
        .collect();

    let mut diffs: Vec<EntryDiff> = remotes
        .iter()
        .filter(|r| {
            !local_server_ids.contains(&r.id)
                && !r.client_id.as_ref().is_some_and(|c| local.contains(c))
        })
        .map(|r| {
            let client_id = r.client_id.clone().unwrap_or_else(ClientId::generate);
            EntryDiff::Add(Entry::from_remote(client_id, r.clone()))
        })
        .collect();

    for entry in local {
        let remote = entry
            .server_id
            .and_then(|id| remote_by_server_id.get(&id))
            .or_else(|| remote_by_client_id.get(&entry.client_id))
            .copied();

        let diff = match (remote, entry.server_id) {
            (Some(r), _) if entry.version_id.map_or(true, |v| v < r.version_id) => {
                EntryDiff::Replace {
                    client_id: entry.client_id.clone(),
                    entry: Entry::from_remote(entry.client_id.clone(), r.clone()),
                }
            }
            (None, Some(server_id)) => EntryDiff::Remove {
                client_id: entry.client_id.clone(),
                server_id,
            },
            _ => EntryDiff::Noop {
                client_id: entry.client_id.clone(),
            },
        };
        diffs.push(diff);
    }

    diffs
}

/// Apply a diff, producing the refreshed registry ordered by `order`
#[must_use]
pub fn apply_diff(local: &EntityRegistry, diffs: Vec<EntryDiff>) -> EntityRegistry {
    let mut next = EntityRegistry::new();
    let mut added = Vec::new();

    for diff in diffs {
        match diff {
            EntryDiff::Add(entry) => added.push(entry),
            EntryDiff::Replace { entry, .. } => next.replace_from_remote(entry),
            EntryDiff::Remove { client_id, server_id } => {
                tracing::debug!(%client_id, %server_id, "entry removed remotely");
            }
            EntryDiff::Noop { client_id } => {
                if let Some(entry) = local.get(&client_id) {
                    if let Err(err) = next.insert(entry.clone()) {
                        tracing::warn!(%err, "duplicate entry in refresh diff");
                    }
                }
            }
        }
    }
    for entry in added {
        next.replace_from_remote(entry);
    }

    next.sort_by_order();
    next
}
