//! Result of a save, reported to the UI

use crate::sync::SyncTotals;
use serde::Serialize;

/// What happened to the parent document after the entries were saved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ParentSave {
    /// Saved; the resolver now holds this version
    Saved {
        /// Version returned by the store
        version: u64,
    },
    /// Skipped because some entry failed
    Skipped,
    /// Nothing was sent and the document had no edits
    NotNeeded,
    /// The document save itself failed
    Failed,
}

/// Per-category counts of one save
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveOutcome {
    /// Deletes acknowledged by the store
    pub deletes_succeeded: usize,
    /// Deletes not acknowledged
    pub deletes_failed: usize,
    /// Updates persisted
    pub updates_succeeded: usize,
    /// Updates rejected or unanswered
    pub updates_failed: usize,
    /// Records held back by local validation
    pub local_validation_failed: usize,
    /// Deleted records dropped without a network call
    pub purged_local: usize,
    /// Network calls made
    pub round_trips: usize,
    /// Parent document result
    pub parent: ParentSave,
}

impl SaveOutcome {
    /// Build from reconciliation totals
    #[must_use]
    pub fn from_totals(
        totals: &SyncTotals,
        local_validation_failed: usize,
        purged_local: usize,
    ) -> Self {
        Self {
            deletes_succeeded: totals.deletes_succeeded,
            deletes_failed: totals.deletes_failed,
            updates_succeeded: totals.updates_succeeded,
            updates_failed: totals.updates_failed,
            local_validation_failed,
            purged_local,
            round_trips: totals.round_trips,
            parent: ParentSave::NotNeeded,
        }
    }

    /// With parent document result
    #[inline]
    #[must_use]
    pub fn with_parent(mut self, parent: ParentSave) -> Self {
        self.parent = parent;
        self
    }

    /// All four remote counts are zero, nothing was held back and nothing purged
    #[must_use]
    pub fn did_nothing(&self) -> bool {
        self.purged_local == 0
            && self.deletes_succeeded == 0
            && self.deletes_failed == 0
            && self.updates_succeeded == 0
            && self.updates_failed == 0
            && self.local_validation_failed == 0
    }

    /// Any record failed, locally or remotely
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.deletes_failed > 0 || self.updates_failed > 0 || self.local_validation_failed > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_totals_did_nothing() {
        let outcome = SaveOutcome::from_totals(&SyncTotals::default(), 0, 0);
        assert!(outcome.did_nothing());
        assert!(!outcome.has_failures());
        assert_eq!(outcome.parent, ParentSave::NotNeeded);
    }

    #[test]
    fn local_failures_count_as_failures() {
        let outcome = SaveOutcome::from_totals(&SyncTotals::default(), 2, 0);
        assert!(!outcome.did_nothing());
        assert!(outcome.has_failures());
    }

    #[test]
    fn purging_local_drafts_is_not_nothing() {
        let outcome = SaveOutcome::from_totals(&SyncTotals::default(), 0, 1);
        assert!(!outcome.did_nothing());
        assert!(!outcome.has_failures());
    }

    #[test]
    fn serializes_parent_status() {
        let outcome = SaveOutcome::from_totals(&SyncTotals::default(), 0, 0)
            .with_parent(ParentSave::Saved { version: 4 });
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["parent"]["status"], "saved");
        assert_eq!(json["parent"]["version"], 4);
    }
}
