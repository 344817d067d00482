//! Restore points for single-record selection editing
//!
//! A two-state session: either nothing is being edited in isolation, or one
//! record is selected and a by-value snapshot of the whole registry is held.
//!
//! - `create_restore_point`: `NoActiveEdit -> ActiveEdit`
//! - `commit`: `ActiveEdit -> NoActiveEdit`, live registry kept
//! - `restore`: `ActiveEdit -> NoActiveEdit`, live registry rolled back

use crate::ids::ClientId;
use crate::registry::EntityRegistry;

/// Snapshot taken when selection editing begins
#[derive(Debug, Clone, PartialEq)]
pub struct RestorePoint {
    registry: EntityRegistry,
    selected: ClientId,
}

impl RestorePoint {
    /// Record selected for editing
    #[inline]
    #[must_use]
    pub fn selected(&self) -> &ClientId {
        &self.selected
    }

    /// Registry as it was when editing began
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }
}

/// Selection editing state
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SelectionSession {
    /// No record is being edited in isolation
    #[default]
    NoActiveEdit,
    /// One record is being edited; snapshot held
    ActiveEdit(RestorePoint),
}

impl SelectionSession {
    /// Create idle session
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::NoActiveEdit
    }

    /// Check if a selection edit is in progress
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::ActiveEdit(_))
    }

    /// Record currently selected, if any
    #[must_use]
    pub fn selected(&self) -> Option<&ClientId> {
        match self {
            Self::NoActiveEdit => None,
            Self::ActiveEdit(point) => Some(point.selected()),
        }
    }

    /// Snapshot the registry by value and select a record
    ///
    /// Callers must not begin a second edit while one is active; if they do,
    /// the previous snapshot is replaced.
    pub fn create_restore_point(&mut self, registry: &EntityRegistry, selected: ClientId) {
        if let Self::ActiveEdit(previous) = self {
            tracing::warn!(
                previous = %previous.selected,
                next = %selected,
                "restore point replaced while a selection edit was active"
            );
        }
        *self = Self::ActiveEdit(RestorePoint {
            registry: registry.clone(),
            selected,
        });
    }

    /// Drop the snapshot, keeping live changes
    ///
    /// Returns the record that was selected.
    pub fn commit(&mut self) -> Option<ClientId> {
        match std::mem::take(self) {
            Self::NoActiveEdit => None,
            Self::ActiveEdit(point) => Some(point.selected),
        }
    }

    /// Roll the live registry back to the snapshot and drop it
    ///
    /// Returns the record that was selected; no-op when idle.
    pub fn restore(&mut self, registry: &mut EntityRegistry) -> Option<ClientId> {
        match std::mem::take(self) {
            Self::NoActiveEdit => None,
            Self::ActiveEdit(point) => {
                *registry = point.registry;
                Some(point.selected)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttributeData;
    use crate::entry::{Entry, EntryPatch};
    use pretty_assertions::assert_eq;

    fn registry() -> EntityRegistry {
        EntityRegistry::from_entries([Entry::new("a".into()), Entry::new("b".into())])
    }

    #[test]
    fn restore_round_trip_is_exact() {
        let mut live = registry();
        let before = live.clone();
        let mut session = SelectionSession::new();

        session.create_restore_point(&live, ClientId::from("a"));
        live.upsert(
            &ClientId::from("a"),
            &EntryPatch::new().set("w", AttributeData::Text("changed".into())),
        );
        live.remove(&ClientId::from("b"));
        assert_ne!(live, before);

        let selected = session.restore(&mut live);
        assert_eq!(selected, Some(ClientId::from("a")));
        assert_eq!(live, before);
        assert!(!session.is_active());
    }

    #[test]
    fn commit_keeps_live_changes() {
        let mut live = registry();
        let mut session = SelectionSession::new();
        session.create_restore_point(&live, ClientId::from("b"));
        live.upsert(&ClientId::from("b"), &EntryPatch::new().with_excerpt("kept"));

        assert_eq!(session.commit(), Some(ClientId::from("b")));
        assert_eq!(
            live.get(&ClientId::from("b")).unwrap().excerpt.as_deref(),
            Some("kept")
        );
        assert_eq!(session, SelectionSession::NoActiveEdit);
    }

    #[test]
    fn snapshot_is_not_aliased_with_live_registry() {
        let mut live = registry();
        let mut session = SelectionSession::new();
        session.create_restore_point(&live, ClientId::from("a"));
        live.upsert(&ClientId::from("a"), &EntryPatch::new().with_order(9));

        let SelectionSession::ActiveEdit(point) = &session else {
            panic!("expected active edit");
        };
        assert_eq!(point.registry().get(&ClientId::from("a")).unwrap().order, 0);
    }

    #[test]
    fn idle_operations_are_noops() {
        let mut live = registry();
        let before = live.clone();
        let mut session = SelectionSession::new();

        assert_eq!(session.commit(), None);
        assert_eq!(session.restore(&mut live), None);
        assert_eq!(live, before);
        assert!(session.selected().is_none());
    }
}
