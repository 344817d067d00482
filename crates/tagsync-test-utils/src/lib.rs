//! Testing utilities for the tagsync workspace
//!
//! Shared fixtures, a recording notifier, and session builders.

#![allow(missing_docs)]

use parking_lot::Mutex;
use std::sync::Arc;
use tagsync_core::test_harness::InMemoryStore;
use tagsync_core::{EditingSession, Notifier, NotifyKind, SessionContext, SyncConfig};
use tagsync_model::{
    AttributeData, ClientId, DocumentId, EntityRegistry, Entry, EntryPatch, Framework,
    RemoteEntry, ServerId, Widget, WidgetKind,
};

pub const DOCUMENT_ID: DocumentId = DocumentId(1);

/// Framework with one required scale, one bounded number and one text widget
pub fn test_framework() -> Framework {
    Framework::new(1, "test")
        .with_widget(
            Widget::new(
                "sector",
                "Sector",
                WidgetKind::Scale {
                    options: vec!["health".into(), "shelter".into()],
                },
            )
            .required(),
        )
        .with_widget(Widget::new(
            "severity",
            "Severity",
            WidgetKind::Number {
                min: Some(0.0),
                max: Some(5.0),
            },
        ))
        .with_widget(Widget::new("note", "Note", WidgetKind::Text))
}

pub fn sector(value: &str) -> AttributeData {
    AttributeData::Scale(value.to_string())
}

/// Patch that passes validation against [`test_framework`]
pub fn valid_patch(order: i64) -> EntryPatch {
    EntryPatch::new()
        .with_order(order)
        .set("sector", sector("health"))
}

/// Clean, persisted entry
pub fn persisted_entry(client_id: &str, server_id: u64) -> Entry {
    let mut entry = Entry::new(ClientId::from(client_id));
    entry.server_id = Some(ServerId(server_id));
    entry.version_id = Some(1);
    entry.set_attribute(&"sector".into(), sector("health"));
    entry
}

/// Persisted entry with unsaved edits
pub fn stale_entry(client_id: &str, server_id: u64) -> Entry {
    let mut entry = persisted_entry(client_id, server_id);
    entry.stale = true;
    entry
}

/// Never-saved entry
pub fn new_entry(client_id: &str) -> Entry {
    let mut entry = Entry::new(ClientId::from(client_id));
    entry.set_attribute(&"sector".into(), sector("health"));
    entry.stale = true;
    entry
}

/// Remote record as another client would have saved it
pub fn remote_entry(server_id: u64, client_id: &str, version_id: u64, order: i64) -> RemoteEntry {
    RemoteEntry {
        id: ServerId(server_id),
        client_id: Some(ClientId::from(client_id)),
        version_id,
        order,
        excerpt: None,
        attributes: vec![],
        created_at: None,
        modified_at: None,
        created_by: None,
    }
}

pub fn registry_of(entries: impl IntoIterator<Item = Entry>) -> EntityRegistry {
    EntityRegistry::from_entries(entries)
}

/// Notification as recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NotifyKind,
    pub title: String,
    pub message: String,
}

/// Notifier that keeps every notification
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    pub fn count(&self, kind: NotifyKind) -> usize {
        self.notices.lock().iter().filter(|n| n.kind == kind).count()
    }

    pub fn titles(&self) -> Vec<String> {
        self.notices.lock().iter().map(|n| n.title.clone()).collect()
    }

    pub fn clear(&self) {
        self.notices.lock().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: NotifyKind, title: &str, message: &str) {
        self.notices.lock().push(Notice {
            kind,
            title: title.to_string(),
            message: message.to_string(),
        });
    }
}

/// Session wired to an in-memory store and a recording notifier
pub struct Harness {
    pub session: EditingSession,
    pub store: Arc<InMemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub fn new(config: SyncConfig) -> Self {
        Self::with_store(config, InMemoryStore::new(DOCUMENT_ID))
    }

    pub fn with_store(config: SyncConfig, store: InMemoryStore) -> Self {
        let store = Arc::new(store);
        let notifier = RecordingNotifier::new();
        let context = SessionContext::new(test_framework())
            .with_config(config)
            .with_notifier(notifier.clone());
        let session = EditingSession::new(context, store.clone(), store.clone(), DOCUMENT_ID);
        Self {
            session,
            store,
            notifier,
        }
    }
}
