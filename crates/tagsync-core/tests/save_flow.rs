use pretty_assertions::assert_eq;
use tagsync_core::test_harness::InMemoryStore;
use tagsync_core::{NotifyKind, ParentSave, SyncConfig, SyncError};
use tagsync_model::{
    AttributeData, ClientId, EntryPatch, EntryStatus, ErrorOrigin, ServerId, ATTRIBUTES_FIELD,
};
use tagsync_test_utils::{
    new_entry, persisted_entry, registry_of, remote_entry, stale_entry, valid_patch, Harness,
    DOCUMENT_ID,
};

#[tokio::test]
async fn second_save_without_edits_sends_nothing() {
    let mut h = Harness::new(SyncConfig::default());
    for i in 0..3 {
        h.session.create_entry(valid_patch(i));
    }

    let first = h.session.save().await.unwrap();
    assert_eq!(first.updates_succeeded, 3);
    assert_eq!(h.store.batch_call_count(), 1);

    let second = h.session.save().await.unwrap();
    assert!(second.did_nothing());
    assert_eq!(second.round_trips, 0);
    assert_eq!(second.parent, ParentSave::NotNeeded);
    assert_eq!(h.store.batch_call_count(), 1);
    assert_eq!(h.notifier.count(NotifyKind::Info), 1);
}

#[tokio::test]
async fn application_error_does_not_abort_the_batch() {
    let mut h = Harness::new(SyncConfig::default());
    let ids: Vec<ClientId> = (0..3).map(|i| h.session.create_entry(valid_patch(i))).collect();
    h.store.reject_client(ids[1].clone());

    let outcome = h.session.save().await.unwrap();

    assert_eq!(outcome.updates_succeeded, 2);
    assert_eq!(outcome.updates_failed, 1);
    assert_eq!(outcome.parent, ParentSave::Skipped);
    assert_eq!(h.store.document_saves(), 0);

    let registry = h.session.registry();
    assert!(!registry.get(&ids[0]).unwrap().stale);
    assert!(registry.get(&ids[1]).unwrap().stale);
    assert!(!registry.get(&ids[2]).unwrap().stale);

    let slot = h.session.errors().get(&ids[1]).unwrap();
    assert_eq!(slot.origin, ErrorOrigin::Remote);
    assert_eq!(
        h.session.entry_status(&ids[1], false),
        Some(EntryStatus::ServerError)
    );
    assert_eq!(h.notifier.count(NotifyKind::Error), 1);
    assert_eq!(h.notifier.count(NotifyKind::Success), 1);
}

#[tokio::test]
async fn transport_failure_commits_nothing() {
    let mut h = Harness::new(SyncConfig::default());
    let ids: Vec<ClientId> = (0..3).map(|i| h.session.create_entry(valid_patch(i))).collect();
    h.store.fail_next_batches(1);

    let err = h.session.save().await.unwrap_err();

    assert!(err.is_transport());
    assert!(matches!(err, SyncError::Transport(_)));
    for id in &ids {
        let entry = h.session.registry().get(id).unwrap();
        assert!(entry.stale);
        assert!(entry.server_id.is_none());
        assert!(h.session.errors().get(id).is_none());
    }
    assert_eq!(h.notifier.titles(), vec!["Failed to save entries".to_string()]);

    // Retrying the whole save works
    let outcome = h.session.save().await.unwrap();
    assert_eq!(outcome.updates_succeeded, 3);
}

#[tokio::test]
async fn transport_failure_mid_batch_discards_earlier_chunks() {
    let mut h = Harness::new(SyncConfig::new().with_chunk_lens(1, 1));
    let ids: Vec<ClientId> = (0..3).map(|i| h.session.create_entry(valid_patch(i))).collect();
    h.store.fail_call_number(2);

    assert!(h.session.save().await.is_err());

    // The store applied the first chunk, the registry did not
    assert_eq!(h.store.batch_call_count(), 2);
    assert_eq!(h.store.entry_count(), 1);
    assert!(ids
        .iter()
        .all(|id| h.session.registry().get(id).unwrap().stale));

    let outcome = h.session.save().await.unwrap();
    assert_eq!(outcome.updates_succeeded, 3);
    assert_eq!(outcome.round_trips, 3);
    assert_eq!(h.store.entry_count(), 3);
}

#[tokio::test]
async fn end_to_end_delete_and_update_in_one_call() {
    let store = InMemoryStore::new(DOCUMENT_ID).with_document_version(3);
    store.insert_remote_entry(remote_entry(10, "e1", 1, 0));
    store.insert_remote_entry(remote_entry(11, "e2", 1, 1));

    let mut h = Harness::with_store(SyncConfig::new().with_chunk_lens(1, 1), store);
    let e1 = ClientId::from("e1");
    let e2 = ClientId::from("e2");
    let mut removed = persisted_entry("e2", 11);
    removed.deleted = true;
    h.session = h
        .session
        .with_version(3)
        .with_registry(registry_of([stale_entry("e1", 10), removed]));

    let outcome = h.session.save().await.unwrap();

    let calls = h.store.batch_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].delete_ids, vec![ServerId(11)]);
    assert_eq!(calls[0].updates.len(), 1);
    assert_eq!(calls[0].updates[0].client_id, e1);

    assert_eq!(outcome.updates_succeeded, 1);
    assert_eq!(outcome.deletes_succeeded, 1);
    assert!(!outcome.has_failures());
    assert_eq!(outcome.parent, ParentSave::Saved { version: 4 });
    assert_eq!(h.session.local_version(), Some(4));

    assert!(!h.session.registry().get(&e1).unwrap().stale);
    assert!(!h.session.registry().contains(&e2));
    assert!(h.session.errors().is_empty());
    assert_eq!(h.store.document_saves(), 1);
}

#[tokio::test]
async fn local_validation_holds_back_invalid_entries() {
    let mut h = Harness::new(SyncConfig::default());
    let valid = h.session.create_entry(valid_patch(0));
    let invalid = h.session.create_entry(
        EntryPatch::new()
            .with_order(1)
            .set("severity", AttributeData::Number(9.0)),
    );

    let outcome = h.session.save().await.unwrap();

    assert_eq!(outcome.local_validation_failed, 1);
    assert_eq!(outcome.updates_succeeded, 1);
    assert_eq!(outcome.parent, ParentSave::Skipped);

    let calls = h.store.batch_calls();
    assert_eq!(calls[0].updates.len(), 1);
    assert_eq!(calls[0].updates[0].client_id, valid);

    let slot = h.session.errors().get(&invalid).unwrap();
    assert_eq!(slot.origin, ErrorOrigin::Local);
    let attributes = slot.tree.field(ATTRIBUTES_FIELD).unwrap();
    assert!(attributes.field("sector").is_some());
    assert!(attributes.field("severity").is_some());
    assert_eq!(
        h.session.entry_status(&invalid, false),
        Some(EntryStatus::LocalError)
    );

    // Fixing the entry clears the local error on edit
    let fixed = EntryPatch::new()
        .set("severity", AttributeData::Number(2.0))
        .set("sector", AttributeData::Scale("shelter".into()));
    assert!(h.session.edit_entry(&invalid, &fixed));
    assert!(h.session.errors().get(&invalid).is_none());

    let outcome = h.session.save().await.unwrap();
    assert_eq!(outcome.updates_succeeded, 1);
    assert!(matches!(outcome.parent, ParentSave::Saved { .. }));
}

#[tokio::test]
async fn unsaved_deleted_entries_are_purged_without_network() {
    let mut h = Harness::new(SyncConfig::default());
    h.session = h.session.with_registry(registry_of([new_entry("draft")]));
    let draft = ClientId::from("draft");

    h.session.delete_entry(&draft);
    assert!(h.session.restore_entry(&draft));
    assert!(!h.session.registry().get(&draft).unwrap().deleted);

    h.session.delete_entry(&draft);
    let outcome = h.session.save().await.unwrap();

    assert_eq!(outcome.purged_local, 1);
    assert_eq!(outcome.round_trips, 0);
    assert!(!h.session.registry().contains(&draft));
    assert_eq!(h.store.batch_call_count(), 0);
    assert_eq!(h.notifier.count(NotifyKind::Info), 0);
}

#[tokio::test]
async fn edit_clears_remote_error() {
    let mut h = Harness::new(SyncConfig::default());
    let id = h.session.create_entry(valid_patch(0));
    h.store.reject_client(id.clone());
    h.session.save().await.unwrap();
    assert!(h.session.errors().get(&id).is_some());

    h.session
        .edit_entry(&id, &EntryPatch::new().with_excerpt("rephrased"));
    assert!(h.session.errors().get(&id).is_none());
    assert_eq!(
        h.session.entry_status(&id, false),
        Some(EntryStatus::NonPristine)
    );
    assert_eq!(
        h.session.entry_status(&id, true),
        Some(EntryStatus::Requesting)
    );
}

#[tokio::test]
async fn document_edits_alone_trigger_parent_save() {
    let mut h = Harness::new(SyncConfig::default());
    h.session
        .set_document_field("title", serde_json::json!("Flood assessment"));

    let outcome = h.session.save().await.unwrap();

    assert_eq!(outcome.round_trips, 0);
    assert_eq!(outcome.parent, ParentSave::Saved { version: 2 });
    assert!(h.session.is_pristine());
    assert_eq!(h.store.batch_call_count(), 0);
}

#[tokio::test]
async fn comment_counts_follow_deleted_entries() {
    let store = InMemoryStore::new(DOCUMENT_ID);
    store.insert_remote_entry(remote_entry(5, "kept", 1, 0));
    store.insert_remote_entry(remote_entry(6, "gone", 1, 1));
    let mut h = Harness::with_store(SyncConfig::default(), store);
    h.session.load_document().await.unwrap();

    h.session.context_mut().set_comment_count(ServerId(5), 2);
    h.session.context_mut().set_comment_count(ServerId(6), 3);
    h.session.delete_entry(&ClientId::from("gone"));
    h.session.save().await.unwrap();

    assert_eq!(h.session.context().comment_count(ServerId(5)), 2);
    assert_eq!(h.session.context().comment_count(ServerId(6)), 0);
}
