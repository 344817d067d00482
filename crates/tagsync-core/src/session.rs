//! Editing session facade
//!
//! [`EditingSession`] is what the UI talks to. It owns the registry, the
//! per-entry errors, the selection restore point and the parent document
//! state, and drives the synchronizer and the version resolver.
//!
//! All mutation goes through `&mut self`, so one session never has two saves
//! or a save and an edit in flight at once. Independent sessions share
//! nothing mutable and may run concurrently.

use crate::context::SessionContext;
use crate::error::SyncError;
use crate::notify::{entries, NotifyKind};
use crate::outcome::{ParentSave, SaveOutcome};
use crate::remote::{Document, DocumentFields, DocumentStore, RemoteStore};
use crate::sync::{persisted_ids, ChunkedSynchronizer, SyncBatch};
use crate::version::{VersionCheck, VersionResolver};
use std::sync::Arc;
use tagsync_model::{
    apply_diff, apply_to_all, create_diff, ClientId, Deletion, DiffSummary, DocumentId,
    EntityRegistry, EntryErrors, EntryPatch, EntryStatus, ErrorOrigin, SaveKind,
    SelectionSession, WidgetId,
};
use tracing::{debug, info, warn};

/// Parent document as seen by this session
#[derive(Debug, Clone, PartialEq)]
struct DocumentState {
    id: DocumentId,
    fields: DocumentFields,
    pristine: bool,
    resolver: VersionResolver,
}

/// Work frozen at the start of a save
struct PreparedSave {
    batch: SyncBatch,
    local_validation_failed: usize,
    purged_local: usize,
}

/// One user's editing session over one document's entries
pub struct EditingSession {
    context: SessionContext,
    remote: Arc<dyn RemoteStore>,
    documents: Arc<dyn DocumentStore>,
    synchronizer: ChunkedSynchronizer,
    registry: EntityRegistry,
    errors: EntryErrors,
    selection: SelectionSession,
    document: DocumentState,
}

impl EditingSession {
    /// Create session for a document; nothing is loaded yet
    #[must_use]
    pub fn new(
        context: SessionContext,
        remote: Arc<dyn RemoteStore>,
        documents: Arc<dyn DocumentStore>,
        document_id: DocumentId,
    ) -> Self {
        let synchronizer = ChunkedSynchronizer::from_config(context.config());
        Self {
            context,
            remote,
            documents,
            synchronizer,
            registry: EntityRegistry::new(),
            errors: EntryErrors::new(),
            selection: SelectionSession::new(),
            document: DocumentState {
                id: document_id,
                fields: DocumentFields::new(),
                pristine: true,
                resolver: VersionResolver::new(),
            },
        }
    }

    /// With a cached document version
    #[inline]
    #[must_use]
    pub fn with_version(mut self, version: u64) -> Self {
        self.document.resolver = VersionResolver::with_version(version);
        self
    }

    /// With an initial registry
    #[inline]
    #[must_use]
    pub fn with_registry(mut self, registry: EntityRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Session context
    #[inline]
    #[must_use]
    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Session context, for view state such as comment counts
    #[inline]
    pub fn context_mut(&mut self) -> &mut SessionContext {
        &mut self.context
    }

    /// Live registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Per-entry errors
    #[inline]
    #[must_use]
    pub fn errors(&self) -> &EntryErrors {
        &self.errors
    }

    /// Selection editing state
    #[inline]
    #[must_use]
    pub fn selection(&self) -> &SelectionSession {
        &self.selection
    }

    /// Cached document version
    #[inline]
    #[must_use]
    pub fn local_version(&self) -> Option<u64> {
        self.document.resolver.local_version()
    }

    /// Document fields
    #[inline]
    #[must_use]
    pub fn document_fields(&self) -> &DocumentFields {
        &self.document.fields
    }

    /// Edit a document field
    pub fn set_document_field(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.document.fields.insert(key.into(), value);
        self.document.pristine = false;
    }

    /// No unsaved edits to the document or its entries
    #[must_use]
    pub fn is_pristine(&self) -> bool {
        self.document.pristine && !self.registry.has_pending_changes()
    }

    /// Status of an entry
    ///
    /// `saving` is the caller's knowledge that a save is in flight; only
    /// records that are part of a save show as requesting.
    #[must_use]
    pub fn entry_status(&self, client_id: &ClientId, saving: bool) -> Option<EntryStatus> {
        let entry = self.registry.get(client_id)?;
        let pending = saving && entry.save_kind().is_some();
        Some(tagsync_model::entry_status(
            entry,
            self.errors.get(client_id),
            pending,
        ))
    }

    /// Create a new entry from an initial patch
    pub fn create_entry(&mut self, initial: EntryPatch) -> ClientId {
        let client_id = ClientId::generate();
        self.registry.upsert(&client_id, &initial);
        debug!(client_id = %client_id, "entry created");
        client_id
    }

    /// Apply a user edit to an existing entry
    ///
    /// Returns `false` (and logs) if the entry does not exist.
    pub fn edit_entry(&mut self, client_id: &ClientId, patch: &EntryPatch) -> bool {
        if !self.registry.contains(client_id) {
            warn!(client_id = %client_id, "edit of unknown entry ignored");
            return false;
        }
        let entry = self.registry.upsert(client_id, patch);

        self.errors.clear_remote(client_id);
        if self
            .errors
            .get(client_id)
            .is_some_and(|slot| slot.origin == ErrorOrigin::Local)
        {
            let result = self
                .context
                .validator()
                .validate(entry.to_payload(), self.context.framework());
            match result {
                Ok(_) => {
                    self.errors.clear(client_id);
                }
                Err(tree) => self.errors.set(client_id.clone(), tree, ErrorOrigin::Local),
            }
        }
        true
    }

    /// Soft-delete an entry
    pub fn delete_entry(&mut self, client_id: &ClientId) -> Option<Deletion> {
        self.commit_selection();
        match self.registry.mark_deleted(client_id) {
            Ok(deletion) => Some(deletion),
            Err(e) => {
                warn!(error = %e, "delete ignored");
                None
            }
        }
    }

    /// Undo a soft delete that has not been saved yet
    pub fn restore_entry(&mut self, client_id: &ClientId) -> bool {
        self.commit_selection();
        match self.registry.restore(client_id) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "restore ignored");
                false
            }
        }
    }

    /// Start editing one entry in isolation
    pub fn begin_selection_edit(&mut self, client_id: &ClientId) -> bool {
        if !self.registry.contains(client_id) {
            warn!(client_id = %client_id, "selection of unknown entry ignored");
            return false;
        }
        self.selection
            .create_restore_point(&self.registry, client_id.clone());
        true
    }

    /// Keep the edits made since the selection began
    pub fn approve_selection_edit(&mut self) -> Option<ClientId> {
        self.selection.commit()
    }

    /// Roll the registry back to when the selection began
    pub fn discard_selection_edit(&mut self) -> Option<ClientId> {
        let selected = self.selection.restore(&mut self.registry)?;
        let registry = &self.registry;
        self.errors.retain(|id| registry.contains(id));
        Some(selected)
    }

    /// Copy one entry's value for a widget onto its siblings
    pub fn apply_to_all(
        &mut self,
        source: &ClientId,
        widget_id: &WidgetId,
        below_only: bool,
    ) -> Vec<ClientId> {
        let changed = apply_to_all(&mut self.registry, source, widget_id, below_only);
        for id in &changed {
            self.errors.clear_remote(id);
        }
        changed
    }

    fn commit_selection(&mut self) {
        if let Some(selected) = self.selection.commit() {
            debug!(client_id = %selected, "selection edit committed");
        }
    }

    /// Save every pending delete and update, then the parent document
    ///
    /// Commits any active selection edit first.
    ///
    /// # Errors
    /// - `SyncError::Transport` if any chunk failed at the transport level;
    ///   no record state changed and everything can be retried
    pub async fn save(&mut self) -> Result<SaveOutcome, SyncError> {
        self.commit_selection();
        let PreparedSave {
            batch,
            local_validation_failed,
            purged_local,
        } = self.prepare_save();
        let sent_anything = !batch.is_empty();

        let drained = match self
            .synchronizer
            .drain(self.remote.as_ref(), batch)
            .await
        {
            Ok(drained) => drained,
            Err(e) => {
                self.context.notifier().notify(
                    NotifyKind::Error,
                    "Failed to save entries",
                    &e.to_string(),
                );
                return Err(SyncError::Transport(e));
            }
        };

        let totals = drained.reconcile(
            &mut self.registry,
            &mut self.errors,
            self.context.validator(),
            self.context.framework(),
        );
        let persisted = persisted_ids(&self.registry);
        self.context
            .retain_comment_counts(|id| persisted.contains(&id));

        let outcome = SaveOutcome::from_totals(&totals, local_validation_failed, purged_local);
        self.notify_outcome(&outcome);

        let parent = if outcome.has_failures() {
            info!(failures = totals.failures(), "document save skipped");
            ParentSave::Skipped
        } else if !sent_anything && self.document.pristine {
            ParentSave::NotNeeded
        } else {
            self.save_parent().await
        };

        let outcome = outcome.with_parent(parent);
        info!(
            deletes_succeeded = outcome.deletes_succeeded,
            deletes_failed = outcome.deletes_failed,
            updates_succeeded = outcome.updates_succeeded,
            updates_failed = outcome.updates_failed,
            local_validation_failed = outcome.local_validation_failed,
            round_trips = outcome.round_trips,
            "save finished"
        );
        Ok(outcome)
    }

    fn prepare_save(&mut self) -> PreparedSave {
        let purged = self.registry.purge_unsaved_deleted();
        for id in &purged {
            self.errors.clear(id);
        }

        let validate = self.context.config().validate_before_save;
        let mut deletes = Vec::new();
        let mut updates = Vec::new();
        let mut local_validation_failed = 0;

        for (entry, kind) in self.registry.filter_savable() {
            match kind {
                SaveKind::Delete(server_id) => deletes.push((server_id, entry.client_id.clone())),
                SaveKind::Update if !validate => updates.push(entry.to_payload()),
                SaveKind::Update => {
                    let result = self
                        .context
                        .validator()
                        .validate(entry.to_payload(), self.context.framework());
                    match result {
                        Ok(cleaned) => updates.push(cleaned),
                        Err(tree) => {
                            self.errors
                                .set(entry.client_id.clone(), tree, ErrorOrigin::Local);
                            local_validation_failed += 1;
                        }
                    }
                }
            }
        }

        if local_validation_failed > 0 {
            debug!(local_validation_failed, "entries held back by validation");
        }

        PreparedSave {
            batch: SyncBatch::new(deletes, updates),
            local_validation_failed,
            purged_local: purged.len(),
        }
    }

    fn notify_outcome(&self, outcome: &SaveOutcome) {
        let notifier = self.context.notifier();
        if outcome.did_nothing() {
            if self.context.config().notify_did_nothing {
                notifier.notify(NotifyKind::Info, "Nothing to save", "There were no changes to save");
            }
            return;
        }
        if outcome.deletes_succeeded > 0 {
            notifier.notify(
                NotifyKind::Success,
                "Entries deleted",
                &format!("Successfully deleted {}", entries(outcome.deletes_succeeded)),
            );
        }
        if outcome.deletes_failed > 0 {
            notifier.notify(
                NotifyKind::Error,
                "Failed to delete entries",
                &format!("Failed to delete {}", entries(outcome.deletes_failed)),
            );
        }
        if outcome.updates_succeeded > 0 {
            notifier.notify(
                NotifyKind::Success,
                "Entries saved",
                &format!("Successfully saved {}", entries(outcome.updates_succeeded)),
            );
        }
        if outcome.updates_failed > 0 {
            notifier.notify(
                NotifyKind::Error,
                "Failed to save entries",
                &format!("Failed to save {}", entries(outcome.updates_failed)),
            );
        }
        if outcome.local_validation_failed > 0 {
            notifier.notify(
                NotifyKind::Error,
                "Invalid entries",
                &format!(
                    "{} could not be saved because of validation errors",
                    entries(outcome.local_validation_failed)
                ),
            );
        }
    }

    async fn save_parent(&mut self) -> ParentSave {
        let result = self
            .documents
            .save_document(self.document.id, self.document.fields.clone())
            .await;
        match result {
            Ok(document) => {
                self.document.resolver.accept(document.version);
                self.document.fields = document.fields;
                self.document.pristine = true;
                debug!(version = document.version, "document saved");
                ParentSave::Saved {
                    version: document.version,
                }
            }
            Err(e) => {
                warn!(error = %e, "document save failed");
                self.context.notifier().notify(
                    NotifyKind::Error,
                    "Failed to save document",
                    &e.to_string(),
                );
                ParentSave::Failed
            }
        }
    }

    /// Load (or refresh) the parent document and its entries
    ///
    /// Remote data is always accepted. If the remote version moved ahead
    /// while the user had unsaved edits, one warning is shown.
    ///
    /// # Errors
    /// - `SyncError::DocumentLoad` if the store call failed; nothing changed
    pub async fn load_document(&mut self) -> Result<VersionCheck, SyncError> {
        let document = match self.documents.load_document(self.document.id).await {
            Ok(document) => document,
            Err(e) => {
                self.context.notifier().notify(
                    NotifyKind::Error,
                    "Failed to load document",
                    &e.to_string(),
                );
                return Err(SyncError::DocumentLoad(e));
            }
        };

        let check = self.document.resolver.check(document.version);
        let was_pristine = self.is_pristine();

        if check.should_set_value {
            self.accept_document(document);
        }
        if check.is_value_overridden && !was_pristine {
            self.context.notifier().notify(
                NotifyKind::Warning,
                "Data was overridden",
                "This document was changed elsewhere and your unsaved edits were replaced",
            );
        }
        self.document.pristine = true;
        Ok(check)
    }

    fn accept_document(&mut self, document: Document) {
        let Document {
            version,
            fields,
            entries,
            ..
        } = document;
        self.document.resolver.accept(version);
        self.document.fields = fields;

        let diffs = create_diff(&self.registry, &entries);
        let summary = DiffSummary::of(&diffs);
        if diffs.iter().any(|d| d.is_modifying()) && self.selection.is_active() {
            self.commit_selection();
        }
        self.registry = apply_diff(&self.registry, diffs);

        let registry = &self.registry;
        self.errors.retain(|id| registry.contains(id));
        let persisted = persisted_ids(&self.registry);
        self.context
            .retain_comment_counts(|id| persisted.contains(&id));

        debug!(
            version,
            added = summary.added,
            replaced = summary.replaced,
            removed = summary.removed,
            "document accepted"
        );
    }
}

impl std::fmt::Debug for EditingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditingSession")
            .field("context", &self.context)
            .field("synchronizer", &self.synchronizer)
            .field("entries", &self.registry.len())
            .field("errors", &self.errors.len())
            .field("selection_active", &self.selection.is_active())
            .field("document", &self.document.id)
            .finish_non_exhaustive()
    }
}
