//! In-memory remote store with fault injection
//!
//! Implements both [`RemoteStore`] and [`DocumentStore`]. Every batch call is
//! recorded so tests can assert on chunking. Faults can be injected
//! deterministically (reject a client id, fail the next N calls) or randomly
//! from a seeded generator.
//!
//! Retries after an aborted save are safe: a create whose client id is
//! already stored updates that entry, and deleting an already deleted id is
//! acknowledged again.

use crate::error::TransportError;
use crate::remote::{
    BatchRequest, BatchResponse, DeletedAck, Document, DocumentFields, DocumentStore,
    RemoteStore,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::{BTreeMap, HashSet};
use tagsync_model::{ClientId, DocumentId, EntryPayload, ErrorTree, RemoteEntry, ServerId};

/// Seeded random faults
#[derive(Debug)]
struct RandomFaults {
    rng: StdRng,
    rejection_rate: f64,
    transport_failure_rate: f64,
}

#[derive(Debug)]
struct StoreState {
    document_id: DocumentId,
    document_version: u64,
    fields: DocumentFields,
    entries: BTreeMap<ServerId, RemoteEntry>,
    tombstones: HashSet<ServerId>,
    next_server_id: u64,
    calls: Vec<BatchRequest>,
    document_saves: usize,
    rejected: HashSet<ClientId>,
    fail_next: usize,
    fail_calls: HashSet<usize>,
    random: Option<RandomFaults>,
}

/// Remote store kept in memory
#[derive(Debug)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    /// Create store holding one empty document at version 1
    #[must_use]
    pub fn new(document_id: DocumentId) -> Self {
        Self {
            state: Mutex::new(StoreState {
                document_id,
                document_version: 1,
                fields: DocumentFields::new(),
                entries: BTreeMap::new(),
                tombstones: HashSet::new(),
                next_server_id: 1,
                calls: Vec::new(),
                document_saves: 0,
                rejected: HashSet::new(),
                fail_next: 0,
                fail_calls: HashSet::new(),
                random: None,
            }),
        }
    }

    /// With seeded random faults; rates are clamped to `[0, 1]`
    #[must_use]
    pub fn with_random_faults(
        self,
        seed: u64,
        rejection_rate: f64,
        transport_failure_rate: f64,
    ) -> Self {
        self.state.lock().random = Some(RandomFaults {
            rng: StdRng::seed_from_u64(seed),
            rejection_rate: rejection_rate.clamp(0.0, 1.0),
            transport_failure_rate: transport_failure_rate.clamp(0.0, 1.0),
        });
        self
    }

    /// With a starting document version
    #[must_use]
    pub fn with_document_version(self, version: u64) -> Self {
        self.state.lock().document_version = version;
        self
    }

    /// Reject every update for this client id
    pub fn reject_client(&self, client_id: ClientId) {
        self.state.lock().rejected.insert(client_id);
    }

    /// Stop rejecting a client id
    pub fn accept_client(&self, client_id: &ClientId) {
        self.state.lock().rejected.remove(client_id);
    }

    /// Fail the next `n` batch calls at the transport level
    pub fn fail_next_batches(&self, n: usize) {
        self.state.lock().fail_next = n;
    }

    /// Fail the n-th batch call (1-based, counted over the store's lifetime)
    pub fn fail_call_number(&self, n: usize) {
        self.state.lock().fail_calls.insert(n);
    }

    /// Store an entry as if another client had saved it
    pub fn insert_remote_entry(&self, mut entry: RemoteEntry) -> ServerId {
        let mut state = self.state.lock();
        if entry.id.0 == 0 {
            entry.id = ServerId(state.next_server_id);
        }
        state.next_server_id = state.next_server_id.max(entry.id.0 + 1);
        let id = entry.id;
        state.entries.insert(id, entry);
        id
    }

    /// Delete an entry as if another client had deleted it
    pub fn remove_remote_entry(&self, id: ServerId) -> Option<RemoteEntry> {
        self.state.lock().entries.remove(&id)
    }

    /// Advance the document version as if another client had saved it
    pub fn bump_document_version(&self) -> u64 {
        let mut state = self.state.lock();
        state.document_version += 1;
        state.document_version
    }

    /// Every batch received, in order
    #[must_use]
    pub fn batch_calls(&self) -> Vec<BatchRequest> {
        self.state.lock().calls.clone()
    }

    /// Number of batch calls received
    #[must_use]
    pub fn batch_call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    /// Number of successful document saves
    #[must_use]
    pub fn document_saves(&self) -> usize {
        self.state.lock().document_saves
    }

    /// Current document version
    #[must_use]
    pub fn document_version(&self) -> u64 {
        self.state.lock().document_version
    }

    /// Stored entry by server id
    #[must_use]
    pub fn entry(&self, id: ServerId) -> Option<RemoteEntry> {
        self.state.lock().entries.get(&id).cloned()
    }

    /// Number of stored entries
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.state.lock().entries.len()
    }
}

impl StoreState {
    fn roll_transport_failure(&mut self) -> bool {
        if self.fail_calls.contains(&self.calls.len()) {
            return true;
        }
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return true;
        }
        self.random
            .as_mut()
            .is_some_and(|r| r.rng.random_bool(r.transport_failure_rate))
    }

    fn roll_rejection(&mut self, client_id: &ClientId) -> bool {
        self.rejected.contains(client_id)
            || self
                .random
                .as_mut()
                .is_some_and(|r| r.rng.random_bool(r.rejection_rate))
    }

    fn apply_update(&mut self, payload: EntryPayload) -> (Option<ErrorTree>, Option<RemoteEntry>) {
        if self.roll_rejection(&payload.client_id) {
            return (Some(ErrorTree::message("rejected by server")), None);
        }

        let known_id = payload.id.or_else(|| {
            self.entries
                .values()
                .find(|e| e.client_id.as_ref() == Some(&payload.client_id))
                .map(|e| e.id)
        });
        let existing = known_id.and_then(|id| self.entries.get(&id));
        if known_id.is_some() && existing.is_none() {
            return (Some(ErrorTree::message("entry no longer exists")), None);
        }
        let version_id = existing.map_or(1, |e| e.version_id + 1);
        let created_at = existing.and_then(|e| e.created_at);

        let id = known_id.unwrap_or_else(|| {
            let id = ServerId(self.next_server_id);
            self.next_server_id += 1;
            id
        });

        let saved = RemoteEntry {
            id,
            client_id: Some(payload.client_id),
            version_id,
            order: payload.order,
            excerpt: payload.excerpt,
            attributes: payload.attributes,
            created_at,
            modified_at: None,
            created_by: Some("harness".to_string()),
        };
        self.entries.insert(id, saved.clone());
        (None, Some(saved))
    }

    fn delete(&mut self, id: ServerId) -> Option<DeletedAck> {
        if self.entries.remove(&id).is_some() || self.tombstones.contains(&id) {
            self.tombstones.insert(id);
            Some(DeletedAck {})
        } else {
            None
        }
    }

    fn document(&self) -> Document {
        let mut entries: Vec<RemoteEntry> = self.entries.values().cloned().collect();
        entries.sort_by_key(|e| e.order);
        Document {
            id: self.document_id,
            version: self.document_version,
            fields: self.fields.clone(),
            entries,
        }
    }
}

#[async_trait]
impl RemoteStore for InMemoryStore {
    async fn submit_batch(&self, request: BatchRequest) -> Result<BatchResponse, TransportError> {
        let mut state = self.state.lock();
        state.calls.push(request.clone());

        if state.roll_transport_failure() {
            return Err(TransportError::Request("injected transport failure".to_string()));
        }

        let deleted_result = request
            .delete_ids
            .iter()
            .map(|id| state.delete(*id))
            .collect();

        let mut errors = Vec::with_capacity(request.updates.len());
        let mut result = Vec::with_capacity(request.updates.len());
        for payload in request.updates {
            let (error, saved) = state.apply_update(payload);
            errors.push(error);
            result.push(saved);
        }

        Ok(BatchResponse {
            errors,
            result,
            deleted_result,
        })
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn load_document(&self, id: DocumentId) -> Result<Document, TransportError> {
        let state = self.state.lock();
        if id != state.document_id {
            return Err(TransportError::NotFound(id));
        }
        Ok(state.document())
    }

    async fn save_document(
        &self,
        id: DocumentId,
        fields: DocumentFields,
    ) -> Result<Document, TransportError> {
        let mut state = self.state.lock();
        if id != state.document_id {
            return Err(TransportError::NotFound(id));
        }
        state.fields = fields;
        state.document_version += 1;
        state.document_saves += 1;
        Ok(state.document())
    }
}
