//! Chunked bulk synchronizer
//!
//! A save is split into three phases:
//! 1. Freeze: pending delete ids and update payloads are captured once in a
//!    [`SyncBatch`]
//! 2. Drain: chunks are submitted strictly one after another; each response
//!    is appended to the batch's accumulators
//! 3. Reconcile: runs exactly once, after the last chunk, against the registry
//!
//! Progress is derived from how many results have been accumulated, not from
//! a cursor, so the next chunk is always `[accumulated, accumulated + len)`
//! of the frozen lists. A transport failure during the drain drops the batch
//! and nothing is reconciled.

use crate::config::SyncConfig;
use crate::error::TransportError;
use crate::remote::{BatchRequest, BatchResponse, DeletedAck, RemoteStore};
use std::collections::HashSet;
use tagsync_model::{
    ClientId, EntityRegistry, Entry, EntryErrors, EntryPayload, ErrorTree, Framework,
    RemoteEntry, SaveKind, ServerId, Validator,
};
use tracing::{debug, info, warn};

/// Frozen work of one save plus the results accumulated so far
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncBatch {
    deletes: Vec<(ServerId, ClientId)>,
    updates: Vec<EntryPayload>,
    errors: Vec<Option<ErrorTree>>,
    results: Vec<Option<RemoteEntry>>,
    deleted_results: Vec<Option<DeletedAck>>,
    round_trips: usize,
}

impl SyncBatch {
    /// Freeze explicit lists
    #[must_use]
    pub fn new(deletes: Vec<(ServerId, ClientId)>, updates: Vec<EntryPayload>) -> Self {
        Self {
            deletes,
            updates,
            ..Self::default()
        }
    }

    /// Freeze every savable record of a registry, unvalidated
    #[must_use]
    pub fn from_registry(registry: &EntityRegistry) -> Self {
        let mut deletes = Vec::new();
        let mut updates = Vec::new();
        for (entry, kind) in registry.filter_savable() {
            match kind {
                SaveKind::Delete(server_id) => deletes.push((server_id, entry.client_id.clone())),
                SaveKind::Update => updates.push(entry.to_payload()),
            }
        }
        Self::new(deletes, updates)
    }

    /// Whether there is nothing to send
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty() && self.updates.is_empty()
    }

    /// Number of frozen delete ids
    #[inline]
    #[must_use]
    pub fn delete_count(&self) -> usize {
        self.deletes.len()
    }

    /// Number of frozen update payloads
    #[inline]
    #[must_use]
    pub fn update_count(&self) -> usize {
        self.updates.len()
    }

    /// Round trips completed so far
    #[inline]
    #[must_use]
    pub fn round_trips(&self) -> usize {
        self.round_trips
    }

    /// Whether a record is part of this batch
    #[must_use]
    pub fn contains(&self, client_id: &ClientId) -> bool {
        self.deletes.iter().any(|(_, id)| id == client_id)
            || self.updates.iter().any(|p| &p.client_id == client_id)
    }

    /// Whether every frozen item has a result
    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.deleted_results.len() >= self.deletes.len() && self.results.len() >= self.updates.len()
    }

    /// Build the next chunk from the accumulated progress
    ///
    /// Returns `None` once neither side has unsent items.
    #[must_use]
    pub fn next_chunk(&self, delete_len: usize, update_len: usize) -> Option<BatchRequest> {
        let delete_ids: Vec<ServerId> = window(&self.deletes, self.deleted_results.len(), delete_len)
            .iter()
            .map(|(server_id, _)| *server_id)
            .collect();
        let updates = window(&self.updates, self.results.len(), update_len).to_vec();

        let request = BatchRequest {
            delete_ids,
            updates,
        };
        (!request.is_empty()).then_some(request)
    }

    /// Append one chunk's response to the accumulators
    ///
    /// # Errors
    /// - `TransportError::Misaligned` if the response does not match the sizes sent;
    ///   nothing is appended in that case
    pub fn accumulate(
        &mut self,
        deletes_sent: usize,
        updates_sent: usize,
        response: BatchResponse,
    ) -> Result<(), TransportError> {
        response.check_alignment(deletes_sent, updates_sent)?;
        self.errors.extend(response.errors);
        self.results.extend(response.result);
        self.deleted_results.extend(response.deleted_result);
        self.round_trips += 1;
        Ok(())
    }

    /// Fold the accumulated results into the registry and error map
    ///
    /// Correlation is positional: the i-th accumulated result belongs to the
    /// i-th frozen item. Items without a result (the batch was not fully
    /// drained) are counted as failed and left untouched.
    pub fn reconcile(
        self,
        registry: &mut EntityRegistry,
        errors: &mut EntryErrors,
        validator: &dyn Validator,
        framework: &Framework,
    ) -> SyncTotals {
        let mut totals = SyncTotals {
            round_trips: self.round_trips,
            ..SyncTotals::default()
        };

        let mut deleted_results = self.deleted_results.into_iter();
        for (server_id, client_id) in self.deletes {
            if let Some(Some(DeletedAck {})) = deleted_results.next() {
                registry.remove(&client_id);
                errors.clear(&client_id);
                totals.removed.push(server_id);
                totals.deletes_succeeded += 1;
            } else {
                totals.deletes_failed += 1;
            }
        }

        let mut update_errors = self.errors.into_iter();
        let mut results = self.results.into_iter();
        for payload in self.updates {
            let error = update_errors.next().flatten();
            let result = results.next().flatten();
            let client_id = payload.client_id.clone();

            // The record was sent, so any earlier error is superseded
            errors.clear(&client_id);
            let failed = error.is_some() || result.is_none();

            if let Some(error) = error {
                let mapped = validator.transform_remote_error(framework, &payload, error);
                errors.merge_remote(client_id.clone(), mapped);
            }

            if let Some(remote) = result {
                if remote
                    .client_id
                    .as_ref()
                    .is_some_and(|echoed| echoed != &client_id)
                {
                    warn!(
                        client_id = %client_id,
                        server_id = %remote.id,
                        "remote result echoed a different client id; using positional match"
                    );
                }
                registry.replace_from_remote(Entry::from_remote(client_id, remote));
            }

            if failed {
                totals.updates_failed += 1;
            } else {
                totals.updates_succeeded += 1;
            }
        }

        totals
    }
}

fn window<T>(items: &[T], start: usize, len: usize) -> &[T] {
    let start = start.min(items.len());
    let end = start.saturating_add(len).min(items.len());
    &items[start..end]
}

/// Counts produced by one reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncTotals {
    /// Deletes acknowledged
    pub deletes_succeeded: usize,
    /// Deletes not acknowledged
    pub deletes_failed: usize,
    /// Updates with a canonical result and no error
    pub updates_succeeded: usize,
    /// Updates rejected or without a result
    pub updates_failed: usize,
    /// Server ids removed from the registry
    pub removed: Vec<ServerId>,
    /// Network calls made
    pub round_trips: usize,
}

impl SyncTotals {
    /// Number of per-record failures
    #[inline]
    #[must_use]
    pub fn failures(&self) -> usize {
        self.deletes_failed + self.updates_failed
    }
}

/// Drains a [`SyncBatch`] against a remote store in bounded chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkedSynchronizer {
    delete_chunk_len: usize,
    update_chunk_len: usize,
}

impl ChunkedSynchronizer {
    /// Create synchronizer; chunk lengths are at least one
    #[inline]
    #[must_use]
    pub fn new(delete_chunk_len: usize, update_chunk_len: usize) -> Self {
        Self {
            delete_chunk_len: delete_chunk_len.max(1),
            update_chunk_len: update_chunk_len.max(1),
        }
    }

    /// Create from configuration
    #[inline]
    #[must_use]
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.delete_chunk_len, config.update_chunk_len)
    }

    /// Delete ids per round trip
    #[inline]
    #[must_use]
    pub fn delete_chunk_len(&self) -> usize {
        self.delete_chunk_len
    }

    /// Update payloads per round trip
    #[inline]
    #[must_use]
    pub fn update_chunk_len(&self) -> usize {
        self.update_chunk_len
    }

    /// Submit chunks until every frozen item has a result
    ///
    /// Chunk N+1 is only built after chunk N's response is accumulated.
    ///
    /// # Errors
    /// The first transport failure aborts the drain; the partially filled
    /// batch is dropped with it.
    pub async fn drain(
        &self,
        store: &dyn RemoteStore,
        mut batch: SyncBatch,
    ) -> Result<SyncBatch, TransportError> {
        if batch.is_empty() {
            debug!("nothing to send");
            return Ok(batch);
        }

        info!(
            deletes = batch.delete_count(),
            updates = batch.update_count(),
            "saving entries"
        );

        while let Some(request) = batch.next_chunk(self.delete_chunk_len, self.update_chunk_len) {
            let deletes_sent = request.delete_ids.len();
            let updates_sent = request.updates.len();
            debug!(
                round_trip = batch.round_trips() + 1,
                deletes_sent, updates_sent, "submitting chunk"
            );

            let response = store.submit_batch(request).await.map_err(|e| {
                warn!(error = %e, round_trips = batch.round_trips(), "chunk failed; aborting save");
                e
            })?;
            batch.accumulate(deletes_sent, updates_sent, response)?;
        }

        info!(round_trips = batch.round_trips(), "all chunks sent");
        Ok(batch)
    }
}

impl Default for ChunkedSynchronizer {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

/// Server ids still present in a registry
pub(crate) fn persisted_ids(registry: &EntityRegistry) -> HashSet<ServerId> {
    registry.iter().filter_map(|e| e.server_id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tagsync_model::{EntryPatch, FrameworkValidator};

    /// Acknowledges everything, assigning server ids from 100
    #[derive(Default)]
    struct AckStore {
        calls: Mutex<Vec<BatchRequest>>,
        fail_on_call: Option<usize>,
    }

    #[async_trait]
    impl RemoteStore for AckStore {
        async fn submit_batch(&self, request: BatchRequest) -> Result<BatchResponse, TransportError> {
            let mut calls = self.calls.lock();
            calls.push(request.clone());
            if self.fail_on_call == Some(calls.len()) {
                return Err(TransportError::Request("connection reset".into()));
            }
            Ok(BatchResponse {
                errors: vec![None; request.updates.len()],
                result: request
                    .updates
                    .iter()
                    .enumerate()
                    .map(|(i, p)| {
                        Some(RemoteEntry {
                            id: p.id.unwrap_or(ServerId(100 + i as u64)),
                            client_id: Some(p.client_id.clone()),
                            version_id: 1,
                            order: p.order,
                            excerpt: p.excerpt.clone(),
                            attributes: p.attributes.clone(),
                            created_at: None,
                            modified_at: None,
                            created_by: None,
                        })
                    })
                    .collect(),
                deleted_result: vec![Some(DeletedAck {}); request.delete_ids.len()],
            })
        }
    }

    fn stale_registry(n: usize) -> EntityRegistry {
        let mut registry = EntityRegistry::new();
        for i in 0..n {
            let id = ClientId::from_string(format!("e{i}"));
            registry.upsert(&id, &EntryPatch::new().with_order(i as i64));
        }
        registry
    }

    #[test]
    fn next_chunk_follows_accumulated_length() {
        let registry = stale_registry(5);
        let mut batch = SyncBatch::from_registry(&registry);

        let first = batch.next_chunk(10, 2).unwrap();
        assert_eq!(first.updates.len(), 2);
        assert_eq!(first.updates[0].client_id.as_str(), "e0");

        batch
            .accumulate(
                0,
                2,
                BatchResponse {
                    errors: vec![None, None],
                    result: vec![None, None],
                    deleted_result: vec![],
                },
            )
            .unwrap();

        let second = batch.next_chunk(10, 2).unwrap();
        assert_eq!(second.updates[0].client_id.as_str(), "e2");
    }

    #[test]
    fn empty_batch_has_no_chunk() {
        let batch = SyncBatch::from_registry(&EntityRegistry::new());
        assert!(batch.is_empty());
        assert!(batch.next_chunk(100, 100).is_none());
    }

    #[test]
    fn misaligned_response_is_not_accumulated() {
        let mut batch = SyncBatch::from_registry(&stale_registry(2));
        let err = batch
            .accumulate(
                0,
                2,
                BatchResponse {
                    errors: vec![None, None],
                    result: vec![None],
                    deleted_result: vec![],
                },
            )
            .unwrap_err();
        assert!(matches!(err, TransportError::Misaligned { .. }));
        assert_eq!(batch.round_trips(), 0);
        assert!(batch.next_chunk(100, 100).is_some());
    }

    #[tokio::test]
    async fn drain_sends_sequential_chunks() {
        let store = AckStore::default();
        let batch = SyncBatch::from_registry(&stale_registry(5));

        let drained = ChunkedSynchronizer::new(100, 2)
            .drain(&store, batch)
            .await
            .unwrap();

        assert_eq!(drained.round_trips(), 3);
        assert!(drained.is_drained());
        let sizes: Vec<usize> = store.calls.lock().iter().map(|c| c.updates.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn drain_aborts_on_transport_failure() {
        let store = AckStore {
            fail_on_call: Some(2),
            ..AckStore::default()
        };
        let batch = SyncBatch::from_registry(&stale_registry(5));

        let result = ChunkedSynchronizer::new(100, 2).drain(&store, batch).await;

        assert!(result.is_err());
        assert_eq!(store.calls.lock().len(), 2);
    }

    #[tokio::test]
    async fn reconcile_clears_stale_and_removes_deleted() {
        let mut registry = stale_registry(2);
        let gone = ClientId::from("gone");
        let mut persisted = Entry::new(gone.clone());
        persisted.server_id = Some(ServerId(7));
        registry.insert(persisted).unwrap();
        registry.mark_deleted(&gone).unwrap();

        let batch = SyncBatch::from_registry(&registry);
        let drained = ChunkedSynchronizer::default()
            .drain(&AckStore::default(), batch)
            .await
            .unwrap();

        let mut errors = EntryErrors::new();
        let framework = Framework::new(1, "empty");
        let totals = drained.reconcile(&mut registry, &mut errors, &FrameworkValidator, &framework);

        assert_eq!(totals.updates_succeeded, 2);
        assert_eq!(totals.deletes_succeeded, 1);
        assert_eq!(totals.removed, vec![ServerId(7)]);
        assert!(!registry.contains(&gone));
        assert!(registry.iter().all(|e| !e.stale && e.is_persisted()));
    }

    #[test]
    fn reconcile_counts_null_results_as_failed() {
        let mut registry = stale_registry(2);
        let mut batch = SyncBatch::from_registry(&registry);
        batch
            .accumulate(
                0,
                2,
                BatchResponse {
                    errors: vec![None, Some(ErrorTree::message("rejected"))],
                    result: vec![None, None],
                    deleted_result: vec![],
                },
            )
            .unwrap();

        let mut errors = EntryErrors::new();
        let totals = batch.reconcile(
            &mut registry,
            &mut errors,
            &FrameworkValidator,
            &Framework::new(1, "empty"),
        );

        assert_eq!(totals.updates_failed, 2);
        assert!(registry.iter().all(|e| e.stale));
        assert!(errors.get(&ClientId::from("e0")).is_none());
        assert!(errors.get(&ClientId::from("e1")).is_some());
    }

    #[test]
    fn positional_match_wins_over_echoed_client_id() {
        let mut registry = stale_registry(1);
        let mut batch = SyncBatch::from_registry(&registry);
        batch
            .accumulate(
                0,
                1,
                BatchResponse {
                    errors: vec![None],
                    result: vec![Some(RemoteEntry {
                        id: ServerId(3),
                        client_id: Some(ClientId::from("someone-else")),
                        version_id: 1,
                        order: 0,
                        excerpt: None,
                        attributes: vec![],
                        created_at: None,
                        modified_at: None,
                        created_by: None,
                    })],
                    deleted_result: vec![],
                },
            )
            .unwrap();

        batch.reconcile(
            &mut registry,
            &mut EntryErrors::new(),
            &FrameworkValidator,
            &Framework::new(1, "empty"),
        );

        let entry = registry.get(&ClientId::from("e0")).unwrap();
        assert_eq!(entry.server_id, Some(ServerId(3)));
        assert!(!registry.contains(&ClientId::from("someone-else")));
    }
}
