//! Contracts of the remote collaborators
//!
//! The transport itself (HTTP, auth, retries) lives behind these traits.
//! Batch responses are correlated with requests by array position only, so
//! implementations must never reorder, pad or truncate.

use crate::error::TransportError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tagsync_model::{DocumentId, EntryPayload, ErrorTree, RemoteEntry, ServerId};

/// Document fields as sent and received
pub type DocumentFields = serde_json::Map<String, serde_json::Value>;

/// One chunk of a bulk save
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    /// Server ids to delete
    pub delete_ids: Vec<ServerId>,
    /// Entries to create or update
    pub updates: Vec<EntryPayload>,
}

impl BatchRequest {
    /// Check if the chunk carries nothing
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.delete_ids.is_empty() && self.updates.is_empty()
    }
}

/// Marker that a delete succeeded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedAck {}

/// Structured response to one chunk
///
/// `errors[i]` and `result[i]` belong to `updates[i]`; `deleted_result[i]`
/// belongs to `delete_ids[i]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    /// Per-update application error
    pub errors: Vec<Option<ErrorTree>>,
    /// Per-update canonical record
    pub result: Vec<Option<RemoteEntry>>,
    /// Per-delete acknowledgement
    #[serde(rename = "deletedResult", alias = "deleted_result")]
    pub deleted_result: Vec<Option<DeletedAck>>,
}

impl BatchResponse {
    /// Verify positional alignment with the request that produced it
    ///
    /// # Errors
    /// - `TransportError::Misaligned` naming the first array of the wrong length
    pub fn check_alignment(&self, deletes_sent: usize, updates_sent: usize) -> Result<(), TransportError> {
        let checks = [
            ("errors", self.errors.len(), updates_sent),
            ("result", self.result.len(), updates_sent),
            ("deletedResult", self.deleted_result.len(), deletes_sent),
        ];
        for (field, actual, expected) in checks {
            if actual != expected {
                return Err(TransportError::Misaligned {
                    field,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }
}

/// Store accepting bulk entry mutations
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Submit one chunk
    ///
    /// # Errors
    /// Any `Err` is a transport-level failure and aborts the save.
    async fn submit_batch(&self, request: BatchRequest) -> Result<BatchResponse, TransportError>;
}

/// Parent document as returned by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document id
    pub id: DocumentId,
    /// Monotonic version counter
    pub version: u64,
    /// Form fields
    #[serde(default)]
    pub fields: DocumentFields,
    /// Entries attached to the document
    #[serde(default)]
    pub entries: Vec<RemoteEntry>,
}

/// Store holding parent documents
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Load a document with its entries
    ///
    /// # Errors
    /// Transport failure or missing document.
    async fn load_document(&self, id: DocumentId) -> Result<Document, TransportError>;

    /// Save document fields, returning the new canonical document
    ///
    /// # Errors
    /// Transport failure or missing document.
    async fn save_document(
        &self,
        id: DocumentId,
        fields: DocumentFields,
    ) -> Result<Document, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alignment_accepts_matching_lengths() {
        let response = BatchResponse {
            errors: vec![None, None],
            result: vec![None, None],
            deleted_result: vec![Some(DeletedAck {})],
        };
        assert!(response.check_alignment(1, 2).is_ok());
    }

    #[test]
    fn alignment_rejects_truncated_result() {
        let response = BatchResponse {
            errors: vec![None, None],
            result: vec![None],
            deleted_result: vec![],
        };
        assert_eq!(
            response.check_alignment(0, 2),
            Err(TransportError::Misaligned {
                field: "result",
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn response_parses_wire_names() {
        let response: BatchResponse = serde_json::from_str(
            r#"{"errors":[null],"result":[null],"deletedResult":[{}]}"#,
        )
        .unwrap();
        assert_eq!(response.deleted_result, vec![Some(DeletedAck {})]);
    }
}
