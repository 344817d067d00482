//! Error types for the tagsync engine
//!
//! Follows the failure taxonomy of a save:
//! - Transport-level failures abort the whole in-flight save ([`SyncError::Transport`])
//! - Application-level rejections are per record and never surface as `Err`;
//!   they land in the entry error map and in [`crate::SaveOutcome`]
//! - Version conflicts are notifications, not errors

use std::path::PathBuf;
use tagsync_model::DocumentId;

/// Failure of a call to a remote collaborator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The request did not produce a structured response
    #[error("request failed: {0}")]
    Request(String),

    /// The transport gave up waiting
    #[error("request timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Response arrays are not positionally aligned with the request
    #[error("response misaligned: {field} has {actual} items, expected {expected}")]
    Misaligned {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Document does not exist remotely
    #[error("document not found: {0}")]
    NotFound(DocumentId),
}

/// Session-level errors
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A batch call failed; nothing from this save was applied
    #[error("failed to save entries: {0}")]
    Transport(#[from] TransportError),

    /// Loading the parent document failed
    #[error("failed to load document: {0}")]
    DocumentLoad(#[source] TransportError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl SyncError {
    /// Check if this aborted a save at the transport level
    #[inline]
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::DocumentLoad(_))
    }

    /// Check if retrying the same operation can succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) | Self::DocumentLoad(e) => {
                matches!(e, TransportError::Request(_) | TransportError::Timeout { .. })
            }
            Self::Config(_) => false,
        }
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading the file
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid TOML
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Value out of range
    #[error("invalid value: {0}")]
    Invalid(String),
}
