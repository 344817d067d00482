//! tagsync Core
//!
//! Optimistic editing of tagged entries with chunked bulk persistence:
//! 1. **Edit**: entries change locally and are marked stale
//! 2. **Save**: pending deletes and updates are drained to the remote store
//!    in bounded chunks, then reconciled once
//! 3. **Refresh**: the parent document is reloaded; remote data always wins,
//!    with a warning if unsaved edits were replaced
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tagsync_core::test_harness::{simulation_framework, InMemoryStore};
//! use tagsync_core::{EditingSession, SessionContext};
//! use tagsync_model::{AttributeData, DocumentId, EntryPatch};
//!
//! # async fn run() -> Result<(), tagsync_core::SyncError> {
//! let store = Arc::new(InMemoryStore::new(DocumentId(1)));
//! let context = SessionContext::new(simulation_framework());
//! let mut session = EditingSession::new(context, store.clone(), store, DocumentId(1));
//!
//! session.load_document().await?;
//! session.create_entry(
//!     EntryPatch::new().set("sector", AttributeData::Scale("health".into())),
//! );
//! let outcome = session.save().await?;
//! assert_eq!(outcome.updates_succeeded, 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod context;
pub mod error;
pub mod notify;
pub mod outcome;
pub mod remote;
pub mod session;
pub mod sync;
pub mod version;

// Test harness
pub mod test_harness;

// Re-exports
pub use config::{SyncConfig, DEFAULT_DELETE_CHUNK_LEN, DEFAULT_UPDATE_CHUNK_LEN};
pub use context::SessionContext;
pub use error::{ConfigError, SyncError, TransportError};
pub use notify::{Notifier, NotifyKind, TracingNotifier};
pub use outcome::{ParentSave, SaveOutcome};
pub use remote::{
    BatchRequest, BatchResponse, DeletedAck, Document, DocumentFields, DocumentStore,
    RemoteStore,
};
pub use session::EditingSession;
pub use sync::{ChunkedSynchronizer, SyncBatch, SyncTotals};
pub use version::{VersionCheck, VersionResolver};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
