//! tagsync Model
//!
//! In-memory state for collaborative entry tagging:
//! - [`EntityRegistry`]: ordered entries keyed by client id
//! - [`SelectionSession`]: single-slot restore point for isolated edits
//! - [`apply_to_all`]: value propagation across sibling entries
//! - [`Validator`]: schema validation shared by local and remote errors
//! - [`create_diff`] / [`apply_diff`]: refresh from the server's entry list
//!
//! # Example
//!
//! ```rust
//! use tagsync_model::{AttributeData, ClientId, EntityRegistry, EntryPatch, SelectionSession};
//!
//! let mut registry = EntityRegistry::new();
//! let id = ClientId::generate();
//! registry.upsert(&id, &EntryPatch::new().set("sector", AttributeData::Text("health".into())));
//!
//! let mut selection = SelectionSession::new();
//! selection.create_restore_point(&registry, id.clone());
//! registry.upsert(&id, &EntryPatch::new().clear("sector"));
//! selection.restore(&mut registry);
//!
//! assert!(registry.get(&id).unwrap().attributes.len() == 1);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod attribute;
pub mod diff;
pub mod entry;
pub mod error;
pub mod error_tree;
pub mod ids;
pub mod propagate;
pub mod registry;
pub mod restore_point;
pub mod schema;
pub mod status;
pub mod validate;

// Re-exports
pub use attribute::{Attribute, AttributeData, AttributePatch, ConditionalData, DataKind};
pub use diff::{apply_diff, create_diff, DiffSummary, EntryDiff};
pub use entry::{Entry, EntryPatch, EntryPayload, RemoteEntry};
pub use error::ModelError;
pub use error_tree::ErrorTree;
pub use ids::{ClientId, DocumentId, ServerId, WidgetId};
pub use propagate::apply_to_all;
pub use registry::{Deletion, EntityRegistry, SaveKind};
pub use restore_point::{RestorePoint, SelectionSession};
pub use schema::{Framework, Widget, WidgetKind};
pub use status::{entry_status, EntryErrors, EntryStatus, ErrorOrigin, ErrorSlot};
pub use validate::{FrameworkValidator, Validator, ATTRIBUTES_FIELD};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
