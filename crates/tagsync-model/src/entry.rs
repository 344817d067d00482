//! Entries and their wire representations
//!
//! - [`Entry`]: the in-memory record the UI edits
//! - [`EntryPatch`]: a user edit, merged into an entry
//! - [`EntryPayload`]: what is sent to the remote store
//! - [`RemoteEntry`]: the server's canonical version of a record

use crate::attribute::{Attribute, AttributeData, AttributePatch};
use crate::ids::{ClientId, ServerId, WidgetId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One annotation record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Stable client identity, the only key used for UI and result correlation
    pub client_id: ClientId,
    /// Present once persisted
    pub server_id: Option<ServerId>,
    /// Server version of this record, used by the refresh diff
    pub version_id: Option<u64>,
    /// Display order within the source
    pub order: i64,
    /// Excerpt of the source this entry annotates
    pub excerpt: Option<String>,
    /// Server creation time, tie-breaker for ordering
    pub created_at: Option<DateTime<Utc>>,
    /// At most one attribute per widget
    pub attributes: Vec<Attribute>,
    /// Modified locally since the last confirmed save
    pub stale: bool,
    /// Soft-deleted locally
    pub deleted: bool,
}

impl Entry {
    /// Create a new local entry, not yet persisted
    #[must_use]
    pub fn new(client_id: ClientId) -> Self {
        Self {
            client_id,
            server_id: None,
            version_id: None,
            order: 0,
            excerpt: None,
            created_at: None,
            attributes: Vec::new(),
            stale: false,
            deleted: false,
        }
    }

    /// Build the local record from the server's canonical version
    ///
    /// Server-only bookkeeping (`modified_at`, `created_by`) is dropped and the
    /// record is clean (`stale = false`).
    #[must_use]
    pub fn from_remote(client_id: ClientId, remote: RemoteEntry) -> Self {
        Self {
            client_id,
            server_id: Some(remote.id),
            version_id: Some(remote.version_id),
            order: remote.order,
            excerpt: remote.excerpt,
            created_at: remote.created_at,
            attributes: remote.attributes,
            stale: false,
            deleted: false,
        }
    }

    /// Whether the remote store knows this record
    #[inline]
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.server_id.is_some()
    }

    /// Attribute for a widget
    #[must_use]
    pub fn attribute(&self, widget_id: &WidgetId) -> Option<&Attribute> {
        self.attributes.iter().find(|a| &a.widget_id == widget_id)
    }

    /// Mutable attribute for a widget
    pub fn attribute_mut(&mut self, widget_id: &WidgetId) -> Option<&mut Attribute> {
        self.attributes.iter_mut().find(|a| &a.widget_id == widget_id)
    }

    /// Set a widget's value, keeping the existing attribute identity if any
    pub fn set_attribute(&mut self, widget_id: &WidgetId, data: AttributeData) {
        match self.attribute_mut(widget_id) {
            Some(existing) => existing.data = data,
            None => self
                .attributes
                .push(Attribute::new(widget_id.clone(), data)),
        }
    }

    /// Remove a widget's value, returning whether it was present
    pub fn clear_attribute(&mut self, widget_id: &WidgetId) -> bool {
        let before = self.attributes.len();
        self.attributes.retain(|a| &a.widget_id != widget_id);
        before != self.attributes.len()
    }

    /// Merge a user edit into this entry (does not touch `stale`)
    pub fn apply_patch(&mut self, patch: &EntryPatch) {
        if let Some(excerpt) = &patch.excerpt {
            self.excerpt = Some(excerpt.clone());
        }
        if let Some(order) = patch.order {
            self.order = order;
        }
        for change in &patch.attributes {
            match &change.data {
                Some(data) => self.set_attribute(&change.widget_id, data.clone()),
                None => {
                    self.clear_attribute(&change.widget_id);
                }
            }
        }
    }

    /// Payload sent to the remote store
    #[must_use]
    pub fn to_payload(&self) -> EntryPayload {
        EntryPayload {
            id: self.server_id,
            client_id: self.client_id.clone(),
            order: self.order,
            excerpt: self.excerpt.clone(),
            attributes: self.attributes.clone(),
        }
    }
}

/// A user edit to an entry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryPatch {
    /// New excerpt
    pub excerpt: Option<String>,
    /// New order
    pub order: Option<i64>,
    /// Widget value changes
    pub attributes: Vec<AttributePatch>,
}

impl EntryPatch {
    /// Empty patch
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With excerpt
    #[inline]
    #[must_use]
    pub fn with_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.excerpt = Some(excerpt.into());
        self
    }

    /// With order
    #[inline]
    #[must_use]
    pub fn with_order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    /// Set a widget value
    #[inline]
    #[must_use]
    pub fn set(mut self, widget_id: impl Into<WidgetId>, data: AttributeData) -> Self {
        self.attributes.push(AttributePatch::set(widget_id, data));
        self
    }

    /// Clear a widget value
    #[inline]
    #[must_use]
    pub fn clear(mut self, widget_id: impl Into<WidgetId>) -> Self {
        self.attributes.push(AttributePatch::clear(widget_id));
        self
    }
}

/// Entry as sent to the remote store in a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryPayload {
    /// Server id, absent for records being created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ServerId>,
    /// Client id
    pub client_id: ClientId,
    /// Order
    pub order: i64,
    /// Excerpt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    /// Attributes
    pub attributes: Vec<Attribute>,
}

/// The server's canonical version of an entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// Server id
    pub id: ServerId,
    /// Client id echoed back, if the server stored one
    #[serde(default)]
    pub client_id: Option<ClientId>,
    /// Server version of the record
    pub version_id: u64,
    /// Order
    pub order: i64,
    /// Excerpt
    #[serde(default)]
    pub excerpt: Option<String>,
    /// Attributes with server ids assigned
    pub attributes: Vec<Attribute>,
    /// Creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification time (server-only)
    #[serde(default)]
    pub modified_at: Option<DateTime<Utc>>,
    /// Author (server-only)
    #[serde(default)]
    pub created_by: Option<String>,
}
