//! Structured per-field error tree
//!
//! Produced both by local validation and by the remote store, so the UI
//! renders both in the same slot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Nested field errors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorTree {
    /// Error on this node itself (non-field error)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Errors keyed by child field
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, ErrorTree>,
}

impl ErrorTree {
    /// Empty tree
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tree with a single node-level message
    #[inline]
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            fields: BTreeMap::new(),
        }
    }

    /// With child error
    #[inline]
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>, error: ErrorTree) -> Self {
        self.insert(field, error);
        self
    }

    /// Insert child error, merging into an existing one
    pub fn insert(&mut self, field: impl Into<String>, error: ErrorTree) {
        if error.is_empty() {
            return;
        }
        self.fields.entry(field.into()).or_default().merge(error);
    }

    /// Merge another tree into this one; `other` wins on message conflicts
    pub fn merge(&mut self, other: ErrorTree) {
        if other.message.is_some() {
            self.message = other.message;
        }
        for (field, child) in other.fields {
            self.insert(field, child);
        }
    }

    /// Whether the tree carries no error at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.message.is_none() && self.fields.values().all(ErrorTree::is_empty)
    }

    /// Child error for a field
    #[inline]
    #[must_use]
    pub fn field(&self, field: &str) -> Option<&ErrorTree> {
        self.fields.get(field)
    }

    /// Number of leaf messages
    #[must_use]
    pub fn count(&self) -> usize {
        usize::from(self.message.is_some())
            + self.fields.values().map(ErrorTree::count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_children_are_not_inserted() {
        let tree = ErrorTree::new().with_field("a", ErrorTree::new());
        assert!(tree.is_empty());
        assert!(tree.fields.is_empty());
    }

    #[test]
    fn merge_combines_fields() {
        let mut a = ErrorTree::new().with_field("x", ErrorTree::message("bad x"));
        let b = ErrorTree::message("top").with_field("y", ErrorTree::message("bad y"));
        a.merge(b);

        assert_eq!(a.message.as_deref(), Some("top"));
        assert_eq!(a.count(), 3);
        assert!(a.field("y").is_some());
    }

    #[test]
    fn deserializes_sparse_json() {
        let tree: ErrorTree =
            serde_json::from_str(r#"{"fields":{"excerpt":{"message":"required"}}}"#).unwrap();
        assert_eq!(
            tree.field("excerpt").and_then(|e| e.message.as_deref()),
            Some("required")
        );
    }
}
