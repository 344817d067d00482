//! Explicit per-session context
//!
//! Everything a component needs beyond the registry itself is carried here
//! and handed in at construction, instead of being read from shared state.
//! The context is created with an editing session and dropped with it.

use crate::config::SyncConfig;
use crate::notify::{Notifier, TracingNotifier};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tagsync_model::{Framework, FrameworkValidator, ServerId, Validator};

/// Session-scoped collaborators and view state
#[derive(Clone)]
pub struct SessionContext {
    notifier: Arc<dyn Notifier>,
    validator: Arc<dyn Validator>,
    framework: Arc<Framework>,
    config: SyncConfig,
    comment_counts: HashMap<ServerId, u32>,
}

impl SessionContext {
    /// Create context for a framework with default collaborators
    #[must_use]
    pub fn new(framework: Framework) -> Self {
        Self {
            notifier: Arc::new(TracingNotifier),
            validator: Arc::new(FrameworkValidator::new()),
            framework: Arc::new(framework),
            config: SyncConfig::default(),
            comment_counts: HashMap::new(),
        }
    }

    /// With notifier
    #[inline]
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// With validator
    #[inline]
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = validator;
        self
    }

    /// With configuration
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Notifier
    #[inline]
    #[must_use]
    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    /// Validator
    #[inline]
    #[must_use]
    pub fn validator(&self) -> &dyn Validator {
        self.validator.as_ref()
    }

    /// Framework schema
    #[inline]
    #[must_use]
    pub fn framework(&self) -> &Framework {
        &self.framework
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Set the review comment count of a persisted entry
    pub fn set_comment_count(&mut self, server_id: ServerId, count: u32) {
        if count == 0 {
            self.comment_counts.remove(&server_id);
        } else {
            self.comment_counts.insert(server_id, count);
        }
    }

    /// Review comment count of a persisted entry
    #[must_use]
    pub fn comment_count(&self, server_id: ServerId) -> u32 {
        self.comment_counts.get(&server_id).copied().unwrap_or(0)
    }

    /// Drop counts of entries that no longer exist
    pub fn retain_comment_counts(&mut self, mut keep: impl FnMut(ServerId) -> bool) {
        self.comment_counts.retain(|id, _| keep(*id));
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("framework", &self.framework.id)
            .field("config", &self.config)
            .field("comment_counts", &self.comment_counts.len())
            .finish_non_exhaustive()
    }
}
