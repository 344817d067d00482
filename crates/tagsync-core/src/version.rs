//! Version conflict resolution for the parent document
//!
//! Policy is "last load wins": remote data is always accepted. The only
//! protection for unsaved local edits is a notification after the fact, and
//! the caller decides whether to show it based on whether the form was
//! pristine. Prompting before overwriting is intentionally not done here.

/// Decision for one load response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionCheck {
    /// Whether to replace local values with the response
    pub should_set_value: bool,
    /// Whether the remote moved ahead of the cached version
    pub is_value_overridden: bool,
}

/// Cached version counter of the parent document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VersionResolver {
    local_version: Option<u64>,
}

impl VersionResolver {
    /// Resolver with nothing loaded yet
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver seeded from a cached version
    #[inline]
    #[must_use]
    pub fn with_version(version: u64) -> Self {
        Self {
            local_version: Some(version),
        }
    }

    /// Cached version
    #[inline]
    #[must_use]
    pub fn local_version(&self) -> Option<u64> {
        self.local_version
    }

    /// Compare a loaded version against the cached one
    #[must_use]
    pub fn check(&self, remote_version: u64) -> VersionCheck {
        match self.local_version {
            None => VersionCheck {
                should_set_value: true,
                is_value_overridden: false,
            },
            Some(local) if remote_version == local => VersionCheck {
                should_set_value: true,
                is_value_overridden: false,
            },
            Some(local) if remote_version > local => VersionCheck {
                should_set_value: true,
                is_value_overridden: true,
            },
            Some(local) => {
                tracing::warn!(
                    local_version = local,
                    remote_version,
                    "remote document version went backwards; accepting"
                );
                VersionCheck {
                    should_set_value: true,
                    is_value_overridden: false,
                }
            }
        }
    }

    /// Record an accepted version (after load or save)
    #[inline]
    pub fn accept(&mut self, remote_version: u64) {
        self.local_version = Some(remote_version);
    }
}
