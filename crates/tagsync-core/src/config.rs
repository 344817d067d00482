//! Synchronizer configuration
//!
//! Defaults match the remote store's batch limits. A TOML file may override
//! any subset of fields:
//!
//! ```toml
//! delete_chunk_len = 50
//! update_chunk_len = 25
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default number of delete ids per round trip
pub const DEFAULT_DELETE_CHUNK_LEN: usize = 100;

/// Default number of update payloads per round trip
pub const DEFAULT_UPDATE_CHUNK_LEN: usize = 100;

/// Save behaviour configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Delete ids sent per round trip
    pub delete_chunk_len: usize,
    /// Update payloads sent per round trip
    pub update_chunk_len: usize,
    /// Validate stale entries locally before sending them
    pub validate_before_save: bool,
    /// Notify when a save had nothing to do
    pub notify_did_nothing: bool,
}

impl SyncConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With chunk lengths
    #[inline]
    #[must_use]
    pub fn with_chunk_lens(mut self, delete_chunk_len: usize, update_chunk_len: usize) -> Self {
        self.delete_chunk_len = delete_chunk_len;
        self.update_chunk_len = update_chunk_len;
        self
    }

    /// With local validation toggled
    #[inline]
    #[must_use]
    pub fn with_validate_before_save(mut self, enabled: bool) -> Self {
        self.validate_before_save = enabled;
        self
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    /// - `ConfigError::Parse` on malformed TOML
    /// - `ConfigError::Invalid` on out-of-range values
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// - `ConfigError::Io` if the file cannot be read
    /// - see [`SyncConfig::from_toml_str`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// - `ConfigError::Invalid` if a chunk length is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.delete_chunk_len == 0 {
            return Err(ConfigError::Invalid(
                "delete_chunk_len must be at least 1".to_string(),
            ));
        }
        if self.update_chunk_len == 0 {
            return Err(ConfigError::Invalid(
                "update_chunk_len must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Render as TOML
    ///
    /// # Errors
    /// - `ConfigError::Invalid` if serialization fails
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            delete_chunk_len: DEFAULT_DELETE_CHUNK_LEN,
            update_chunk_len: DEFAULT_UPDATE_CHUNK_LEN,
            validate_before_save: true,
            notify_did_nothing: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = SyncConfig::new();
        assert_eq!(config.delete_chunk_len, 100);
        assert_eq!(config.update_chunk_len, 100);
        assert!(config.validate_before_save);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = SyncConfig::from_toml_str("update_chunk_len = 7").unwrap();
        assert_eq!(config.update_chunk_len, 7);
        assert_eq!(config.delete_chunk_len, 100);
    }

    #[test]
    fn zero_chunk_len_rejected() {
        let err = SyncConfig::from_toml_str("delete_chunk_len = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_toml_rejected() {
        let err = SyncConfig::from_toml_str("delete_chunk_len = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_from_file_round_trip() {
        let config = SyncConfig::new().with_chunk_lens(3, 4);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_toml_string().unwrap().as_bytes())
            .unwrap();

        assert_eq!(SyncConfig::load(file.path()).unwrap(), config);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SyncConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
