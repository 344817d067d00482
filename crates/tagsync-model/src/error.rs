//! Error types for the entry model

use crate::ids::{ClientId, WidgetId};

/// Errors raised by registry and propagation operations
///
/// These are caller-logic errors: the session logs them and degrades to a
/// no-op rather than surfacing them to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// No entry with this client id
    #[error("entry not found: {0}")]
    EntryNotFound(ClientId),

    /// An entry with this client id already exists
    #[error("entry already exists: {0}")]
    DuplicateEntry(ClientId),

    /// Widget is not part of the framework
    #[error("unknown widget: {0}")]
    UnknownWidget(WidgetId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_error_display() {
        let err = ModelError::EntryNotFound(ClientId::from("abc"));
        assert_eq!(err.to_string(), "entry not found: abc");
    }
}
