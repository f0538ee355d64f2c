//! Error types for the herald framework.
//!
//! [`HeraldError`] is the top-level error. Only configuration-time
//! failures are fatal; everything raised while serving a command is
//! converted into a [`Response`](crate::response::Response) before it
//! reaches the caller.

use thiserror::Error;

/// Top-level error type for the herald framework.
///
/// Variants are grouped into recoverable (lookup and store failures that
/// a caller may retry or report) and fatal (configuration problems that
/// must stop the process at load time).
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HeraldError {
    // ── Recoverable ──────────────────────────────────────────────────

    /// The identity store has no user with this name.
    #[error("unknown user: {username}")]
    UnknownUser {
        /// Username that failed lookup.
        username: String,
    },

    /// The identity store has no client with this id.
    #[error("unknown client: {client_id}")]
    UnknownClient {
        /// Client id that failed lookup.
        client_id: String,
    },

    /// An external store (identity, keys, notifications) failed.
    #[error("store error: {0}")]
    Store(String),

    /// An operation exceeded its deadline.
    #[error("operation timed out: {operation}")]
    Timeout {
        /// Human-readable name of the operation that timed out.
        operation: String,
    },

    // ── Fatal ────────────────────────────────────────────────────────

    /// Configuration is malformed or semantically invalid.
    #[error("invalid config: {reason}")]
    ConfigInvalid {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// Two plugins were registered under the same name.
    #[error(
        "plugin name '{name}' has already been registered; plugin names must be unique identifiers"
    )]
    DuplicatePlugin {
        /// The clashing plugin name.
        name: String,
    },

    /// Underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HeraldError {
    /// Whether this error must abort start-up rather than be reported.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HeraldError::ConfigInvalid { .. }
                | HeraldError::DuplicatePlugin { .. }
                | HeraldError::Io(_)
                | HeraldError::Json(_)
        )
    }
}

/// A convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, HeraldError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_plugin_display() {
        let err = HeraldError::DuplicatePlugin {
            name: "echo".into(),
        };
        assert!(err.to_string().starts_with("plugin name 'echo'"));
        assert!(err.is_fatal());
    }

    #[test]
    fn lookup_errors_are_recoverable() {
        let err = HeraldError::UnknownUser {
            username: "ghost".into(),
        };
        assert_eq!(err.to_string(), "unknown user: ghost");
        assert!(!err.is_fatal());

        let err = HeraldError::Timeout {
            operation: "key lookup".into(),
        };
        assert!(!err.is_fatal());
    }

    #[test]
    fn error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{{bad}}").unwrap_err();
        let err: HeraldError = json_err.into();
        assert!(matches!(err, HeraldError::Json(_)));
    }
}
