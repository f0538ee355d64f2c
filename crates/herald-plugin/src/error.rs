//! Plugin error types.
//!
//! [`PluginError`] is what `exec()` / `response()` return on failure. The
//! dispatcher turns every variant except [`PluginError::Reported`] into a
//! generic `PLUGIN_ERROR`; `Reported` is a plugin-authored, user-facing
//! error and passes through as-is.

use thiserror::Error;

/// Errors produced by plugin operations.
#[derive(Debug, Error)]
pub enum PluginError {
    /// Plugin execution failed at runtime.
    #[error("plugin execution failed: {0}")]
    ExecutionFailed(String),

    /// A declared argument was not present in the resolved set.
    #[error("missing argument: {0}")]
    MissingArgument(String),

    /// A resolved argument had an unexpected shape.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An upstream call made by the plugin exceeded its deadline.
    #[error("timeout after {0}s")]
    Timeout(u64),

    /// The plugin does not implement the requested handler.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// A user-facing error the plugin wants returned verbatim.
    #[error("{id}: {text}")]
    Reported {
        id: String,
        text: String,
        status: u16,
    },

    /// I/O error during plugin operation.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PluginError {
    /// Shorthand for a plugin-authored user-facing error.
    pub fn reported(id: impl Into<String>, text: impl Into<String>, status: u16) -> Self {
        PluginError::Reported {
            id: id.into(),
            text: text.into(),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_execution_failed() {
        let err = PluginError::ExecutionFailed("upstream 502".into());
        assert_eq!(err.to_string(), "plugin execution failed: upstream 502");
    }

    #[test]
    fn error_display_reported() {
        let err = PluginError::reported("SEARCH_FAILED", "no answers found", 404);
        assert_eq!(err.to_string(), "SEARCH_FAILED: no answers found");
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::TimedOut, "socket");
        let err = PluginError::from(io_err);
        assert!(matches!(err, PluginError::Io(_)));
    }
}
