//! Service error types.

use thiserror::Error;

/// Errors produced by services in this crate.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// A polling interval of zero was supplied.
    #[error("invalid interval: {0}")]
    InvalidInterval(String),
}

/// Convenience alias for results in this crate.
pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ServiceError::InvalidInterval("notifications.poll_secs is 0".into());
        assert_eq!(err.to_string(), "invalid interval: notifications.poll_secs is 0");
    }
}
