//! Interfaces to the external collaborators.
//!
//! herald does not own identity, key or notification storage, and it does
//! not do its own language analysis. These traits are the seams; the
//! [`memory`](crate::memory) and [`parser`](crate::parser) modules supply
//! in-process implementations.

use async_trait::async_trait;
use herald_plugin::ParsedText;
use herald_types::HeraldError;
use herald_types::records::{ApiKey, ClientRecord, Notification, UserRecord};

/// Errors raised by collaborator implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store answered with something unusable.
    #[error("store returned invalid data: {0}")]
    Invalid(String),

    /// The sink refused a delivery.
    #[error("delivery rejected: {0}")]
    Rejected(String),
}

impl From<StoreError> for HeraldError {
    fn from(err: StoreError) -> Self {
        HeraldError::Store(err.to_string())
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Turns raw text into a [`ParsedText`].
pub trait Parser: Send + Sync {
    fn parse(&self, text: &str) -> ParsedText;
}

/// User and client lookup. Consulted when a session is opened and when
/// its records are reloaded.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_user(&self, username: &str) -> StoreResult<Option<UserRecord>>;

    async fn find_client(&self, client_id: &str) -> StoreResult<Option<ClientRecord>>;

    /// Record whether the user has at least one live session.
    async fn set_online(&self, username: &str, online: bool) -> StoreResult<()>;
}

/// Rotating API key pools.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Hand out the next key of `key_type` and count one use against it.
    ///
    /// `Ok(None)` means every key in the pool is exhausted.
    async fn next_key(&self, key_type: &str) -> StoreResult<Option<ApiKey>>;
}

/// Final delivery of a due notification.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> StoreResult<()>;
}
