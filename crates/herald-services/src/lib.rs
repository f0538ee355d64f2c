//! Background services for herald.
//!
//! The session manager's own loops live in `herald-core`; this crate holds
//! the services that sit beside it. Currently that is notification
//! delivery: [`notifications::NotificationMonitor`] drains due entries
//! from the shared [`NotificationQueue`](herald_core::NotificationQueue)
//! into a [`NotificationSink`](herald_core::stores::NotificationSink).

pub mod error;
pub mod notifications;

pub use error::{Result, ServiceError};
pub use notifications::{LogSink, NotificationMonitor};
