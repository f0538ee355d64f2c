//! Pending notifications shared between sessions and the delivery monitor.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use herald_types::records::Notification;

/// A cloneable handle to the process-wide notification queue.
#[derive(Clone, Default)]
pub struct NotificationQueue {
    inner: Arc<Mutex<Vec<Notification>>>,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, notification: Notification) {
        self.inner.lock().push(notification);
    }

    /// Remove and return every notification due at `now`, earliest first.
    pub fn take_due(&self, now: DateTime<Utc>) -> Vec<Notification> {
        let mut pending = self.inner.lock();
        let (mut due, rest): (Vec<_>, Vec<_>) =
            pending.drain(..).partition(|n| n.is_due(now));
        *pending = rest;
        due.sort_by_key(|n| n.trigger_time);
        due
    }

    pub fn pending_for(&self, user: &str) -> Vec<Notification> {
        self.inner
            .lock()
            .iter()
            .filter(|n| n.user == user)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
