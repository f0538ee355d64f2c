//! Notification delivery service.
//!
//! Polls the shared [`NotificationQueue`] at a fixed interval and hands
//! every notification whose trigger time has passed to a
//! [`NotificationSink`]. A failed delivery goes back on the queue and is
//! retried on the next tick.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use herald_core::NotificationQueue;
use herald_core::stores::{NotificationSink, StoreResult};
use herald_types::config::NotificationsConfig;
use herald_types::records::Notification;

use crate::error::{Result, ServiceError};

/// Delivers due notifications from a queue to a sink.
pub struct NotificationMonitor {
    queue: NotificationQueue,
    sink: Arc<dyn NotificationSink>,
    interval: Duration,
}

impl NotificationMonitor {
    /// Create a monitor polling every `interval`.
    ///
    /// Fails with [`ServiceError::InvalidInterval`] for a zero interval.
    pub fn new(
        queue: NotificationQueue,
        sink: Arc<dyn NotificationSink>,
        interval: Duration,
    ) -> Result<Self> {
        if interval.is_zero() {
            return Err(ServiceError::InvalidInterval(
                "notification poll interval must be positive".into(),
            ));
        }
        Ok(Self {
            queue,
            sink,
            interval,
        })
    }

    pub fn from_config(
        queue: NotificationQueue,
        sink: Arc<dyn NotificationSink>,
        config: &NotificationsConfig,
    ) -> Result<Self> {
        Self::new(queue, sink, config.poll_interval())
    }

    /// Deliver everything due at `now`. Returns the number delivered.
    pub async fn tick(&self, now: DateTime<Utc>) -> usize {
        let due = self.queue.take_due(now);
        let mut delivered = 0;
        for notification in due {
            match self.sink.deliver(&notification).await {
                Ok(()) => {
                    debug!(
                        uid = %notification.uid,
                        user = %notification.user,
                        "notification delivered"
                    );
                    delivered += 1;
                }
                Err(e) => {
                    warn!(
                        uid = %notification.uid,
                        user = %notification.user,
                        error = %e,
                        "notification delivery failed, re-queued"
                    );
                    self.queue.push(notification);
                }
            }
        }
        delivered
    }

    /// Run the delivery loop until `cancel` fires.
    pub async fn start(&self, cancel: CancellationToken) -> Result<()> {
        info!(
            interval_secs = self.interval.as_secs(),
            "notification monitor started"
        );
        let mut interval = tokio::time::interval(self.interval);

        // The first tick fires immediately; skip it.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(pending = self.queue.len(), "notification monitor shutting down");
                    return Ok(());
                }
                _ = interval.tick() => {
                    self.tick(Utc::now()).await;
                }
            }
        }
    }
}

/// A sink that writes each notification to the log.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, notification: &Notification) -> StoreResult<()> {
        info!(
            user = %notification.user,
            title = %notification.title,
            scope = %notification.scope,
            summary = %notification.summary(),
            "notification"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use herald_core::memory::MemorySink;

    fn note(user: &str, offset_secs: i64) -> Notification {
        Notification::new(
            user,
            "Reminder",
            "water the plants before noon today",
            Utc::now() + ChronoDuration::seconds(offset_secs),
            "user",
        )
    }

    fn monitor(queue: &NotificationQueue, sink: &Arc<MemorySink>) -> NotificationMonitor {
        NotificationMonitor::new(queue.clone(), sink.clone(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn zero_interval_rejected() {
        let result = NotificationMonitor::new(
            NotificationQueue::new(),
            Arc::new(MemorySink::new()),
            Duration::ZERO,
        );
        assert!(matches!(result, Err(ServiceError::InvalidInterval(_))));
    }

    #[tokio::test]
    async fn tick_delivers_only_due() {
        let queue = NotificationQueue::new();
        let sink = Arc::new(MemorySink::new());
        queue.push(note("ada", -10));
        queue.push(note("bob", 3600));

        let delivered = monitor(&queue, &sink).tick(Utc::now()).await;
        assert_eq!(delivered, 1);
        assert_eq!(sink.delivered()[0].user, "ada");
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pending_for("bob").len(), 1);
    }

    #[tokio::test]
    async fn failed_delivery_is_requeued() {
        let queue = NotificationQueue::new();
        let sink = Arc::new(MemorySink::new());
        let monitor = monitor(&queue, &sink);
        queue.push(note("ada", -1));

        sink.set_rejecting(true);
        assert_eq!(monitor.tick(Utc::now()).await, 0);
        assert_eq!(queue.len(), 1);

        sink.set_rejecting(false);
        assert_eq!(monitor.tick(Utc::now()).await, 1);
        assert!(queue.is_empty());
        assert_eq!(sink.delivered().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_delivers_and_stops_on_cancel() {
        let queue = NotificationQueue::new();
        let sink = Arc::new(MemorySink::new());
        let monitor = monitor(&queue, &sink);
        queue.push(note("ada", -1));

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move { monitor.start(token).await });

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(sink.delivered().len(), 1);

        cancel.cancel();
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn log_sink_accepts_everything() {
        assert!(LogSink.deliver(&note("ada", 0)).await.is_ok());
    }
}
