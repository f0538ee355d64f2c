//! Cache manager: rebuilds queued argument caches.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::Registry;

/// Rebuild every session currently in the queue. Sessions that logged out
/// while queued are skipped. Returns the number rebuilt.
pub(crate) async fn drain(registry: &Registry, rx: &mut mpsc::UnboundedReceiver<String>) -> usize {
    let mut rebuilt = 0;
    while let Ok(session_id) = rx.try_recv() {
        let Some(session) = registry.get(&session_id) else {
            debug!(session_id = %session_id, "queued session is gone");
            continue;
        };
        let failed = session.rebuild().await;
        debug!(session_id = %session_id, failed, "argument cache rebuilt");
        rebuilt += 1;
    }
    rebuilt
}

pub(crate) async fn run(
    registry: Arc<Registry>,
    mut rx: mpsc::UnboundedReceiver<String>,
    period: Duration,
    cancel: CancellationToken,
) {
    info!(interval_secs = period.as_secs(), "cache manager started");
    let mut interval = tokio::time::interval(period);
    interval.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("cache manager shutting down");
                return;
            }
            _ = interval.tick() => {
                drain(&registry, &mut rx).await;
            }
        }
    }
}
