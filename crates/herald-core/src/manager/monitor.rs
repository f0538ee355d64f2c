//! State monitor: idle expiry and refresh scheduling.

use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use herald_types::config::Config;

use super::Registry;

/// What one scan did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Sessions logged out for inactivity.
    pub expired: Vec<String>,
    /// Sessions queued for an argument rebuild.
    pub queued: Vec<String>,
}

pub(crate) async fn scan(registry: &Registry, config: &Config, now: Instant) -> ScanOutcome {
    let inactivity = config.sessions.inactivity_timeout();
    let refresh = config.sessions.refresh_interval();
    let mut outcome = ScanOutcome::default();

    for session in registry.snapshot() {
        if session.age_at(now) >= inactivity {
            if session.logout().await {
                info!(session_id = %session.id(), "session expired");
                outcome.expired.push(session.id().to_string());
            }
            continue;
        }
        if session.is_ready()
            && session.arguments().needs_refresh(now, refresh)
            && registry.queue_rebuild(&session)
        {
            debug!(session_id = %session.id(), "argument cache queued for rebuild");
            outcome.queued.push(session.id().to_string());
        }
    }
    outcome
}

pub(crate) async fn run(registry: Arc<Registry>, config: Config, cancel: CancellationToken) {
    let period = config.manager.state_poll();
    info!(interval_secs = period.as_secs(), "state monitor started");
    let mut interval = tokio::time::interval(period);

    // The first tick fires immediately; skip it.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("state monitor shutting down");
                return;
            }
            _ = interval.tick() => {
                let outcome = scan(&registry, &config, Instant::now()).await;
                if !outcome.expired.is_empty() || !outcome.queued.is_empty() {
                    debug!(
                        expired = outcome.expired.len(),
                        queued = outcome.queued.len(),
                        "state monitor pass"
                    );
                }
            }
        }
    }
}
