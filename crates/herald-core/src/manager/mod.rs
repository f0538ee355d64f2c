//! Session manager.
//!
//! Owns the live-session registry and runs two background loops:
//!
//! - **state monitor** ([`monitor`]): logs out idle sessions and queues
//!   stale argument caches for rebuild.
//! - **cache manager** ([`cache`]): drains the rebuild queue off the
//!   request path.
//!
//! Both loops are tokio tasks that stop when the `CancellationToken`
//! passed to [`SessionManager::start`] fires.

pub mod cache;
pub mod monitor;
pub mod report;

pub use monitor::ScanOutcome;
pub use report::ManagerReport;

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use herald_types::response::Response;
use herald_types::{HeraldError, Result};

use crate::session::{Session, SessionContext};

/// Live sessions keyed by id, plus the rebuild queue's sending side.
pub(crate) struct Registry {
    sessions: DashMap<String, Arc<Session>>,
    rebuild_tx: mpsc::UnboundedSender<String>,
}

impl Registry {
    fn insert(&self, session: Arc<Session>) {
        self.sessions.insert(session.id().to_string(), session);
    }

    pub(crate) fn remove(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.remove(id).map(|(_, session)| session)
    }

    pub(crate) fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Whether any live session belongs to `username`.
    pub(crate) fn has_user(&self, username: &str) -> bool {
        self.sessions.iter().any(|entry| entry.username() == username)
    }

    /// Clones of every live session. Taken before any await so no shard
    /// lock is held across one.
    pub(crate) fn snapshot(&self) -> Vec<Arc<Session>> {
        self.sessions.iter().map(|entry| Arc::clone(entry.value())).collect()
    }

    pub(crate) fn queue_rebuild(&self, session: &Session) -> bool {
        if !session.try_queue() {
            return false;
        }
        if self.rebuild_tx.send(session.id().to_string()).is_err() {
            warn!(session_id = %session.id(), "rebuild queue closed");
            return false;
        }
        true
    }
}

pub struct SessionManager {
    ctx: Arc<SessionContext>,
    registry: Arc<Registry>,
    rebuild_rx: tokio::sync::Mutex<Option<mpsc::UnboundedReceiver<String>>>,
    cancel: Mutex<Option<CancellationToken>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SessionManager {
    pub fn new(ctx: SessionContext) -> Self {
        let (rebuild_tx, rebuild_rx) = mpsc::unbounded_channel();
        Self {
            ctx: Arc::new(ctx),
            registry: Arc::new(Registry {
                sessions: DashMap::new(),
                rebuild_tx,
            }),
            rebuild_rx: tokio::sync::Mutex::new(Some(rebuild_rx)),
            cancel: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn context(&self) -> &Arc<SessionContext> {
        &self.ctx
    }

    /// Open a session for a verified user and client.
    ///
    /// The argument cache is fully built before the session is published,
    /// and the user is marked online.
    pub async fn open_session(&self, username: &str, client_id: &str) -> Result<Arc<Session>> {
        let user = self
            .ctx
            .identity
            .find_user(username)
            .await?
            .ok_or_else(|| HeraldError::UnknownUser {
                username: username.to_string(),
            })?;
        let client = self
            .ctx
            .identity
            .find_client(client_id)
            .await?
            .ok_or_else(|| HeraldError::UnknownClient {
                client_id: client_id.to_string(),
            })?;

        let session = Arc::new(Session::new(
            username.to_string(),
            client_id.to_string(),
            user,
            client,
            Arc::clone(&self.ctx),
            Arc::downgrade(&self.registry),
        ));
        let failed = session.rebuild().await;
        session.mark_ready();
        self.registry.insert(Arc::clone(&session));

        if let Err(e) = self.ctx.identity.set_online(username, true).await {
            warn!(username, error = %e, "failed to set online flag");
        }
        info!(
            session_id = %session.id(),
            username,
            client_id,
            failed_arguments = failed,
            "session opened"
        );
        Ok(session)
    }

    pub fn get(&self, session_id: &str) -> Option<Arc<Session>> {
        self.registry.get(session_id)
    }

    pub fn sessions(&self) -> Vec<Arc<Session>> {
        self.registry.snapshot()
    }

    pub fn len(&self) -> usize {
        self.registry.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.sessions.is_empty()
    }

    /// One state-monitor pass at the current time.
    pub async fn scan(&self) -> ScanOutcome {
        self.scan_at(Instant::now()).await
    }

    /// One state-monitor pass as if the clock read `now`.
    pub async fn scan_at(&self, now: Instant) -> ScanOutcome {
        monitor::scan(&self.registry, &self.ctx.config, now).await
    }

    /// One cache-manager pass. Returns 0 once the loop owns the queue.
    pub async fn drain_rebuilds(&self) -> usize {
        match self.rebuild_rx.lock().await.as_mut() {
            Some(rx) => cache::drain(&self.registry, rx).await,
            None => 0,
        }
    }

    pub fn report(&self) -> Response {
        ManagerReport::collect(&self.registry.snapshot()).into_response()
    }

    /// Spawn the state monitor and cache manager loops.
    pub async fn start(&self, cancel: CancellationToken) {
        let Some(rx) = self.rebuild_rx.lock().await.take() else {
            warn!("session manager already started");
            return;
        };
        let config = &self.ctx.config;
        let monitor = tokio::spawn(monitor::run(
            Arc::clone(&self.registry),
            config.clone(),
            cancel.clone(),
        ));
        let cache = tokio::spawn(cache::run(
            Arc::clone(&self.registry),
            rx,
            config.manager.cache_poll(),
            cancel.clone(),
        ));
        self.tasks.lock().extend([monitor, cache]);
        *self.cancel.lock() = Some(cancel);
    }

    /// Cancel the loops and wait for them to exit.
    pub async fn shutdown(&self) {
        if let Some(cancel) = self.cancel.lock().take() {
            cancel.cancel();
        }
        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "session manager task ended abnormally");
            }
        }
        info!("session manager stopped");
    }
}
