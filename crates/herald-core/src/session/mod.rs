//! Authenticated per-user, per-client sessions.
//!
//! A [`Session`] owns its command history and argument cache. Sessions are
//! created by [`SessionManager::open_session`](crate::manager::SessionManager::open_session)
//! and live in the manager's registry until [`Session::logout`].
//!
//! Dispatch (`command`, `process_response`) lives in [`dispatch`].

mod dispatch;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use herald_plugin::Command;
use herald_types::config::Config;
use herald_types::records::{ClientRecord, Notification, UserRecord};

use crate::arguments::{ArgumentSet, BuildContext};
use crate::manager::Registry;
use crate::notify::NotificationQueue;
use crate::plugins::PluginRegistry;
use crate::stores::{IdentityStore, KeyStore, Parser};

/// Scope that unlocks raw plugin error detail in responses.
pub const ADMIN_SCOPE: &str = "admin";

/// Shared, read-only dependencies of every session.
pub struct SessionContext {
    pub config: Config,
    pub plugins: Arc<PluginRegistry>,
    pub parser: Arc<dyn Parser>,
    pub identity: Arc<dyn IdentityStore>,
    pub keys: Arc<dyn KeyStore>,
    pub notifications: NotificationQueue,
}

impl SessionContext {
    pub fn new(
        config: Config,
        plugins: Arc<PluginRegistry>,
        parser: Arc<dyn Parser>,
        identity: Arc<dyn IdentityStore>,
        keys: Arc<dyn KeyStore>,
    ) -> Self {
        Self {
            config,
            plugins,
            parser,
            identity,
            keys,
            notifications: NotificationQueue::new(),
        }
    }

    pub fn with_notifications(mut self, queue: NotificationQueue) -> Self {
        self.notifications = queue;
        self
    }
}

/// Point-in-time summary of one session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub session_id: String,
    pub username: String,
    pub client_id: String,
    pub created: DateTime<Utc>,
    pub last_reloaded: DateTime<Utc>,
    pub commands: usize,
    pub idle_secs: u64,
}

pub struct Session {
    id: String,
    username: String,
    client_id: String,
    created: DateTime<Utc>,
    last_reloaded: Mutex<DateTime<Utc>>,
    last_active: Mutex<Instant>,
    commands: Mutex<HashMap<Uuid, Command>>,
    arguments: ArgumentSet,
    user: RwLock<Option<UserRecord>>,
    client: RwLock<Option<ClientRecord>>,
    ready: AtomicBool,
    queued: AtomicBool,
    /// Held for the whole of a dispatch so commands run in arrival order.
    turn: tokio::sync::Mutex<()>,
    ctx: Arc<SessionContext>,
    registry: Weak<Registry>,
}

impl Session {
    pub(crate) fn new(
        username: String,
        client_id: String,
        user: UserRecord,
        client: ClientRecord,
        ctx: Arc<SessionContext>,
        registry: Weak<Registry>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            username,
            client_id,
            created: now,
            last_reloaded: Mutex::new(now),
            last_active: Mutex::new(Instant::now()),
            commands: Mutex::new(HashMap::new()),
            arguments: ArgumentSet::new(),
            user: RwLock::new(Some(user)),
            client: RwLock::new(Some(client)),
            ready: AtomicBool::new(false),
            queued: AtomicBool::new(false),
            turn: tokio::sync::Mutex::new(()),
            ctx,
            registry,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn last_reloaded(&self) -> DateTime<Utc> {
        *self.last_reloaded.lock()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    pub fn arguments(&self) -> &ArgumentSet {
        &self.arguments
    }

    pub fn command_count(&self) -> usize {
        self.commands.lock().len()
    }

    /// A copy of a stored command.
    pub fn get_command(&self, uid: &Uuid) -> Option<Command> {
        self.commands.lock().get(uid).cloned()
    }

    fn store(&self, command: Command) {
        self.commands.lock().insert(command.uid, command);
    }

    fn touch(&self) {
        *self.last_active.lock() = Instant::now();
    }

    /// Time since the session was created or last received input.
    pub fn age(&self) -> Duration {
        self.age_at(Instant::now())
    }

    pub fn age_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(*self.last_active.lock())
    }

    fn is_admin(&self) -> bool {
        self.client
            .read()
            .as_ref()
            .is_some_and(|c| c.has_scope(ADMIN_SCOPE))
    }

    fn user_setting(&self, name: &str) -> Option<String> {
        self.user.read().as_ref().and_then(|u| u.setting_str(name))
    }

    /// Claim the single rebuild-queue slot. False if already queued.
    pub(crate) fn try_queue(&self) -> bool {
        !self.queued.swap(true, Ordering::SeqCst)
    }

    /// Reload missing user/client records, then rebuild every argument.
    /// Returns the number of arguments that failed.
    pub async fn rebuild(&self) -> usize {
        self.refresh_records().await;
        let user = self.user.read().clone();
        let client = self.client.read().clone();
        let ctx = BuildContext {
            session_id: &self.id,
            username: &self.username,
            client_id: &self.client_id,
            created: self.created,
            user: user.as_ref(),
            client: client.as_ref(),
            keys: self.ctx.keys.as_ref(),
            timeout: self.ctx.config.arguments.build_timeout(),
        };
        let failed = self.arguments.build_all(&ctx).await;
        self.queued.store(false, Ordering::SeqCst);
        failed
    }

    async fn refresh_records(&self) {
        let need_user = self.user.read().is_none();
        if need_user {
            match self.ctx.identity.find_user(&self.username).await {
                Ok(Some(user)) => *self.user.write() = Some(user),
                Ok(None) => warn!(session_id = %self.id, username = %self.username, "user no longer exists"),
                Err(e) => warn!(session_id = %self.id, error = %e, "user lookup failed"),
            }
        }
        let need_client = self.client.read().is_none();
        if need_client {
            match self.ctx.identity.find_client(&self.client_id).await {
                Ok(Some(client)) => *self.client.write() = Some(client),
                Ok(None) => warn!(session_id = %self.id, client_id = %self.client_id, "client no longer exists"),
                Err(e) => warn!(session_id = %self.id, error = %e, "client lookup failed"),
            }
        }
    }

    /// Re-fetch whatever [`reload`](Self::reload) invalidated. Called by
    /// dispatch under the turn lock, so a reload is visible to the very
    /// next command.
    pub(crate) async fn ensure_current(&self) {
        if self.arguments.is_stale() {
            let failed = self.rebuild().await;
            debug!(session_id = %self.id, failed, "stale argument cache rebuilt on access");
        } else {
            self.refresh_records().await;
        }
    }

    /// Drop cached records and mark the argument cache stale. The next
    /// command, or failing that the next manager scan, recomputes them.
    pub fn reload(&self) {
        *self.user.write() = None;
        *self.client.write() = None;
        self.arguments.mark_stale();
        *self.last_reloaded.lock() = Utc::now();
        info!(session_id = %self.id, "session reloaded");
    }

    /// Remove the session from the live registry.
    ///
    /// Clears the user's online flag when this was their last session.
    /// Returns false, and logs, if the session was already gone.
    pub async fn logout(&self) -> bool {
        let removed = self
            .registry
            .upgrade()
            .and_then(|registry| registry.remove(&self.id).map(|_| registry));
        let Some(registry) = removed else {
            error!(session_id = %self.id, username = %self.username, "logout of a session that is not live");
            return false;
        };
        self.ready.store(false, Ordering::SeqCst);

        if !registry.has_user(&self.username)
            && let Err(e) = self.ctx.identity.set_online(&self.username, false).await
        {
            warn!(username = %self.username, error = %e, "failed to clear online flag");
        }
        info!(session_id = %self.id, username = %self.username, "session closed");
        true
    }

    pub fn report(&self) -> SessionReport {
        SessionReport {
            session_id: self.id.clone(),
            username: self.username.clone(),
            client_id: self.client_id.clone(),
            created: self.created,
            last_reloaded: self.last_reloaded(),
            commands: self.command_count(),
            idle_secs: self.age().as_secs(),
        }
    }

    /// Queue a notification for this session's user. Returns its uid.
    pub fn notify(
        &self,
        message: &str,
        title: &str,
        trigger_time: DateTime<Utc>,
        scope: &str,
    ) -> Uuid {
        let notification = Notification::new(&self.username, title, message, trigger_time, scope);
        let uid = notification.uid;
        self.ctx.notifications.push(notification);
        uid
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("client_id", &self.client_id)
            .field("ready", &self.is_ready())
            .finish()
    }
}
