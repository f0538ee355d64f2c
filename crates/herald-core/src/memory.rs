//! In-process collaborator implementations.
//!
//! Used by the CLI (seeded from a JSON directory file) and as test fakes.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use tracing::{debug, info};

use herald_types::Result;
use herald_types::records::{ApiKey, ClientRecord, Notification, UserRecord};

use crate::stores::{IdentityStore, KeyStore, NotificationSink, StoreError, StoreResult};

// ── Directory file ───────────────────────────────────────────────────────

/// Seed data for the in-memory stores.
///
/// ```json
/// {
///   "users":   [{"username": "ada", "settings": {"temp_unit": "celsius"}}],
///   "clients": [{"client_id": "cli", "scopes": ["admin"]}],
///   "keys":    [{"key_type": "weather", "value": "...", "max_uses": 1000}]
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Directory {
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub clients: Vec<ClientRecord>,
    #[serde(default)]
    pub keys: Vec<ApiKey>,
}

impl Directory {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let directory: Directory = serde_json::from_str(&contents)?;
        info!(
            path = %path.display(),
            users = directory.users.len(),
            clients = directory.clients.len(),
            keys = directory.keys.len(),
            "loaded directory"
        );
        Ok(directory)
    }
}

// ── Identity ─────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryIdentityStore {
    users: RwLock<HashMap<String, UserRecord>>,
    clients: RwLock<HashMap<String, ClientRecord>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_directory(directory: &Directory) -> Self {
        let store = Self::new();
        for user in &directory.users {
            store.insert_user(user.clone());
        }
        for client in &directory.clients {
            store.insert_client(client.clone());
        }
        store
    }

    pub fn insert_user(&self, user: UserRecord) {
        self.users.write().insert(user.username.clone(), user);
    }

    pub fn insert_client(&self, client: ClientRecord) {
        self.clients.write().insert(client.client_id.clone(), client);
    }

    /// Snapshot of a stored user.
    pub fn user(&self, username: &str) -> Option<UserRecord> {
        self.users.read().get(username).cloned()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_user(&self, username: &str) -> StoreResult<Option<UserRecord>> {
        Ok(self.user(username))
    }

    async fn find_client(&self, client_id: &str) -> StoreResult<Option<ClientRecord>> {
        Ok(self.clients.read().get(client_id).cloned())
    }

    async fn set_online(&self, username: &str, online: bool) -> StoreResult<()> {
        match self.users.write().get_mut(username) {
            Some(user) => {
                user.online = online;
                Ok(())
            }
            None => Err(StoreError::Invalid(format!("no user named {username}"))),
        }
    }
}

// ── Keys ─────────────────────────────────────────────────────────────────

struct KeyPools {
    pools: HashMap<String, Vec<ApiKey>>,
    period_started: Instant,
}

/// Key pools with per-period usage limits.
///
/// Each call picks the non-exhausted key with the fewest uses this period
/// (ties go to the earlier key) and counts one use against it. All counters
/// reset once `rotation_period` has elapsed since the period started.
pub struct MemoryKeyStore {
    state: Mutex<KeyPools>,
    rotation_period: Duration,
}

impl MemoryKeyStore {
    pub fn new(keys: Vec<ApiKey>, rotation_period: Duration) -> Self {
        let mut pools: HashMap<String, Vec<ApiKey>> = HashMap::new();
        for key in keys {
            pools.entry(key.key_type.clone()).or_default().push(key);
        }
        Self {
            state: Mutex::new(KeyPools {
                pools,
                period_started: Instant::now(),
            }),
            rotation_period,
        }
    }

    /// Reset every usage counter and start a new period.
    pub fn reset_usage(&self) {
        let mut state = self.state.lock();
        reset(&mut state);
    }

    /// Uses counted against each key of `key_type`, in pool order.
    pub fn usage(&self, key_type: &str) -> Vec<u32> {
        self.state
            .lock()
            .pools
            .get(key_type)
            .map(|pool| pool.iter().map(|k| k.usage_count).collect())
            .unwrap_or_default()
    }
}

fn reset(state: &mut KeyPools) {
    for key in state.pools.values_mut().flatten() {
        key.usage_count = 0;
    }
    state.period_started = Instant::now();
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn next_key(&self, key_type: &str) -> StoreResult<Option<ApiKey>> {
        let mut state = self.state.lock();
        if state.period_started.elapsed() >= self.rotation_period {
            debug!("key rotation period elapsed, resetting usage");
            reset(&mut state);
        }

        let Some(pool) = state.pools.get_mut(key_type) else {
            return Ok(None);
        };
        let chosen = pool
            .iter_mut()
            .filter(|k| k.available())
            .min_by_key(|k| k.usage_count);
        Ok(chosen.map(|key| {
            key.usage_count += 1;
            key.clone()
        }))
    }
}

// ── Notifications ────────────────────────────────────────────────────────

/// Collects delivered notifications. Can be told to reject deliveries.
#[derive(Default)]
pub struct MemorySink {
    delivered: Mutex<Vec<Notification>>,
    reject: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_rejecting(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    pub fn delivered(&self) -> Vec<Notification> {
        self.delivered.lock().clone()
    }
}

#[async_trait]
impl NotificationSink for MemorySink {
    async fn deliver(&self, notification: &Notification) -> StoreResult<()> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected("sink is rejecting deliveries".into()));
        }
        self.delivered.lock().push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(max: Option<u32>) -> MemoryKeyStore {
        MemoryKeyStore::new(
            vec![
                ApiKey::new("wolfram", "k1", max),
                ApiKey::new("wolfram", "k2", max),
                ApiKey::new("weather", "w1", None),
            ],
            Duration::from_secs(86_400),
        )
    }

    #[tokio::test]
    async fn rotation_picks_least_used() {
        let store = keys(Some(10));
        let first = store.next_key("wolfram").await.unwrap().unwrap();
        let second = store.next_key("wolfram").await.unwrap().unwrap();
        let third = store.next_key("wolfram").await.unwrap().unwrap();
        assert_eq!(first.value.expose(), "k1");
        assert_eq!(second.value.expose(), "k2");
        assert_eq!(third.value.expose(), "k1");
        assert_eq!(store.usage("wolfram"), vec![2, 1]);
    }

    #[tokio::test]
    async fn exhausted_pool_returns_none() {
        let store = keys(Some(1));
        assert!(store.next_key("wolfram").await.unwrap().is_some());
        assert!(store.next_key("wolfram").await.unwrap().is_some());
        assert!(store.next_key("wolfram").await.unwrap().is_none());
        assert_eq!(store.usage("wolfram"), vec![1, 1]);

        store.reset_usage();
        assert!(store.next_key("wolfram").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unknown_pool_returns_none() {
        assert!(keys(None).next_key("spotify").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn period_elapsed_resets_counters() {
        let store = MemoryKeyStore::new(
            vec![ApiKey::new("wolfram", "k1", Some(1))],
            Duration::ZERO,
        );
        assert!(store.next_key("wolfram").await.unwrap().is_some());
        assert!(store.next_key("wolfram").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn identity_online_flag() {
        let store = MemoryIdentityStore::new();
        store.insert_user(UserRecord::new("ada"));
        store.set_online("ada", true).await.unwrap();
        assert!(store.user("ada").unwrap().online);
        assert!(store.set_online("bob", true).await.is_err());
        assert!(store.find_client("cli").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sink_rejects_when_told() {
        let sink = MemorySink::new();
        let n = Notification::new("ada", "t", "m", chrono::Utc::now(), "all");
        sink.deliver(&n).await.unwrap();
        sink.set_rejecting(true);
        assert!(sink.deliver(&n).await.is_err());
        assert_eq!(sink.delivered().len(), 1);
    }

    #[test]
    fn directory_loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("directory.json");
        std::fs::write(
            &path,
            r#"{
                "users": [{"username": "ada", "settings": {"temp_unit": "celsius"}}],
                "clients": [{"clientId": "cli", "scopes": ["admin"]}],
                "keys": [{"key_type": "weather", "value": "w1", "max_uses": 5}]
            }"#,
        )
        .unwrap();

        let directory = Directory::load(&path).unwrap();
        assert_eq!(directory.users.len(), 1);
        assert_eq!(directory.keys[0].max_uses, Some(5));

        let identity = MemoryIdentityStore::from_directory(&directory);
        assert!(identity.user("ada").is_some());
    }
}
