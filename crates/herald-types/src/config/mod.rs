//! Configuration schema types.
//!
//! All structs accept both `snake_case` and `camelCase` field names via
//! `#[serde(alias)]`, and every section defaults, so an empty JSON object
//! is a valid configuration. Unknown fields are ignored.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HeraldError, Result};

// ── Root config ──────────────────────────────────────────────────────────

/// Root configuration for herald.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Session lifecycle thresholds.
    #[serde(default)]
    pub sessions: SessionsConfig,

    /// Background loop intervals of the session manager.
    #[serde(default)]
    pub manager: ManagerConfig,

    /// Dispatch settings.
    #[serde(default)]
    pub plugins: PluginsConfig,

    /// Argument build settings.
    #[serde(default)]
    pub arguments: ArgumentsConfig,

    /// API key rotation settings.
    #[serde(default)]
    pub keys: KeysConfig,

    /// Notification delivery settings.
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

impl Config {
    /// Check semantic constraints that serde cannot express.
    ///
    /// A failure here is a configuration error and must stop start-up.
    pub fn validate(&self) -> Result<()> {
        let intervals = [
            ("sessions.inactivity_timeout_secs", self.sessions.inactivity_timeout_secs),
            ("sessions.refresh_interval_secs", self.sessions.refresh_interval_secs),
            ("manager.state_poll_secs", self.manager.state_poll_secs),
            ("manager.cache_poll_secs", self.manager.cache_poll_secs),
            ("plugins.exec_timeout_secs", self.plugins.exec_timeout_secs),
            ("arguments.build_timeout_secs", self.arguments.build_timeout_secs),
            ("keys.rotation_period_secs", self.keys.rotation_period_secs),
            ("notifications.poll_secs", self.notifications.poll_secs),
        ];
        for (field, value) in intervals {
            if value == 0 {
                return Err(HeraldError::ConfigInvalid {
                    reason: format!("{field} must be greater than zero"),
                });
            }
        }

        let threshold = self.plugins.similarity_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(HeraldError::ConfigInvalid {
                reason: format!(
                    "plugins.similarity_threshold must be in (0, 1], got {threshold}"
                ),
            });
        }

        if let Some(name) = &self.plugins.default_plugin
            && name.trim().is_empty()
        {
            return Err(HeraldError::ConfigInvalid {
                reason: "plugins.default_plugin must not be blank".into(),
            });
        }

        Ok(())
    }
}

// ── Sessions ─────────────────────────────────────────────────────────────

/// Session lifecycle thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Idle seconds after which a session is logged out.
    #[serde(default = "default_inactivity_timeout", alias = "inactivityTimeoutSecs")]
    pub inactivity_timeout_secs: u64,

    /// Age in seconds after which a session's argument cache is rebuilt.
    #[serde(default = "default_refresh_interval", alias = "refreshIntervalSecs")]
    pub refresh_interval_secs: u64,

    /// Seconds a command stays open for a follow-up reply.
    #[serde(default = "default_response_window", alias = "responseWindowSecs")]
    pub response_window_secs: u64,
}

impl SessionsConfig {
    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn response_window(&self) -> Duration {
        Duration::from_secs(self.response_window_secs)
    }

    /// The reply window as a `chrono::TimeDelta`, saturating at
    /// `TimeDelta::MAX` for windows chrono cannot represent.
    pub fn response_window_delta(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::from_std(self.response_window()).unwrap_or(chrono::TimeDelta::MAX)
    }
}

fn default_inactivity_timeout() -> u64 {
    900
}
fn default_refresh_interval() -> u64 {
    900
}
fn default_response_window() -> u64 {
    300
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout_secs: default_inactivity_timeout(),
            refresh_interval_secs: default_refresh_interval(),
            response_window_secs: default_response_window(),
        }
    }
}

// ── Manager ──────────────────────────────────────────────────────────────

/// Poll intervals for the session manager's background loops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Seconds between state monitor scans.
    #[serde(default = "default_state_poll", alias = "statePollSecs")]
    pub state_poll_secs: u64,

    /// Seconds between cache manager drains.
    #[serde(default = "default_cache_poll", alias = "cachePollSecs")]
    pub cache_poll_secs: u64,
}

impl ManagerConfig {
    pub fn state_poll(&self) -> Duration {
        Duration::from_secs(self.state_poll_secs)
    }

    pub fn cache_poll(&self) -> Duration {
        Duration::from_secs(self.cache_poll_secs)
    }
}

fn default_state_poll() -> u64 {
    10
}
fn default_cache_poll() -> u64 {
    2
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            state_poll_secs: default_state_poll(),
            cache_poll_secs: default_cache_poll(),
        }
    }
}

// ── Plugins ──────────────────────────────────────────────────────────────

/// Dispatch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginsConfig {
    /// Plugin run when nothing matches. A user's `default_plugin` setting
    /// takes precedence.
    #[serde(default, alias = "defaultPlugin")]
    pub default_plugin: Option<String>,

    /// Deadline for a single `exec()` / `response()` call.
    #[serde(default = "default_exec_timeout", alias = "execTimeoutSecs")]
    pub exec_timeout_secs: u64,

    /// Minimum phrase similarity for similarity-based matchers.
    #[serde(default = "default_similarity_threshold", alias = "similarityThreshold")]
    pub similarity_threshold: f32,
}

impl PluginsConfig {
    pub fn exec_timeout(&self) -> Duration {
        Duration::from_secs(self.exec_timeout_secs)
    }
}

fn default_exec_timeout() -> u64 {
    30
}
fn default_similarity_threshold() -> f32 {
    0.96
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            default_plugin: None,
            exec_timeout_secs: default_exec_timeout(),
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

// ── Arguments ────────────────────────────────────────────────────────────

/// Argument build settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgumentsConfig {
    /// Deadline for one argument `build()`.
    #[serde(default = "default_build_timeout", alias = "buildTimeoutSecs")]
    pub build_timeout_secs: u64,
}

impl ArgumentsConfig {
    pub fn build_timeout(&self) -> Duration {
        Duration::from_secs(self.build_timeout_secs)
    }
}

fn default_build_timeout() -> u64 {
    10
}

impl Default for ArgumentsConfig {
    fn default() -> Self {
        Self {
            build_timeout_secs: default_build_timeout(),
        }
    }
}

// ── Keys ─────────────────────────────────────────────────────────────────

/// API key rotation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysConfig {
    /// Length of a usage period; `max_uses` counters reset at each boundary.
    #[serde(default = "default_rotation_period", alias = "rotationPeriodSecs")]
    pub rotation_period_secs: u64,
}

impl KeysConfig {
    pub fn rotation_period(&self) -> Duration {
        Duration::from_secs(self.rotation_period_secs)
    }
}

fn default_rotation_period() -> u64 {
    86_400
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            rotation_period_secs: default_rotation_period(),
        }
    }
}

// ── Notifications ────────────────────────────────────────────────────────

/// Notification delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Seconds between checks for due notifications.
    #[serde(default = "default_notification_poll", alias = "pollSecs")]
    pub poll_secs: u64,
}

impl NotificationsConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_secs)
    }
}

fn default_notification_poll() -> u64 {
    5
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            poll_secs: default_notification_poll(),
        }
    }
}
