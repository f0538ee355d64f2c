//! Records exchanged with the external identity, key and notification stores.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user as returned by the identity store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,

    #[serde(default, alias = "firstName")]
    pub first_name: String,

    #[serde(default, alias = "lastName")]
    pub last_name: String,

    /// Free-form settings (`temp_unit`, `timezone`, `location`,
    /// `default_plugin`, ...).
    #[serde(default)]
    pub settings: HashMap<String, serde_json::Value>,

    /// Whether the user has at least one live session.
    #[serde(default)]
    pub online: bool,
}

impl UserRecord {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            first_name: String::new(),
            last_name: String::new(),
            settings: HashMap::new(),
            online: false,
        }
    }

    /// Builder-style setting insert.
    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// A setting rendered as a string, if present and scalar.
    pub fn setting_str(&self, key: &str) -> Option<String> {
        match self.settings.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// A registered client application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRecord {
    #[serde(alias = "clientId")]
    pub client_id: String,

    /// Location reported by the client, if it provides one.
    #[serde(default)]
    pub location: Option<String>,

    /// Authorization scopes granted to the client (`"admin"`, ...).
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl ClientRecord {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            location: None,
            scopes: Vec::new(),
        }
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}

/// An API key value that never shows up in logs or `Debug` output.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct KeyValue(String);

impl KeyValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw key, for handing to the plugin that calls the upstream API.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"[REDACTED]\"")
    }
}

impl Serialize for KeyValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("")
    }
}

/// One API key handed out by the key store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKey {
    /// Pool this key belongs to (`"weather"`, `"wolfram"`, ...).
    #[serde(alias = "keyType")]
    pub key_type: String,

    pub value: KeyValue,

    /// Uses consumed in the current period, including the one that
    /// returned this record.
    #[serde(default, alias = "usageCount")]
    pub usage_count: u32,

    /// Uses allowed per period; `None` is unlimited.
    #[serde(default, alias = "maxUses")]
    pub max_uses: Option<u32>,

    #[serde(default, alias = "endpointUrl")]
    pub endpoint_url: Option<String>,
}

impl ApiKey {
    pub fn new(key_type: impl Into<String>, value: impl Into<String>, max_uses: Option<u32>) -> Self {
        Self {
            key_type: key_type.into(),
            value: KeyValue::new(value),
            usage_count: 0,
            max_uses,
            endpoint_url: None,
        }
    }

    /// Whether another use is allowed in the current period.
    pub fn available(&self) -> bool {
        self.max_uses.is_none_or(|max| self.usage_count < max)
    }
}

/// A message scheduled for delivery to a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub uid: Uuid,
    pub user: String,
    pub title: String,
    pub message: String,
    pub trigger_time: DateTime<Utc>,
    /// Which of the user's clients should receive it (`"all"` for every one).
    pub scope: String,
    #[serde(default)]
    pub summary: Option<String>,
    pub created: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        user: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
        trigger_time: DateTime<Utc>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            uid: Uuid::new_v4(),
            user: user.into(),
            title: title.into(),
            message: message.into(),
            trigger_time,
            scope: scope.into(),
            summary: None,
            created: Utc::now(),
        }
    }

    /// Whether the trigger time has passed at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.trigger_time
    }

    /// The explicit summary, or the first five words of the message.
    pub fn summary(&self) -> String {
        if let Some(summary) = &self.summary {
            return summary.clone();
        }
        self.message
            .split_whitespace()
            .take(5)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn key_value_is_redacted() {
        let key = ApiKey::new("weather", "s3cret", Some(10));
        let debug = format!("{key:?}");
        assert!(!debug.contains("s3cret"));
        assert_eq!(key.value.expose(), "s3cret");
        assert_eq!(serde_json::to_value(&key.value).unwrap(), "");
    }

    #[test]
    fn key_availability() {
        let mut key = ApiKey::new("wolfram", "k", Some(2));
        assert!(key.available());
        key.usage_count = 2;
        assert!(!key.available());

        let unlimited = ApiKey {
            usage_count: 10_000,
            ..ApiKey::new("wolfram", "k", None)
        };
        assert!(unlimited.available());
    }

    #[test]
    fn setting_str_renders_scalars() {
        let user = UserRecord::new("ada")
            .with_setting("temp_unit", "celsius")
            .with_setting("retries", 3)
            .with_setting("nested", serde_json::json!({"a": 1}));
        assert_eq!(user.setting_str("temp_unit").as_deref(), Some("celsius"));
        assert_eq!(user.setting_str("retries").as_deref(), Some("3"));
        assert!(user.setting_str("nested").is_none());
        assert!(user.setting_str("missing").is_none());
    }

    #[test]
    fn notification_summary_takes_five_words() {
        let n = Notification::new(
            "ada",
            "Reminder",
            "take the bread out of the oven now",
            Utc::now(),
            "all",
        );
        assert_eq!(n.summary(), "take the bread out of");

        let short = Notification::new("ada", "", "hi", Utc::now(), "all");
        assert_eq!(short.summary(), "hi");
    }

    #[test]
    fn notification_due() {
        let now = Utc::now();
        let n = Notification::new("ada", "", "m", now + Duration::seconds(30), "all");
        assert!(!n.is_due(now));
        assert!(n.is_due(now + Duration::seconds(30)));
    }

    #[test]
    fn client_scopes() {
        let client = ClientRecord {
            scopes: vec!["admin".into()],
            ..ClientRecord::new("cli")
        };
        assert!(client.has_scope("admin"));
        assert!(!ClientRecord::new("web").has_scope("admin"));
    }
}
