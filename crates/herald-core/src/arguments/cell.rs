//! One cached argument value.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use parking_lot::{Mutex, RwLock};
use serde_json::json;
use tracing::{debug, warn};

use herald_plugin::{ArgValue, ArgumentKind, Command};
use herald_types::records::{ClientRecord, UserRecord};
use herald_types::response::{ErrorObject, ResponseCode, status};

use crate::stores::KeyStore;

/// Outcome of the most recent build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    Untried,
    Successful,
    /// Human-readable reason the value could not be built.
    Failed(String),
}

impl BuildStatus {
    pub fn is_successful(&self) -> bool {
        matches!(self, BuildStatus::Successful)
    }
}

/// Everything a build may read. Assembled by the session before a rebuild.
pub struct BuildContext<'a> {
    pub session_id: &'a str,
    pub username: &'a str,
    pub client_id: &'a str,
    pub created: DateTime<Utc>,
    pub user: Option<&'a UserRecord>,
    pub client: Option<&'a ClientRecord>,
    pub keys: &'a dyn KeyStore,
    pub timeout: Duration,
}

/// An immutable view of a cell. Rebuilds replace the whole snapshot.
#[derive(Debug, Clone)]
pub struct ArgumentSnapshot {
    pub status: BuildStatus,
    pub value: Option<ArgValue>,
    pub built_at: Option<DateTime<Utc>>,
}

impl ArgumentSnapshot {
    fn untried() -> Self {
        Self {
            status: BuildStatus::Untried,
            value: None,
            built_at: None,
        }
    }
}

struct Failure {
    code: ResponseCode,
    text: String,
    status: u16,
}

impl Failure {
    fn setting(name: &str) -> Self {
        Self {
            code: ResponseCode::SettingArgumentInvalid,
            text: format!("Couldn't find setting {name} for user"),
            status: status::CONFLICT,
        }
    }

    fn internal(text: String) -> Self {
        Self {
            code: ResponseCode::ArgumentBuildFailed,
            text,
            status: status::INTERNAL_SERVER_ERROR,
        }
    }
}

pub struct ArgumentCell {
    kind: ArgumentKind,
    snapshot: RwLock<Arc<ArgumentSnapshot>>,
    errors: Mutex<Vec<ErrorObject>>,
}

impl ArgumentCell {
    pub fn new(kind: ArgumentKind) -> Self {
        Self {
            kind,
            snapshot: RwLock::new(Arc::new(ArgumentSnapshot::untried())),
            errors: Mutex::new(Vec::new()),
        }
    }

    pub fn kind(&self) -> ArgumentKind {
        self.kind
    }

    /// The current snapshot. Never blocks on a running build.
    pub fn snapshot(&self) -> Arc<ArgumentSnapshot> {
        Arc::clone(&self.snapshot.read())
    }

    pub fn status(&self) -> BuildStatus {
        self.snapshot().status.clone()
    }

    /// Recompute the value and publish a new snapshot.
    ///
    /// Failures, including a timeout, become a `Failed` status plus a
    /// logged error entry; this never returns an error.
    pub async fn build(&self, ctx: &BuildContext<'_>) -> BuildStatus {
        let result = match tokio::time::timeout(ctx.timeout, self.compute(ctx)).await {
            Ok(result) => result,
            Err(_) => Err(Failure::internal(format!(
                "Build for argument {} timed out after {}s",
                self.kind,
                ctx.timeout.as_secs()
            ))),
        };

        let snapshot = match result {
            Ok(value) => {
                self.errors.lock().clear();
                ArgumentSnapshot {
                    status: BuildStatus::Successful,
                    value,
                    built_at: Some(Utc::now()),
                }
            }
            Err(failure) => {
                warn!(
                    session_id = %ctx.session_id,
                    argument = %self.kind,
                    reason = %failure.text,
                    "argument build failed"
                );
                self.errors
                    .lock()
                    .push(ErrorObject::coded(failure.code, failure.text.clone(), failure.status));
                ArgumentSnapshot {
                    status: BuildStatus::Failed(failure.text),
                    value: None,
                    built_at: Some(Utc::now()),
                }
            }
        };

        let status = snapshot.status.clone();
        *self.snapshot.write() = Arc::new(snapshot);
        status
    }

    async fn compute(&self, ctx: &BuildContext<'_>) -> Result<Option<ArgValue>, Failure> {
        let value = match self.kind {
            ArgumentKind::CommandObject
            | ArgumentKind::CommandText
            | ArgumentKind::CommandParsed
            | ArgumentKind::CommandCreated
            | ArgumentKind::CommandUid => return Ok(None),
            ArgumentKind::SessionData => ArgValue::Json(json!({
                "session_id": ctx.session_id,
                "username": ctx.username,
                "client_id": ctx.client_id,
                "created": ctx.created.to_rfc3339(),
            })),
            ArgumentKind::UserData => {
                let user = ctx.user.ok_or_else(|| {
                    Failure::internal(format!("Couldn't load user record for {}", ctx.username))
                })?;
                let json = serde_json::to_value(user)
                    .map_err(|e| Failure::internal(format!("User record unusable: {e}")))?;
                ArgValue::Json(json)
            }
            ArgumentKind::ClientId => ArgValue::Text(ctx.client_id.to_string()),
            ArgumentKind::TempUnit => ArgValue::Text(user_setting(ctx, "temp_unit")?),
            ArgumentKind::Location => {
                match ctx.client.and_then(|c| c.location.clone()) {
                    Some(location) => ArgValue::Text(location),
                    None => ArgValue::Text(user_setting(ctx, "location")?),
                }
            }
            ArgumentKind::TimeZone => {
                let raw = user_setting(ctx, "timezone")?;
                let offset = parse_offset(&raw).ok_or_else(|| Failure {
                    code: ResponseCode::SettingArgumentInvalid,
                    text: format!("Setting timezone has unrecognised value {raw}"),
                    status: status::CONFLICT,
                })?;
                ArgValue::Time(Utc::now().with_timezone(&offset))
            }
            ArgumentKind::WeatherApi | ArgumentKind::WolframApi => {
                let key_type = self.kind.key_type().unwrap_or_default();
                match ctx.keys.next_key(key_type).await {
                    Ok(Some(key)) => {
                        debug!(key_type, usage = key.usage_count, "key drawn");
                        ArgValue::Key(key)
                    }
                    Ok(None) => {
                        return Err(Failure {
                            code: ResponseCode::KeyNotAvailable,
                            text: format!("No valid API keys found of type {key_type}"),
                            status: status::SERVICE_UNAVAILABLE,
                        });
                    }
                    Err(e) => return Err(Failure::internal(format!("Key store error: {e}"))),
                }
            }
        };
        Ok(Some(value))
    }

    /// The value for `command`. Command-scoped kinds read from `command`;
    /// the rest come from the snapshot. Never builds.
    pub fn value(&self, command: &Command) -> Option<ArgValue> {
        self.value_from(&self.snapshot(), command)
    }

    /// Like [`value`](Self::value), but reads a snapshot the caller already
    /// holds so the status it checked and the value it gets agree.
    pub fn value_from(&self, snapshot: &ArgumentSnapshot, command: &Command) -> Option<ArgValue> {
        match self.kind {
            ArgumentKind::CommandObject => Some(ArgValue::Command(Box::new(command.clone()))),
            ArgumentKind::CommandText => Some(ArgValue::Text(command.text.clone())),
            ArgumentKind::CommandParsed => Some(ArgValue::Parsed(command.parsed.clone())),
            ArgumentKind::CommandCreated => Some(ArgValue::Time(command.created.into())),
            ArgumentKind::CommandUid => Some(ArgValue::Uid(command.uid)),
            ArgumentKind::TimeZone => match &snapshot.value {
                Some(ArgValue::Time(t)) => Some(ArgValue::Time(Utc::now().with_timezone(t.offset()))),
                other => other.clone(),
            },
            _ => snapshot.value.clone(),
        }
    }

    /// Remove and return the accumulated error entries.
    pub fn take_errors(&self) -> Vec<ErrorObject> {
        std::mem::take(&mut *self.errors.lock())
    }
}

fn user_setting(ctx: &BuildContext<'_>, name: &str) -> Result<String, Failure> {
    ctx.user
        .and_then(|u| u.setting_str(name))
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| Failure::setting(name))
}

/// Parse `UTC`, `Z`, or a fixed `±HH:MM` / `±HHMM` offset.
pub fn parse_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("utc") || raw.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0);
    }
    let (sign, rest) = match raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
