//! Argument kinds a plugin can declare, and the values they resolve to.
//!
//! The set of kinds is closed. `herald-core` owns the cache cells that
//! build them; plugins only see the resolved [`ResolvedArgs`].

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, FixedOffset};
use herald_types::records::ApiKey;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::command::Command;
use crate::error::PluginError;
use crate::parsed::ParsedText;

/// Every argument kind the dispatcher knows how to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ArgumentKind {
    SessionData,
    CommandObject,
    CommandText,
    CommandParsed,
    CommandCreated,
    CommandUid,
    UserData,
    ClientId,
    TempUnit,
    Location,
    TimeZone,
    #[serde(rename = "WeatherAPI")]
    WeatherApi,
    #[serde(rename = "WolframAPI")]
    WolframApi,
}

impl ArgumentKind {
    pub const ALL: [ArgumentKind; 13] = [
        ArgumentKind::SessionData,
        ArgumentKind::CommandObject,
        ArgumentKind::CommandText,
        ArgumentKind::CommandParsed,
        ArgumentKind::CommandCreated,
        ArgumentKind::CommandUid,
        ArgumentKind::UserData,
        ArgumentKind::ClientId,
        ArgumentKind::TempUnit,
        ArgumentKind::Location,
        ArgumentKind::TimeZone,
        ArgumentKind::WeatherApi,
        ArgumentKind::WolframApi,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ArgumentKind::SessionData => "SessionData",
            ArgumentKind::CommandObject => "CommandObject",
            ArgumentKind::CommandText => "CommandText",
            ArgumentKind::CommandParsed => "CommandParsed",
            ArgumentKind::CommandCreated => "CommandCreated",
            ArgumentKind::CommandUid => "CommandUID",
            ArgumentKind::UserData => "UserData",
            ArgumentKind::ClientId => "ClientID",
            ArgumentKind::TempUnit => "TempUnit",
            ArgumentKind::Location => "Location",
            ArgumentKind::TimeZone => "TimeZone",
            ArgumentKind::WeatherApi => "WeatherAPI",
            ArgumentKind::WolframApi => "WolframAPI",
        }
    }

    /// Kinds read straight from the command at resolve time.
    pub fn is_command_scoped(&self) -> bool {
        matches!(
            self,
            ArgumentKind::CommandObject
                | ArgumentKind::CommandText
                | ArgumentKind::CommandParsed
                | ArgumentKind::CommandCreated
                | ArgumentKind::CommandUid
        )
    }

    /// Key pool backing an API-key kind.
    pub fn key_type(&self) -> Option<&'static str> {
        match self {
            ArgumentKind::WeatherApi => Some("weather"),
            ArgumentKind::WolframApi => Some("wolfram"),
            _ => None,
        }
    }

    /// User setting backing a setting-derived kind.
    pub fn setting(&self) -> Option<&'static str> {
        match self {
            ArgumentKind::TempUnit => Some("temp_unit"),
            ArgumentKind::Location => Some("location"),
            ArgumentKind::TimeZone => Some("timezone"),
            _ => None,
        }
    }
}

impl fmt::Display for ArgumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A resolved argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Text(String),
    Json(serde_json::Value),
    Time(DateTime<FixedOffset>),
    Uid(Uuid),
    Parsed(ParsedText),
    Command(Box<Command>),
    Key(ApiKey),
}

/// The arguments handed to `exec()` / `response()`, keyed by kind.
#[derive(Debug, Clone, Default)]
pub struct ResolvedArgs {
    values: HashMap<ArgumentKind, ArgValue>,
}

impl ResolvedArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: ArgumentKind, value: ArgValue) {
        self.values.insert(kind, value);
    }

    pub fn get(&self, kind: ArgumentKind) -> Option<&ArgValue> {
        self.values.get(&kind)
    }

    pub fn contains(&self, kind: ArgumentKind) -> bool {
        self.values.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The value for `kind`, or [`PluginError::MissingArgument`].
    pub fn require(&self, kind: ArgumentKind) -> Result<&ArgValue, PluginError> {
        self.get(kind)
            .ok_or_else(|| PluginError::MissingArgument(kind.name().into()))
    }

    pub fn text(&self, kind: ArgumentKind) -> Result<&str, PluginError> {
        match self.require(kind)? {
            ArgValue::Text(s) => Ok(s),
            other => Err(mismatch(kind, "text", other)),
        }
    }

    pub fn json(&self, kind: ArgumentKind) -> Result<&serde_json::Value, PluginError> {
        match self.require(kind)? {
            ArgValue::Json(v) => Ok(v),
            other => Err(mismatch(kind, "json", other)),
        }
    }

    pub fn time(&self, kind: ArgumentKind) -> Result<DateTime<FixedOffset>, PluginError> {
        match self.require(kind)? {
            ArgValue::Time(t) => Ok(*t),
            other => Err(mismatch(kind, "time", other)),
        }
    }

    pub fn key(&self, kind: ArgumentKind) -> Result<&ApiKey, PluginError> {
        match self.require(kind)? {
            ArgValue::Key(k) => Ok(k),
            other => Err(mismatch(kind, "api key", other)),
        }
    }

    pub fn command(&self) -> Result<&Command, PluginError> {
        match self.require(ArgumentKind::CommandObject)? {
            ArgValue::Command(c) => Ok(c),
            other => Err(mismatch(ArgumentKind::CommandObject, "command", other)),
        }
    }
}

fn mismatch(kind: ArgumentKind, expected: &str, got: &ArgValue) -> PluginError {
    PluginError::InvalidArgument(format!("{kind} is not {expected}: {got:?}"))
}
