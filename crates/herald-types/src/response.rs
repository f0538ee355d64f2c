//! Uniform response envelope.
//!
//! Every public entry point answers with a [`Response`], which serializes
//! to one of two shapes:
//!
//! ```json
//! {"data": {"type": "success", "id": "ECHO_PLUGIN_SUCCESS", "text": "hi"}}
//! {"errors": [{"type": "error", "id": "NO_MATCH", "text": "...", "status": 404}]}
//! ```
//!
//! An optional top-level `"meta"` object carries human-readable notes.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// HTTP-style status codes attached to error objects.
pub mod status {
    /// Malformed request (bad command id, unexpected response).
    pub const BAD_REQUEST: u16 = 400;
    /// Nothing matched the request.
    pub const NOT_FOUND: u16 = 404;
    /// The user must fix something before the request can run.
    pub const CONFLICT: u16 = 409;
    /// A plugin or store failed.
    pub const INTERNAL_SERVER_ERROR: u16 = 500;
    /// The session is not ready to serve commands yet.
    pub const SERVICE_UNAVAILABLE: u16 = 503;
}

/// Stable machine-readable response codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseCode {
    PluginError,
    PluginResponseMalformed,
    PluginResponseRequired,
    PluginChoiceInvalid,
    NoMatch,
    CommandIdInvalid,
    CommandResponseInvalid,
    ArgumentBuildFailed,
    KeyNotAvailable,
    SettingArgumentInvalid,
    SessionNotReady,
    SessionReportingSuccessful,
}

impl ResponseCode {
    /// The wire representation of this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseCode::PluginError => "PLUGIN_ERROR",
            ResponseCode::PluginResponseMalformed => "PLUGIN_RESPONSE_MALFORMED",
            ResponseCode::PluginResponseRequired => "PLUGIN_RESPONSE_REQUIRED",
            ResponseCode::PluginChoiceInvalid => "PLUGIN_CHOICE_INVALID",
            ResponseCode::NoMatch => "NO_MATCH",
            ResponseCode::CommandIdInvalid => "COMMAND_ID_INVALID",
            ResponseCode::CommandResponseInvalid => "COMMAND_RESPONSE_INVALID",
            ResponseCode::ArgumentBuildFailed => "ARGUMENT_BUILD_FAILED",
            ResponseCode::KeyNotAvailable => "KEY_NOT_AVAILABLE",
            ResponseCode::SettingArgumentInvalid => "SETTING_ARGUMENT_INVALID",
            ResponseCode::SessionNotReady => "SESSION_NOT_READY",
            ResponseCode::SessionReportingSuccessful => "SESSION_REPORTING_SUCCESSFUL",
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a data payload is a final answer or asks the user for more input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    /// The command completed.
    Success,
    /// The command is waiting for a follow-up reply.
    Response,
}

/// Successful payload under the `"data"` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Data {
    #[serde(rename = "type")]
    pub kind: DataKind,
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    /// Additional payload fields (`options`, `command_id`, plugin data, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ErrorTag {
    #[default]
    Error,
}

/// One entry in the `"errors"` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    #[serde(rename = "type", default)]
    tag: ErrorTag,
    pub id: String,
    pub text: String,
    pub status: u16,
}

impl ErrorObject {
    /// Build an error object with a custom id.
    pub fn new(id: impl Into<String>, text: impl Into<String>, status: u16) -> Self {
        Self {
            tag: ErrorTag::Error,
            id: id.into(),
            text: text.into(),
            status,
        }
    }

    /// Build an error object for one of the stable codes.
    pub fn coded(code: ResponseCode, text: impl Into<String>, status: u16) -> Self {
        Self::new(code.as_str(), text, status)
    }
}

/// Human-readable notes attached to a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub text: String,
}

/// The two mutually exclusive response bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Body {
    Data(Data),
    Errors(Vec<ErrorObject>),
}

/// A complete response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(flatten)]
    pub body: Body,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl Response {
    fn data(kind: DataKind, id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            body: Body::Data(Data {
                kind,
                id: id.into(),
                text: text.into(),
                extra: Map::new(),
            }),
            meta: None,
        }
    }

    /// A completed command.
    pub fn success(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::data(DataKind::Success, id, text)
    }

    /// A command that awaits a follow-up reply.
    pub fn prompt(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::data(DataKind::Response, id, text)
    }

    /// A single-error response for one of the stable codes.
    pub fn error(code: ResponseCode, text: impl Into<String>, status: u16) -> Self {
        Self::from_errors(vec![ErrorObject::coded(code, text, status)])
    }

    /// A response carrying several errors.
    pub fn from_errors(errors: Vec<ErrorObject>) -> Self {
        Self {
            body: Body::Errors(errors),
            meta: None,
        }
    }

    /// Attach an extra field to a data payload. No-op on error responses.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Body::Data(data) = &mut self.body {
            data.extra.insert(key.into(), value.into());
        }
        self
    }

    /// Attach a `meta.text` note.
    pub fn with_meta(mut self, text: impl Into<String>) -> Self {
        self.meta = Some(Meta { text: text.into() });
        self
    }

    /// True for `{"data": ...}` responses.
    pub fn is_success(&self) -> bool {
        matches!(self.body, Body::Data(_))
    }

    /// The data payload, if any.
    pub fn payload(&self) -> Option<&Data> {
        match &self.body {
            Body::Data(data) => Some(data),
            Body::Errors(_) => None,
        }
    }

    /// The error list (empty for data responses).
    pub fn errors(&self) -> &[ErrorObject] {
        match &self.body {
            Body::Data(_) => &[],
            Body::Errors(errors) => errors,
        }
    }

    /// The `id` of the data payload or of the first error.
    pub fn id(&self) -> Option<&str> {
        match &self.body {
            Body::Data(data) => Some(&data.id),
            Body::Errors(errors) => errors.first().map(|e| e.id.as_str()),
        }
    }

    /// Serialize to a JSON value.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
