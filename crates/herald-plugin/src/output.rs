//! What a plugin hands back from `exec()` / `response()`.

use herald_types::response::Response;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// The command is complete.
    Success,
    /// The plugin wants a follow-up reply routed to its `response()`.
    Prompt,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PluginOutput {
    pub kind: OutputKind,
    pub id: String,
    pub text: String,
    pub extra: Map<String, Value>,
}

impl PluginOutput {
    pub fn success(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: OutputKind::Success,
            id: id.into(),
            text: text.into(),
            extra: Map::new(),
        }
    }

    pub fn prompt(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: OutputKind::Prompt,
            ..Self::success(id, text)
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn is_prompt(&self) -> bool {
        self.kind == OutputKind::Prompt
    }

    /// Convert into the public envelope. Prompts become `"type": "response"`.
    pub fn into_response(self) -> Response {
        let mut resp = match self.kind {
            OutputKind::Success => Response::success(self.id, self.text),
            OutputKind::Prompt => Response::prompt(self.id, self.text),
        };
        for (key, value) in self.extra {
            resp = resp.with_extra(key, value);
        }
        resp
    }
}
