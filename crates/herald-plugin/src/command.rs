//! One parsed unit of user input and its continuation chain.
//!
//! Continuations are linked by uid (`parent`, `responses`), never by
//! pointer; the owning session keeps the uid-keyed map.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::parsed::ParsedText;

/// Whether a command is waiting for a follow-up reply, and what kind.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ResponseState {
    #[default]
    Closed,
    /// Several plugins matched; the reply picks one of `options`.
    AwaitingChoice { options: Vec<String> },
    /// The matched plugin asked for more input.
    AwaitingReply { plugin: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub uid: Uuid,
    pub text: String,
    pub parsed: ParsedText,
    /// Lower-cased lemmas of the verbs in `text`.
    pub verbs: BTreeSet<String>,
    /// Entity label to entity text; the last occurrence of a label wins.
    pub entities: BTreeMap<String, String>,
    pub created: DateTime<Utc>,
    /// Name of the plugin this command was routed to, once known.
    pub plugin: Option<String>,
    pub state: ResponseState,
    /// When the command started waiting for a reply.
    pub awaiting_since: Option<DateTime<Utc>>,
    /// Child commands, in arrival order.
    pub responses: Vec<Uuid>,
    pub parent: Option<Uuid>,
}

impl Command {
    pub fn new(text: impl Into<String>, parsed: ParsedText) -> Self {
        let verbs = parsed.verb_lemmas().collect();
        let entities = parsed
            .entities
            .iter()
            .map(|e| (e.label.clone(), e.text.clone()))
            .collect();
        Self {
            uid: Uuid::new_v4(),
            text: text.into(),
            parsed,
            verbs,
            entities,
            created: Utc::now(),
            plugin: None,
            state: ResponseState::Closed,
            awaiting_since: None,
            responses: Vec::new(),
            parent: None,
        }
    }

    /// A follow-up command answering `self`.
    ///
    /// The caller must also push the child's uid onto `self.responses`.
    pub fn reply(&self, text: impl Into<String>, parsed: ParsedText) -> Self {
        let mut child = Command::new(text, parsed);
        child.parent = Some(self.uid);
        child.plugin = self.plugin.clone();
        child
    }

    /// True while the command accepts a follow-up reply.
    pub fn allow_response(&self) -> bool {
        !matches!(self.state, ResponseState::Closed)
    }

    pub fn await_choice(&mut self, options: Vec<String>) {
        self.state = ResponseState::AwaitingChoice { options };
        self.awaiting_since = Some(Utc::now());
    }

    pub fn await_reply(&mut self, plugin: impl Into<String>) {
        let plugin = plugin.into();
        self.plugin = Some(plugin.clone());
        self.state = ResponseState::AwaitingReply { plugin };
        self.awaiting_since = Some(Utc::now());
    }

    pub fn close(&mut self) {
        self.state = ResponseState::Closed;
        self.awaiting_since = None;
    }

    /// Whether the reply window has elapsed at `now`.
    pub fn response_expired(&self, now: DateTime<Utc>, window: Duration) -> bool {
        match self.awaiting_since {
            Some(since) => now - since > window,
            None => false,
        }
    }

    /// Case-insensitive test against the raw text.
    pub fn text_is(&self, expected: &str) -> bool {
        self.text.trim().eq_ignore_ascii_case(expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsed::{Entity, PartOfSpeech, Token};

    fn parsed_weather() -> ParsedText {
        ParsedText {
            text: "check the weather in Paris".into(),
            tokens: vec![
                Token {
                    text: "check".into(),
                    lemma: "check".into(),
                    pos: PartOfSpeech::Verb,
                },
                Token {
                    text: "weather".into(),
                    lemma: "weather".into(),
                    pos: PartOfSpeech::Noun,
                },
            ],
            entities: vec![Entity {
                label: "GPE".into(),
                text: "Paris".into(),
            }],
            ..ParsedText::default()
        }
    }

    #[test]
    fn new_extracts_verbs_and_entities() {
        let cmd = Command::new("check the weather in Paris", parsed_weather());
        assert!(cmd.verbs.contains("check"));
        assert!(!cmd.verbs.contains("weather"));
        assert_eq!(cmd.entities.get("GPE").map(String::as_str), Some("Paris"));
        assert!(!cmd.allow_response());
    }

    #[test]
    fn uids_are_unique() {
        let a = Command::new("a", ParsedText::default());
        let b = Command::new("a", ParsedText::default());
        assert_ne!(a.uid, b.uid);
    }

    #[test]
    fn choice_then_close() {
        let mut cmd = Command::new("weather news", ParsedText::default());
        cmd.await_choice(vec!["weather".into(), "news".into()]);
        assert!(cmd.allow_response());
        assert!(cmd.awaiting_since.is_some());
        cmd.close();
        assert!(!cmd.allow_response());
        assert!(cmd.awaiting_since.is_none());
    }

    #[test]
    fn reply_links_parent_and_plugin() {
        let mut parent = Command::new("echo", ParsedText::default());
        parent.await_reply("echo");
        let child = parent.reply("hello", ParsedText::default());
        assert_eq!(child.parent, Some(parent.uid));
        assert_eq!(child.plugin.as_deref(), Some("echo"));
        assert!(!child.allow_response());
    }

    #[test]
    fn response_window_expiry() {
        let mut cmd = Command::new("echo", ParsedText::default());
        let window = Duration::seconds(300);
        assert!(!cmd.response_expired(Utc::now() + Duration::hours(1), window));

        cmd.await_reply("echo");
        let since = cmd.awaiting_since.unwrap();
        assert!(!cmd.response_expired(since + Duration::seconds(300), window));
        assert!(cmd.response_expired(since + Duration::seconds(301), window));
    }
}
