//! Helpers for writing `check()` overrides.

use herald_types::config::PluginsConfig;

use crate::command::Command;
use crate::parsed::ParsedText;

/// True when any token (surface text or lemma) equals one of `keywords`,
/// compared case-insensitively.
pub fn any_keyword(command: &Command, keywords: &[&str]) -> bool {
    let hit = |word: &str| keywords.iter().any(|k| k.eq_ignore_ascii_case(word));
    if command.parsed.tokens.is_empty() {
        return command.text.split_whitespace().any(hit);
    }
    command
        .parsed
        .tokens
        .iter()
        .any(|t| hit(&t.text) || hit(&t.lemma))
}

/// True when the command contains an entity with one of `labels`.
pub fn has_entity(command: &Command, labels: &[&str]) -> bool {
    labels.iter().any(|l| command.entities.contains_key(*l))
}

/// Matches commands that are close to one of a fixed set of phrases.
#[derive(Debug, Clone)]
pub struct PhraseMatcher {
    phrases: Vec<ParsedText>,
    threshold: f32,
}

impl PhraseMatcher {
    /// `phrases` must already be parsed by the same parser that parses
    /// commands, otherwise their vectors are not comparable.
    pub fn new(phrases: Vec<ParsedText>, threshold: f32) -> Self {
        Self { phrases, threshold }
    }

    /// Uses `plugins.similarity_threshold` as the threshold.
    pub fn from_config(phrases: Vec<ParsedText>, config: &PluginsConfig) -> Self {
        Self::new(phrases, config.similarity_threshold)
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Index and score of the closest phrase, if any phrases are loaded.
    pub fn best(&self, parsed: &ParsedText) -> Option<(usize, f32)> {
        self.phrases
            .iter()
            .map(|p| p.similarity(parsed))
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }

    pub fn matches(&self, command: &Command) -> bool {
        self.best(&command.parsed)
            .is_some_and(|(_, score)| score >= self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsed::{Entity, PartOfSpeech, Token};

    fn vec_text(text: &str, vector: Vec<f32>) -> ParsedText {
        ParsedText {
            text: text.into(),
            vector,
            ..ParsedText::default()
        }
    }

    #[test]
    fn keyword_matches_tokens_or_raw_text() {
        let parsed = ParsedText {
            text: "Who won".into(),
            tokens: vec![Token {
                text: "Who".into(),
                lemma: "who".into(),
                pos: PartOfSpeech::Pron,
            }],
            ..ParsedText::default()
        };
        let cmd = Command::new("Who won", parsed);
        assert!(any_keyword(&cmd, &["who", "what"]));

        let raw = Command::new("what is rust", ParsedText::default());
        assert!(any_keyword(&raw, &["who", "what"]));
        assert!(!any_keyword(&raw, &["where"]));
    }

    #[test]
    fn entity_labels() {
        let parsed = ParsedText {
            entities: vec![Entity {
                label: "GPE".into(),
                text: "Oslo".into(),
            }],
            ..ParsedText::default()
        };
        let cmd = Command::new("weather in Oslo", parsed);
        assert!(has_entity(&cmd, &["GPE", "LOC"]));
        assert!(!has_entity(&cmd, &["PERSON"]));
    }

    #[test]
    fn phrase_threshold() {
        let matcher = PhraseMatcher::new(
            vec![
                vec_text("tell me a joke", vec![1.0, 0.0, 0.0]),
                vec_text("open the pod bay doors", vec![0.0, 1.0, 0.0]),
            ],
            0.96,
        );
        let close = Command::new("open the pod bay doors", vec_text("", vec![0.0, 1.0, 0.1]));
        let far = Command::new("hello", vec_text("", vec![0.5, 0.5, 0.5]));

        assert_eq!(matcher.best(&close.parsed).map(|(i, _)| i), Some(1));
        assert!(matcher.matches(&close));
        assert!(!matcher.matches(&far));
        assert!(PhraseMatcher::new(Vec::new(), 0.96).best(&far.parsed).is_none());
    }

    #[test]
    fn threshold_comes_from_config() {
        let phrases = vec![vec_text("tell me a joke", vec![1.0, 0.0])];
        let near = Command::new("tell me jokes", vec_text("", vec![1.0, 0.5]));

        let mut config = PluginsConfig::default();
        let strict = PhraseMatcher::from_config(phrases.clone(), &config);
        assert!((strict.threshold() - 0.96).abs() < f32::EPSILON);
        assert!(!strict.matches(&near));

        config.similarity_threshold = 0.8;
        assert!(PhraseMatcher::from_config(phrases, &config).matches(&near));
    }
}
