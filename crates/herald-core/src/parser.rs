//! Lexicon-driven parser.
//!
//! A small stand-in for a real NLP engine: whitespace tokenisation, a verb
//! lexicon for part-of-speech, a gazetteer for entities, and a hashed
//! bag-of-lemmas vector for similarity. Good enough to route commands
//! when no external parser is wired in.

use std::collections::{HashMap, HashSet};
use std::hash::Hasher;

use fnv::FnvHasher;

use herald_plugin::{DependencyEdge, Entity, ParsedText, PartOfSpeech, Token};

use crate::stores::Parser;

const VECTOR_DIM: usize = 64;

const DEFAULT_VERBS: &[&str] = &[
    "echo", "search", "find", "play", "tell", "open", "check", "set", "remind", "show",
    "get", "look", "say", "ask", "send", "stop", "start", "turn", "weather", "news",
];

const PRONOUNS: &[&str] = &[
    "i", "me", "you", "it", "we", "they", "he", "she", "who", "what", "where", "when", "why",
    "how", "which",
];

const DETERMINERS: &[&str] = &["a", "an", "the", "this", "that", "these", "those", "my", "your"];

const ADPOSITIONS: &[&str] = &["in", "on", "at", "for", "to", "from", "of", "with", "about"];

pub struct BasicParser {
    verbs: HashSet<String>,
    gazetteer: HashMap<String, String>,
}

impl Default for BasicParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BasicParser {
    pub fn new() -> Self {
        Self {
            verbs: DEFAULT_VERBS.iter().map(|v| v.to_string()).collect(),
            gazetteer: HashMap::new(),
        }
    }

    /// Treat `lemma` as a verb.
    pub fn with_verb(mut self, lemma: &str) -> Self {
        self.verbs.insert(lemma.to_lowercase());
        self
    }

    /// Tag single-word `text` as an entity with `label` (e.g. `GPE`).
    pub fn with_entity(mut self, text: &str, label: &str) -> Self {
        self.gazetteer.insert(text.to_lowercase(), label.to_string());
        self
    }

    fn lemmatize(&self, lower: &str) -> String {
        if self.verbs.contains(lower) {
            return lower.to_string();
        }
        for suffix in ["ing", "es", "ed", "s"] {
            if let Some(stem) = lower.strip_suffix(suffix)
                && self.verbs.contains(stem)
            {
                return stem.to_string();
            }
        }
        lower.to_string()
    }

    fn tag(&self, lemma: &str, surface: &str) -> PartOfSpeech {
        if surface.chars().all(|c| c.is_ascii_punctuation()) {
            PartOfSpeech::Punct
        } else if self.verbs.contains(lemma) {
            PartOfSpeech::Verb
        } else if PRONOUNS.contains(&lemma) {
            PartOfSpeech::Pron
        } else if DETERMINERS.contains(&lemma) {
            PartOfSpeech::Det
        } else if ADPOSITIONS.contains(&lemma) {
            PartOfSpeech::Adp
        } else if lemma.chars().all(|c| c.is_ascii_digit()) {
            PartOfSpeech::Num
        } else if surface.chars().next().is_some_and(char::is_uppercase) {
            PartOfSpeech::Propn
        } else {
            PartOfSpeech::Noun
        }
    }
}

impl Parser for BasicParser {
    fn parse(&self, text: &str) -> ParsedText {
        let mut tokens = Vec::new();
        for raw in text.split_whitespace() {
            let word = raw.trim_matches(|c: char| c.is_ascii_punctuation());
            let surface = if word.is_empty() { raw } else { word };
            let lemma = self.lemmatize(&surface.to_lowercase());
            let pos = self.tag(&lemma, surface);
            tokens.push(Token {
                text: surface.to_string(),
                lemma,
                pos,
            });
        }

        let entities = tokens
            .iter()
            .filter_map(|t| {
                let label = match self.gazetteer.get(&t.lemma) {
                    Some(label) => label.clone(),
                    None if t.pos == PartOfSpeech::Num => "CARDINAL".to_string(),
                    None => return None,
                };
                Some(Entity {
                    label,
                    text: t.text.clone(),
                })
            })
            .collect();

        // Everything hangs off the first verb.
        let edges = match tokens.iter().position(|t| t.pos == PartOfSpeech::Verb) {
            Some(root) => (0..tokens.len())
                .filter(|&i| i != root && tokens[i].pos != PartOfSpeech::Punct)
                .map(|i| DependencyEdge {
                    head: root,
                    dependent: i,
                    label: "dep".into(),
                })
                .collect(),
            None => Vec::new(),
        };

        let mut vector = vec![0.0f32; VECTOR_DIM];
        for token in tokens.iter().filter(|t| t.pos != PartOfSpeech::Punct) {
            let mut hasher = FnvHasher::default();
            hasher.write(token.lemma.as_bytes());
            vector[(hasher.finish() as usize) % VECTOR_DIM] += 1.0;
        }

        ParsedText {
            text: text.to_string(),
            tokens,
            entities,
            edges,
            vector,
        }
    }
}
