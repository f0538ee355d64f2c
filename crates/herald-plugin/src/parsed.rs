//! Parsed representation of a command's text.
//!
//! [`ParsedText`] is the opaque structure produced by the external parser:
//! tokens with lemma and part of speech, named entities, dependency edges,
//! and a document vector used for similarity scoring.

use serde::{Deserialize, Serialize};

/// Coarse part-of-speech tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PartOfSpeech {
    Verb,
    Noun,
    Propn,
    Pron,
    Adj,
    Adv,
    Det,
    Adp,
    Num,
    Punct,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub lemma: String,
    pub pos: PartOfSpeech,
}

/// A named entity, e.g. `("GPE", "Paris")`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub label: String,
    pub text: String,
}

/// A dependency arc between two token indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub head: usize,
    pub dependent: usize,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedText {
    pub text: String,
    #[serde(default)]
    pub tokens: Vec<Token>,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub edges: Vec<DependencyEdge>,
    /// Document embedding; empty when the parser provides none.
    #[serde(default)]
    pub vector: Vec<f32>,
}

impl ParsedText {
    /// Lower-cased lemmas of all tokens tagged as verbs.
    pub fn verb_lemmas(&self) -> impl Iterator<Item = String> + '_ {
        self.tokens
            .iter()
            .filter(|t| t.pos == PartOfSpeech::Verb)
            .map(|t| t.lemma.to_lowercase())
    }

    /// Cosine similarity of the document vectors, clamped to `[0, 1]`.
    ///
    /// Returns `0.0` when either side has no vector or the dimensions
    /// differ.
    pub fn similarity(&self, other: &ParsedText) -> f32 {
        if self.vector.is_empty() || self.vector.len() != other.vector.len() {
            return 0.0;
        }
        let dot: f32 = self
            .vector
            .iter()
            .zip(&other.vector)
            .map(|(a, b)| a * b)
            .sum();
        let norm_a = self.vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        let norm_b = other.vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_vector(vector: Vec<f32>) -> ParsedText {
        ParsedText {
            vector,
            ..ParsedText::default()
        }
    }

    #[test]
    fn identical_vectors_score_one() {
        let a = with_vector(vec![1.0, 2.0, 3.0]);
        assert!((a.similarity(&a.clone()) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_score_zero() {
        let a = with_vector(vec![1.0, 0.0]);
        let b = with_vector(vec![0.0, 1.0]);
        assert_eq!(a.similarity(&b), 0.0);
    }

    #[test]
    fn missing_or_mismatched_vectors_score_zero() {
        let a = with_vector(vec![1.0, 0.0]);
        assert_eq!(a.similarity(&ParsedText::default()), 0.0);
        assert_eq!(a.similarity(&with_vector(vec![1.0, 0.0, 0.0])), 0.0);
        assert_eq!(with_vector(vec![0.0, 0.0]).similarity(&a), 0.0);
    }

    #[test]
    fn verb_lemmas_are_lowercased() {
        let parsed = ParsedText {
            tokens: vec![
                Token {
                    text: "Echo".into(),
                    lemma: "Echo".into(),
                    pos: PartOfSpeech::Verb,
                },
                Token {
                    text: "this".into(),
                    lemma: "this".into(),
                    pos: PartOfSpeech::Pron,
                },
            ],
            ..ParsedText::default()
        };
        assert_eq!(parsed.verb_lemmas().collect::<Vec<_>>(), vec!["echo"]);
    }
}
