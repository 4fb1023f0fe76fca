// src/tagger.rs
//! Grammatical-role tagging for name filtering.
//!
//! Role inference is an injected capability: the engine only ever calls
//! `Tagger::tag`, so hosts can plug in a real part-of-speech model. The
//! bundled `LexiconTagger` (an embedded word list plus suffix heuristics)
//! is deterministic, which keeps the whole pipeline reproducible in tests.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Grammatical role of a single word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordRole {
    Noun,
    ProperNoun,
    Adjective,
    Adverb,
    Verb,
    Other,
}

/// Role oracle. Implementations must be pure: same word, same role.
pub trait Tagger {
    fn tag(&self, word: &str) -> WordRole;

    /// "Key" terms are nouns; trailing key terms in a listing usually mean
    /// an unrelated clause ("... for iPhone case").
    fn is_key_word(&self, word: &str) -> bool {
        !word.is_empty() && self.tag(word) == WordRole::Noun
    }
}

static LEXICON: Lazy<HashMap<String, WordRole>> = Lazy::new(|| {
    let raw = include_str!("../pos_lexicon.json");
    let table: HashMap<String, String> =
        serde_json::from_str(raw).expect("valid pos lexicon");
    table
        .into_iter()
        .map(|(word, role)| {
            let role = match role.as_str() {
                "noun" => WordRole::Noun,
                "propn" => WordRole::ProperNoun,
                "adj" => WordRole::Adjective,
                "adv" => WordRole::Adverb,
                "verb" => WordRole::Verb,
                _ => WordRole::Other,
            };
            (word, role)
        })
        .collect()
});

/// Deterministic tagger: embedded lexicon first, suffix heuristics second.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconTagger;

impl LexiconTagger {
    pub fn new() -> Self {
        Self
    }
}

impl Tagger for LexiconTagger {
    fn tag(&self, word: &str) -> WordRole {
        let w = word.trim().to_lowercase();
        if w.is_empty() || !w.chars().any(|c| c.is_alphabetic()) {
            return WordRole::Other;
        }
        if let Some(role) = LEXICON.get(&w) {
            return *role;
        }
        suffix_role(&w)
    }
}

/// Suffix fallback for words outside the lexicon. Defaults to `Noun`, which
/// matches how marketplace titles read: unknown words are mostly product
/// nouns.
fn suffix_role(w: &str) -> WordRole {
    if w.len() > 3 && w.ends_with("ly") {
        return WordRole::Adverb;
    }
    const ADJ: [&str; 8] = ["ful", "ous", "ive", "less", "able", "ible", "ic", "est"];
    if w.len() > 4 && ADJ.iter().any(|s| w.ends_with(s)) {
        return WordRole::Adjective;
    }
    if w.len() > 4 && (w.ends_with("ing") || w.ends_with("ed")) {
        return WordRole::Verb;
    }
    WordRole::Noun
}
