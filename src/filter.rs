// src/filter.rs
//! Name filtering: reduce a variant name to the tokens that carry identity.
//!
//! Each `FilterScheme` keeps tokens of certain grammatical roles; numbers,
//! recognized units, and the connector words "for"/"with" always survive.
//! Running the fixed scheme list produces several "views" of a name, from
//! loose (nouns + modifiers) to strict (nouns only). Stricter views carry
//! higher weight: a token that survives a strict filter is more
//! discriminating.

use crate::tagger::{Tagger, WordRole};
use crate::tokens::{has_digit, tokenize};
use crate::units;

/// One reduction scheme: roles to retain plus its aggregation weight.
#[derive(Debug, Clone, Copy)]
pub struct FilterScheme {
    pub roles: &'static [WordRole],
    pub weight: f64,
}

/// Fixed scheme ladder, most permissive first.
pub const FILTER_SCHEMES: [FilterScheme; 4] = [
    FilterScheme {
        roles: &[
            WordRole::Noun,
            WordRole::ProperNoun,
            WordRole::Adjective,
            WordRole::Adverb,
        ],
        weight: 1.0,
    },
    FilterScheme {
        roles: &[WordRole::Noun, WordRole::ProperNoun, WordRole::Adjective],
        weight: 1.3,
    },
    FilterScheme {
        roles: &[WordRole::Noun, WordRole::ProperNoun],
        weight: 1.7,
    },
    FilterScheme {
        roles: &[WordRole::Noun],
        weight: 3.0,
    },
];

/// Sum of all scheme weights, used by the per-candidate view average.
pub fn total_scheme_weight() -> f64 {
    FILTER_SCHEMES.iter().map(|s| s.weight).sum()
}

const CONNECTORS: [&str; 2] = ["for", "with"];

fn keep_token(normalized: &str, roles: &[WordRole], tagger: &dyn Tagger) -> bool {
    if CONNECTORS.contains(&normalized) {
        return true;
    }
    if units::is_unit(normalized) {
        return true;
    }
    if has_digit(normalized) {
        return true;
    }
    roles.contains(&tagger.tag(normalized))
}

/// Reduce a target's variant name under one scheme.
pub fn filter_target_variant(variant: &str, roles: &[WordRole], tagger: &dyn Tagger) -> String {
    let toks = tokenize(variant);
    let mut kept = String::new();
    for i in 0..toks.len() {
        if keep_token(&toks.normalized[i], roles, tagger) {
            kept.push_str(&toks.raw[i]);
        }
    }
    kept.trim().to_string()
}

/// Reduce a candidate's variant name under one scheme. In addition to the
/// target rules, any token that literally occurs in the target's lowercased
/// variant survives, so terms the target already uses are never dropped.
pub fn filter_candidate_variant(
    variant: &str,
    target_variant: &str,
    roles: &[WordRole],
    tagger: &dyn Tagger,
) -> String {
    let target_lower = target_variant.to_lowercase();
    let toks = tokenize(variant);
    let mut kept = String::new();
    for i in 0..toks.len() {
        let normalized = &toks.normalized[i];
        let in_target = !normalized.is_empty() && target_lower.contains(normalized.as_str());
        if in_target || keep_token(normalized, roles, tagger) {
            kept.push_str(&toks.raw[i]);
        }
    }
    kept.trim().to_string()
}
