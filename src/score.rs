// src/score.rs
//! Match scoring: how strongly does a normalized candidate look like the
//! target, under one filtered view of both names?
//!
//! The scorer is pure: it returns a multiplicative factor and never touches
//! the candidate. Callers apply the factor to the carried confidence and the
//! aggregator is the only place that clamps to [0,100].
//!
//! Tier ladder (first applicable wins): exact variant equality,
//! case-insensitive equality, substring inclusion on variants and names,
//! then the same checks with whitespace stripped. When nothing matches, a
//! token-overlap closeness drives a banded multiplier. Matches that include
//! digits count as stronger evidence (model numbers, sizes), so digit-bearing
//! tiers sit slightly higher.

use crate::model::{Candidate, Target};
use crate::tagger::Tagger;
use crate::tokens::{has_digit, is_integer_token, tokenize};
use once_cell::sync::Lazy;
use regex::Regex;

// ------------------------------
// Similarity multiplier constants
// ------------------------------
const EXACT_MATCH: f64 = 1.0;
const EXACT_CI_MATCH: f64 = 0.98;
const INCLUSIVE_MATCH: f64 = 0.85;
const INCLUSIVE_CI_MATCH: f64 = 0.83;
const EXACT_NO_SPACES_MATCH: f64 = 0.97;
const INCLUSIVE_NO_SPACES_MATCH: f64 = 0.81;

static NO_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bno\b").expect("no-word regex"));

/// One filtered view of the two names being compared. `*_name` fields are
/// the full cleaned names (brand + variant); the variants are the reduced
/// view strings.
#[derive(Debug, Clone)]
pub struct ViewPair {
    pub target_variant: String,
    pub target_name: String,
    pub candidate_variant: String,
    pub candidate_name: String,
}

/// Compute the confidence multiplier for one view. In the no-match branch a
/// zero token overlap yields factor 0.
pub fn match_factor(
    pair: &ViewPair,
    target: &Target,
    candidate: &Candidate,
    tagger: &dyn Tagger,
) -> f64 {
    // 1) Exact, case-sensitive. Digits (model numbers, sizes) are stronger
    //    evidence than purely alphabetic matches.
    if pair.target_variant == pair.candidate_variant {
        return if has_digit(&pair.target_variant) {
            EXACT_MATCH
        } else {
            EXACT_MATCH - 0.05
        };
    }

    // 2) Exact, case-insensitive.
    if pair.target_variant.to_lowercase() == pair.candidate_variant.to_lowercase() {
        return if has_digit(&pair.target_variant) {
            EXACT_CI_MATCH
        } else {
            EXACT_CI_MATCH - 0.05
        };
    }

    // 3) Target variant contained in candidate variant (case-sensitive).
    if !pair.target_variant.is_empty() && pair.candidate_variant.contains(&pair.target_variant) {
        let base = inclusive_base(
            INCLUSIVE_MATCH,
            &pair.target_variant,
            &pair.candidate_variant,
        );
        return context_factor(target, candidate, true, tagger)
            * end_factor(pair, target, candidate, tagger)
            * base;
    }

    // 4) Target name contained in candidate name (case-insensitive).
    if !pair.target_name.is_empty()
        && pair
            .candidate_name
            .to_lowercase()
            .contains(&pair.target_name.to_lowercase())
    {
        let base = inclusive_base(INCLUSIVE_CI_MATCH, &pair.target_name, &pair.candidate_name);
        return context_factor(target, candidate, true, tagger)
            * end_factor(pair, target, candidate, tagger)
            * base;
    }

    // 5) Same checks with whitespace stripped and both sides lowercased.
    let target_flat = strip_spaces_lower(&pair.target_variant);
    let candidate_flat = strip_spaces_lower(&pair.candidate_variant);
    if !target_flat.is_empty() {
        if target_flat == candidate_flat {
            let base = if has_digit(&target_flat) {
                EXACT_NO_SPACES_MATCH
            } else {
                EXACT_NO_SPACES_MATCH - 0.05
            };
            return context_factor(target, candidate, true, tagger) * base;
        }
        if candidate_flat.contains(&target_flat) {
            let base = inclusive_base(INCLUSIVE_NO_SPACES_MATCH, &target_flat, &candidate_flat);
            return context_factor(target, candidate, true, tagger) * base;
        }
    }

    no_match_factor(pair, target, candidate, tagger)
}

/// Inclusion tiers: digits on the target side keep the full base; digits
/// present only on the candidate side suggest a different model and cut the
/// base hard.
fn inclusive_base(base: f64, target_text: &str, candidate_text: &str) -> f64 {
    if has_digit(target_text) {
        base
    } else if has_digit(candidate_text) {
        base - 0.4
    } else {
        base - 0.05
    }
}

fn strip_spaces_lower(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// Token-overlap fallback when no direct or inclusive match applied.
fn no_match_factor(
    pair: &ViewPair,
    target: &Target,
    candidate: &Candidate,
    tagger: &dyn Tagger,
) -> f64 {
    let mut f = context_factor(target, candidate, false, tagger)
        * end_factor(pair, target, candidate, tagger);

    // A branded target matched against an unbranded listing is usually a
    // different product line.
    if !target.brand.is_empty() && candidate.brand.is_empty() {
        f *= 0.1;
    }

    let searched: Vec<String> = tokenize(&pair.target_variant)
        .normalized
        .into_iter()
        .filter(|t| !t.is_empty())
        .collect();
    let candidate_words: Vec<String> = tokenize(&pair.candidate_variant)
        .normalized
        .into_iter()
        .filter(|t| !t.is_empty())
        .collect();
    if searched.is_empty() {
        return 0.0;
    }

    let mut matched = 0usize;
    let mut numbers_in_name = 0usize;
    let mut numbers_matched = 0usize;
    for word in &searched {
        let present = candidate_words.contains(word);
        if has_digit(word) {
            numbers_in_name += 1;
            if present {
                numbers_matched += 1;
                matched += 1;
            }
        } else if present {
            matched += 1;
        }
    }
    if matched == 0 {
        return 0.0;
    }
    let closeness = matched as f64 / searched.len() as f64;

    // Length-mismatch penalty over word (non-integer) tokens; tighter bands
    // when the candidate is the shorter name.
    let candidate_word_count = candidate_words
        .iter()
        .filter(|t| !is_integer_token(t))
        .count();
    let target_word_count = searched.iter().filter(|t| !is_integer_token(t)).count();
    let diff = (candidate_word_count as i64 - matched as i64).abs();
    if diff > 0 {
        f *= if candidate_word_count < target_word_count {
            match diff {
                1 => 0.97,
                2 => 0.92,
                3 => 0.87,
                _ => 0.8,
            }
        } else {
            match diff {
                1 => 0.75,
                2 => 0.7,
                3 => 0.65,
                _ => 0.6,
            }
        };
    }

    f * closeness_multiplier(closeness, searched.len(), numbers_in_name, numbers_matched)
}

/// Banded multiplier by closeness, nudged by how numeric the target name is
/// and whether those numeric tokens actually matched.
fn closeness_multiplier(
    closeness: f64,
    token_count: usize,
    numbers_in_name: usize,
    numbers_matched: usize,
) -> f64 {
    let numeric_nudge = |base: f64, plus: f64, minus: f64| {
        if token_count / 5 < numbers_in_name {
            base
        } else if token_count / 2 < numbers_in_name {
            base + plus
        } else {
            base - minus
        }
    };

    if closeness >= 1.0 {
        return if token_count / 5 < numbers_in_name {
            0.75
        } else if token_count / 2 < numbers_in_name {
            0.80
        } else if numbers_in_name > 0 {
            0.70
        } else {
            0.50
        };
    }
    if closeness < 0.3 {
        return 0.01;
    }

    let (base, plus, minus, wordy) = if closeness < 0.4 {
        (0.15, 0.02, 0.01, 0.13)
    } else if closeness < 0.5 {
        (0.23, 0.03, 0.02, 0.18)
    } else if closeness < 0.6 {
        (0.30, 0.03, 0.02, 0.25)
    } else if closeness < 0.7 {
        (0.36, 0.03, 0.02, 0.31)
    } else if closeness < 0.8 {
        (0.41, 0.03, 0.02, 0.36)
    } else if closeness < 0.9 {
        (0.56, 0.03, 0.02, 0.36)
    } else {
        (0.60, 0.03, 0.02, 0.40)
    };

    if numbers_in_name > 0 {
        let mut m = numeric_nudge(base, plus, minus);
        // Unmatched numeric tokens are near-disqualifying: a different size
        // or model number despite overlapping words.
        if numbers_matched != numbers_in_name {
            m *= 0.2;
        }
        m
    } else {
        wordy
    }
}

/// Contextual penalties from the words around the matched span in the
/// candidate's verbatim title. "for X" usually means an accessory for X,
/// "with X" a bundle; a trailing noun clause points at a different item.
fn context_factor(
    target: &Target,
    candidate: &Candidate,
    matched: bool,
    tagger: &dyn Tagger,
) -> f64 {
    let mut f = 1.0;
    let context = &candidate.source_title;
    let brand_lower = target.brand.to_lowercase();
    let variant_lower = target.variant.to_lowercase();
    let part_of_target = |w: &str| -> bool {
        !w.is_empty() && (brand_lower.contains(w) || variant_lower.contains(w))
    };

    for part in [&target.original_brand, &target.original_variant] {
        let Some(needle) = context_needle(part, matched) else {
            continue;
        };
        let pattern = format!(r"(?i)((?:\b\w+\s+){{0,2}}){}", regex::escape(&needle));
        let Ok(re) = Regex::new(&pattern) else {
            continue;
        };
        let Some(caps) = re.captures(context) else {
            continue;
        };
        let before: Vec<String> = caps[1]
            .split_whitespace()
            .map(|w| w.to_lowercase())
            .collect();
        let word_before = before.last().cloned().unwrap_or_default();
        let word_before2 = if before.len() > 1 {
            before[before.len() - 2].clone()
        } else {
            String::new()
        };

        if word_before == "with" && !part_of_target(&word_before) {
            f *= if matched { 0.7 } else { 0.8 };
        }
        if word_before2 == "with" && !part_of_target(&word_before2) {
            f *= if matched { 0.85 } else { 0.95 };
        }
        if word_before == "for" && !part_of_target(&word_before) {
            f *= if matched { 0.35 } else { 0.45 };
        }
        if word_before2 == "for" && !part_of_target(&word_before2) {
            f *= if matched { 0.5 } else { 0.6 };
        }
    }

    // Words immediately after the variant occurrence: a key (noun) term that
    // the target does not contain suggests an unrelated trailing clause.
    if let Some(needle) = context_needle(&target.original_variant, matched) {
        let pattern = format!(r"(?i){}((?:\s+\w+){{0,2}})", regex::escape(&needle));
        if let Ok(re) = Regex::new(&pattern) {
            if let Some(caps) = re.captures(context) {
                let after: Vec<String> = caps[1]
                    .split_whitespace()
                    .map(|w| w.to_lowercase())
                    .collect();
                if let Some(word) = after.first() {
                    if !part_of_target(word) && tagger.is_key_word(word) {
                        f *= if matched { 0.7 } else { 0.85 };
                    }
                }
                if let Some(word) = after.get(1) {
                    if !part_of_target(word) && tagger.is_key_word(word) {
                        f *= if matched { 0.85 } else { 0.97 };
                    }
                }
            }
        }
    }

    // Negation mismatch, e.g. "no box" on the listing only.
    if NO_WORD.is_match(&candidate.variant) && !NO_WORD.is_match(&target.variant) {
        f *= 0.9;
    }

    f
}

/// The span to look around: the whole part when a direct match anchored it,
/// otherwise its first normalized token as a best-effort anchor.
fn context_needle(part: &str, matched: bool) -> Option<String> {
    let trimmed = part.trim();
    if trimmed.is_empty() {
        return None;
    }
    if matched {
        return Some(trimmed.to_string());
    }
    tokenize(trimmed)
        .normalized
        .into_iter()
        .find(|t| !t.is_empty())
}

/// End-anchoring: names describing the same item usually end on the same
/// token; differing trailing tokens of the same grammatical role are still
/// plausible rewordings.
fn end_factor(
    pair: &ViewPair,
    target: &Target,
    candidate: &Candidate,
    tagger: &dyn Tagger,
) -> f64 {
    let target_last = last_token(&target.variant);
    let candidate_last = last_token(&candidate.variant);
    if let (Some(t), Some(c)) = (&target_last, &candidate_last) {
        if t == c {
            return 0.99;
        }
    }

    let mut f = role_comparison(&target_last, &candidate_last, tagger);
    f *= role_comparison(
        &last_token(&pair.target_variant),
        &last_token(&pair.candidate_variant),
        tagger,
    );
    f
}

fn last_token(text: &str) -> Option<String> {
    tokenize(text)
        .normalized
        .into_iter()
        .rev()
        .find(|t| !t.is_empty())
}

fn role_comparison(target: &Option<String>, candidate: &Option<String>, tagger: &dyn Tagger) -> f64 {
    match (target, candidate) {
        (Some(t), Some(c)) => {
            if tagger.tag(c) == tagger.tag(t) {
                0.95
            } else {
                0.85
            }
        }
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagger::LexiconTagger;

    fn pair(tv: &str, cv: &str) -> ViewPair {
        ViewPair {
            target_variant: tv.to_string(),
            target_name: tv.to_string(),
            candidate_variant: cv.to_string(),
            candidate_name: cv.to_string(),
        }
    }

    fn target(variant: &str) -> Target {
        Target::new("", variant, 1)
    }

    fn candidate(title: &str) -> Candidate {
        Candidate::new(title)
    }

    #[test]
    fn exact_match_with_digit_is_factor_one() {
        let t = target("Primer 30ml");
        let c = candidate("Primer 30ml");
        let f = match_factor(&pair("Primer 30ml", "Primer 30ml"), &t, &c, &LexiconTagger);
        assert_eq!(f, 1.0);
    }

    #[test]
    fn exact_match_without_digit_is_discounted() {
        let t = target("Primer");
        let c = candidate("Primer");
        let f = match_factor(&pair("Primer", "Primer"), &t, &c, &LexiconTagger);
        assert_eq!(f, 0.95);
    }

    #[test]
    fn case_insensitive_equality_uses_second_tier() {
        let t = target("primer 30ml");
        let c = candidate("PRIMER 30ml");
        let f = match_factor(&pair("primer 30ml", "PRIMER 30ml"), &t, &c, &LexiconTagger);
        assert_eq!(f, 0.98);
    }

    #[test]
    fn candidate_only_digits_cut_the_inclusive_tier() {
        let t = target("Lip Duo");
        let c = candidate("Lip Duo 2");
        let f = match_factor(&pair("Lip Duo", "Lip Duo 2"), &t, &c, &LexiconTagger);
        // Tier 3 fires at 0.45 base; context and end factors only lower it.
        assert!(f <= 0.45);
        assert!(f > 0.2);
    }

    #[test]
    fn zero_token_overlap_zeroes_the_factor() {
        let t = target("Strawberry Butter");
        let c = candidate("Phone Charger");
        let f = match_factor(
            &pair("Strawberry Butter", "Phone Charger"),
            &t,
            &c,
            &LexiconTagger,
        );
        assert_eq!(f, 0.0);
    }

    #[test]
    fn accessory_for_phrase_is_penalized() {
        let t = target("Dream Cover");
        let mut c = candidate("Case for Dream Cover");
        c.variant = "Case for Dream Cover".to_string();
        let direct = match_factor(
            &pair("Dream Cover", "Dream Cover"),
            &target("Dream Cover"),
            &candidate("Dream Cover"),
            &LexiconTagger,
        );
        let accessory = match_factor(
            &pair("Dream Cover", "Case for Dream Cover"),
            &t,
            &c,
            &LexiconTagger,
        );
        assert!(accessory < direct);
    }

    #[test]
    fn negation_only_on_candidate_side_applies_point_nine() {
        let t = target("Watch Series 5");
        let mut c = candidate("Watch Series 5 no box");
        c.variant = "Watch Series 5 no box".to_string();
        let with_no = match_factor(
            &pair("Watch Series 5", "Watch Series 5 no box"),
            &t,
            &c,
            &LexiconTagger,
        );
        let mut c2 = candidate("Watch Series 5 plus box");
        c2.variant = "Watch Series 5 plus box".to_string();
        let without_no = match_factor(
            &pair("Watch Series 5", "Watch Series 5 plus box"),
            &t,
            &c2,
            &LexiconTagger,
        );
        assert!(with_no < without_no);
    }

    #[test]
    fn unmatched_numeric_tokens_collapse_the_band() {
        let tagger = LexiconTagger;
        let t = target("Serum 30ml strength 5");
        let c = candidate("Serum strength boost");
        let f_unmatched = match_factor(
            &pair("Serum 30 strength 5", "Serum strength boost"),
            &t,
            &c,
            &tagger,
        );
        let c2 = candidate("Serum strength 30 5 boost");
        let f_matched = match_factor(
            &pair("Serum 30 strength 5", "Serum strength 30 5 boost"),
            &t,
            &c2,
            &tagger,
        );
        assert!(f_unmatched < f_matched);
    }
}
