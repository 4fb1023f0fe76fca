// src/normalize.rs
//! Candidate normalization: turn a raw listing title into a record that can
//! be compared against a target.
//!
//! The pass infers the brand, collapses pack/multiplier expressions
//! ("4 x 50ml"), reconciles units and quantities against the target's
//! declared measurement, and adjusts price/confidence for quantity
//! mismatches. It is a pure transformation: the candidate goes in by value
//! and comes out normalized, with `total = buy + postage` re-enforced.
//!
//! Idempotence: re-running the pass on a normalized candidate with no
//! remaining pack/unit patterns changes nothing.

use crate::clean::clean_title;
use crate::config::EngineConfig;
use crate::debug::dev_log_score;
use crate::model::{round2, Candidate, Target};
use crate::tokens::{canonical_number, tokenize};
use crate::units;
use once_cell::sync::Lazy;
use regex::Regex;

// "6 pack x 500ml" keeps the multiplier expression: only the word "pack"
// goes.
static PACK_X: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d+)\s*pack\s+x\b").expect("pack-x regex"));
static N_PACK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d+)\s*pack\b").expect("n-pack regex"));
static PACK_OF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bpack\s+of\s+(\d+)\b").expect("pack-of regex"));

// "4 x 50ml = 200ml" keeps the per-item size; the count and total go.
static X_EQUATION: Lazy<Regex> = Lazy::new(|| {
    let alt = units::unit_alternation();
    Regex::new(&format!(
        r"(?i)\b(\d+)\s*[x*]\s*(\d+(?:\.\d+)?)\s*({alt})?\s*=\s*\d+(?:\.\d+)?\s*(?:{alt})?\b"
    ))
    .expect("x-equation regex")
});
// "4 x 50ml" / "4 x 50": the whole span goes.
static X_SIZE: Lazy<Regex> = Lazy::new(|| {
    let alt = units::unit_alternation();
    Regex::new(&format!(
        r"(?i)\b(\d+)\s*[x*]\s*(\d+(?:\.\d+)?)\s*(?:{alt})?\b"
    ))
    .expect("x-size regex")
});
// Dangling "4 x" with no size following.
static X_TRAILING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d+)\s*[x*](\s|$)").expect("x-trailing regex"));
// Leading "x4" / "* 4".
static X_LEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(^|[^0-9a-z])[x*]\s*(\d+)\b").expect("x-leading regex"));

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("ws regex"));

/// Normalize one candidate relative to the target. Confidence is carried
/// forward from the input (this is not yet the match score).
pub fn normalize(mut candidate: Candidate, target: &Target, cfg: &EngineConfig) -> Candidate {
    if candidate.variant.is_empty() {
        candidate.variant = candidate.title.clone();
    }
    infer_brand(&mut candidate, target);

    let (variant, divisor) = collapse_packs(&candidate.variant);
    candidate.variant = variant;
    if divisor > 1 {
        apply_pack_divisor(&mut candidate, divisor, cfg);
    }

    let target_units: Vec<String> = target
        .measurements
        .iter()
        .map(|m| m.unit.trim().to_lowercase())
        .collect();
    candidate.variant = reconcile_units(&candidate.variant, &target_units);
    let (variant, price_divisor) = first_value_divisor(&candidate.variant, target);
    candidate.variant = variant;
    if let Some(divisor) = price_divisor {
        apply_value_divisor(&mut candidate, divisor, cfg);
    }

    candidate.variant = clean_title(&candidate.variant);
    candidate.title = format!("{} {}", candidate.brand, candidate.variant)
        .trim()
        .to_string();
    candidate.confidence = round2(candidate.confidence);
    candidate.enforce_price_invariant();
    dev_log_score("normalized", &candidate.source_title, candidate.confidence);
    candidate
}

/// Adopt the target's brand only when it literally occurs in the listing
/// title; the matched span is stripped from the variant. Otherwise the brand
/// stays unknown.
fn infer_brand(candidate: &mut Candidate, target: &Target) {
    if !candidate.brand.is_empty() || target.brand.is_empty() {
        return;
    }
    if candidate
        .title
        .to_lowercase()
        .contains(&target.brand.to_lowercase())
    {
        candidate.brand = target.brand.clone();
        let pattern = format!(r"(?i)\b{}\b", regex::escape(&target.brand));
        if let Ok(re) = Regex::new(&pattern) {
            candidate.variant = re.replace_all(&candidate.title, "").trim().to_string();
        }
    }
    candidate.title = format!("{} {}", candidate.brand, candidate.variant)
        .trim()
        .to_string();
}

/// Remove pack/multiplier expressions and return the inferred count
/// (>= 1). The first multiplier in the text wins; pack counts and "x"
/// counts compete by magnitude, mirroring listings like "2 pack 3 x 50ml".
fn collapse_packs(variant: &str) -> (String, u32) {
    let mut name = PACK_X.replace_all(variant, "$1 x").into_owned();

    let mut pack_divisor: u32 = 1;
    if let Some(caps) = N_PACK.captures(&name) {
        pack_divisor = caps[1].parse().unwrap_or(1);
    }
    name = N_PACK.replace_all(&name, " ").into_owned();
    if let Some(caps) = PACK_OF.captures(&name) {
        pack_divisor = pack_divisor.max(caps[1].parse().unwrap_or(1));
    }
    name = PACK_OF.replace_all(&name, " ").into_owned();

    let mut x_divisor: u32 = 1;
    let mut seen = false;
    name = X_EQUATION
        .replace_all(&name, |caps: &regex::Captures<'_>| {
            if !seen {
                x_divisor = caps[1].parse().unwrap_or(1);
                seen = true;
            }
            let unit = caps.get(3).map(|m| m.as_str()).unwrap_or("");
            format!(" {}{} ", &caps[2], unit.to_lowercase())
        })
        .into_owned();
    name = X_SIZE
        .replace_all(&name, |caps: &regex::Captures<'_>| {
            if !seen {
                x_divisor = caps[1].parse().unwrap_or(1);
                seen = true;
            }
            " ".to_string()
        })
        .into_owned();
    name = X_TRAILING
        .replace_all(&name, |caps: &regex::Captures<'_>| {
            if !seen {
                x_divisor = caps[1].parse().unwrap_or(1);
                seen = true;
            }
            caps[2].to_string()
        })
        .into_owned();
    name = X_LEADING
        .replace_all(&name, |caps: &regex::Captures<'_>| {
            if !seen {
                x_divisor = caps[2].parse().unwrap_or(1);
                seen = true;
            }
            caps[1].to_string()
        })
        .into_owned();

    let name = WHITESPACE.replace_all(&name, " ").trim().to_string();
    (name, pack_divisor.max(x_divisor).max(1))
}

/// A listing of N units sells each unit at roughly price/N; the damped
/// exponent keeps multi-packs from looking impossibly cheap per unit.
fn apply_pack_divisor(candidate: &mut Candidate, divisor: u32, cfg: &EngineConfig) {
    let d = divisor as f64;
    let baseline = if candidate.postage_price > 0.0 {
        candidate.postage_price
    } else {
        cfg.assumed_postage
    };
    candidate.buy_price = round2((candidate.total_price - baseline) / d.powf(cfg.pack_price_exponent));
    candidate.confidence = round2(
        candidate.confidence * (1.0 - cfg.pack_confidence_rate * d.powf(cfg.pack_confidence_exponent)),
    );
    candidate.enforce_price_invariant();
}

/// Convert each number+unit pair to the target's declared unit, pairing
/// positionally. Pairs with no corresponding target unit are deleted from
/// the display text.
fn reconcile_units(variant: &str, target_units: &[String]) -> String {
    let toks = tokenize(variant);
    let mut out = String::new();
    let mut unit_idx = 0usize;
    let mut i = 0usize;
    while i < toks.len() {
        let value: Option<f64> = toks.normalized[i].parse().ok();
        let next_is_unit = i + 1 < toks.len() && units::is_unit(&toks.normalized[i + 1]);
        if let (Some(value), true) = (value, next_is_unit) {
            match target_units.get(unit_idx) {
                None => {
                    // No corresponding unit on the target; drop the pair.
                    i += 2;
                    continue;
                }
                Some(target_unit) => {
                    match units::convert(value, &toks.normalized[i + 1], target_unit) {
                        Ok(converted) => {
                            let rendered = canonical_number(&format!("{:.2}", converted))
                                .unwrap_or_else(|| format!("{}", converted));
                            out.push_str(&format!("{}{} ", rendered, target_unit));
                        }
                        Err(_) => {
                            // Target declared an unknown unit; leave the pair as-is.
                            out.push_str(&toks.raw[i]);
                            out.push_str(&toks.raw[i + 1]);
                        }
                    }
                    unit_idx += 1;
                    i += 2;
                    continue;
                }
            }
        }
        out.push_str(&toks.raw[i]);
        i += 1;
    }
    WHITESPACE.replace_all(&out, " ").trim().to_string()
}

/// Find the first number whose unit matches the target's first declared
/// measurement; replace the displayed value with the target's canonical one
/// and return the size ratio. At most one measurement is consumed per pass.
fn first_value_divisor(variant: &str, target: &Target) -> (String, Option<f64>) {
    let Some(m) = target.measurements.first() else {
        return (variant.to_string(), None);
    };
    if m.value == 0.0 {
        return (variant.to_string(), None);
    }
    let target_unit = m.unit.trim().to_lowercase();
    let toks = tokenize(variant);
    let mut out = String::new();
    let mut divisor = None;
    let mut i = 0usize;
    while i < toks.len() {
        if divisor.is_none() {
            let value: Option<f64> = toks.normalized[i].parse().ok().filter(|v| *v > 0.0);
            let unit_matches =
                i + 1 < toks.len() && toks.normalized[i + 1].trim().to_lowercase() == target_unit;
            if let (Some(value), true) = (value, unit_matches) {
                let rendered =
                    canonical_number(&format!("{}", m.value)).unwrap_or_else(|| m.value.to_string());
                out.push_str(&format!("{}{} ", rendered, target_unit));
                divisor = Some(value / m.value);
                i += 2;
                continue;
            }
        }
        out.push_str(&toks.raw[i]);
        i += 1;
    }
    let out = WHITESPACE.replace_all(&out, " ").trim().to_string();
    (out, divisor)
}

/// Scale price by the size ratio and degrade confidence as the mismatch
/// grows; a candidate 30x the target's size stops counting entirely.
fn apply_value_divisor(candidate: &mut Candidate, divisor: f64, cfg: &EngineConfig) {
    if divisor != 1.0 {
        candidate.buy_price = round2(candidate.buy_price / divisor.powf(cfg.value_price_exponent));
    }
    let inverted = if divisor < 1.0 { 1.0 / divisor } else { divisor };
    if inverted > 1.0 {
        if inverted >= cfg.value_collapse_ratio {
            candidate.confidence = 0.0;
        } else {
            candidate.confidence = round2(
                candidate.confidence
                    * (1.0 - cfg.value_confidence_rate * inverted.powf(cfg.value_confidence_exponent)),
            );
        }
    }
    candidate.enforce_price_invariant();
}
