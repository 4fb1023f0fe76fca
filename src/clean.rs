// src/clean.rs
//! Title cleaning: strip marketing boilerplate, normalise numbers, and join
//! number-unit pairs so "50 ML" reads as "50ml".
//!
//! Applied to both target names and candidate listing titles before any
//! tokenized work, so the matcher compares like with like.

use crate::tokens::canonical_number;
use crate::units;
use once_cell::sync::Lazy;
use regex::Regex;

/// Marketing and listing phrases that carry no identity signal.
static REMOVAL_TERMS: Lazy<Regex> = Lazy::new(|| {
    let terms = [
        r"new\s+with\s+tags",
        r"new\s+in\s+box",
        r"new\s+with\s+box",
        r"new\s+in\s+packaging",
        r"new\s*&\s*unused",
        r"new/unused",
        r"never\s+used",
        r"never\s+opened",
        r"free\s+postage",
        r"free\s+delivery",
        r"free\s+shipping",
        r"free\s+post",
        r"job\s+lot\s+of",
        r"job\s+lot",
        r"job\s+lots",
        r"for\s+sale",
        r"for\s+auction",
        r"for\s+collection",
        r"limited\s+edition",
        r"one\s+of\s+a\s+kind",
        r"cruelty\s+free",
        r"eco\s+friendly",
        r"plastic\s+free",
        r"new",
        r"brand",
        r"sealed",
        r"clearance",
        r"unused",
        r"updated",
        r"discontinued",
        r"discounted",
        r"delivery",
        r"worldwide",
        r"global",
        r"international",
        r"local",
        r"uk",
        r"original",
        r"authentic",
        r"genuine",
        r"official",
        r"collectible",
        r"vintage",
        r"rare",
        r"unique",
        r"seller",
        r"bulk",
        r"wholesale",
        r"vegan",
        r"organic",
        r"natural",
        r"sustainable",
        r"recyclable",
        r"biodegradable",
        r"packaging",
    ];
    Regex::new(&format!(r"(?i)\b(?:{})\b", terms.join("|"))).expect("removal terms regex")
});

static SPECIALS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9.=\-&\s]").expect("specials regex"));
static EDGE_DOTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\.+|\.+$").expect("edge dots regex"));
static LONE_DOT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.([^0-9]|$)").expect("lone dot regex"));
static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("number regex"));
static RRP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)rrp\s*\d+(?:\.\d+)?").expect("rrp regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("ws regex"));

/// `"50 ML"` -> `"50ml"`: whitespace between a number and a known unit is
/// dropped and the unit lowercased. Longest symbols first so "ml" wins
/// over "m".
static NUMBER_UNIT: Lazy<Regex> = Lazy::new(|| {
    let alt = units::unit_alternation();
    Regex::new(&format!(r"(?i)\b(\d+(?:\.\d+)?)\s+({})\b", alt)).expect("number-unit regex")
});

/// Clean one display name. Pure function; run it twice and nothing changes.
pub fn clean_title(text: &str) -> String {
    let mut name = text.trim().to_string();

    // Standardise separators, then strip noise phrases.
    name = name.replace('-', " ").replace('_', " ");
    name = REMOVAL_TERMS.replace_all(&name, "").into_owned();

    // Keep letters, digits, whitespace and `. = - &`; everything else
    // becomes a space.
    name = SPECIALS.replace_all(&name, " ").into_owned();

    // Trim edge dots; dots not starting a decimal become spaces.
    name = EDGE_DOTS.replace_all(&name, "").into_owned();
    name = LONE_DOT.replace_all(&name, " $1").into_owned();

    // Canonical decimal rendering for every number ("10.0" -> "10").
    name = NUMBER
        .replace_all(&name, |caps: &regex::Captures<'_>| {
            canonical_number(&caps[0]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned();

    // Join numbers to their units and lowercase the unit.
    name = NUMBER_UNIT
        .replace_all(&name, |caps: &regex::Captures<'_>| {
            format!("{}{}", &caps[1], caps[2].to_lowercase())
        })
        .into_owned();

    name = RRP.replace_all(&name, " ").into_owned();
    name = name.replace('&', " and ");

    name = WHITESPACE.replace_all(&name, " ").trim().to_string();
    name = REMOVAL_TERMS.replace_all(&name, "").into_owned();
    WHITESPACE.replace_all(&name, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_marketing_boilerplate() {
        let cleaned = clean_title("BRAND NEW Sealed Strawberry Body Butter - Free Postage!!");
        assert_eq!(cleaned, "Strawberry Body Butter");
    }

    #[test]
    fn joins_numbers_to_units() {
        assert_eq!(clean_title("Body Butter 50 ML"), "Body Butter 50ml");
        assert_eq!(clean_title("Shampoo 250.0 ml"), "Shampoo 250ml");
    }

    #[test]
    fn keeps_decimals_intact() {
        assert_eq!(clean_title("Serum 0.50 ml"), "Serum 0.5ml");
        assert_eq!(clean_title("Gel 10.05ml"), "Gel 10.05ml");
    }

    #[test]
    fn removes_rrp_hints_and_ampersands() {
        assert_eq!(clean_title("Lip Duo RRP 12.99 Line & Define"), "Lip Duo Line and Define");
    }

    #[test]
    fn boundaries_protect_inner_words() {
        // "new" inside a larger word must survive.
        assert_eq!(clean_title("Newcastle mug"), "Newcastle mug");
    }

    #[test]
    fn idempotent_on_cleaned_text() {
        let once = clean_title("NEW! Volume Lift Conditioner 250 ML");
        let twice = clean_title(&once);
        assert_eq!(once, twice);
    }
}
