// src/units.rs
//! Unit conversion over a fixed table of multipliers to a per-category base
//! unit: mass -> grams, volume -> millilitres, length -> millimetres,
//! data -> bytes.
//!
//! No cross-category validation is performed; callers are responsible for
//! only converting within one physical category. Data units use binary
//! multiples (1 kb = 1024 b).

use once_cell::sync::Lazy;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum UnitError {
    #[error("conversion from `{from}` to `{to}` is not supported")]
    UnsupportedUnit { from: String, to: String },
}

static FACTORS: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    HashMap::from([
        // mass -> grams
        ("kg", 1000.0),
        ("g", 1.0),
        ("lb", 453.592),
        ("oz", 28.3495),
        // volume -> millilitres
        ("fl oz", 29.5735),
        ("l", 1000.0),
        ("ml", 1.0),
        // length -> millimetres
        ("m", 1000.0),
        ("cm", 10.0),
        ("mm", 1.0),
        // data -> bytes
        ("b", 1.0),
        ("kb", 1024.0),
        ("gb", 1024.0 * 1024.0),
        ("tb", 1024.0 * 1024.0 * 1024.0),
    ])
});

/// True when `token` (trimmed, lowercased) is a recognized unit symbol.
pub fn is_unit(token: &str) -> bool {
    FACTORS.contains_key(token.trim().to_lowercase().as_str())
}

/// Iterate all known unit symbols.
pub fn unit_symbols() -> impl Iterator<Item = &'static str> {
    FACTORS.keys().copied()
}

/// Escaped alternation of all unit symbols, longest first, for building
/// regexes that must prefer "ml" over "m".
pub fn unit_alternation() -> String {
    let mut symbols: Vec<&str> = unit_symbols().collect();
    symbols.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    symbols
        .iter()
        .map(|s| regex::escape(s))
        .collect::<Vec<_>>()
        .join("|")
}

/// Convert `value` between two units sharing a base category.
pub fn convert(value: f64, from: &str, to: &str) -> Result<f64, UnitError> {
    let from_key = from.trim().to_lowercase();
    let to_key = to.trim().to_lowercase();
    match (FACTORS.get(from_key.as_str()), FACTORS.get(to_key.as_str())) {
        (Some(f), Some(t)) => Ok(value * f / t),
        _ => Err(UnitError::UnsupportedUnit {
            from: from.to_string(),
            to: to.to_string(),
        }),
    }
}
