// src/debug.rs
//! Anonymized dev logging helpers.
//!
//! Raw listing titles never reach the logs: dev-level events carry only a
//! short hash of the text plus numeric fields. The gate requires
//! `RESALE_DEV_LOG=1` and a dev build.

use tracing::debug;

// Dev logging gate: RESALE_DEV_LOG=1 AND a debug build.
pub(crate) fn dev_logging_enabled() -> bool {
    let on = std::env::var("RESALE_DEV_LOG").ok().as_deref() == Some("1");
    on && cfg!(debug_assertions)
}

/// Short, stable, anonymized id for a text field.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Minimal, anonymized dev logger for per-candidate scoring events.
pub(crate) fn dev_log_score(event: &str, title: &str, confidence: f64) {
    if !dev_logging_enabled() {
        return;
    }
    let id = anon_hash(title);
    debug!(target: "scoring", %id, confidence, event);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_short_and_stable() {
        let a = anon_hash("The Body Shop Body Butter 50ml");
        let b = anon_hash("The Body Shop Body Butter 50ml");
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
        assert_ne!(a, anon_hash("something else"));
    }
}
