// src/config.rs
//! Engine tuning constants, consolidated in one place.
//!
//! Every free-floating heuristic constant the estimator uses lives here with
//! its documented effect, instead of being re-declared per component. Loaded
//! from TOML (path via `RESALE_CONFIG_PATH`, default `config/engine.toml`);
//! missing file or missing keys fall back to defaults.

use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_CONFIG_PATH: &str = "config/engine.toml";
pub const ENV_CONFIG_PATH: &str = "RESALE_CONFIG_PATH";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Quantile divisor for "cheap" selection: index `len / N` of a sorted
    /// list. Lower values pick cheaper entries.
    pub cheapness_aggression: usize,
    /// Candidates above `threshold * this` feed the synthetic price anchor.
    pub products_below_multiplier: f64,
    /// Minimum working-set size before a sparse-regime estimate is trusted.
    pub working_minimum: usize,
    /// Minimum number of >=90-confidence candidates for the rich regime.
    pub rich_minimum: usize,
    /// 0-99. Higher weakens the confidence-spread penalty
    /// (exponent = 1 - strength/100).
    pub standardize_strength: f64,
    /// Pool size below which search constraints are progressively relaxed.
    pub min_pool: usize,
    /// Pack collapse: price is divided by `N ^ this`.
    pub pack_price_exponent: f64,
    /// Pack collapse: confidence is scaled by `1 - rate * N ^ exponent`.
    pub pack_confidence_rate: f64,
    pub pack_confidence_exponent: f64,
    /// Value reconciliation: price is divided by `divisor ^ this`.
    pub value_price_exponent: f64,
    /// Value reconciliation: confidence scaled by `1 - rate * d ^ exponent`.
    pub value_confidence_rate: f64,
    pub value_confidence_exponent: f64,
    /// Size ratio at which a reconciled candidate stops counting at all.
    pub value_collapse_ratio: f64,
    /// Postage baseline assumed when a pack listing hides shipping in price.
    pub assumed_postage: f64,
    /// Normalized-Levenshtein threshold for dropping re-fetched duplicates
    /// when widened pools are merged.
    pub duplicate_similarity: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cheapness_aggression: 4,
            products_below_multiplier: 0.8,
            working_minimum: 8,
            rich_minimum: 6,
            standardize_strength: 50.0,
            min_pool: 3,
            pack_price_exponent: 0.96,
            pack_confidence_rate: 0.03,
            pack_confidence_exponent: 0.6,
            value_price_exponent: 0.59,
            value_confidence_rate: 0.13,
            value_confidence_exponent: 0.6,
            value_collapse_ratio: 30.0,
            assumed_postage: 2.7,
            duplicate_similarity: 0.92,
        }
    }
}

impl EngineConfig {
    /// Parse from a TOML string. Unknown keys are ignored, absent keys keep
    /// their defaults.
    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let cfg: EngineConfig = toml::from_str(toml_str)?;
        Ok(cfg)
    }

    /// Load from `RESALE_CONFIG_PATH` (or the default path). A missing file
    /// is not an error: defaults apply.
    pub fn from_env_or_default() -> anyhow::Result<Self> {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        match fs::read_to_string(&path) {
            Ok(content) => Self::from_toml_str(&content).map_err(|e| {
                anyhow::anyhow!("invalid engine config at {}: {}", path.display(), e)
            }),
            Err(_) => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.cheapness_aggression, 4);
        assert_eq!(cfg.working_minimum, 8);
        assert_eq!(cfg.rich_minimum, 6);
        assert_eq!(cfg.standardize_strength, 50.0);
        assert_eq!(cfg.min_pool, 3);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = EngineConfig::from_toml_str("working_minimum = 5\n").unwrap();
        assert_eq!(cfg.working_minimum, 5);
        assert_eq!(cfg.cheapness_aggression, 4);
    }
}
