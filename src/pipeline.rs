// src/pipeline.rs
//! End-to-end appraisal: target description + materialized candidate pool
//! in, enriched target out.
//!
//! Per candidate: currency conversion and penalty hints at creation,
//! normalization against the target, then one match score per filter scheme
//! view, combined by scheme weight. Per target: the aggregator's two pricing
//! regimes, the buyer-protection fee, a postage fallback, and the final
//! quality metrics.
//!
//! Everything is deterministic for a fixed pool: stable sorts, explicit
//! tie-break keys, no wall-clock or randomness anywhere in the path.

use crate::aggregate;
use crate::clean::clean_title;
use crate::config::EngineConfig;
use crate::currency::{CurrencyConverter, RateTable};
use crate::debug::dev_log_score;
use crate::fees;
use crate::filter::{filter_candidate_variant, filter_target_variant, FILTER_SCHEMES};
use crate::lot;
use crate::model::{round2, Candidate, Lot, Measurement, RawListing, Target};
use crate::normalize;
use crate::score::{match_factor, ViewPair};
use crate::tagger::{LexiconTagger, Tagger};
use crate::tokens::tokenize;
use crate::units;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("ws regex"));

/// The appraisal engine with its injected collaborators.
pub struct Appraiser<C: CurrencyConverter, T: Tagger> {
    pub config: EngineConfig,
    currency: C,
    tagger: T,
}

impl Default for Appraiser<RateTable, LexiconTagger> {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            currency: RateTable::base_only(),
            tagger: LexiconTagger::new(),
        }
    }
}

impl Appraiser<RateTable, LexiconTagger> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: CurrencyConverter, T: Tagger> Appraiser<C, T> {
    pub fn with_collaborators(config: EngineConfig, currency: C, tagger: T) -> Self {
        Self {
            config,
            currency,
            tagger,
        }
    }

    /// Appraise one target against its candidate pool and return the
    /// enriched copy.
    pub fn appraise(&self, mut target: Target, pool: &[RawListing]) -> Target {
        info!(target = %target.name, pool = pool.len(), "appraising target");

        self.prepare_target(&mut target);

        // Target views are the same for every candidate; compute them once.
        let target_views: Vec<String> = FILTER_SCHEMES
            .iter()
            .map(|scheme| filter_target_variant(&target.variant, scheme.roles, &self.tagger))
            .collect();

        for listing in pool {
            let candidate = self.create_candidate(listing);
            let mut candidate = normalize::normalize(candidate, &target, &self.config);

            let mut views = Vec::with_capacity(FILTER_SCHEMES.len());
            for (scheme, target_view) in FILTER_SCHEMES.iter().zip(&target_views) {
                let candidate_view = filter_candidate_variant(
                    &candidate.variant,
                    &target.variant,
                    scheme.roles,
                    &self.tagger,
                );
                let pair = ViewPair {
                    target_variant: target_view.clone(),
                    target_name: target.name.clone(),
                    candidate_variant: candidate_view,
                    candidate_name: candidate.title.clone(),
                };
                let factor = match_factor(&pair, &target, &candidate, &self.tagger);
                views.push((candidate.confidence * factor, scheme.weight));
            }
            candidate.confidence = aggregate::combine_view_confidences(&views);
            candidate.quality_score = fees::quality_tier(candidate.confidence);
            dev_log_score("scored", &candidate.source_title, candidate.confidence);
            target.candidates.push(candidate);
        }

        target.sort_candidates();
        aggregate::price_target(&mut target, &self.config);

        if target.sell_price > 0.0 {
            fees::apply_buyer_protection(&mut target);
            fees::estimate_postage(&mut target);
            target.total_price = round2(
                target.sell_price + target.postage_price + target.buyer_protection_fee,
            );
        }
        fees::finalize_scores(&mut target);

        info!(
            target = %target.name,
            sell = target.sell_price,
            confidence = target.confidence,
            matched = target.matched_count,
            "appraisal complete"
        );
        target
    }

    /// Appraise every target in a lot against its pool (by position) and
    /// roll the lot up. A missing pool prices that target at zero without
    /// affecting its siblings.
    pub fn appraise_lot(&self, mut lot: Lot, pools: &[Vec<RawListing>]) -> Lot {
        let targets = std::mem::take(&mut lot.targets);
        lot.targets = targets
            .into_iter()
            .enumerate()
            .map(|(i, t)| {
                let pool = pools.get(i).map(Vec::as_slice).unwrap_or(&[]);
                self.appraise(t, pool)
            })
            .collect();
        lot::rollup(&mut lot);
        lot
    }

    /// Preserve the pre-clean texts for context scoring, clean the display
    /// name, and pick up the canonical measurement from the name when none
    /// was declared.
    fn prepare_target(&self, target: &mut Target) {
        // One appraisal pass fully derives these; stale state from an
        // earlier pass must not leak into a re-run.
        target.candidates.clear();
        target.buyer_protection_fee = 0.0;
        target.total_price = 0.0;
        target.price_quality = 0.0;

        target.original_brand = target.brand.trim().to_string();
        target.original_variant = target.variant.trim().to_string();
        target.original_name = format!("{} {}", target.original_brand, target.original_variant)
            .trim()
            .to_string();

        target.variant = clean_title(&target.variant);
        self.extract_measurements(target);
        target.name = format!("{} {}", target.brand, target.variant)
            .trim()
            .to_string();
    }

    /// First number+unit pair in the name becomes the canonical measurement
    /// (unless the host already declared one); later pairs are stripped from
    /// the display text so duplicates don't confuse matching.
    fn extract_measurements(&self, target: &mut Target) {
        if !target.measurements.is_empty() {
            return;
        }
        let toks = tokenize(&target.variant);
        let mut out = String::new();
        let mut found: Option<Measurement> = None;
        let mut i = 0usize;
        while i < toks.len() {
            let value: Option<f64> = toks.normalized[i].parse().ok();
            let next_is_unit = i + 1 < toks.len() && units::is_unit(&toks.normalized[i + 1]);
            if let (Some(value), true) = (value, next_is_unit) {
                if found.is_none() {
                    found = Some(Measurement::new(
                        round2(value),
                        toks.normalized[i + 1].clone(),
                    ));
                    out.push_str(&toks.raw[i]);
                    out.push_str(&toks.raw[i + 1]);
                }
                // A later number+unit pair is a duplicate size mention; drop it.
                i += 2;
                continue;
            }
            out.push_str(&toks.raw[i]);
            i += 1;
        }
        target.variant = WHITESPACE.replace_all(&out, " ").trim().to_string();
        if let Some(m) = found {
            target.measurements = vec![m];
        }
    }

    fn create_candidate(&self, listing: &RawListing) -> Candidate {
        let hints = listing.hints;
        let mut candidate = Candidate::new(listing.title.clone());
        candidate.web_url = listing.web_url.clone();
        candidate.confidence = (1.0 - hints.confidence_penalty).clamp(0.0, 1.0) * 100.0;

        match &listing.price {
            Some(money) if !money.currency.is_empty() => {
                let discounted = money.amount * (1.0 - hints.price_penalty);
                match self.currency.to_base(discounted, &money.currency) {
                    Ok(amount) => candidate.buy_price = round2(amount),
                    Err(e) => {
                        warn!(error = %e, "listing price not convertible; kept unpriced");
                        candidate.priced = false;
                    }
                }
            }
            _ => candidate.priced = false,
        }

        if candidate.priced {
            if let Some(shipping) = &listing.shipping {
                match self.currency.to_base(shipping.amount, &shipping.currency) {
                    Ok(amount) => candidate.postage_price = round2(amount),
                    Err(_) => candidate.postage_price = 0.0,
                }
            }
            candidate.enforce_price_invariant();
        } else {
            candidate.buy_price = 0.0;
            candidate.postage_price = 0.0;
            candidate.total_price = 0.0;
        }
        candidate
    }
}
