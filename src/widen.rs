// src/widen.rs
//! Search widening: when a candidate pool comes back too small, relax the
//! marketplace search constraints step by step and tag everything fetched
//! under relaxed constraints with trust penalties.
//!
//! The controller is a pure state machine over pool size; it never performs
//! a search itself. Steps: strict (country + condition) -> drop the country
//! filters -> restore country but flip the condition -> drop both. Pools
//! from earlier steps are always kept; later pools are appended with their
//! penalty hints attached at creation time.

use crate::model::{Condition, PenaltyHints, RawListing};
use strsim::normalized_levenshtein;
use tracing::debug;

/// Widening steps, in relaxation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidenStep {
    Strict,
    RelaxCountry,
    RelaxCondition,
    RelaxBoth,
}

/// One search the host should run: which filters to apply and which
/// penalties to stamp on the results.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPlan {
    pub step: WidenStep,
    /// Keep the delivery/location country filters on this search.
    pub restrict_country: bool,
    pub condition: Condition,
    /// Penalties to attach to every listing this search returns.
    pub hints: PenaltyHints,
}

/// Drives the relaxation sequence. Terminal once the pool holds at least
/// `min_pool` listings or every step has been tried.
#[derive(Debug)]
pub struct WideningController {
    base_condition: Condition,
    min_pool: usize,
    next_step: usize,
}

impl WideningController {
    pub fn new(base_condition: Condition, min_pool: usize) -> Self {
        Self {
            base_condition,
            min_pool,
            next_step: 0,
        }
    }

    /// Condition-flip penalty: searching used listings for a new-condition
    /// good mildly degrades trust; pricing a used good from new listings
    /// badly misstates the market.
    fn flip_penalty(&self) -> f64 {
        match self.base_condition {
            Condition::New => 0.1,
            Condition::Used => 0.6,
        }
    }

    /// The next search to run given the current pool size, or `None` when
    /// the pool is big enough or the steps are exhausted.
    pub fn next_plan(&mut self, pool_size: usize) -> Option<SearchPlan> {
        if self.next_step > 0 && pool_size >= self.min_pool {
            return None;
        }
        let plan = match self.next_step {
            0 => SearchPlan {
                step: WidenStep::Strict,
                restrict_country: true,
                condition: self.base_condition,
                hints: PenaltyHints::default(),
            },
            1 => SearchPlan {
                step: WidenStep::RelaxCountry,
                restrict_country: false,
                condition: self.base_condition,
                hints: PenaltyHints {
                    confidence_penalty: 0.1,
                    price_penalty: 0.0,
                },
            },
            2 => SearchPlan {
                step: WidenStep::RelaxCondition,
                restrict_country: true,
                condition: self.base_condition.flipped(),
                hints: PenaltyHints {
                    confidence_penalty: self.flip_penalty(),
                    price_penalty: self.flip_penalty(),
                },
            },
            3 => SearchPlan {
                step: WidenStep::RelaxBoth,
                restrict_country: false,
                condition: self.base_condition.flipped(),
                hints: PenaltyHints {
                    confidence_penalty: self.flip_penalty() + 0.1,
                    price_penalty: self.flip_penalty(),
                },
            },
            _ => return None,
        };
        self.next_step += 1;
        Some(plan)
    }
}

/// Append a freshly fetched pool, stamping the plan's penalty hints on each
/// listing. Exact re-fetches (same locator) and near-identical titles at the
/// same price are skipped so relaxed searches don't double-count what the
/// strict search already found.
pub fn merge_pool(
    existing: &mut Vec<RawListing>,
    fresh: Vec<RawListing>,
    plan: &SearchPlan,
    similarity_threshold: f64,
) {
    for mut listing in fresh {
        let duplicate = existing.iter().any(|seen| {
            if !listing.web_url.is_empty() && seen.web_url == listing.web_url {
                return true;
            }
            let same_price = match (&seen.price, &listing.price) {
                (Some(a), Some(b)) => (a.amount - b.amount).abs() < 0.01 && a.currency == b.currency,
                (None, None) => true,
                _ => false,
            };
            same_price
                && normalized_levenshtein(
                    &seen.title.to_lowercase(),
                    &listing.title.to_lowercase(),
                ) >= similarity_threshold
        });
        if duplicate {
            debug!(step = ?plan.step, "skipping near-duplicate listing from widened search");
            continue;
        }
        listing.hints = plan.hints;
        existing.push(listing);
    }
}
