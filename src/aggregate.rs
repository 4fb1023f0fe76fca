// src/aggregate.rs
//! Aggregation: per-candidate view averaging, then per-target price and
//! confidence estimation over the whole candidate pool.
//!
//! This is the only place confidence is clamped to [0,100]; the scorer just
//! multiplies factors and is allowed to produce anything non-negative.
//!
//! Two regimes drive the target estimate. With enough near-certain matches
//! (>= `rich_minimum` at confidence 90+) that set alone is trusted.
//! Otherwise a sparse walk descends the confidence thresholds 90, 85, ... 0,
//! growing a working set (double-counting the above-threshold candidates and
//! adding a synthetic price anchor) until it is large enough to price from.
//! Prices are picked at a cheap quantile of the sorted working set rather
//! than a mean, deliberately undercutting the market.

use crate::config::EngineConfig;
use crate::model::{round2, Candidate, Target};
use tracing::debug;

/// Scheme-weighted average of per-view confidences for one candidate,
/// rounded and clamped. Sole clamp point of the engine.
pub fn combine_view_confidences(views: &[(f64, f64)]) -> f64 {
    let total_weight: f64 = views.iter().map(|(_, w)| w).sum();
    if total_weight <= 0.0 {
        return 0.0;
    }
    let weighted: f64 = views.iter().map(|(c, w)| c * w).sum();
    round2((weighted / total_weight).clamp(0.0, 100.0))
}

/// Derive sell price, postage, and confidence for the target from its
/// scored candidates. Insufficient data is signaled by zeroed outputs, not
/// an error, so batch processing never halts.
pub fn price_target(target: &mut Target, cfg: &EngineConfig) {
    target.sell_price = 0.0;
    target.postage_price = 0.0;

    if !target.candidates.iter().any(|c| c.priced) {
        target.confidence = 0.0;
        target.matched_count = 0;
        return;
    }

    let thresholds: Vec<f64> = (0..19).map(|i| 90.0 - 5.0 * i as f64).collect();
    let top_band = band(target, thresholds[0]);

    if top_band.len() >= cfg.rich_minimum {
        rich_regime(target, &top_band);
    } else {
        for i in 0..thresholds.len() - 1 {
            let score = thresholds[i];
            let above = band(target, score);
            let working = band(target, thresholds[i + 1]);
            // The bottom of the walk computes from whatever is there.
            let last_step = thresholds[i + 1] == 0.0;
            sparse_step(target, &above, working, score, last_step, cfg);
            if target.sell_price > 0.0 {
                debug!(threshold = score, sell = target.sell_price, "priced in sparse regime");
                break;
            }
        }
    }
}

/// Candidates at or above a confidence threshold, cheapest first. Stable
/// tie-break on title keeps repeated runs bit-identical.
fn band(target: &Target, threshold: f64) -> Vec<Candidate> {
    let mut out: Vec<Candidate> = target
        .candidates
        .iter()
        .filter(|c| c.priced && c.confidence >= threshold)
        .cloned()
        .collect();
    sort_by_price(&mut out);
    out
}

fn sort_by_price(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        a.total_price
            .partial_cmp(&b.total_price)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.title.cmp(&b.title))
    });
}

/// Enough near-certain matches: price from that set alone. The cheapest
/// listing's price is the sell estimate; postage is the mean of known
/// postages. Wide confidence spread discounts the average.
fn rich_regime(target: &mut Target, set: &[Candidate]) {
    let avg = mean(set.iter().map(|c| c.confidence));
    let postages: Vec<f64> = set
        .iter()
        .map(|c| c.postage_price)
        .filter(|p| *p > 0.0)
        .collect();
    let estimated_postage = if postages.is_empty() {
        0.0
    } else {
        mean(postages.iter().copied())
    };

    let spread = spread_ratio(set);
    target.confidence = round2(avg * spread.powf(0.5));
    target.sell_price = round2(set[0].total_price);
    target.postage_price = round2(estimated_postage);
    target.matched_count = set.len();
}

/// One step of the sparse walk at `score`. Leaves `sell_price` at zero when
/// the working set is still too small, so the walk continues downward.
fn sparse_step(
    target: &mut Target,
    above: &[Candidate],
    mut working: Vec<Candidate>,
    score: f64,
    last_step: bool,
    cfg: &EngineConfig,
) {
    target.matched_count = working.len();

    if !above.is_empty() || score <= 30.0 {
        let mut below: Vec<&Candidate> = target
            .candidates
            .iter()
            .filter(|c| c.priced && c.confidence > score * cfg.products_below_multiplier)
            .collect();
        below.sort_by(|a, b| {
            a.total_price
                .partial_cmp(&b.total_price)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.title.cmp(&b.title))
        });
        let below_prices: Vec<f64> = below.iter().map(|c| c.total_price).collect();
        let below_postages: Vec<f64> = below.iter().map(|c| c.postage_price).collect();

        if below_prices.is_empty() {
            return;
        }

        let price_median = lower_middle(&below_prices);
        let postage_median = lower_middle(&below_postages);

        // Anchor halfway between the below-median and the above-set mean;
        // with no above set, the below medians stand alone.
        let (anchor_price, anchor_postage) = if !above.is_empty() {
            let above_mean = mean(above.iter().map(|c| c.total_price + c.postage_price));
            (
                round2(price_median + (price_median - above_mean).abs() / 2.0),
                0.0,
            )
        } else {
            (price_median, postage_median)
        };

        // Double-count the above set, then add the anchor.
        working.extend_from_slice(above);
        working.extend_from_slice(above);
        let mut anchor = Candidate::new("anchor");
        anchor.confidence = score;
        anchor.postage_price = anchor_postage;
        anchor.buy_price = round2(anchor_price - anchor_postage);
        anchor.enforce_price_invariant();
        working.push(anchor);
    }

    if working.len() >= cfg.working_minimum || last_step {
        set_target_attributes(target, working, cfg);
    } else {
        target.sell_price = 0.0;
        target.confidence = 0.0;
        target.postage_price = 0.0;
        target.matched_count = 0;
    }
}

/// Price/confidence/postage from a working set: cheap-quantile selection,
/// postage imputation, and a spread-discounted confidence average.
fn set_target_attributes(target: &mut Target, mut working: Vec<Candidate>, cfg: &EngineConfig) {
    if working.is_empty() {
        target.sell_price = 0.0;
        target.confidence = 0.0;
        target.postage_price = 0.0;
        return;
    }
    sort_by_price(&mut working);

    let mut postages: Vec<f64> = working
        .iter()
        .map(|c| c.postage_price)
        .filter(|p| *p > 0.0)
        .collect();
    postages.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let estimated_postage = postages
        .get(postages.len() / cfg.cheapness_aggression)
        .copied()
        .unwrap_or(0.0);

    // Impute unknown postage and re-derive buy prices, both in the working
    // set and on the target's own candidates so downstream consumers agree.
    for c in &mut working {
        if c.postage_price == 0.0 {
            c.postage_price = estimated_postage;
        }
        c.buy_price = round2(c.total_price - c.postage_price);
        c.total_price = round2(c.buy_price + c.postage_price);
    }
    for c in &mut target.candidates {
        if !c.priced {
            continue;
        }
        if c.postage_price == 0.0 {
            c.postage_price = estimated_postage;
        }
        c.buy_price = round2(c.total_price - c.postage_price);
        c.total_price = round2(c.buy_price + c.postage_price);
    }

    let sell = working[working.len() / cfg.cheapness_aggression].buy_price;
    let avg = mean(working.iter().map(|c| c.confidence));
    let spread = spread_ratio(&working);
    let exponent = 1.0 - cfg.standardize_strength / 100.0;

    target.sell_price = round2(sell);
    target.confidence = round2(avg * spread.powf(exponent));
    target.postage_price = round2(estimated_postage);
}

/// Lower-middle element of a sorted list: index (n/2)-1 for n > 1. Not a
/// true median, by design.
fn lower_middle(values: &[f64]) -> f64 {
    match values.len() {
        0 => 0.0,
        1 => values[0],
        n => values[n / 2 - 1],
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let collected: Vec<f64> = values.collect();
    if collected.is_empty() {
        return 0.0;
    }
    collected.iter().sum::<f64>() / collected.len() as f64
}

/// Confidence spread as min/max in (0,1]; 1 means no spread. Zero inputs
/// are clamped to 1 to avoid division blowups.
fn spread_ratio(set: &[Candidate]) -> f64 {
    if set.is_empty() {
        return 1.0;
    }
    let mut max = set.iter().map(|c| c.confidence).fold(f64::MIN, f64::max);
    let mut min = set.iter().map(|c| c.confidence).fold(f64::MAX, f64::min);
    if min == 0.0 {
        min = 1.0;
    }
    if max == 0.0 {
        max = 1.0;
    }
    (min / max).min(1.0)
}
