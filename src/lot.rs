// src/lot.rs
//! Lot rollup: aggregate already-appraised targets into lot-level totals,
//! profit, and a profitability rating.
//!
//! Rollup is idempotent for a fixed set of appraised targets; a target that
//! failed to price contributes zeros rather than aborting the lot.

use crate::model::{round2, Lot};
use tracing::info;

/// Compute lot-level metrics from the lot's targets and declared purchase
/// price, and stamp the processing date. Targets are re-sorted by
/// price-quality descending (stable, name tie-break).
pub fn rollup(lot: &mut Lot) {
    lot.targets.sort_by(|a, b| {
        b.price_quality
            .partial_cmp(&a.price_quality)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });

    let mut total_confidence = 0.0;
    let mut total_sell = 0.0;
    let mut total_postage = 0.0;
    let mut total_fees = 0.0;
    let mut total_score = 0.0;
    let mut item_count: u32 = 0;

    for target in &lot.targets {
        let qty = target.quantity as f64;
        total_confidence += target.confidence * qty;
        // Gross sale value: the net sell estimate plus the fee the buyer
        // covers on top.
        total_sell += (target.sell_price + target.buyer_protection_fee) * qty;
        total_postage += target.postage_price * qty;
        total_fees += target.buyer_protection_fee * qty;
        total_score += target.price_quality * qty;
        item_count += target.quantity;
    }

    lot.sell_price = round2(total_sell);
    lot.postage_price = round2(total_postage);
    lot.fees = round2(total_fees);
    lot.listing_price = round2(total_sell + total_postage);

    // Light scale bonus so a 20-item lot with the same per-item quality
    // outranks a 2-item one.
    if item_count > 0 {
        total_score *= (item_count as f64).powf(0.1);
    }

    lot.profit = round2(total_sell - lot.buy_listing_price);
    lot.rating = if lot.profit == 0.0 {
        0.0
    } else {
        let sign = if lot.profit > 0.0 { 1.0 } else { -1.0 };
        round2(sign * total_score * lot.profit.abs().powf(1.2))
    };
    lot.confidence = if item_count > 0 {
        round2(total_confidence / item_count as f64)
    } else {
        0.0
    };

    lot.processed_on = Some(chrono::Local::now().date_naive());
    info!(
        lot = %lot.name,
        profit = lot.profit,
        rating = lot.rating,
        confidence = lot.confidence,
        "lot rollup complete"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Condition, Target};

    fn appraised(name: &str, sell: f64, fee: f64, postage: f64, conf: f64, quality: f64, qty: u32) -> Target {
        let mut t = Target::new("", name, qty);
        t.sell_price = sell;
        t.buyer_protection_fee = fee;
        t.postage_price = postage;
        t.confidence = conf;
        t.price_quality = quality;
        t
    }

    #[test]
    fn totals_are_quantity_weighted() {
        let mut lot = Lot::new("box of creams", Condition::New, 20.0);
        lot.targets.push(appraised("a", 10.0, 0.8, 1.55, 80.0, 4.0, 2));
        lot.targets.push(appraised("b", 5.0, 0.45, 1.55, 60.0, 2.0, 1));
        rollup(&mut lot);
        // (10 + 0.80) * 2 + (5 + 0.45) * 1
        assert_eq!(lot.sell_price, 27.05);
        assert_eq!(lot.postage_price, 4.65);
        assert_eq!(lot.fees, 2.05);
        assert_eq!(lot.listing_price, 31.7);
        // (80*2 + 60*1) / 3
        assert_eq!(lot.confidence, 73.33);
        assert_eq!(lot.profit, 7.05);
        assert!(lot.rating > 0.0);
        assert!(lot.processed_on.is_some());
    }

    #[test]
    fn targets_resort_by_price_quality() {
        let mut lot = Lot::new("lot", Condition::New, 0.0);
        lot.targets.push(appraised("low", 1.0, 0.1, 1.0, 10.0, 0.5, 1));
        lot.targets.push(appraised("high", 9.0, 0.7, 1.0, 90.0, 8.0, 1));
        rollup(&mut lot);
        assert_eq!(lot.targets[0].name, "high");
    }

    #[test]
    fn negative_profit_yields_negative_rating() {
        let mut lot = Lot::new("overpriced", Condition::Used, 30.0);
        lot.targets.push(appraised("a", 23.3, 1.7, 2.7, 70.0, 2.0, 1));
        rollup(&mut lot);
        assert_eq!(lot.profit, -5.0);
        // sign(profit) * total_score * |profit|^1.2 with a single item.
        let expected = -(2.0 * 5.0_f64.powf(1.2));
        assert!((lot.rating - round2(expected)).abs() < 1e-9);
    }

    #[test]
    fn zero_profit_rating_is_exactly_zero() {
        let mut lot = Lot::new("breakeven", Condition::New, 10.8);
        lot.targets.push(appraised("a", 10.0, 0.8, 1.55, 50.0, 1.0, 1));
        rollup(&mut lot);
        assert_eq!(lot.profit, 0.0);
        assert_eq!(lot.rating, 0.0);
    }

    #[test]
    fn empty_lot_is_all_zeroes() {
        let mut lot = Lot::new("empty", Condition::New, 5.0);
        rollup(&mut lot);
        assert_eq!(lot.sell_price, 0.0);
        assert_eq!(lot.confidence, 0.0);
        assert_eq!(lot.profit, -5.0);
        assert_eq!(lot.rating, 0.0);
    }
}
