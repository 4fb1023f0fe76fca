// src/fees.rs
//! Buyer-protection fees, postage estimation, and the per-target quality
//! metrics derived after pricing.

use crate::model::{round2, Target};

/// Marketplace buyer-protection fee for a given sell price: a flat part
/// plus a marginal rate, tiered by price.
pub fn buyer_protection_fee(sell_price: f64) -> f64 {
    if sell_price <= 20.0 {
        round2(0.1 + 0.07 * sell_price)
    } else if sell_price <= 300.0 {
        round2(1.5 + 0.04 * (sell_price - 20.0))
    } else if sell_price <= 4000.0 {
        round2(12.7 + 0.02 * (sell_price - 300.0))
    } else {
        86.7
    }
}

/// Compute the fee and net it out of the target's sell price.
pub fn apply_buyer_protection(target: &mut Target) {
    target.buyer_protection_fee = buyer_protection_fee(target.sell_price);
    target.sell_price = round2(target.sell_price - target.buyer_protection_fee);
}

/// Fallback postage from the first declared measurement when no candidate
/// supplied one. Small/light goods ship cheaper.
pub fn estimate_postage(target: &mut Target) {
    if target.postage_price > 0.0 {
        return;
    }
    let Some(m) = target.measurements.first() else {
        target.postage_price = 1.7;
        return;
    };
    target.postage_price = match m.unit.trim().to_lowercase().as_str() {
        "ml" => {
            if m.value <= 50.0 {
                1.55
            } else {
                2.7
            }
        }
        "l" => {
            if m.value <= 0.05 {
                1.55
            } else {
                2.7
            }
        }
        "g" => {
            if m.value <= 100.0 {
                1.55
            } else if m.value <= 200.0 {
                2.7
            } else {
                3.29
            }
        }
        "kg" => {
            if m.value <= 0.1 {
                1.55
            } else if m.value <= 0.2 {
                2.7
            } else {
                3.29
            }
        }
        _ => 1.55,
    };
}

/// Tiered quality score for a candidate, 0-1000. Deliberately non-linear:
/// close matches are worth disproportionately more.
pub fn quality_tier(confidence: f64) -> f64 {
    if confidence >= 100.0 {
        1000.0
    } else if confidence >= 95.0 {
        970.0
    } else if confidence >= 90.0 {
        930.0
    } else if confidence >= 85.0 {
        890.0
    } else if confidence >= 80.0 {
        850.0
    } else if confidence >= 75.0 {
        810.0
    } else if confidence >= 70.0 {
        760.0
    } else if confidence >= 65.0 {
        710.0
    } else if confidence >= 60.0 {
        660.0
    } else if confidence >= 55.0 {
        600.0
    } else if confidence >= 50.0 {
        540.0
    } else if confidence >= 45.0 {
        480.0
    } else if confidence >= 40.0 {
        410.0
    } else if confidence >= 30.0 {
        260.0
    } else if confidence >= 20.0 {
        110.0
    } else if confidence >= 10.0 {
        10.0
    } else if confidence >= 5.0 {
        3.0
    } else if confidence >= 3.0 {
        1.0
    } else if confidence >= 1.0 {
        0.1
    } else {
        0.0
    }
}

/// Finalize the target's scores after pricing: compress confidence with a
/// square-root curve, penalize small samples and low name certainty, then
/// derive the price-quality value metric.
pub fn finalize_scores(target: &mut Target) {
    target.confidence = 100.0 * (target.confidence / 100.0).sqrt();

    match target.matched_count {
        1 => target.confidence *= 0.7,
        2 => target.confidence *= 0.85,
        3 => target.confidence *= 0.95,
        _ => {}
    }
    target.confidence = round2(target.confidence);

    let certainty_penalty = target.confidence
        - target
            .confidence
            .powf(target.name_certainty.clamp(0.0, 1.0).sqrt());

    target.price_quality = if target.total_price > 0.0 {
        ((target.confidence - certainty_penalty) / target.total_price).powf(1.1)
    } else {
        0.0
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Measurement;

    #[test]
    fn fee_schedule_tiers() {
        // 250 sits in the second tier: 1.50 + 4% of 230.
        assert_eq!(buyer_protection_fee(250.0), 10.7);
        assert_eq!(buyer_protection_fee(10.0), 0.8);
        assert_eq!(buyer_protection_fee(20.0), 1.5);
        assert_eq!(buyer_protection_fee(300.0), 12.7);
        assert_eq!(buyer_protection_fee(4000.0), 86.7);
        assert_eq!(buyer_protection_fee(9999.0), 86.7);
    }

    #[test]
    fn fee_is_netted_out_of_sell_price() {
        let mut t = Target::new("", "thing", 1);
        t.sell_price = 250.0;
        apply_buyer_protection(&mut t);
        assert_eq!(t.buyer_protection_fee, 10.7);
        assert_eq!(t.sell_price, 239.3);
    }

    #[test]
    fn postage_fallback_uses_first_measurement() {
        let mut t = Target::new("", "thing", 1)
            .with_measurements(vec![Measurement::new(30.0, "ml")]);
        estimate_postage(&mut t);
        assert_eq!(t.postage_price, 1.55);

        let mut heavy = Target::new("", "thing", 1)
            .with_measurements(vec![Measurement::new(500.0, "g")]);
        estimate_postage(&mut heavy);
        assert_eq!(heavy.postage_price, 3.29);

        let mut bare = Target::new("", "thing", 1);
        estimate_postage(&mut bare);
        assert_eq!(bare.postage_price, 1.7);
    }

    #[test]
    fn postage_already_known_is_kept() {
        let mut t = Target::new("", "thing", 1);
        t.postage_price = 2.2;
        estimate_postage(&mut t);
        assert_eq!(t.postage_price, 2.2);
    }

    #[test]
    fn quality_tiers_spot_checks() {
        assert_eq!(quality_tier(100.0), 1000.0);
        assert_eq!(quality_tier(96.5), 970.0);
        assert_eq!(quality_tier(52.0), 540.0);
        assert_eq!(quality_tier(2.0), 0.1);
        assert_eq!(quality_tier(0.5), 0.0);
    }

    #[test]
    fn small_samples_drag_confidence_down() {
        let mut one = Target::new("", "thing", 1);
        one.confidence = 81.0;
        one.matched_count = 1;
        one.total_price = 10.0;
        finalize_scores(&mut one);
        // sqrt compression to 90, then the single-sample penalty.
        assert_eq!(one.confidence, 63.0);

        let mut many = Target::new("", "thing", 1);
        many.confidence = 81.0;
        many.matched_count = 8;
        many.total_price = 10.0;
        finalize_scores(&mut many);
        assert_eq!(many.confidence, 90.0);
        assert!(many.price_quality > one.price_quality);
    }

    #[test]
    fn unpriced_target_has_zero_quality() {
        let mut t = Target::new("", "thing", 1);
        t.confidence = 0.0;
        t.total_price = 0.0;
        finalize_scores(&mut t);
        assert_eq!(t.price_quality, 0.0);
    }
}
