// src/model.rs
//! Core data model: the good being priced (`Target`), a marketplace listing
//! considered as a match (`Candidate`), and a purchased bundle (`Lot`).
//!
//! `RawListing` is the input boundary: whatever the host's marketplace client
//! returns, reduced to the fields the engine consumes. Everything here is
//! plain data; the pipeline produces enriched copies rather than sharing
//! mutable state across targets.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Round a monetary or score value to 2 decimal places.
pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Listing condition used when searching and when widening flips it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Condition {
    New,
    Used,
}

impl Condition {
    pub fn flipped(self) -> Self {
        match self {
            Condition::New => Condition::Used,
            Condition::Used => Condition::New,
        }
    }
}

/// An amount in some ISO 4217 currency, as reported by the marketplace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub amount: f64,
    pub currency: String,
}

impl Money {
    pub fn new(amount: f64, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }
}

/// Trust penalties attached to listings fetched under relaxed search
/// constraints. Both values are fractions in [0,1]; zero means untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PenaltyHints {
    pub confidence_penalty: f64,
    pub price_penalty: f64,
}

/// A raw marketplace listing record, fully materialized by the host before
/// entering the pipeline. Missing price/currency marks the listing as
/// unpriceable, not as an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawListing {
    pub title: String,
    pub price: Option<Money>,
    #[serde(default)]
    pub shipping: Option<Money>,
    #[serde(default)]
    pub web_url: String,
    #[serde(default)]
    pub hints: PenaltyHints,
}

impl RawListing {
    pub fn new(title: impl Into<String>, price: Option<Money>) -> Self {
        Self {
            title: title.into(),
            price,
            shipping: None,
            web_url: String::new(),
            hints: PenaltyHints::default(),
        }
    }
}

/// A physical measurement declared on a target, e.g. `50 ml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub value: f64,
    pub unit: String,
}

impl Measurement {
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }
}

/// A marketplace listing mapped into the target's domain.
///
/// Invariant: `total_price == buy_price + postage_price` (2 dp) after every
/// price mutation; `enforce_price_invariant` re-establishes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Cleaned display name, `"{brand} {variant}"`.
    pub title: String,
    pub brand: String,
    pub variant: String,
    /// Verbatim listing title as fetched; context checks read this.
    pub source_title: String,
    pub web_url: String,
    pub total_price: f64,
    pub buy_price: f64,
    pub postage_price: f64,
    /// 0-100 estimate that this listing is the target.
    pub confidence: f64,
    /// Tiered 0-1000 quality derived from confidence.
    pub quality_score: f64,
    /// False marks the "unavailable" sentinel: listing had no usable price
    /// and is retained for inspection but excluded from pricing.
    pub priced: bool,
}

impl Candidate {
    pub fn new(title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            source_title: title.clone(),
            variant: title.clone(),
            title,
            brand: String::new(),
            web_url: String::new(),
            total_price: 0.0,
            buy_price: 0.0,
            postage_price: 0.0,
            confidence: 100.0,
            quality_score: 0.0,
            priced: true,
        }
    }

    /// Recompute `total_price` from buy + postage, rounded to 2 dp.
    pub fn enforce_price_invariant(&mut self) {
        self.buy_price = round2(self.buy_price);
        self.postage_price = round2(self.postage_price);
        self.total_price = round2(self.buy_price + self.postage_price);
    }
}

/// The good being priced. Owns its candidates; no candidate is shared
/// across targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    /// Cleaned full name, `"{brand} {variant}"`.
    pub name: String,
    pub brand: String,
    pub variant: String,
    /// Pre-clean text, retained for context scoring.
    pub original_name: String,
    pub original_brand: String,
    pub original_variant: String,
    pub quantity: u32,
    /// How sure the upstream extractor was about the name, in [0,1].
    pub name_certainty: f64,
    pub measurements: Vec<Measurement>,
    pub confidence: f64,
    pub sell_price: f64,
    pub postage_price: f64,
    pub buyer_protection_fee: f64,
    pub total_price: f64,
    pub price_quality: f64,
    /// Size of the working set the estimate was derived from.
    pub matched_count: usize,
    pub candidates: Vec<Candidate>,
}

impl Target {
    pub fn new(
        brand: impl Into<String>,
        variant: impl Into<String>,
        quantity: u32,
    ) -> Self {
        let brand = brand.into();
        let variant = variant.into();
        let name = format!("{} {}", brand, variant).trim().to_string();
        Self {
            original_name: name.clone(),
            original_brand: brand.clone(),
            original_variant: variant.clone(),
            name,
            brand,
            variant,
            quantity,
            name_certainty: 1.0,
            measurements: Vec::new(),
            confidence: 100.0,
            sell_price: 0.0,
            postage_price: 0.0,
            buyer_protection_fee: 0.0,
            total_price: 0.0,
            price_quality: 0.0,
            matched_count: 0,
            candidates: Vec::new(),
        }
    }

    pub fn with_certainty(mut self, certainty: f64) -> Self {
        self.name_certainty = certainty.clamp(0.0, 1.0);
        self
    }

    pub fn with_measurements(mut self, measurements: Vec<Measurement>) -> Self {
        self.measurements = measurements;
        self
    }

    /// Confidence descending. The sort is stable, so ties keep discovery
    /// order and repeated runs over the same pool are identical.
    pub fn sort_candidates(&mut self) {
        self.candidates.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }
}

/// A purchased bundle of targets, priced and rated as a unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lot {
    pub name: String,
    pub web_url: String,
    pub condition: Condition,
    /// Declared purchase price for the whole lot.
    pub buy_listing_price: f64,
    pub targets: Vec<Target>,
    pub sell_price: f64,
    pub postage_price: f64,
    pub fees: f64,
    /// sell + postage + fees: what the whole lot would list for.
    pub listing_price: f64,
    pub profit: f64,
    /// Quantity-weighted mean confidence across targets.
    pub confidence: f64,
    pub rating: f64,
    pub processed_on: Option<NaiveDate>,
}

impl Lot {
    pub fn new(name: impl Into<String>, condition: Condition, buy_listing_price: f64) -> Self {
        Self {
            name: name.into(),
            web_url: String::new(),
            condition,
            buy_listing_price,
            targets: Vec::new(),
            sell_price: 0.0,
            postage_price: 0.0,
            fees: 0.0,
            listing_price: 0.0,
            profit: 0.0,
            confidence: 0.0,
            rating: 0.0,
            processed_on: None,
        }
    }
}
