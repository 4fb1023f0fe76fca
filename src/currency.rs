// src/currency.rs
//! Currency conversion boundary. The core invokes `CurrencyConverter` as a
//! pure function; the rate data behind it is fetched once, up front, so no
//! pipeline step ever suspends.
//!
//! `RateTable::fetch_frankfurter` populates a table from the Frankfurter
//! API. A listing in an unknown currency becomes the unpriced sentinel, not
//! a pipeline failure.

use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::info;

/// All engine prices are expressed in GBP.
pub const BASE_CURRENCY: &str = "GBP";

#[derive(Debug, Error, PartialEq)]
pub enum CurrencyError {
    #[error("no conversion rate for currency code `{0}`")]
    UnknownCurrency(String),
}

/// Converts marketplace amounts into the base currency.
pub trait CurrencyConverter {
    fn to_base(&self, amount: f64, code: &str) -> Result<f64, CurrencyError>;
}

/// Static code -> GBP-per-unit rate map.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    rates: HashMap<String, f64>,
}

impl RateTable {
    /// Build from `(code, gbp_per_unit)` pairs. Codes are upper-cased.
    pub fn new(rates: impl IntoIterator<Item = (String, f64)>) -> Self {
        Self {
            rates: rates
                .into_iter()
                .map(|(code, rate)| (code.to_uppercase(), rate))
                .collect(),
        }
    }

    /// A table that only accepts the base currency. Useful for tests and
    /// GBP-only hosts.
    pub fn base_only() -> Self {
        Self::default()
    }

    /// Fetch current rates from the Frankfurter API. One request per
    /// processing session; the resulting table is pure and sync.
    pub async fn fetch_frankfurter() -> anyhow::Result<Self> {
        #[derive(Deserialize)]
        struct Latest {
            rates: HashMap<String, f64>,
        }

        let url = format!("https://api.frankfurter.app/latest?from={BASE_CURRENCY}");
        let response = reqwest::get(&url).await?;
        if !response.status().is_success() {
            anyhow::bail!("frankfurter request failed: {}", response.status());
        }
        let latest: Latest = response.json().await?;

        // Frankfurter reports units-of-code per GBP; invert to GBP per unit.
        let rates = latest
            .rates
            .into_iter()
            .filter(|(_, per_gbp)| *per_gbp > 0.0)
            .map(|(code, per_gbp)| (code, 1.0 / per_gbp));
        let table = Self::new(rates);
        info!(currencies = table.rates.len(), "currency rate table loaded");
        Ok(table)
    }
}

impl CurrencyConverter for RateTable {
    fn to_base(&self, amount: f64, code: &str) -> Result<f64, CurrencyError> {
        let code = code.trim().to_uppercase();
        if code == BASE_CURRENCY {
            return Ok(amount);
        }
        self.rates
            .get(&code)
            .map(|rate| amount * rate)
            .ok_or(CurrencyError::UnknownCurrency(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_currency_passes_through() {
        let table = RateTable::base_only();
        assert_eq!(table.to_base(12.5, "GBP").unwrap(), 12.5);
        assert_eq!(table.to_base(12.5, "gbp").unwrap(), 12.5);
    }

    #[test]
    fn known_codes_convert() {
        let table = RateTable::new([("USD".to_string(), 0.8)]);
        assert!((table.to_base(10.0, "usd").unwrap() - 8.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_code_is_a_typed_error() {
        let table = RateTable::base_only();
        assert_eq!(
            table.to_base(1.0, "XYZ").unwrap_err(),
            CurrencyError::UnknownCurrency("XYZ".into())
        );
    }
}
