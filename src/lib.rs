// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod aggregate;
pub mod clean;
pub mod config;
pub mod currency;
pub mod fees;
pub mod filter;
pub mod lot;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod score;
pub mod tagger;
pub mod tokens;
pub mod units;
pub mod widen;

mod debug;

// ---- Re-exports for stable public API ----
pub use crate::config::EngineConfig;
pub use crate::currency::{CurrencyConverter, RateTable, BASE_CURRENCY};
pub use crate::model::{
    Candidate, Condition, Lot, Measurement, Money, PenaltyHints, RawListing, Target,
};
pub use crate::pipeline::Appraiser;
pub use crate::tagger::{LexiconTagger, Tagger, WordRole};
pub use crate::widen::{SearchPlan, WidenStep, WideningController};
