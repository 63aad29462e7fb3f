//! Market data models
//!
//! This module contains the canonical data shapes returned by every provider:
//! - `types` - Identifier aliases and symbol/rounding helpers
//! - `quote` - Latest price snapshot with server-derived change fields
//! - `candle` - OHLCV series and the resolved lookup window
//! - `profile` - Company profile

mod candle;
mod profile;
mod quote;
mod types;

pub use candle::{
    Candle, CandleRequest, CandleSeries, Resolution, DEFAULT_LOOKBACK_DAYS, SECONDS_PER_DAY,
};
pub use profile::CompanyProfile;
pub use quote::{compute_change, Quote};
pub use types::{canonical_symbol, round_cents, ProviderId};
