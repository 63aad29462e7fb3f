//! Pricewatch Market Data Crate
//!
//! Quote, candle and company-profile access for the pricewatch service.
//!
//! # Overview
//!
//! - A resilient HTTP fetcher with bounded retries and separate backoff for
//!   throttling and transport failures
//! - A TTL cache with per-kind expiry (quote 10s, candles 60s, profile 24h)
//! - Providers: Finnhub when a credential is configured, demo data otherwise
//! - A market-hours calculator for choosing polling cadence
//!
//! # Architecture
//!
//! ```text
//! +--------------------+
//! |  MarketDataClient  |  canonical symbol, coalescing, Option<T> results
//! +--------------------+
//!      |          |
//!      v          v
//! +---------+  +--------------------+
//! |  Cache  |  | MarketDataProvider |  (Finnhub, Demo)
//! +---------+  +--------------------+
//!                        |
//!                        v
//!              +--------------------+
//!              |  ResilientFetcher  |  retry / backoff
//!              +--------------------+
//!                        |
//!                        v
//!              +--------------------+
//!              |   HttpTransport    |  reqwest
//!              +--------------------+
//! ```
//!
//! # Core Types
//!
//! - [`Quote`] - Latest price with locally derived change fields
//! - [`CandleSeries`] - Index-aligned OHLCV arrays
//! - [`CompanyProfile`] - Name, exchange and industry
//! - [`MarketDataClient`] - Cache-fronted entry point

pub mod cache;
mod client;
pub mod errors;
pub mod fetcher;
pub mod market_hours;
pub mod models;
pub mod provider;

pub use cache::{CacheKey, CacheTtls, CacheValue, MarketDataCache};
pub use client::{MarketDataClient, MarketDataConfig, QuoteBatch};
pub use errors::MarketDataError;
pub use fetcher::{FetchError, ResilientFetcher, RetryPolicy};
pub use market_hours::{is_market_open, is_market_open_at, poll_interval_at};
pub use models::{
    canonical_symbol, round_cents, Candle, CandleRequest, CandleSeries, CompanyProfile, ProviderId,
    Quote, Resolution, SECONDS_PER_DAY,
};
pub use provider::{DemoProvider, FinnhubProvider, MarketDataProvider};
