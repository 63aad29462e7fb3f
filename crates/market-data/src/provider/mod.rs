//! Market data provider abstractions and implementations.
//!
//! This module contains:
//! - The `MarketDataProvider` trait that all providers implement
//! - `FinnhubProvider`, the live upstream
//! - `DemoProvider`, deterministic-shape synthetic data used when no API key
//!   is configured
//!
//! Providers do not cache. They are wrapped by the
//! [`MarketDataClient`](crate::MarketDataClient), which owns the TTL cache.

mod traits;

pub mod demo;
pub mod finnhub;

pub use demo::DemoProvider;
pub use finnhub::FinnhubProvider;
pub use traits::MarketDataProvider;
