//! Quote views module.
//!
//! Read-only market data shaped for the API:
//!
//! - [`model`] - Stock snapshots, chart periods and chart series
//! - [`service`] - `QuoteService` over the market-data crate's client
//!
//! ```text
//! QuoteService → MarketDataClient → market-data crate (cache, providers)
//! ```

pub mod model;
pub mod service;

pub use model::{ChartPeriod, ChartSeries, SnapshotBatch, StockSnapshot};
pub use service::{QuoteService, QuoteServiceTrait};
