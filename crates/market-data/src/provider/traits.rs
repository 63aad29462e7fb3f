//! Market data provider trait definitions.

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::{CandleRequest, CandleSeries, CompanyProfile, ProviderId, Quote};

/// A source of quotes, candles and company profiles.
///
/// Implementations talk to a single upstream and return raw results; caching,
/// request coalescing and failure-to-"not found" mapping happen in
/// [`MarketDataClient`](crate::MarketDataClient).
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use pricewatch_market_data::provider::MarketDataProvider;
///
/// struct MyProvider;
///
/// #[async_trait]
/// impl MarketDataProvider for MyProvider {
///     fn id(&self) -> &'static str {
///         "MY_PROVIDER"
///     }
///
///     // ... implement the fetch methods
/// }
/// ```
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Unique identifier for this provider, e.g. "FINNHUB".
    ///
    /// Used for logging and as the `source` of returned quotes.
    fn id(&self) -> ProviderId;

    /// Whether results are synthetic rather than live market data.
    fn is_demo(&self) -> bool {
        false
    }

    /// Fetch the latest quote for `symbol`.
    ///
    /// The returned quote must satisfy [`Quote::is_valid`].
    async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError>;

    /// Fetch the candle series for a resolved request window.
    ///
    /// Returns [`MarketDataError::NoDataForRange`] when the window is empty.
    async fn get_candles(&self, request: &CandleRequest) -> Result<CandleSeries, MarketDataError>;

    /// Fetch the company profile for `symbol`.
    async fn get_profile(&self, symbol: &str) -> Result<CompanyProfile, MarketDataError>;
}
