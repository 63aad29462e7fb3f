//! Cache-fronted market data access.
//!
//! [`MarketDataClient`] is what the rest of the application talks to. Every
//! lookup canonicalizes the symbol, consults the [`MarketDataCache`], and on a
//! miss calls the configured provider exactly once per key even when several
//! callers miss at the same time. Provider failures never propagate: they are
//! logged and reported as `None`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use futures::future::join_all;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, CacheTtls, CacheValue, Cacheable, MarketDataCache};
use crate::errors::MarketDataError;
use crate::models::{
    canonical_symbol, CandleRequest, CandleSeries, CompanyProfile, ProviderId, Quote, Resolution,
};
use crate::provider::{DemoProvider, FinnhubProvider, MarketDataProvider};

/// Tunables for [`MarketDataClient`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarketDataConfig {
    /// Upper bound for a single symbol's fetch, including retries. Also used
    /// as the HTTP request timeout of the live provider.
    pub quote_timeout: Duration,
    pub ttls: CacheTtls,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            quote_timeout: Duration::from_secs(12),
            ttls: CacheTtls::default(),
        }
    }
}

/// Result of a multi-symbol quote lookup.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuoteBatch {
    /// Valid quotes, in request order
    pub quotes: Vec<Quote>,
    /// Symbols with no quote this time (unknown, failed or timed out)
    pub missing: Vec<String>,
}

type InFlight = Arc<OnceCell<Option<CacheValue>>>;

/// Provider adapter with TTL caching and request coalescing.
pub struct MarketDataClient {
    provider: Arc<dyn MarketDataProvider>,
    cache: Arc<MarketDataCache>,
    in_flight: DashMap<CacheKey, InFlight>,
    config: MarketDataConfig,
}

impl MarketDataClient {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        cache: Arc<MarketDataCache>,
        config: MarketDataConfig,
    ) -> Self {
        Self {
            provider,
            cache,
            in_flight: DashMap::new(),
            config,
        }
    }

    /// Pick the provider from the credential: Finnhub when a non-empty key is
    /// given, demo data otherwise.
    pub fn from_api_key(
        api_key: Option<&str>,
        config: MarketDataConfig,
    ) -> Result<Self, MarketDataError> {
        let provider: Arc<dyn MarketDataProvider> =
            match api_key.map(str::trim).filter(|key| !key.is_empty()) {
                Some(key) => Arc::new(FinnhubProvider::new(key, config.quote_timeout)?),
                None => {
                    info!("No market data API key configured, serving demo data");
                    Arc::new(DemoProvider::new())
                }
            };
        let cache = Arc::new(MarketDataCache::with_ttls(config.ttls.clone()));
        Ok(Self::new(provider, cache, config))
    }

    pub fn provider_id(&self) -> ProviderId {
        self.provider.id()
    }

    /// Whether prices are synthetic.
    pub fn is_demo(&self) -> bool {
        self.provider.is_demo()
    }

    pub fn cache(&self) -> &Arc<MarketDataCache> {
        &self.cache
    }

    pub fn config(&self) -> &MarketDataConfig {
        &self.config
    }

    /// Latest valid quote for `symbol`, or `None` when there is none.
    pub async fn get_quote(&self, symbol: &str) -> Option<Quote> {
        let symbol = canonical_symbol(symbol);
        if symbol.is_empty() {
            return None;
        }

        let provider = self.provider.clone();
        self.cached_or_fetch(CacheKey::quote(&symbol), move || async move {
            provider
                .get_quote(&symbol)
                .await
                .map(Cacheable::into_cache_value)
        })
        .await
        .and_then(Quote::from_cache_value)
    }

    /// Quotes for many symbols, fetched concurrently.
    ///
    /// Each symbol is bounded by [`MarketDataConfig::quote_timeout`]; a slow or
    /// failing symbol lands in [`QuoteBatch::missing`] without affecting the
    /// others. Duplicate and blank symbols are ignored.
    pub async fn get_quotes<S: AsRef<str>>(&self, symbols: &[S]) -> QuoteBatch {
        let mut unique: Vec<String> = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let symbol = canonical_symbol(symbol.as_ref());
            if !symbol.is_empty() && !unique.contains(&symbol) {
                unique.push(symbol);
            }
        }

        let timeout = self.config.quote_timeout;
        let results = join_all(unique.into_iter().map(|symbol| async move {
            match tokio::time::timeout(timeout, self.get_quote(&symbol)).await {
                Ok(quote) => (symbol, quote),
                Err(_) => {
                    warn!("Quote fetch for {} timed out after {:?}", symbol, timeout);
                    (symbol, None)
                }
            }
        }))
        .await;

        let mut batch = QuoteBatch::default();
        for (symbol, quote) in results {
            match quote {
                Some(quote) => batch.quotes.push(quote),
                None => batch.missing.push(symbol),
            }
        }
        batch
    }

    /// Candle series for `symbol`; `to` defaults to now and `from` to one
    /// year before `to`.
    pub async fn get_candles(
        &self,
        symbol: &str,
        resolution: Resolution,
        from: Option<i64>,
        to: Option<i64>,
    ) -> Option<CandleSeries> {
        let request = CandleRequest::new(symbol, resolution, from, to, Utc::now().timestamp());
        self.get_candles_for(request).await
    }

    /// Candle series for an already-resolved window.
    pub async fn get_candles_for(&self, request: CandleRequest) -> Option<CandleSeries> {
        if request.symbol.is_empty() {
            return None;
        }

        let provider = self.provider.clone();
        self.cached_or_fetch(CacheKey::candles(&request), move || async move {
            provider
                .get_candles(&request)
                .await
                .map(Cacheable::into_cache_value)
        })
        .await
        .and_then(CandleSeries::from_cache_value)
    }

    /// Company profile for `symbol`.
    pub async fn get_profile(&self, symbol: &str) -> Option<CompanyProfile> {
        let symbol = canonical_symbol(symbol);
        if symbol.is_empty() {
            return None;
        }

        let provider = self.provider.clone();
        self.cached_or_fetch(CacheKey::profile(&symbol), move || async move {
            provider
                .get_profile(&symbol)
                .await
                .map(Cacheable::into_cache_value)
        })
        .await
        .and_then(CompanyProfile::from_cache_value)
    }

    /// Serve `key` from the cache, or run `fetch` once for all concurrent
    /// callers missing the same key. Only values passing their model
    /// invariants are cached.
    async fn cached_or_fetch<F, Fut>(&self, key: CacheKey, fetch: F) -> Option<CacheValue>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CacheValue, MarketDataError>>,
    {
        if let Some(value) = self.cache.get(&key) {
            return Some(value);
        }

        let cell = self
            .in_flight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .value()
            .clone();

        let fetch_key = key.clone();
        let value = cell
            .get_or_init(move || async move {
                let key = fetch_key;
                // filled by a request that finished before this one registered
                if let Some(value) = self.cache.get(&key) {
                    return Some(value);
                }

                debug!("Cache miss: {}", key);
                let provider = self.provider.id();
                match fetch().await {
                    Ok(value) if value.is_valid() => {
                        self.cache.put_for_kind(key, value.clone());
                        Some(value)
                    }
                    Ok(_) => {
                        warn!("Discarding invalid {} from {}", key, provider);
                        None
                    }
                    Err(MarketDataError::SymbolNotFound(_)) | Err(MarketDataError::NoDataForRange) => {
                        debug!("No data for {} from {}", key, provider);
                        None
                    }
                    Err(e) => {
                        warn!("Fetching {} from {} failed: {}", key, provider, e);
                        None
                    }
                }
            })
            .await
            .clone();

        self.in_flight
            .remove_if(&key, |_, current| Arc::ptr_eq(current, &cell));
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls; sleeps before answering; can hang on one symbol.
    struct MockProvider {
        calls: AtomicUsize,
        delay: Duration,
        hang_on: Option<&'static str>,
        fail_with: Option<MarketDataError>,
        invalid: bool,
    }

    impl MockProvider {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay: Duration::from_millis(100),
                hang_on: None,
                fail_with: None,
                invalid: false,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MarketDataProvider for MockProvider {
        fn id(&self) -> ProviderId {
            "MOCK"
        }

        async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.hang_on == Some(symbol) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            tokio::time::sleep(self.delay).await;

            if let Some(e) = &self.fail_with {
                return Err(e.clone());
            }
            let mut quote = Quote::new(symbol, dec!(10), dec!(8), Utc::now(), "MOCK")?;
            if self.invalid {
                quote.previous_close = Decimal::ZERO;
            }
            Ok(quote)
        }

        async fn get_candles(
            &self,
            _request: &CandleRequest,
        ) -> Result<CandleSeries, MarketDataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(MarketDataError::NoDataForRange)
        }

        async fn get_profile(&self, symbol: &str) -> Result<CompanyProfile, MarketDataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CompanyProfile::unknown(symbol))
        }
    }

    fn client(provider: Arc<MockProvider>) -> MarketDataClient {
        MarketDataClient::new(
            provider,
            Arc::new(MarketDataCache::new()),
            MarketDataConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_quote_is_cached_for_ttl() {
        let provider = Arc::new(MockProvider::new());
        let client = client(provider.clone());

        assert!(client.get_quote("abc").await.is_some());
        assert!(client.get_quote("ABC ").await.is_some());
        assert_eq!(provider.calls(), 1);

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(client.get_quote("ABC").await.is_some());
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_misses_are_coalesced() {
        let provider = Arc::new(MockProvider::new());
        let client = client(provider.clone());

        let results = join_all((0..8).map(|_| client.get_quote("ABC"))).await;

        assert!(results.iter().all(|quote| quote.is_some()));
        assert_eq!(provider.calls(), 1);
        assert!(client.in_flight.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_become_none_and_are_not_cached() {
        let mut mock = MockProvider::new();
        mock.fail_with = Some(MarketDataError::RateLimited {
            provider: "MOCK".to_string(),
        });
        let provider = Arc::new(mock);
        let client = client(provider.clone());

        assert!(client.get_quote("ABC").await.is_none());
        assert!(client.get_quote("ABC").await.is_none());
        assert_eq!(provider.calls(), 2);
        assert!(client.cache().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_quote_is_never_cached() {
        let mut mock = MockProvider::new();
        mock.invalid = true;
        let client = client(Arc::new(mock));

        assert!(client.get_quote("ABC").await.is_none());
        assert!(client.cache().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_with_one_timeout_returns_the_rest() {
        let mut mock = MockProvider::new();
        mock.hang_on = Some("SLOW");
        let client = client(Arc::new(mock));

        let symbols = ["AAA", "BBB", "SLOW", "CCC", "DDD"];
        let batch = client.get_quotes(&symbols).await;

        let returned: Vec<_> = batch.quotes.iter().map(|q| q.symbol.as_str()).collect();
        assert_eq!(returned, vec!["AAA", "BBB", "CCC", "DDD"]);
        assert_eq!(batch.missing, vec!["SLOW".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_skips_blank_and_duplicate_symbols() {
        let provider = Arc::new(MockProvider::new());
        let client = client(provider.clone());

        let batch = client.get_quotes(&["aaa", " AAA", "", "bbb"]).await;
        assert_eq!(batch.quotes.len(), 2);
        assert!(batch.missing.is_empty());
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_data_candles_is_none() {
        let provider = Arc::new(MockProvider::new());
        let client = client(provider.clone());

        assert!(client
            .get_candles("ABC", Resolution::Day, Some(0), Some(100))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_demo_mode_without_key() {
        let client = MarketDataClient::from_api_key(Some("  "), MarketDataConfig::default()).unwrap();
        assert!(client.is_demo());
        assert_eq!(client.provider_id(), "DEMO");

        let quote = client.get_quote("AAPL").await.unwrap();
        assert_eq!(quote.price, dec!(228.5));
        assert_eq!(quote.previous_close, dec!(226.4));

        let profile = client.get_profile("nope").await.unwrap();
        assert_eq!(profile.exchange, "-");
    }

    #[tokio::test]
    async fn test_live_provider_with_key() {
        let client =
            MarketDataClient::from_api_key(Some("abc123"), MarketDataConfig::default()).unwrap();
        assert!(!client.is_demo());
        assert_eq!(client.provider_id(), "FINNHUB");
    }

    #[tokio::test]
    async fn test_blank_symbol_is_none() {
        let provider = Arc::new(MockProvider::new());
        let client = client(provider.clone());
        assert!(client.get_quote("   ").await.is_none());
        assert!(client.get_profile("").await.is_none());
        assert_eq!(provider.calls(), 0);
    }
}
