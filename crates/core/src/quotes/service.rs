use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use log::debug;
use pricewatch_market_data::{
    canonical_symbol, CandleRequest, CompanyProfile, MarketDataClient, Quote, Resolution,
    SECONDS_PER_DAY,
};

use super::model::{ChartPeriod, ChartSeries, SnapshotBatch, StockSnapshot};

/// Read-only market data views used by the API.
#[async_trait]
pub trait QuoteServiceTrait: Send + Sync {
    /// Whether prices are synthetic.
    fn is_demo(&self) -> bool;

    async fn get_quote(&self, symbol: &str) -> Option<Quote>;

    /// Quote and profile per symbol, fetched concurrently.
    async fn get_snapshots(&self, symbols: &[String]) -> SnapshotBatch;

    /// Daily closes over `period` ("7d", "30d", "90d", "1y"). Any other
    /// period yields an empty window.
    async fn get_chart(&self, symbol: &str, period: &str) -> Option<ChartSeries>;

    async fn get_profile(&self, symbol: &str) -> Option<CompanyProfile>;
}

pub struct QuoteService {
    market_data: Arc<MarketDataClient>,
}

impl QuoteService {
    pub fn new(market_data: Arc<MarketDataClient>) -> Self {
        Self { market_data }
    }

    /// Resolve a chart request relative to `now` (unix seconds).
    pub fn chart_request(symbol: &str, period: &str, now: i64) -> CandleRequest {
        let days = match period.parse::<ChartPeriod>() {
            Ok(period) => period.days(),
            Err(_) => {
                debug!("Unknown chart period '{}', using an empty window", period);
                0
            }
        };
        CandleRequest::new(
            symbol,
            Resolution::Day,
            Some(now - days * SECONDS_PER_DAY),
            Some(now),
            now,
        )
    }
}

fn chart_label(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%b %-d").to_string())
        .unwrap_or_default()
}

#[async_trait]
impl QuoteServiceTrait for QuoteService {
    fn is_demo(&self) -> bool {
        self.market_data.is_demo()
    }

    async fn get_quote(&self, symbol: &str) -> Option<Quote> {
        self.market_data.get_quote(symbol).await
    }

    async fn get_snapshots(&self, symbols: &[String]) -> SnapshotBatch {
        let mut unique: Vec<String> = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let symbol = canonical_symbol(symbol);
            if !symbol.is_empty() && !unique.contains(&symbol) {
                unique.push(symbol);
            }
        }

        let timeout = self.market_data.config().quote_timeout;
        let profiles = join_all(unique.iter().map(|symbol| async move {
            tokio::time::timeout(timeout, self.market_data.get_profile(symbol))
                .await
                .ok()
                .flatten()
        }));
        let (quotes, profiles) =
            futures::join!(self.market_data.get_quotes(unique.as_slice()), profiles);

        let stocks = quotes
            .quotes
            .iter()
            .map(|quote| {
                let profile = unique
                    .iter()
                    .position(|symbol| *symbol == quote.symbol)
                    .and_then(|i| profiles[i].as_ref());
                StockSnapshot::from_parts(quote, profile)
            })
            .collect();

        SnapshotBatch {
            stocks,
            missing: quotes.missing,
        }
    }

    async fn get_chart(&self, symbol: &str, period: &str) -> Option<ChartSeries> {
        let request = Self::chart_request(symbol, period, Utc::now().timestamp());
        let series = self.market_data.get_candles_for(request).await?;

        Some(ChartSeries {
            labels: series.timestamps.iter().map(|ts| chart_label(*ts)).collect(),
            values: series.close,
        })
    }

    async fn get_profile(&self, symbol: &str) -> Option<CompanyProfile> {
        self.market_data.get_profile(symbol).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricewatch_market_data::MarketDataConfig;
    use rust_decimal_macros::dec;

    fn service() -> QuoteService {
        QuoteService::new(Arc::new(
            MarketDataClient::from_api_key(None, MarketDataConfig::default()).unwrap(),
        ))
    }

    #[test]
    fn test_chart_request_windows() {
        let now = 1_700_000_000;
        let week = QuoteService::chart_request("aapl", "7d", now);
        assert_eq!(week.symbol, "AAPL");
        assert_eq!(week.to, now);
        assert_eq!(week.days_in_range(), 7);

        let unknown = QuoteService::chart_request("AAPL", "5y", now);
        assert_eq!(unknown.from, unknown.to);
    }

    #[test]
    fn test_chart_label() {
        // 2024-01-05T00:00:00Z
        assert_eq!(chart_label(1_704_412_800), "Jan 5");
    }

    #[tokio::test]
    async fn test_snapshots_in_demo_mode() {
        let batch = service()
            .get_snapshots(&["msft".to_string(), "zzz".to_string(), "MSFT".to_string()])
            .await;

        assert_eq!(batch.stocks.len(), 2);
        assert!(batch.missing.is_empty());

        let msft = &batch.stocks[0];
        assert_eq!(msft.symbol, "MSFT");
        assert_eq!(msft.name, "Microsoft Corporation");
        assert_eq!(msft.price, dec!(415.5));
        assert_eq!(msft.change, dec!(2.8));

        let unknown = &batch.stocks[1];
        assert_eq!(unknown.name, "ZZZ");
        assert_eq!(unknown.price, dec!(100));
    }

    #[tokio::test]
    async fn test_chart_in_demo_mode() {
        let chart = service().get_chart("NVDA", "30d").await.unwrap();
        assert_eq!(chart.labels.len(), 30);
        assert_eq!(chart.values.len(), 30);

        // unknown periods clamp to the shortest demo series
        let chart = service().get_chart("NVDA", "bogus").await.unwrap();
        assert_eq!(chart.values.len(), 2);
    }
}
