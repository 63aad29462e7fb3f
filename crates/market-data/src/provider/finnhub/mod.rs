//! Finnhub market data provider implementation.
//!
//! This module provides market data from the Finnhub API:
//! - Latest quotes via /quote
//! - OHLCV series via /stock/candle
//! - Company profiles via /stock/profile2
//!
//! Every request goes through the [`ResilientFetcher`], so throttling and
//! transport failures are retried before they reach this module.
//! API documentation: https://finnhub.io/docs/api

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::MarketDataError;
use crate::fetcher::{ReqwestTransport, ResilientFetcher};
use crate::models::{Candle, CandleRequest, CandleSeries, CompanyProfile, ProviderId, Quote};
use crate::provider::MarketDataProvider;

pub const BASE_URL: &str = "https://finnhub.io/api/v1";
const PROVIDER_ID: &str = "FINNHUB";
const TOKEN_HEADER: &str = "X-Finnhub-Token";

// ============================================================================
// API Response Structures
// ============================================================================

/// Response from /quote endpoint
#[derive(Debug, Deserialize)]
struct QuoteResponse {
    /// Current price
    c: Option<f64>,
    /// High price of the day
    h: Option<f64>,
    /// Low price of the day
    l: Option<f64>,
    /// Open price of the day
    o: Option<f64>,
    /// Previous close
    pc: Option<f64>,
    /// Timestamp (Unix)
    t: Option<i64>,
    // Note: d (change) and dp (percent change) exist but are recomputed locally
}

/// Response from /stock/candle endpoint
#[derive(Debug, Deserialize)]
struct CandleResponse {
    /// Status: "ok" or "no_data"
    s: String,
    #[serde(default)]
    c: Vec<f64>,
    #[serde(default)]
    h: Vec<f64>,
    #[serde(default)]
    l: Vec<f64>,
    #[serde(default)]
    o: Vec<f64>,
    #[serde(default)]
    v: Vec<f64>,
    /// Timestamps (Unix)
    #[serde(default)]
    t: Vec<i64>,
}

/// Response from /stock/profile2 endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    name: Option<String>,
    exchange: Option<String>,
    /// Finnhub industry classification
    finnhub_industry: Option<String>,
    weburl: Option<String>,
}

/// Error response from Finnhub
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
}

// ============================================================================
// FinnhubProvider
// ============================================================================

/// Finnhub market data provider.
///
/// The free tier allows 60 calls per minute; HTTP 429 answers are absorbed
/// by the fetcher's backoff.
pub struct FinnhubProvider {
    fetcher: ResilientFetcher,
    base_url: String,
}

impl FinnhubProvider {
    /// Create a provider that authenticates with `api_key`.
    ///
    /// The key is sent as a header on every request, never as a query
    /// parameter.
    pub fn new(api_key: &str, request_timeout: Duration) -> Result<Self, MarketDataError> {
        let mut token = HeaderValue::from_str(api_key.trim()).map_err(|_| {
            MarketDataError::ValidationFailed {
                message: "Finnhub API key contains invalid characters".to_string(),
            }
        })?;
        token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(TOKEN_HEADER, token);

        let transport = ReqwestTransport::new(request_timeout, headers);
        Ok(Self::with_fetcher(
            ResilientFetcher::new(Arc::new(transport)),
            BASE_URL,
        ))
    }

    /// Create a provider over an existing fetcher and base URL.
    pub fn with_fetcher(fetcher: ResilientFetcher, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }

    fn build_url(&self, endpoint: &str, params: &[(&str, &str)]) -> String {
        let query = params
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}{}?{}", self.base_url, endpoint, query)
    }

    /// GET an endpoint and return the body of a successful response.
    async fn fetch(
        &self,
        endpoint: &str,
        symbol: &str,
        params: &[(&str, &str)],
    ) -> Result<String, MarketDataError> {
        let url = self.build_url(endpoint, params);
        debug!("Finnhub request: {} for {}", endpoint, symbol);

        let response = self
            .fetcher
            .fetch(&url)
            .await
            .map_err(|e| MarketDataError::from_fetch(PROVIDER_ID, e))?;

        match response.status {
            401 => {
                return Err(MarketDataError::ProviderError {
                    provider: PROVIDER_ID.to_string(),
                    message: "Invalid or missing API key".to_string(),
                })
            }
            // Finnhub answers 403 once the plan quota is exhausted
            403 => {
                return Err(MarketDataError::RateLimited {
                    provider: PROVIDER_ID.to_string(),
                })
            }
            404 => return Err(MarketDataError::SymbolNotFound(symbol.to_string())),
            _ => {}
        }

        if !response.is_success() {
            if let Ok(error_resp) = serde_json::from_str::<ErrorResponse>(&response.body) {
                if let Some(error_msg) = error_resp.error {
                    return Err(MarketDataError::ProviderError {
                        provider: PROVIDER_ID.to_string(),
                        message: error_msg,
                    });
                }
            }

            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("HTTP {} - {}", response.status, response.body),
            });
        }

        Ok(response.body)
    }

    fn parse<T: for<'de> Deserialize<'de>>(text: &str, what: &str) -> Result<T, MarketDataError> {
        serde_json::from_str(text).map_err(|e| MarketDataError::ProviderError {
            provider: PROVIDER_ID.to_string(),
            message: format!("Failed to parse {} response: {}", what, e),
        })
    }
}

fn to_decimal(value: f64) -> Option<Decimal> {
    if value.is_finite() {
        Decimal::try_from(value).ok()
    } else {
        None
    }
}

/// Turn a decoded /quote payload into a validated [`Quote`].
///
/// Finnhub answers unknown symbols with zeros instead of an error, which the
/// positivity check rejects along with any other malformed payload.
fn quote_from_response(symbol: &str, response: QuoteResponse) -> Result<Quote, MarketDataError> {
    let price = response.c.and_then(to_decimal);
    let previous_close = response.pc.and_then(to_decimal);

    let (price, previous_close) = match (price, previous_close) {
        (Some(price), Some(previous_close)) => (price, previous_close),
        _ => return Err(MarketDataError::SymbolNotFound(symbol.to_string())),
    };

    let timestamp = response
        .t
        .filter(|ts| *ts > 0)
        .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
        .unwrap_or_else(Utc::now);

    let quote = Quote::new(symbol, price, previous_close, timestamp, PROVIDER_ID)?;
    Ok(quote.with_day_range(
        response.o.and_then(to_decimal),
        response.h.and_then(to_decimal),
        response.l.and_then(to_decimal),
    ))
}

fn series_from_response(
    request: &CandleRequest,
    response: CandleResponse,
) -> Result<CandleSeries, MarketDataError> {
    if response.s == "no_data" {
        return Err(MarketDataError::NoDataForRange);
    }

    if response.s != "ok" {
        return Err(MarketDataError::ProviderError {
            provider: PROVIDER_ID.to_string(),
            message: format!("Unexpected candle status: {}", response.s),
        });
    }

    let len = response.t.len();
    if response.c.len() != len
        || response.o.len() != len
        || response.h.len() != len
        || response.l.len() != len
    {
        return Err(MarketDataError::ProviderError {
            provider: PROVIDER_ID.to_string(),
            message: "Mismatched array lengths in candle response".to_string(),
        });
    }

    let mut candles = Vec::with_capacity(len);
    for i in 0..len {
        let (Some(open), Some(high), Some(low), Some(close)) = (
            to_decimal(response.o[i]),
            to_decimal(response.h[i]),
            to_decimal(response.l[i]),
            to_decimal(response.c[i]),
        ) else {
            warn!("Skipping invalid candle at index {} for {}", i, request.symbol);
            continue;
        };

        candles.push(Candle {
            timestamp: response.t[i],
            open,
            high,
            low,
            close,
            volume: response
                .v
                .get(i)
                .copied()
                .and_then(to_decimal)
                .unwrap_or(Decimal::ZERO),
        });
    }

    candles.sort_by_key(|candle| candle.timestamp);
    candles.dedup_by_key(|candle| candle.timestamp);

    CandleSeries::from_candles(&request.symbol, request.resolution, candles)
}

fn profile_from_response(symbol: &str, text: &str) -> Result<CompanyProfile, MarketDataError> {
    // Unknown symbols come back as an empty object
    if text.trim() == "{}" {
        return Err(MarketDataError::SymbolNotFound(symbol.to_string()));
    }

    let response: ProfileResponse = FinnhubProvider::parse(text, "profile")?;
    let name = response
        .name
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;

    let exchange = response
        .exchange
        .filter(|exchange| !exchange.trim().is_empty())
        .unwrap_or_else(|| "-".to_string());

    let mut profile =
        CompanyProfile::new(symbol, &name, &exchange).with_industry(response.finnhub_industry);
    profile.web_url = response.weburl.filter(|url| !url.is_empty());
    Ok(profile)
}

#[async_trait]
impl MarketDataProvider for FinnhubProvider {
    fn id(&self) -> ProviderId {
        PROVIDER_ID
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let text = self.fetch("/quote", symbol, &[("symbol", symbol)]).await?;
        let response: QuoteResponse = Self::parse(&text, "quote")?;
        quote_from_response(symbol, response)
    }

    async fn get_candles(&self, request: &CandleRequest) -> Result<CandleSeries, MarketDataError> {
        let from = request.from.to_string();
        let to = request.to.to_string();
        let params = [
            ("symbol", request.symbol.as_str()),
            ("resolution", request.resolution.as_str()),
            ("from", from.as_str()),
            ("to", to.as_str()),
        ];

        let text = self.fetch("/stock/candle", &request.symbol, &params).await?;
        let response: CandleResponse = Self::parse(&text, "candle")?;
        let series = series_from_response(request, response)?;

        debug!(
            "Finnhub: fetched {} candles for {} ({} to {})",
            series.len(),
            request.symbol,
            request.from,
            request.to
        );
        Ok(series)
    }

    async fn get_profile(&self, symbol: &str) -> Result<CompanyProfile, MarketDataError> {
        let text = self
            .fetch("/stock/profile2", symbol, &[("symbol", symbol)])
            .await?;
        profile_from_response(symbol, &text)
    }
}
