use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use pricewatch_core::quotes::{ChartSeries, StockSnapshot};
use pricewatch_market_data::{is_market_open, CompanyProfile, Quote};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
};

const DEFAULT_CHART_PERIOD: &str = "7d";

#[derive(Deserialize)]
struct QuotesQuery {
    /// Comma separated, e.g. "AAPL,MSFT"
    symbols: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QuotesResponse {
    quotes: Vec<StockSnapshot>,
    missing: Vec<String>,
    market_open: bool,
    timestamp: DateTime<Utc>,
}

async fn get_quotes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<QuotesQuery>,
) -> ApiResult<Json<QuotesResponse>> {
    let symbols: Vec<String> = query
        .symbols
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if symbols.is_empty() {
        return Err(ApiError::BadRequest(
            "symbols query parameter is required".to_string(),
        ));
    }

    let batch = state.quote_service.get_snapshots(&symbols).await;
    Ok(Json(QuotesResponse {
        quotes: batch.stocks,
        missing: batch.missing,
        market_open: is_market_open(),
        timestamp: Utc::now(),
    }))
}

async fn get_quote(
    Path(symbol): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Quote>> {
    let quote = state
        .quote_service
        .get_quote(&symbol)
        .await
        .ok_or(ApiError::NotFound)?;
    Ok(Json(quote))
}

#[derive(Deserialize)]
struct CandlesQuery {
    symbol: Option<String>,
    period: Option<String>,
}

async fn get_candles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CandlesQuery>,
) -> ApiResult<Json<ChartSeries>> {
    let symbol = query
        .symbol
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("symbol query parameter is required".to_string()))?;
    let period = query
        .period
        .unwrap_or_else(|| DEFAULT_CHART_PERIOD.to_string());

    // no data is an empty chart, not an error
    let chart = state
        .quote_service
        .get_chart(&symbol, &period)
        .await
        .unwrap_or_default();
    Ok(Json(chart))
}

async fn get_profile(
    Path(symbol): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<CompanyProfile>> {
    let profile = state
        .quote_service
        .get_profile(&symbol)
        .await
        .ok_or(ApiError::NotFound)?;
    Ok(Json(profile))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/quotes", get(get_quotes))
        .route("/quotes/{symbol}", get(get_quote))
        .route("/candles", get(get_candles))
        .route("/profile/{symbol}", get(get_profile))
}
