use std::{convert::Infallible, sync::Arc};

use anyhow::Context;
use axum::{
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderValue},
    routing::get,
    Json, Router,
};
use pricewatch_market_data::is_market_open;
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{config::Config, main_lib::AppState};

mod alerts;
mod events;
mod quotes;

/// Header naming the calling user. Identity is trusted as given.
pub const USER_ID_HEADER: &str = "x-user-id";
pub const DEFAULT_USER_ID: &str = "local";

/// The calling user, taken from [`USER_ID_HEADER`].
pub struct CallerId(pub String);

impl<S: Send + Sync> FromRequestParts<S> for CallerId {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_USER_ID);
        Ok(CallerId(user_id.to_string()))
    }
}

pub async fn healthz() -> &'static str {
    "ok"
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RuntimeConfig {
    real_time_prices: bool,
    market_open: bool,
}

async fn runtime_config(State(state): State<Arc<AppState>>) -> Json<RuntimeConfig> {
    Json(RuntimeConfig {
        real_time_prices: !state.quote_service.is_demo(),
        market_open: is_market_open(),
    })
}

pub fn app_router(state: Arc<AppState>, config: &Config) -> anyhow::Result<Router> {
    let cors = if config.cors_allow.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins = config
            .cors_allow
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .context("Invalid PW_CORS_ALLOW_ORIGINS")?;
        CorsLayer::new().allow_origin(origins)
    };

    let api = Router::new()
        .route("/healthz", get(healthz))
        .route("/config", get(runtime_config))
        .merge(quotes::router())
        .merge(alerts::router())
        .merge(events::router());

    Ok(Router::new()
        .nest("/api/v1", api)
        .with_state(state)
        .layer(cors)
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http()))
}
