use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{delete, get, patch},
    Json, Router,
};
use pricewatch_core::alerts::{Alert, NewAlert};
use serde::Serialize;

use super::CallerId;
use crate::{
    error::{ApiError, ApiResult},
    events::{ServerEvent, ALERT_CHECK_COMPLETE},
    main_lib::AppState,
};

async fn get_alerts(
    State(state): State<Arc<AppState>>,
    CallerId(user_id): CallerId,
) -> ApiResult<Json<Vec<Alert>>> {
    let alerts = state.alert_service.get_alerts(&user_id)?;
    Ok(Json(alerts))
}

async fn create_alert(
    State(state): State<Arc<AppState>>,
    CallerId(user_id): CallerId,
    Json(new_alert): Json<NewAlert>,
) -> ApiResult<(StatusCode, Json<Alert>)> {
    let alert = state.alert_service.create_alert(&user_id, new_alert).await?;
    Ok((StatusCode::CREATED, Json(alert)))
}

#[derive(Serialize)]
struct MarkTriggeredResponse {
    transitioned: bool,
}

async fn mark_triggered(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    CallerId(user_id): CallerId,
) -> ApiResult<Json<MarkTriggeredResponse>> {
    let transitioned = state.alert_service.mark_triggered(&user_id, &id).await?;
    Ok(Json(MarkTriggeredResponse { transitioned }))
}

async fn delete_alert(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    CallerId(user_id): CallerId,
) -> ApiResult<StatusCode> {
    state.alert_service.delete_alert(&user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn authorize_check(secret: Option<&str>, headers: &HeaderMap) -> ApiResult<()> {
    let Some(secret) = secret else {
        return Ok(());
    };
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);
    if presented == Some(secret) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized("Unauthorized".to_string()))
    }
}

#[derive(Serialize)]
struct CheckResponse {
    checked: usize,
    triggered: usize,
}

/// Evaluate every untriggered alert of every user.
async fn check_alerts(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<CheckResponse>> {
    authorize_check(state.cron_secret.as_deref(), &headers)?;

    let summary = state.alert_monitor.run_full_cycle().await?;
    tracing::info!(
        "Alert check: {} checked, {} triggered",
        summary.checked_count,
        summary.triggered_count
    );
    if let Ok(payload) = serde_json::to_value(summary) {
        state
            .event_bus
            .publish(ServerEvent::with_payload(ALERT_CHECK_COMPLETE, payload));
    }

    Ok(Json(CheckResponse {
        checked: summary.checked_count,
        triggered: summary.triggered_count,
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/alerts", get(get_alerts).post(create_alert))
        .route("/alerts/check", get(check_alerts).post(check_alerts))
        .route("/alerts/{id}", delete(delete_alert))
        .route("/alerts/{id}/triggered", patch(mark_triggered))
}
