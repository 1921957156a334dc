use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::response::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}

pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let start = Instant::now();
    let export_state = state.store().read_state()?;
    let latency_us = start.elapsed().as_micros() as u64;

    Ok(Json(serde_json::json!({
        "status": "ok",
        "uptimeSecs": state.uptime_secs(),
        "provider": state.config().export.provider,
        "lastRun": export_state.last_run,
        "checkpoint": export_state.checkpoint,
        "lastReportDate": export_state.last_report_date,
        "store": {
            "healthy": true,
            "latencyUs": latency_us,
        }
    })))
}

pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().read_state() {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
