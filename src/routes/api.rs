use axum::extract::{Query, State};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::constants::{DEFAULT_RUNS_PAGE_SIZE, MAX_RUNS_PAGE_SIZE};
use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/state", get(get_state))
        .route("/runs", get(list_runs))
}

#[derive(Debug, Deserialize)]
struct RunsQuery {
    limit: Option<usize>,
}

async fn get_state(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    Ok(ok(state.store().read_state()?))
}

async fn list_runs(
    State(state): State<AppState>,
    Query(query): Query<RunsQuery>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_RUNS_PAGE_SIZE)
        .clamp(1, MAX_RUNS_PAGE_SIZE);
    Ok(ok(state.store().list_runs(limit)?))
}
