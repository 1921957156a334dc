pub mod api;
pub mod health;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Json, Router};

use crate::middleware::request_id;
use crate::response::ErrorBody;
use crate::state::AppState;
use crate::trigger;

/// The trigger classifier wraps every route: scheduled firings are answered there,
/// anything else falls through to the routes below.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", api::router())
        .nest("/health", health::router())
        .fallback(fallback_404)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            trigger::scheduled_export_middleware,
        ))
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .with_state(state)
}

async fn fallback_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            success: false,
            code: "NOT_FOUND".to_string(),
            message: "Not found".to_string(),
            trace_id: None,
        }),
    )
}
