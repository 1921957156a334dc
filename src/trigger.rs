//! Scheduled-trigger classification.
//!
//! The export endpoint is reachable by arbitrary HTTP calls. Only two signatures start a
//! run: a scheduler body (`schedule` present and `state == "active"`), or a poll from the
//! trusted scheduling console (matching `referer` plus an `if-none-match` header).
//! Everything else is handed to the next handler untouched.

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use http_body_util::LengthLimitError;
use serde_json::Value;

use crate::response::AppError;
use crate::state::AppState;

/// Maximum trigger body size: 2 MiB.
const MAX_TRIGGER_BODY: usize = 2 * 1024 * 1024;

pub fn is_scheduled_trigger(body: &Value, headers: &HeaderMap, trusted_referer: &str) -> bool {
    let scheduled = body.get("schedule").is_some_and(is_truthy)
        && body.get("state").and_then(Value::as_str) == Some("active");

    let console_poll = header_str(headers, "referer") == Some(trusted_referer)
        && header_str(headers, "if-none-match").is_some_and(|v| !v.is_empty());

    scheduled || console_poll
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// JSON truthiness as scheduler payloads use it: null, false, 0 and "" are absent.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn exceeds_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

/// Intercepts scheduled triggers and runs the export; passes everything else through.
pub async fn scheduled_export_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let (parts, body) = req.into_parts();
    let bytes = match to_bytes(body, MAX_TRIGGER_BODY).await {
        Ok(bytes) => bytes,
        Err(e) if exceeds_limit(&e) => {
            tracing::warn!(path = %parts.uri.path(), limit = MAX_TRIGGER_BODY, "Request body too large");
            return AppError::payload_too_large("Request body exceeds 2 MiB").into_response();
        }
        Err(e) => {
            tracing::debug!(error = %e, "Unreadable body, treating request as non-trigger");
            return next.run(Request::from_parts(parts, Body::empty())).await;
        }
    };

    let payload = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    if !is_scheduled_trigger(&payload, &parts.headers, &state.config().trusted_referer) {
        return next.run(Request::from_parts(parts, Body::from(bytes))).await;
    }

    tracing::info!(path = %parts.uri.path(), "Scheduled export trigger accepted");
    match state.orchestrator().run(chrono::Utc::now()).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => AppError::from(e).into_response(),
    }
}
