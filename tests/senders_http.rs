mod common;

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::routing::post;
use axum::Router;
use serde_json::Value;

use common::fakes::record;
use logs_export::config::DestinationConfig;
use logs_export::senders::{SendError, SenderRegistry};

#[derive(Debug, Clone)]
struct Captured {
    path: String,
    authorization: Option<String>,
    body: String,
}

type Captures = Arc<Mutex<Vec<Captured>>>;

async fn capture(
    State(captures): State<Captures>,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> StatusCode {
    captures.lock().unwrap().push(Captured {
        path: uri.path().to_string(),
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });
    StatusCode::OK
}

async fn reject() -> (StatusCode, &'static str) {
    (StatusCode::SERVICE_UNAVAILABLE, "ingest paused")
}

async fn spawn_destination() -> (String, Captures) {
    let captures: Captures = Arc::default();
    let app = Router::new()
        .route("/ingest", post(capture))
        .route("/services/collector/event", post(capture))
        .route("/reject", post(reject))
        .with_state(captures.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), captures)
}

fn registry(url: String, token: &str) -> SenderRegistry {
    SenderRegistry::builtin(
        reqwest::Client::new(),
        &DestinationConfig {
            url,
            token: token.to_string(),
        },
    )
}

#[tokio::test]
async fn http_sender_posts_json_array_with_bearer() {
    let (base, captures) = spawn_destination().await;
    let senders = registry(format!("{base}/ingest"), "secret");

    let entry = senders.resolve("http").unwrap();
    entry.sender.send(&[record(1, "s"), record(2, "f")]).await.unwrap();

    let captured = captures.lock().unwrap().clone();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].authorization.as_deref(), Some("Bearer secret"));
    let body: Value = serde_json::from_str(&captured[0].body).unwrap();
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["log_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["1", "2"]);
}

#[tokio::test]
async fn splunk_sender_targets_event_collector() {
    let (base, captures) = spawn_destination().await;
    let senders = registry(format!("{base}/"), "hec-token");

    senders
        .resolve("splunk")
        .unwrap()
        .sender
        .send(&[record(7, "s")])
        .await
        .unwrap();

    let captured = captures.lock().unwrap().clone();
    assert_eq!(captured[0].path, "/services/collector/event");
    assert_eq!(captured[0].authorization.as_deref(), Some("Splunk hec-token"));
    let envelope: Value = serde_json::from_str(&captured[0].body).unwrap();
    assert_eq!(envelope["sourcetype"], "auth0_logs");
    assert_eq!(envelope["event"]["log_id"], "7");
}

#[tokio::test]
async fn sumologic_sender_posts_one_line_per_record() {
    let (base, captures) = spawn_destination().await;
    let senders = registry(format!("{base}/ingest"), "");

    senders
        .resolve("sumologic")
        .unwrap()
        .sender
        .send(&[record(1, "s"), record(2, "s"), record(3, "s")])
        .await
        .unwrap();

    let captured = captures.lock().unwrap().clone();
    let lines: Vec<&str> = captured[0].body.lines().collect();
    assert_eq!(lines.len(), 3);
    for line in lines {
        serde_json::from_str::<Value>(line).expect("each line is a JSON document");
    }
}

#[tokio::test]
async fn mixpanel_sender_uses_basic_auth_and_event_shape() {
    let (base, captures) = spawn_destination().await;
    let senders = registry(format!("{base}/ingest"), "mp-secret");

    senders
        .resolve("mixpanel")
        .unwrap()
        .sender
        .send(&[record(9, "fp")])
        .await
        .unwrap();

    let captured = captures.lock().unwrap().clone();
    let auth = captured[0].authorization.as_deref().unwrap();
    assert!(auth.starts_with("Basic "));
    let events: Value = serde_json::from_str(&captured[0].body).unwrap();
    assert_eq!(events[0]["event"], "fp");
    assert_eq!(events[0]["properties"]["$insert_id"], "9");
    assert_eq!(events[0]["properties"]["distinct_id"], "9");
}

#[tokio::test]
async fn non_success_status_is_rejected_with_body() {
    let (base, _captures) = spawn_destination().await;
    let senders = registry(format!("{base}/reject"), "");

    let err = senders
        .resolve("http")
        .unwrap()
        .sender
        .send(&[record(1, "s")])
        .await
        .unwrap_err();

    match err {
        SendError::Rejected { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "ingest paused");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_destination_is_a_network_error() {
    let senders = registry("http://127.0.0.1:9/ingest".to_string(), "");

    let err = senders
        .resolve("http")
        .unwrap()
        .sender
        .send(&[record(1, "s")])
        .await
        .unwrap_err();

    assert!(matches!(err, SendError::Network(_)));
}

#[tokio::test]
async fn missing_destination_url_is_not_configured() {
    let senders = registry(String::new(), "");

    let err = senders
        .resolve("sumologic")
        .unwrap()
        .sender
        .send(&[record(1, "s")])
        .await
        .unwrap_err();

    assert!(matches!(err, SendError::NotConfigured(_)));
}
