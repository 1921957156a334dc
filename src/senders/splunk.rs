use async_trait::async_trait;
use serde_json::json;

use crate::config::DestinationConfig;
use crate::export::LogRecord;
use crate::senders::{check_response, require_url, LogSender, Provider, SendError};

const SOURCE_TYPE: &str = "auth0_logs";

/// Splunk HTTP Event Collector: concatenated event envelopes, token auth.
pub struct SplunkSender {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl SplunkSender {
    pub fn new(client: reqwest::Client, destination: &DestinationConfig) -> Self {
        Self {
            client,
            base_url: destination.url.trim_end_matches('/').to_string(),
            token: destination.token.clone(),
        }
    }
}

/// HEC accepts several JSON objects back to back in one body.
pub fn encode_events(batch: &[LogRecord]) -> Result<String, SendError> {
    let mut body = String::new();
    for record in batch {
        let envelope = json!({
            "time": record.date.map(|d| d.timestamp_millis() as f64 / 1000.0),
            "sourcetype": SOURCE_TYPE,
            "event": record,
        });
        body.push_str(&serde_json::to_string(&envelope)?);
    }
    Ok(body)
}

#[async_trait]
impl LogSender for SplunkSender {
    async fn send(&self, batch: &[LogRecord]) -> Result<(), SendError> {
        require_url(Provider::Splunk, &self.base_url)?;

        let resp = self
            .client
            .post(format!("{}/services/collector/event", self.base_url))
            .header(reqwest::header::AUTHORIZATION, format!("Splunk {}", self.token))
            .body(encode_events(batch)?)
            .send()
            .await?;
        check_response(resp).await
    }
}
