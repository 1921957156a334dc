use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::DestinationConfig;
use crate::export::LogRecord;
use crate::senders::{check_response, LogSender, SendError};

const DEFAULT_IMPORT_URL: &str = "https://api.mixpanel.com/import";

/// Mixpanel import API. Payload limits make this the provider with the small batch ceiling.
pub struct MixpanelSender {
    client: reqwest::Client,
    url: String,
    api_secret: String,
}

impl MixpanelSender {
    pub fn new(client: reqwest::Client, destination: &DestinationConfig) -> Self {
        let url = if destination.url.trim().is_empty() {
            DEFAULT_IMPORT_URL.to_string()
        } else {
            destination.url.clone()
        };
        Self {
            client,
            url,
            api_secret: destination.token.clone(),
        }
    }
}

pub fn to_event(record: &LogRecord) -> Value {
    let mut properties = record.fields.clone();
    properties.insert(
        "time".to_string(),
        json!(record.date.map(|d| d.timestamp_millis())),
    );
    properties.insert(
        "distinct_id".to_string(),
        record
            .fields
            .get("user_id")
            .cloned()
            .unwrap_or_else(|| json!(record.id)),
    );
    properties.insert("$insert_id".to_string(), json!(record.id));

    json!({
        "event": record.log_type,
        "properties": properties,
    })
}

#[async_trait]
impl LogSender for MixpanelSender {
    async fn send(&self, batch: &[LogRecord]) -> Result<(), SendError> {
        if self.api_secret.is_empty() {
            return Err(SendError::NotConfigured(
                "mixpanel requires DESTINATION_TOKEN".to_string(),
            ));
        }

        let events: Vec<Value> = batch.iter().map(to_event).collect();
        let resp = self
            .client
            .post(&self.url)
            .basic_auth(&self.api_secret, None::<&str>)
            .json(&events)
            .send()
            .await?;
        check_response(resp).await
    }
}
