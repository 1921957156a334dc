use async_trait::async_trait;

use crate::config::DestinationConfig;
use crate::export::LogRecord;
use crate::senders::{check_response, require_url, LogSender, Provider, SendError};

/// Sumo Logic HTTP source: one JSON document per line.
pub struct SumologicSender {
    client: reqwest::Client,
    url: String,
}

impl SumologicSender {
    pub fn new(client: reqwest::Client, destination: &DestinationConfig) -> Self {
        Self {
            client,
            url: destination.url.clone(),
        }
    }
}

pub fn encode_lines(batch: &[LogRecord]) -> Result<String, SendError> {
    let lines = batch
        .iter()
        .map(serde_json::to_string)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(lines.join("\n"))
}

#[async_trait]
impl LogSender for SumologicSender {
    async fn send(&self, batch: &[LogRecord]) -> Result<(), SendError> {
        require_url(Provider::Sumologic, &self.url)?;

        let body = encode_lines(batch)?;
        let resp = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        check_response(resp).await
    }
}
