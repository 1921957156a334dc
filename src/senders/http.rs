use async_trait::async_trait;

use crate::config::DestinationConfig;
use crate::export::LogRecord;
use crate::senders::{check_response, require_url, LogSender, Provider, SendError};

/// Generic JSON webhook: the batch is POSTed as a JSON array.
pub struct HttpSender {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl HttpSender {
    pub fn new(client: reqwest::Client, destination: &DestinationConfig) -> Self {
        Self {
            client,
            url: destination.url.clone(),
            token: Some(destination.token.clone()).filter(|t| !t.is_empty()),
        }
    }
}

#[async_trait]
impl LogSender for HttpSender {
    async fn send(&self, batch: &[LogRecord]) -> Result<(), SendError> {
        require_url(Provider::Http, &self.url)?;

        let mut request = self.client.post(&self.url).json(batch);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        check_response(request.send().await?).await
    }
}
