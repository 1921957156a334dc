pub mod http;
pub mod mixpanel;
pub mod splunk;
pub mod sumologic;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::DestinationConfig;
use crate::constants::{DEFAULT_MAX_BATCH_SIZE, MAX_ERROR_BODY_CHARS, MIXPANEL_MAX_BATCH_SIZE};
use crate::export::{ExportError, LogRecord};

#[derive(Debug, Error)]
pub enum SendError {
    #[error("sender is not configured: {0}")]
    NotConfigured(String),
    #[error("request failed: {0}")]
    Network(String),
    #[error("destination rejected batch: status={status}, body={body}")]
    Rejected { status: u16, body: String },
    #[error("failed to encode batch: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for SendError {
    fn from(e: reqwest::Error) -> Self {
        SendError::Network(e.to_string())
    }
}

/// Delivery to one destination. A call resolves exactly once, after the batch has been
/// delivered or has conclusively failed.
#[async_trait]
pub trait LogSender: Send + Sync {
    async fn send(&self, batch: &[LogRecord]) -> Result<(), SendError>;
}

/// Closed set of built-in destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Http,
    Mixpanel,
    Splunk,
    Sumologic,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::Http,
        Provider::Mixpanel,
        Provider::Splunk,
        Provider::Sumologic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Mixpanel => "mixpanel",
            Self::Splunk => "splunk",
            Self::Sumologic => "sumologic",
        }
    }

    pub fn max_batch_size(self) -> usize {
        match self {
            Self::Mixpanel => MIXPANEL_MAX_BATCH_SIZE,
            Self::Http | Self::Splunk | Self::Sumologic => DEFAULT_MAX_BATCH_SIZE,
        }
    }

    fn build_sender(self, client: reqwest::Client, destination: &DestinationConfig) -> Arc<dyn LogSender> {
        match self {
            Self::Http => Arc::new(http::HttpSender::new(client, destination)),
            Self::Mixpanel => Arc::new(mixpanel::MixpanelSender::new(client, destination)),
            Self::Splunk => Arc::new(splunk::SplunkSender::new(client, destination)),
            Self::Sumologic => Arc::new(sumologic::SumologicSender::new(client, destination)),
        }
    }
}

#[derive(Clone)]
pub struct ProviderEntry {
    pub max_batch_size: usize,
    pub sender: Arc<dyn LogSender>,
}

/// Provider id -> `(send, max_batch_size)`, built once at startup.
#[derive(Clone, Default)]
pub struct SenderRegistry {
    entries: HashMap<String, ProviderEntry>,
}

impl SenderRegistry {
    pub fn builtin(client: reqwest::Client, destination: &DestinationConfig) -> Self {
        Provider::ALL
            .into_iter()
            .fold(Self::default(), |registry, provider| {
                let sender = provider.build_sender(client.clone(), destination);
                registry.register(provider.as_str(), provider.max_batch_size(), sender)
            })
    }

    pub fn register(
        mut self,
        id: &str,
        max_batch_size: usize,
        sender: Arc<dyn LogSender>,
    ) -> Self {
        self.entries.insert(
            id.to_string(),
            ProviderEntry {
                max_batch_size,
                sender,
            },
        );
        self
    }

    pub fn resolve(&self, provider: &str) -> Result<&ProviderEntry, ExportError> {
        if provider.trim().is_empty() {
            return Err(ExportError::Configuration(
                "no provider configured".to_string(),
            ));
        }
        self.entries
            .get(provider)
            .ok_or_else(|| ExportError::Configuration(format!("Unknown provider: {provider}")))
    }

    pub fn max_batch_size(&self, provider: &str) -> Result<usize, ExportError> {
        Ok(self.resolve(provider)?.max_batch_size)
    }

    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

/// Map a non-2xx response to `Rejected`, keeping a bounded slice of the body.
pub(crate) async fn check_response(resp: reqwest::Response) -> Result<(), SendError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let body = resp.text().await.unwrap_or_default();
    Err(SendError::Rejected {
        status: status.as_u16(),
        body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
    })
}

pub(crate) fn require_url(provider: Provider, url: &str) -> Result<(), SendError> {
    if url.trim().is_empty() {
        return Err(SendError::NotConfigured(format!(
            "{} requires DESTINATION_URL",
            provider.as_str()
        )));
    }
    Ok(())
}
