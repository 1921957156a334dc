pub mod management_api;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::export::LogPage;
use crate::store::operations::run_history::RunReport;

pub use management_api::ManagementApiSource;

/// Upstream log stream, consumed by the batch processor and the report scheduler.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Records strictly after `cursor` (from the start of the stream when `None`), at most `take`.
    async fn fetch_batch(&self, cursor: Option<&str>, take: usize) -> Result<LogPage, SourceError>;

    /// Aggregate over `[start, end]`.
    async fn report(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<RunReport, SourceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("log source is not configured: {0}")]
    NotConfigured(String),
    #[error("log source request failed: {0}")]
    Network(String),
    #[error("log source returned status={status}, body={body}")]
    Status { status: u16, body: String },
    #[error("log source payload invalid: {0}")]
    Decode(String),
    #[error("report aggregation failed: {0}")]
    Report(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            SourceError::Decode(e.to_string())
        } else {
            SourceError::Network(e.to_string())
        }
    }
}
