use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::UpstreamConfig;
use crate::constants::MAX_ERROR_BODY_CHARS;
use crate::export::{LogPage, LogRecord};
use crate::source::{LogSource, SourceError};
use crate::store::operations::run_history::RunReport;
use crate::store::Store;

/// Tenant management API log endpoint (`/api/v2/logs`), checkpoint-paginated.
///
/// Reports are aggregated from the run history this service records, which is
/// the only place processed counts and failures are tracked.
pub struct ManagementApiSource {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
    store: Arc<Store>,
}

impl ManagementApiSource {
    pub fn new(config: &UpstreamConfig, store: Arc<Store>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: base_url(&config.domain),
            api_token: config.api_token.clone(),
            store,
        }
    }
}

/// Bare domains get `https://`; explicit schemes are kept.
fn base_url(domain: &str) -> String {
    let trimmed = domain.trim().trim_end_matches('/');
    if trimmed.is_empty() || trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

#[async_trait]
impl LogSource for ManagementApiSource {
    async fn fetch_batch(&self, cursor: Option<&str>, take: usize) -> Result<LogPage, SourceError> {
        if self.base_url.is_empty() {
            return Err(SourceError::NotConfigured(
                "UPSTREAM_DOMAIN is empty".to_string(),
            ));
        }

        let mut query: Vec<(&str, String)> = vec![("take", take.to_string())];
        if let Some(from) = cursor {
            query.push(("from", from.to_string()));
        }

        let resp = self
            .client
            .get(format!("{}/api/v2/logs", self.base_url))
            .bearer_auth(&self.api_token)
            .query(&query)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let records: Vec<LogRecord> = resp.json().await?;
        let next_cursor = records
            .last()
            .map(|r| r.id.clone())
            .or_else(|| cursor.map(str::to_string));
        tracing::debug!(count = records.len(), cursor = ?cursor, "Fetched log page");

        Ok(LogPage {
            records,
            next_cursor,
        })
    }

    async fn report(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<RunReport, SourceError> {
        self.store
            .run_report(start, end)
            .map_err(|e| SourceError::Report(e.to_string()))
    }
}
