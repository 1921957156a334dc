pub mod alert;
pub mod orchestrator;
pub mod processor;
pub mod report;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ExportConfig;
use crate::senders::{SendError, SenderRegistry};
use crate::store::StoreError;

/// A single upstream log event. Fields other than id/type/date are carried verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(rename = "log_id")]
    pub id: String,
    #[serde(rename = "type", default)]
    pub log_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// One fetch result. An empty `records` means the source is exhausted.
#[derive(Debug, Clone, Default)]
pub struct LogPage {
    pub records: Vec<LogRecord>,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatus {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub logs_processed: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunStatus {
    /// Status used when the processor could not produce a result at all.
    pub fn synthetic_failure(at: DateTime<Utc>, error: &ExportError) -> Self {
        Self {
            start: at,
            end: at,
            logs_processed: 0,
            error: Some(error.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Produced once per invocation; its checkpoint is folded into PersistedState.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub status: RunStatus,
    pub checkpoint: Option<String>,
}

/// Resolved once per run, immutable for its duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub provider: String,
    pub batch_size: usize,
    pub log_types: Option<BTreeSet<String>>,
    pub start_from: Option<String>,
}

impl ProviderConfig {
    pub fn resolve(config: &ExportConfig, registry: &SenderRegistry) -> Result<Self, ExportError> {
        let max = registry.max_batch_size(&config.provider)?;
        Ok(Self {
            provider: config.provider.clone(),
            batch_size: effective_batch_size(config.batch_size, max),
            log_types: config.log_types.as_deref().and_then(parse_log_types),
            start_from: config.start_from.clone(),
        })
    }

    /// Records whose type is outside the configured set are processed but not sent.
    pub fn wants(&self, record: &LogRecord) -> bool {
        match &self.log_types {
            Some(types) => types.contains(&record.log_type),
            None => true,
        }
    }
}

/// `min(configured, max)`; zero or absent falls back to the provider maximum.
pub fn effective_batch_size(configured: Option<usize>, max_batch_size: usize) -> usize {
    match configured {
        Some(size) if size > 0 && size <= max_batch_size => size,
        _ => max_batch_size,
    }
}

/// `"s, f ,ss"` -> `{"f", "s", "ss"}`. All whitespace is stripped; an empty list means no filter.
pub fn parse_log_types(raw: &str) -> Option<BTreeSet<String>> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let types: BTreeSet<String> = compact
        .split(',')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    if types.is_empty() {
        None
    } else {
        Some(types)
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("upstream fetch failed: {0}")]
    UpstreamFetch(String),
    #[error("delivery to '{provider}' failed: {source}")]
    Delivery {
        provider: String,
        #[source]
        source: SendError,
    },
    #[error("daily report failed: {0}")]
    Report(String),
    #[error("notification failed: {0}")]
    Notification(String),
    #[error("another export run holds the lease")]
    RunInProgress,
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
