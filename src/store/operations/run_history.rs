use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::MAX_REPORT_ERRORS;
use crate::store::keys;
use crate::store::{Store, StoreError};

/// One batch-processor run, appended at the end of every run that produced a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub logs_processed: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub checkpoint: Option<String>,
}

/// Aggregate over the run history inside a time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub runs: u64,
    pub failed_runs: u64,
    pub logs_processed: u64,
    /// Distinct messages, most recent first.
    pub errors: Vec<String>,
    /// Checkpoint of the newest run in the window.
    pub checkpoint: Option<String>,
}

impl Store {
    pub fn append_run(&self, record: &RunRecord) -> Result<(), StoreError> {
        let key = keys::run_history_key(record.start.timestamp_millis(), &record.id);
        self.run_history
            .insert(key.as_bytes(), Self::serialize(record)?)?;
        Ok(())
    }

    pub fn list_runs(&self, limit: usize) -> Result<Vec<RunRecord>, StoreError> {
        let mut runs = Vec::new();
        for item in self.run_history.iter().take(limit) {
            let (_, raw) = item?;
            match Self::deserialize::<RunRecord>(&raw) {
                Ok(run) => runs.push(run),
                Err(e) => tracing::warn!(error = %e, "Skipping unreadable run record"),
            }
        }
        Ok(runs)
    }

    /// Runs that started and ended inside `[start, end]`, aggregated.
    pub fn run_report(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<RunReport, StoreError> {
        let mut report = RunReport {
            start,
            end,
            runs: 0,
            failed_runs: 0,
            logs_processed: 0,
            errors: Vec::new(),
            checkpoint: None,
        };

        // Keys are newest first, so the first match carries the report checkpoint.
        for item in self.run_history.iter() {
            let (key, raw) = item?;
            if let Some(ts) = keys::parse_run_history_timestamp_ms(&key) {
                if ts < start.timestamp_millis() {
                    break;
                }
            }
            let run: RunRecord = match Self::deserialize(&raw) {
                Ok(run) => run,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable run record");
                    continue;
                }
            };
            if run.start < start || run.end > end {
                continue;
            }

            if report.runs == 0 {
                report.checkpoint = run.checkpoint.clone();
            }
            report.runs += 1;
            report.logs_processed += run.logs_processed;
            if let Some(error) = run.error {
                report.failed_runs += 1;
                if report.errors.len() < MAX_REPORT_ERRORS && !report.errors.contains(&error) {
                    report.errors.push(error);
                }
            }
        }

        Ok(report)
    }

    /// Drop runs that started before `cutoff`. Returns the number removed.
    pub fn prune_runs_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let cutoff_ms = cutoff.timestamp_millis();
        let mut batch = sled::Batch::default();
        let mut removed = 0u64;

        // Newest first: everything after the first too-old key is older still.
        for item in self.run_history.iter() {
            let (key, _) = item?;
            match keys::parse_run_history_timestamp_ms(&key) {
                Some(ts) if ts >= cutoff_ms => continue,
                _ => {
                    batch.remove(key);
                    removed += 1;
                }
            }
        }

        self.run_history.apply_batch(batch)?;
        Ok(removed)
    }
}
