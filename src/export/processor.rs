//! Checkpoint-driven fetch / send / advance loop.
//!
//! The checkpoint only moves after the sender has confirmed the batch, so a crash
//! between fetch and checkpoint write re-delivers instead of dropping records.

use chrono::Utc;

use crate::export::{ExportError, ProviderConfig, RunResult, RunStatus};
use crate::instrument::instrument;
use crate::senders::LogSender;
use crate::source::LogSource;
use crate::store::operations::run_history::RunRecord;
use crate::store::Store;

/// Explicit loop state carried between steps.
#[derive(Debug, Default)]
pub struct ProcessorState {
    pub cursor: Option<String>,
    pub logs_processed: u64,
    pub last_error: Option<ExportError>,
}

impl ProcessorState {
    pub fn starting_at(cursor: Option<String>) -> Self {
        Self {
            cursor,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A batch was handled and the checkpoint advanced.
    Advanced,
    /// The source returned nothing.
    Exhausted,
    /// Fetch or delivery failed; `last_error` is set and the checkpoint held.
    Failed,
}

/// Result of a processor run plus the fatal error, if any, that ended it.
#[derive(Debug)]
pub struct BatchOutcome {
    pub result: RunResult,
    pub failure: Option<ExportError>,
}

pub struct LogsProcessor<'a> {
    store: &'a Store,
    source: &'a dyn LogSource,
    sender: &'a dyn LogSender,
    config: &'a ProviderConfig,
}

impl<'a> LogsProcessor<'a> {
    pub fn new(
        store: &'a Store,
        source: &'a dyn LogSource,
        sender: &'a dyn LogSender,
        config: &'a ProviderConfig,
    ) -> Self {
        Self {
            store,
            source,
            sender,
            config,
        }
    }

    /// Where a run resumes: the stored checkpoint, else the configured start.
    pub fn initial_state(&self) -> Result<ProcessorState, ExportError> {
        let stored = self.store.read_state()?.checkpoint;
        Ok(ProcessorState::starting_at(
            stored.or_else(|| self.config.start_from.clone()),
        ))
    }

    /// Fetch, filter, send, then advance. `Err` only for store failures.
    pub async fn step(&self, state: &mut ProcessorState) -> Result<Step, ExportError> {
        let page = match self
            .source
            .fetch_batch(state.cursor.as_deref(), self.config.batch_size)
            .await
        {
            Ok(page) => page,
            Err(e) => {
                tracing::error!(error = %e, cursor = ?state.cursor, "Failed to fetch logs");
                state.last_error = Some(ExportError::UpstreamFetch(e.to_string()));
                return Ok(Step::Failed);
            }
        };

        let Some(last) = page.records.last() else {
            return Ok(Step::Exhausted);
        };
        let next_cursor = page.next_cursor.clone().unwrap_or_else(|| last.id.clone());

        let selected: Vec<_> = page
            .records
            .iter()
            .filter(|r| self.config.wants(r))
            .cloned()
            .collect();

        if !selected.is_empty() {
            let timed = instrument(self.sender.send(&selected)).await;
            tracing::info!(
                provider = %self.config.provider,
                count = selected.len(),
                elapsed_ms = timed.elapsed_ms(),
                "Finished request to '{}' in {:.3}ms.",
                self.config.provider,
                timed.elapsed_ms()
            );
            if let Err(e) = timed.into_inner() {
                tracing::error!(provider = %self.config.provider, error = %e, "Batch delivery failed");
                state.last_error = Some(ExportError::Delivery {
                    provider: self.config.provider.clone(),
                    source: e,
                });
                return Ok(Step::Failed);
            }
        } else {
            tracing::debug!(skipped = page.records.len(), "Batch fully filtered out by log types");
        }

        self.store
            .update_state(|s| s.checkpoint = Some(next_cursor.clone()))?;
        state.logs_processed += page.records.len() as u64;
        state.cursor = Some(next_cursor);
        Ok(Step::Advanced)
    }

    /// Drive `step` until the source is exhausted or a batch fails, then record the run.
    pub async fn run(&self) -> Result<BatchOutcome, ExportError> {
        let start = Utc::now();
        let mut state = self.initial_state()?;
        tracing::info!(
            provider = %self.config.provider,
            batch_size = self.config.batch_size,
            checkpoint = ?state.cursor,
            "Starting log export"
        );

        while self.step(&mut state).await? == Step::Advanced {}

        let status = RunStatus {
            start,
            end: Utc::now(),
            logs_processed: state.logs_processed,
            error: state.last_error.as_ref().map(ToString::to_string),
        };
        let result = RunResult {
            status,
            checkpoint: state.cursor.clone(),
        };

        self.record_run(&result);
        tracing::info!(
            logs_processed = result.status.logs_processed,
            checkpoint = ?result.checkpoint,
            failed = result.status.is_error(),
            "Log export finished"
        );

        Ok(BatchOutcome {
            result,
            failure: state.last_error,
        })
    }

    fn record_run(&self, result: &RunResult) {
        let record = RunRecord {
            id: uuid::Uuid::new_v4().to_string(),
            start: result.status.start,
            end: result.status.end,
            logs_processed: result.status.logs_processed,
            error: result.status.error.clone(),
            checkpoint: result.checkpoint.clone(),
        };
        if let Err(e) = self.store.append_run(&record) {
            tracing::warn!(error = %e, "Failed to record run history");
        }
    }
}
