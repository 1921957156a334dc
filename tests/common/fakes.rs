use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use logs_export::export::{LogPage, LogRecord};
use logs_export::notify::{Notice, Notifier, NotifyError};
use logs_export::senders::{LogSender, SendError};
use logs_export::source::{LogSource, SourceError};
use logs_export::store::operations::run_history::RunReport;

pub fn record(id: u64, log_type: &str) -> LogRecord {
    let mut fields = serde_json::Map::new();
    fields.insert("description".to_string(), serde_json::json!(format!("event {id}")));
    LogRecord {
        id: id.to_string(),
        log_type: log_type.to_string(),
        date: None,
        fields,
    }
}

/// Upstream stream of records `1..=count`; the cursor is the last id delivered.
pub struct FakeSource {
    records: Vec<LogRecord>,
    fail_fetch: bool,
    fail_report: bool,
    pub fetches: Mutex<Vec<(Option<String>, usize)>>,
    pub reports: AtomicUsize,
}

impl FakeSource {
    pub fn numbered(count: u64) -> Self {
        Self::with_records((1..=count).map(|i| record(i, "s")).collect())
    }

    pub fn with_records(records: Vec<LogRecord>) -> Self {
        Self {
            records,
            fail_fetch: false,
            fail_report: false,
            fetches: Mutex::new(Vec::new()),
            reports: AtomicUsize::new(0),
        }
    }

    pub fn failing_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    pub fn failing_report(mut self) -> Self {
        self.fail_report = true;
        self
    }

    pub fn fetch_calls(&self) -> Vec<(Option<String>, usize)> {
        self.fetches.lock().expect("fetches lock").clone()
    }
}

#[async_trait]
impl LogSource for FakeSource {
    async fn fetch_batch(&self, cursor: Option<&str>, take: usize) -> Result<LogPage, SourceError> {
        self.fetches
            .lock()
            .expect("fetches lock")
            .push((cursor.map(str::to_string), take));

        if self.fail_fetch {
            return Err(SourceError::Status {
                status: 503,
                body: "upstream unavailable".to_string(),
            });
        }

        let after: u64 = cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
        let records: Vec<LogRecord> = self
            .records
            .iter()
            .filter(|r| r.id.parse::<u64>().map(|id| id > after).unwrap_or(false))
            .take(take)
            .cloned()
            .collect();
        let next_cursor = records.last().map(|r| r.id.clone());
        Ok(LogPage {
            records,
            next_cursor,
        })
    }

    async fn report(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<RunReport, SourceError> {
        self.reports.fetch_add(1, Ordering::SeqCst);
        if self.fail_report {
            return Err(SourceError::Report("aggregation unavailable".to_string()));
        }
        Ok(RunReport {
            start,
            end,
            runs: 3,
            failed_runs: 1,
            logs_processed: 250,
            errors: vec!["delivery to 'http' failed".to_string()],
            checkpoint: Some("250".to_string()),
        })
    }
}

/// Records every delivered batch by id; can be told to reject or never answer the
/// n-th call (1-based).
#[derive(Default)]
pub struct RecordingSender {
    pub batches: Mutex<Vec<Vec<String>>>,
    fail_on_call: Option<usize>,
    hang_on_call: Option<usize>,
    calls: AtomicUsize,
}

impl RecordingSender {
    pub fn failing_on_call(n: usize) -> Self {
        Self {
            fail_on_call: Some(n),
            ..Self::default()
        }
    }

    pub fn hanging_on_call(n: usize) -> Self {
        Self {
            hang_on_call: Some(n),
            ..Self::default()
        }
    }

    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().expect("batches lock").clone()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches().iter().map(Vec::len).collect()
    }
}

#[async_trait]
impl LogSender for RecordingSender {
    async fn send(&self, batch: &[LogRecord]) -> Result<(), SendError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.hang_on_call == Some(call) {
            std::future::pending::<()>().await;
        }
        if self.fail_on_call == Some(call) {
            return Err(SendError::Rejected {
                status: 500,
                body: "destination down".to_string(),
            });
        }
        self.batches
            .lock()
            .expect("batches lock")
            .push(batch.iter().map(|r| r.id.clone()).collect());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub notices: Mutex<Vec<Notice>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().expect("notices lock").clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.notices().iter().map(Notice::kind).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notice: &Notice) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::SendFailed("webhook unreachable".to_string()));
        }
        self.notices
            .lock()
            .expect("notices lock")
            .push(notice.clone());
        Ok(())
    }
}
