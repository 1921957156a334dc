//! Daily digest gating.
//!
//! Due when the stored `lastReportDate` is not today (in the report timezone) and the
//! local hour has reached the configured report hour. The window is a trailing 24 hours
//! ending now, not snapped to midnight. `lastReportDate` only advances after dispatch.

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};

use crate::config::ReportConfig;
use crate::constants::REPORT_WINDOW_HOURS;
use crate::export::ExportError;
use crate::notify::{Notice, Notifier};
use crate::source::LogSource;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportDecision {
    NotDue,
    Due { today: NaiveDate },
}

pub fn evaluate(
    last_report_date: Option<NaiveDate>,
    now: DateTime<Utc>,
    config: &ReportConfig,
) -> ReportDecision {
    let local = now.with_timezone(&config.timezone);
    let today = local.date_naive();

    if last_report_date != Some(today) && local.hour() >= config.hour {
        ReportDecision::Due { today }
    } else {
        ReportDecision::NotDue
    }
}

pub fn report_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (now - Duration::hours(REPORT_WINDOW_HOURS), now)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    NotDue,
    Dispatched { date: NaiveDate },
    Failed { date: NaiveDate, error: String },
}

pub struct ReportScheduler<'a> {
    store: &'a Store,
    source: &'a dyn LogSource,
    notifier: &'a dyn Notifier,
    config: &'a ReportConfig,
}

impl<'a> ReportScheduler<'a> {
    pub fn new(
        store: &'a Store,
        source: &'a dyn LogSource,
        notifier: &'a dyn Notifier,
        config: &'a ReportConfig,
    ) -> Self {
        Self {
            store,
            source,
            notifier,
            config,
        }
    }

    /// Never fails the caller: errors are logged and reported as `Failed`.
    pub async fn check(&self, now: DateTime<Utc>) -> ReportOutcome {
        let last = match self.store.read_state() {
            Ok(state) => state.last_report_date,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read state for report check");
                return ReportOutcome::NotDue;
            }
        };

        let ReportDecision::Due { today } = evaluate(last, now, self.config) else {
            return ReportOutcome::NotDue;
        };

        match self.send_daily_report(now, today).await {
            Ok(()) => {
                tracing::info!(date = %today, "Daily report dispatched");
                ReportOutcome::Dispatched { date: today }
            }
            Err(e) => {
                tracing::warn!(date = %today, error = %e, "Daily report failed, will retry next run");
                ReportOutcome::Failed {
                    date: today,
                    error: e.to_string(),
                }
            }
        }
    }

    async fn send_daily_report(&self, now: DateTime<Utc>, today: NaiveDate) -> Result<(), ExportError> {
        let (start, end) = report_window(now);
        let report = self
            .source
            .report(start, end)
            .await
            .map_err(|e| ExportError::Report(e.to_string()))?;

        self.notifier
            .send(&Notice::DailyReport(report))
            .await
            .map_err(|e| ExportError::Report(e.to_string()))?;

        self.store
            .update_state(|s| s.last_report_date = Some(today))
            .map_err(|e| ExportError::Report(e.to_string()))?;
        Ok(())
    }
}
