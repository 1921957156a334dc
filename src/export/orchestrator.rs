use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::config::{Config, ExportConfig, ReportConfig};
use crate::constants::MAX_RUN_LEASE_TTL_SECS;
use crate::export::alert::{dispatch, notice_for, notice_for_abort};
use crate::export::processor::{BatchOutcome, LogsProcessor};
use crate::export::report::{ReportOutcome, ReportScheduler};
use crate::export::{ExportError, ProviderConfig, RunResult};
use crate::notify::Notifier;
use crate::senders::SenderRegistry;
use crate::source::LogSource;
use crate::store::{Store, StoreError};

/// Everything a run reads from configuration, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct OrchestratorSettings {
    pub export: ExportConfig,
    pub notify_on_success: bool,
    pub report: ReportConfig,
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            export: config.export.clone(),
            notify_on_success: config.slack.send_success,
            report: config.report.clone(),
        }
    }
}

pub struct Orchestrator {
    store: Arc<Store>,
    source: Arc<dyn LogSource>,
    senders: SenderRegistry,
    notifier: Arc<dyn Notifier>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        store: Arc<Store>,
        source: Arc<dyn LogSource>,
        senders: SenderRegistry,
        notifier: Arc<dyn Notifier>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            store,
            source,
            senders,
            notifier,
            settings,
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// One accepted trigger: lease, mark liveness, export, alert, report, release.
    ///
    /// A delivery or fetch failure is returned as `Err` only after alerting and the
    /// report check have completed. The lease is released even when this future is
    /// dropped mid-run.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<RunResult, ExportError> {
        let ttl = self.lease_ttl()?;
        let owner = uuid::Uuid::new_v4().to_string();
        match self.store.acquire_run_lease(&owner, now, ttl) {
            Ok(_) => {}
            Err(StoreError::Conflict { key, .. }) => {
                tracing::warn!(holder = %key, "Export run skipped: another run holds the lease");
                return Err(ExportError::RunInProgress);
            }
            Err(e) => return Err(e.into()),
        }

        let _lease = LeaseGuard {
            store: self.store.clone(),
            owner,
        };
        self.run_leased(now).await
    }

    fn lease_ttl(&self) -> Result<Duration, ExportError> {
        let secs = self.settings.export.run_lease_ttl_secs;
        if secs == 0 || secs > MAX_RUN_LEASE_TTL_SECS {
            return Err(ExportError::Configuration(format!(
                "run lease TTL must be within 1..={MAX_RUN_LEASE_TTL_SECS} seconds, got {secs}"
            )));
        }
        i64::try_from(secs)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| ExportError::Configuration(format!("invalid run lease TTL: {secs}")))
    }

    async fn run_leased(&self, now: DateTime<Utc>) -> Result<RunResult, ExportError> {
        match self.run_batches(now).await {
            Ok(BatchOutcome { result, failure }) => {
                if let Some(notice) = notice_for(&result, self.settings.notify_on_success) {
                    dispatch(self.notifier.as_ref(), notice).await;
                }
                self.check_report(now).await;
                match failure {
                    Some(e) => Err(e),
                    None => Ok(result),
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Export run aborted");
                dispatch(self.notifier.as_ref(), notice_for_abort(now, &e)).await;
                self.check_report(now).await;
                Err(e)
            }
        }
    }

    async fn run_batches(&self, now: DateTime<Utc>) -> Result<BatchOutcome, ExportError> {
        self.store.update_state(|s| s.last_run = Some(now))?;

        let provider = ProviderConfig::resolve(&self.settings.export, &self.senders)?;
        let entry = self.senders.resolve(&provider.provider)?;

        LogsProcessor::new(
            &self.store,
            self.source.as_ref(),
            entry.sender.as_ref(),
            &provider,
        )
        .run()
        .await
    }

    async fn check_report(&self, now: DateTime<Utc>) -> ReportOutcome {
        ReportScheduler::new(
            &self.store,
            self.source.as_ref(),
            self.notifier.as_ref(),
            &self.settings.report,
        )
        .check(now)
        .await
    }
}

/// Releases the run lease when the run ends, including on cancellation.
struct LeaseGuard {
    store: Arc<Store>,
    owner: String,
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        if let Err(e) = self.store.release_run_lease(&self.owner) {
            tracing::warn!(error = %e, "Failed to release run lease");
        }
    }
}
