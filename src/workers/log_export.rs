//! Built-in scheduled export, for deployments without an external cron caller.

use chrono::Utc;

use crate::export::orchestrator::Orchestrator;
use crate::export::ExportError;

pub async fn run(orchestrator: &Orchestrator) {
    match orchestrator.run(Utc::now()).await {
        Ok(result) => tracing::info!(
            logs_processed = result.status.logs_processed,
            checkpoint = ?result.checkpoint,
            "Scheduled export complete"
        ),
        Err(ExportError::RunInProgress) => {
            tracing::info!("Scheduled export skipped: run already in progress")
        }
        Err(e) => tracing::error!(error = %e, "Scheduled export failed"),
    }
}
