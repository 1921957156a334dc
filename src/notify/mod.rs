pub mod slack;

use async_trait::async_trait;
use thiserror::Error;

use crate::export::RunStatus;
use crate::store::operations::run_history::RunReport;

pub use slack::SlackNotifier;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("send failed: {0}")]
    SendFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    RunFailed {
        status: RunStatus,
        checkpoint: Option<String>,
    },
    RunSucceeded {
        status: RunStatus,
        checkpoint: Option<String>,
    },
    DailyReport(RunReport),
}

impl Notice {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RunFailed { .. } => "run_failed",
            Self::RunSucceeded { .. } => "run_succeeded",
            Self::DailyReport(_) => "daily_report",
        }
    }
}

/// Alert channel for run outcomes and daily digests.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notice: &Notice) -> Result<(), NotifyError>;
}

/// Used when no webhook is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send(&self, notice: &Notice) -> Result<(), NotifyError> {
        tracing::debug!(kind = notice.kind(), "No notification channel configured, dropping notice");
        Ok(())
    }
}
