use chrono::{DateTime, Utc};

use crate::export::{ExportError, RunResult, RunStatus};
use crate::notify::{Notice, Notifier};

/// Failure always alerts; success only when opted in.
pub fn notice_for(result: &RunResult, notify_on_success: bool) -> Option<Notice> {
    if result.status.is_error() {
        Some(Notice::RunFailed {
            status: result.status.clone(),
            checkpoint: result.checkpoint.clone(),
        })
    } else if notify_on_success {
        Some(Notice::RunSucceeded {
            status: result.status.clone(),
            checkpoint: result.checkpoint.clone(),
        })
    } else {
        None
    }
}

/// Alert for a run that never produced a result: zero processed, no checkpoint.
pub fn notice_for_abort(at: DateTime<Utc>, error: &ExportError) -> Notice {
    Notice::RunFailed {
        status: RunStatus::synthetic_failure(at, error),
        checkpoint: None,
    }
}

/// Deliver a notice; failures are logged and swallowed.
pub async fn dispatch(notifier: &dyn Notifier, notice: Notice) {
    if let Err(e) = notifier.send(&notice).await {
        let err = ExportError::Notification(e.to_string());
        tracing::warn!(kind = notice.kind(), error = %err, "Failed to send notification");
    }
}
