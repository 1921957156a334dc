use chrono::{Duration, Utc};

use crate::constants::RUN_HISTORY_RETENTION_DAYS;
use crate::store::Store;

pub async fn run(store: &Store) {
    let cutoff = Utc::now() - Duration::days(RUN_HISTORY_RETENTION_DAYS);
    match store.prune_runs_before(cutoff) {
        Ok(removed) => tracing::info!(removed, cutoff = %cutoff, "Run history cleanup complete"),
        Err(e) => tracing::warn!(error = %e, "Failed to prune run history"),
    }
}
