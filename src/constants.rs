/// Batch ceiling for providers without a stricter payload limit
pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;

/// Mixpanel import endpoint rejects larger payloads
pub const MIXPANEL_MAX_BATCH_SIZE: usize = 20;

/// Local hour after which the daily digest becomes due
pub const DEFAULT_REPORT_HOUR: u32 = 16;

/// Trailing report window (hours), not aligned to calendar days
pub const REPORT_WINDOW_HOURS: i64 = 24;

/// Referer sent by the scheduling console on its poll calls
pub const DEFAULT_TRUSTED_REFERER: &str = "https://manage.auth0.com/";

/// Run history retention (days)
pub const RUN_HISTORY_RETENTION_DAYS: i64 = 7;

/// Maximum distinct error messages carried by a report
pub const MAX_REPORT_ERRORS: usize = 10;

/// Default single-flight lease TTL (seconds)
pub const DEFAULT_RUN_LEASE_TTL_SECS: u64 = 600;

/// Upper bound accepted for `RUN_LEASE_TTL_SECS` (one day)
pub const MAX_RUN_LEASE_TTL_SECS: u64 = 86_400;

/// Default page size for `/api/runs`
pub const DEFAULT_RUNS_PAGE_SIZE: usize = 20;

/// Maximum page size for `/api/runs`
pub const MAX_RUNS_PAGE_SIZE: usize = 100;

/// Upstream and delivery response bodies are truncated to this many chars in errors
pub const MAX_ERROR_BODY_CHARS: usize = 512;
