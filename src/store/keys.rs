/// Single PersistedState record
pub const STATE_KEY: &str = "state";

/// Single-flight run lease, stored next to the state record
pub const LEASE_KEY: &str = "lease";

/// Newest-first ordering: `{reverse_ts:020}:{run_id}`
pub fn run_history_key(timestamp_ms: i64, run_id: &str) -> String {
    let ts = timestamp_ms.max(0) as u64;
    let reverse_ts = u64::MAX - ts;
    format!("{:020}:{}", reverse_ts, run_id)
}

/// Parse the timestamp (ms) back out of a run history key.
pub fn parse_run_history_timestamp_ms(key: &[u8]) -> Option<i64> {
    let sep = key.iter().position(|b| *b == b':')?;
    let reverse_ts = std::str::from_utf8(&key[..sep]).ok()?.parse::<u64>().ok()?;
    i64::try_from(u64::MAX.checked_sub(reverse_ts)?).ok()
}
