pub const EXPORT_STATE: &str = "export_state";
pub const RUN_HISTORY: &str = "run_history";
