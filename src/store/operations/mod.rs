pub mod export_state;
pub mod run_history;
pub mod run_lease;
