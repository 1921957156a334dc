use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

/// The one durable record the orchestrator owns. Always replaced as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,
    /// Every record at or before this cursor has been delivered.
    #[serde(default)]
    pub checkpoint: Option<String>,
    /// Calendar day (report timezone) of the last dispatched digest.
    #[serde(default)]
    pub last_report_date: Option<NaiveDate>,
}

impl Store {
    /// Missing state reads as the default (first run).
    pub fn read_state(&self) -> Result<PersistedState, StoreError> {
        match self.export_state.get(keys::STATE_KEY.as_bytes())? {
            Some(raw) => Self::deserialize(&raw),
            None => Ok(PersistedState::default()),
        }
    }

    pub fn write_state(&self, state: &PersistedState) -> Result<(), StoreError> {
        self.export_state
            .insert(keys::STATE_KEY.as_bytes(), Self::serialize(state)?)?;
        self.export_state.flush()?;
        Ok(())
    }

    /// Read-modify-write of the state record.
    pub fn update_state<F>(&self, mutate: F) -> Result<PersistedState, StoreError>
    where
        F: FnOnce(&mut PersistedState),
    {
        let mut state = self.read_state()?;
        mutate(&mut state);
        self.write_state(&state)?;
        Ok(state)
    }
}
