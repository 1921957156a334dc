use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunLease {
    pub owner: String,
    pub expires_at: DateTime<Utc>,
}

impl Store {
    /// Take the single-flight lease with compare-and-swap.
    ///
    /// Fails with `Conflict` while another owner holds an unexpired lease. An expired
    /// lease is taken over by swapping against the stale bytes, so two contenders
    /// racing for the same stale lease cannot both win.
    pub fn acquire_run_lease(
        &self,
        owner: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<RunLease, StoreError> {
        let lease = RunLease {
            owner: owner.to_string(),
            expires_at: now + ttl,
        };
        let new_bytes = Self::serialize(&lease)?;
        let key = keys::LEASE_KEY.as_bytes();

        let current = self.export_state.get(key)?;
        if let Some(raw) = &current {
            match Self::deserialize::<RunLease>(raw) {
                Ok(held) if held.expires_at > now && held.owner != owner => {
                    return Err(StoreError::Conflict {
                        entity: "run_lease".to_string(),
                        key: held.owner,
                    });
                }
                Ok(held) if held.expires_at <= now => {
                    tracing::warn!(
                        stale_owner = %held.owner,
                        expired_at = %held.expires_at,
                        "Taking over expired run lease"
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Replacing unreadable run lease"),
            }
        }

        let cas_result = self
            .export_state
            .compare_and_swap(key, current.as_deref(), Some(new_bytes))
            .map_err(StoreError::Sled)?;

        if cas_result.is_err() {
            return Err(StoreError::Conflict {
                entity: "run_lease".to_string(),
                key: owner.to_string(),
            });
        }

        Ok(lease)
    }

    /// Release the lease only if `owner` still holds it. Returns whether it was released.
    pub fn release_run_lease(&self, owner: &str) -> Result<bool, StoreError> {
        let key = keys::LEASE_KEY.as_bytes();
        let Some(raw) = self.export_state.get(key)? else {
            return Ok(false);
        };
        let held: RunLease = Self::deserialize(&raw)?;
        if held.owner != owner {
            return Ok(false);
        }

        let cas_result = self
            .export_state
            .compare_and_swap(key, Some(&raw), None::<&[u8]>)
            .map_err(StoreError::Sled)?;
        Ok(cas_result.is_ok())
    }
}
