//! Governance-controlled ledger parameters.

use basis_types::{DEFAULT_LOCK_PERIOD_SECS, DEFAULT_MAX_PROVIDERS};
use serde::{Deserialize, Serialize};

use crate::{LedgerError, Result};

/// Parameters changed only by the governor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerParams {
    /// Principal lock applied on every delegate call, in seconds. Also the
    /// length of each reward emission period.
    #[serde(default = "default_lock_period")]
    pub lock_period: u64,
    /// Registry capacity.
    #[serde(default = "default_max_providers")]
    pub max_providers: u32,
}

fn default_lock_period() -> u64 {
    DEFAULT_LOCK_PERIOD_SECS
}

fn default_max_providers() -> u32 {
    DEFAULT_MAX_PROVIDERS
}

impl Default for LedgerParams {
    fn default() -> Self {
        Self {
            lock_period: default_lock_period(),
            max_providers: default_max_providers(),
        }
    }
}

impl LedgerParams {
    /// Check the parameters are usable.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidInput`] if `lock_period` is zero
    pub fn validate(&self) -> Result<()> {
        validate_lock_period(self.lock_period)
    }
}

/// A zero lock period would make the reward rate a division by zero.
pub(crate) fn validate_lock_period(lock_period: u64) -> Result<()> {
    if lock_period == 0 {
        return Err(LedgerError::InvalidInput(
            "lock period must be non-zero".to_string(),
        ));
    }
    Ok(())
}
