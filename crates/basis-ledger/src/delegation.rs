//! Delegation positions.
//!
//! A delegation is keyed by `(delegator, provider)`. The record appears on
//! the first delegate call and stays after the share returns to zero, so a
//! delegator can still withdraw rewards accrued before undelegating.

use std::collections::BTreeMap;

use basis_types::{Address, Amount, Timestamp};
use serde::{Deserialize, Serialize};

use crate::math::U256;
use crate::{LedgerError, Result};

/// One delegator's position with one provider.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    /// Provider the position belongs to.
    pub provider: Address,
    /// Capital currently delegated. Zero means no active delegation.
    pub share: Amount,
    /// Principal cannot be withdrawn before this time.
    pub unlock_time: Timestamp,
    /// Provider accumulator value at this position's last settlement.
    pub reward_per_share_paid: U256,
    /// Settled rewards not yet withdrawn.
    pub rewards: Amount,
}

impl Delegation {
    /// Empty position with `provider`.
    pub fn open(provider: Address) -> Self {
        Self {
            provider,
            ..Self::default()
        }
    }

    /// Whether principal is still locked at `now`.
    pub fn is_locked(&self, now: Timestamp) -> bool {
        now < self.unlock_time
    }

    /// Add `amount` to the share and restart the lock from `now`.
    ///
    /// The lock is reset on every top-up, not only the first delegation.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Overflow`] if the share or unlock time overflows
    pub fn top_up(&mut self, amount: Amount, now: Timestamp, lock_period: u64) -> Result<()> {
        let share = self
            .share
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        let unlock_time = now.checked_add(lock_period).ok_or(LedgerError::Overflow)?;

        self.share = share;
        self.unlock_time = unlock_time;
        Ok(())
    }
}

/// All delegation positions.
#[derive(Clone, Debug, Default)]
pub struct DelegationBook {
    entries: BTreeMap<(Address, Address), Delegation>,
}

impl DelegationBook {
    /// Create an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded position, if any.
    pub fn get(&self, delegator: &Address, provider: &Address) -> Option<&Delegation> {
        self.entries.get(&(*delegator, *provider))
    }

    /// Recorded position, or an empty default for an unknown pair.
    pub fn lookup(&self, delegator: &Address, provider: &Address) -> Delegation {
        self.get(delegator, provider).cloned().unwrap_or_default()
    }

    /// Copy of the position for staged mutation, opening a fresh one if the
    /// pair has never delegated.
    pub fn checkout_or_open(&self, delegator: &Address, provider: &Address) -> Delegation {
        self.get(delegator, provider)
            .cloned()
            .unwrap_or_else(|| Delegation::open(*provider))
    }

    /// Write back a staged position.
    pub(crate) fn commit(&mut self, delegator: Address, delegation: Delegation) {
        self.entries
            .insert((delegator, delegation.provider), delegation);
    }

    /// Positions held with `provider`.
    pub fn by_provider<'a>(
        &'a self,
        provider: &'a Address,
    ) -> impl Iterator<Item = (&'a Address, &'a Delegation)> + 'a {
        self.entries
            .iter()
            .filter(move |((_, p), _)| p == provider)
            .map(|((delegator, _), delegation)| (delegator, delegation))
    }

    /// Every recorded position as `(delegator, delegation)`.
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &Delegation)> {
        self.entries
            .iter()
            .map(|((delegator, _), delegation)| (delegator, delegation))
    }

    /// Number of recorded positions, including retired ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no position was ever recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
