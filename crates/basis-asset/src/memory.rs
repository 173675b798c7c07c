//! In-memory asset.
//!
//! Balances and allowances live in ordered maps. Used by the node and by
//! tests; a production host plugs in its own [`Asset`] implementation.

use std::collections::BTreeMap;

use basis_types::{Address, Amount};

use crate::{Asset, AssetError, Result};

/// A fungible asset held entirely in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryAsset {
    balances: BTreeMap<Address, Amount>,
    allowances: BTreeMap<(Address, Address), Amount>,
    total_supply: Amount,
}

impl MemoryAsset {
    /// Create an empty asset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` of new supply to `to`.
    ///
    /// # Errors
    ///
    /// - [`AssetError::Overflow`] if the supply or the balance would overflow
    pub fn mint(&mut self, to: &Address, amount: Amount) -> Result<()> {
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(AssetError::Overflow)?;
        let balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(AssetError::Overflow)?;

        self.total_supply = supply;
        self.balances.insert(*to, balance);

        tracing::debug!(%to, amount, "asset minted");
        Ok(())
    }

    /// Set the allowance `spender` has over `owner`'s balance.
    pub fn approve(&mut self, owner: &Address, spender: &Address, amount: Amount) {
        if amount == 0 {
            self.allowances.remove(&(*owner, *spender));
        } else {
            self.allowances.insert((*owner, *spender), amount);
        }
    }

    /// Total minted supply.
    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Debit `from` and credit `to`. Checks everything before writing.
    fn move_balance(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<()> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(AssetError::InsufficientBalance {
                required: amount,
                available,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(AssetError::Overflow)?;

        self.balances.insert(*from, available - amount);
        self.balances.insert(*to, credited);
        Ok(())
    }
}

impl Asset for MemoryAsset {
    fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    fn balance_of(&self, holder: &Address) -> Amount {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    fn transfer_from(
        &mut self,
        spender: &Address,
        owner: &Address,
        recipient: &Address,
        amount: Amount,
    ) -> Result<()> {
        let approved = self.allowance(owner, spender);
        if approved < amount {
            return Err(AssetError::InsufficientApproval {
                required: amount,
                approved,
            });
        }

        self.move_balance(owner, recipient, amount)?;
        self.approve(owner, spender, approved - amount);

        tracing::trace!(%spender, %owner, %recipient, amount, "asset transfer_from");
        Ok(())
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<()> {
        self.move_balance(from, to, amount)?;
        tracing::trace!(%from, %to, amount, "asset transfer");
        Ok(())
    }
}
