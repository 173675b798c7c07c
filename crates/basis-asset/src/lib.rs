//! # basis-asset
//!
//! Fungible value transfer consumed by the staking ledger.
//!
//! The ledger moves principal and rewards exclusively through the [`Asset`]
//! trait and never inspects an implementation's internals. Each call is
//! atomic: it either succeeds completely or returns an error having changed
//! nothing.
//!
//! ## Modules
//!
//! - [`memory`] — In-memory asset with balances and allowances

pub mod memory;

use basis_types::{Address, Amount};

pub use memory::MemoryAsset;

/// Error types for asset operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetError {
    /// Spender's allowance is below the requested amount.
    #[error("approved amount is not sufficient: required {required}, approved {approved}")]
    InsufficientApproval {
        /// Amount requested.
        required: Amount,
        /// Allowance available.
        approved: Amount,
    },

    /// Holder's balance is below the requested amount.
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        /// Amount requested.
        required: Amount,
        /// Balance available.
        available: Amount,
    },

    /// Balance or supply would overflow.
    #[error("arithmetic overflow in asset balance")]
    Overflow,
}

/// Convenience result type for asset operations.
pub type Result<T> = std::result::Result<T, AssetError>;

/// A fungible asset.
pub trait Asset {
    /// Amount `spender` may move out of `owner`'s balance.
    fn allowance(&self, owner: &Address, spender: &Address) -> Amount;

    /// Balance held by `holder`.
    fn balance_of(&self, holder: &Address) -> Amount;

    /// Move `amount` from `owner` to `recipient`, spending `spender`'s allowance.
    ///
    /// # Errors
    ///
    /// - [`AssetError::InsufficientApproval`] if the allowance is too small
    /// - [`AssetError::InsufficientBalance`] if `owner` cannot cover `amount`
    fn transfer_from(
        &mut self,
        spender: &Address,
        owner: &Address,
        recipient: &Address,
        amount: Amount,
    ) -> Result<()>;

    /// Move `amount` from `from` to `to`.
    ///
    /// # Errors
    ///
    /// - [`AssetError::InsufficientBalance`] if `from` cannot cover `amount`
    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<()>;
}
