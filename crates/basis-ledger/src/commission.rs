//! Commission split on reward withdrawal.
//!
//! Commission is taken when a delegator withdraws, using the provider's
//! commission at that moment. The provider's cut truncates toward zero and
//! the delegator receives the remainder, so the two always sum to the
//! withdrawn amount.

use basis_types::Amount;
use serde::{Deserialize, Serialize};

use crate::math::mul_div;
use crate::{LedgerError, Result};

/// Result of splitting a withdrawal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionSplit {
    /// Paid to the delegator.
    pub net: Amount,
    /// Credited to the provider.
    pub commission: Amount,
}

/// Split `amount` at `commission_percent`.
///
/// # Errors
///
/// - [`LedgerError::InvalidInput`] if `commission_percent` exceeds 100
pub fn split(amount: Amount, commission_percent: u8) -> Result<CommissionSplit> {
    if commission_percent > basis_types::MAX_COMMISSION_PERCENT {
        return Err(LedgerError::InvalidInput(format!(
            "commission {commission_percent} exceeds 100"
        )));
    }

    let commission =
        mul_div(amount, u128::from(commission_percent), 100).ok_or(LedgerError::Overflow)?;

    Ok(CommissionSplit {
        net: amount - commission,
        commission,
    })
}
