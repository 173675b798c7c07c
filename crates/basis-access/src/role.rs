//! Single-holder role.

use basis_types::Address;
use serde::{Deserialize, Serialize};

use crate::{AccessError, Result};

/// Record of a completed role hand-off.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleTransfer {
    /// Holder before the transfer.
    pub previous: Address,
    /// Holder after the transfer.
    pub new: Address,
}

/// A role held by exactly one address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Role {
    name: &'static str,
    holder: Address,
}

impl Role {
    /// Create a role held by `holder`.
    pub fn new(name: &'static str, holder: Address) -> Self {
        Self { name, holder }
    }

    /// Role name, used in error messages.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Current holder.
    pub fn holder(&self) -> Address {
        self.holder
    }

    /// Whether `caller` holds the role.
    pub fn is_holder(&self, caller: &Address) -> bool {
        &self.holder == caller
    }

    /// Transfer the role.
    ///
    /// Only the current holder may transfer, and never to the zero address.
    ///
    /// # Errors
    ///
    /// - [`AccessError::Unauthorized`] if `caller` is not the holder
    /// - [`AccessError::ZeroAddress`] if `new_holder` is zero
    pub fn transfer(&mut self, caller: &Address, new_holder: Address) -> Result<RoleTransfer> {
        if !self.is_holder(caller) {
            return Err(AccessError::Unauthorized {
                role: self.name,
                caller: *caller,
            });
        }
        if new_holder.is_zero() {
            return Err(AccessError::ZeroAddress(self.name));
        }

        let previous = std::mem::replace(&mut self.holder, new_holder);

        tracing::info!(
            role = self.name,
            %previous,
            new = %new_holder,
            "role transferred"
        );

        Ok(RoleTransfer {
            previous,
            new: new_holder,
        })
    }
}
