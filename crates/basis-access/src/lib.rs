//! # basis-access
//!
//! Single-holder capability roles consumed by the staking ledger.
//!
//! The ledger only ever asks two questions, "is this caller the operator?"
//! and "is this caller the governor?", through the [`Capabilities`] trait.
//! [`AccessControl`] is the stock implementation: two [`Role`]s, each held
//! by exactly one address and transferable only by its current holder.
//!
//! ## Modules
//!
//! - [`role`] — Single-holder role with guarded transfer

pub mod role;

use basis_types::Address;

pub use role::{Role, RoleTransfer};

/// Error types for role operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    /// Caller does not hold the role.
    #[error("{caller} is not the {role}")]
    Unauthorized {
        /// Role name.
        role: &'static str,
        /// The rejected caller.
        caller: Address,
    },

    /// A role cannot be handed to the zero address.
    #[error("zero address given for new {0}")]
    ZeroAddress(&'static str),
}

/// Convenience result type for role operations.
pub type Result<T> = std::result::Result<T, AccessError>;

/// Capability checks the ledger depends on.
pub trait Capabilities {
    /// Whether `caller` may inject rewards.
    fn is_operator(&self, caller: &Address) -> bool;

    /// Whether `caller` may change ledger parameters.
    fn is_governor(&self, caller: &Address) -> bool;
}

/// Operator and governor roles.
#[derive(Clone, Debug)]
pub struct AccessControl {
    /// Reward-injection role.
    pub operator: Role,
    /// Parameter-change role.
    pub governor: Role,
}

impl AccessControl {
    /// Both roles start with the deployer.
    pub fn new(deployer: Address) -> Self {
        Self {
            operator: Role::new("operator", deployer),
            governor: Role::new("governor", deployer),
        }
    }

    /// Current operator.
    pub fn operator(&self) -> Address {
        self.operator.holder()
    }

    /// Current governor.
    pub fn governor(&self) -> Address {
        self.governor.holder()
    }

    /// Hand the operator role to `new_operator`.
    ///
    /// # Errors
    ///
    /// - [`AccessError::Unauthorized`] if `caller` is not the operator
    /// - [`AccessError::ZeroAddress`] if `new_operator` is zero
    pub fn transfer_operator(
        &mut self,
        caller: &Address,
        new_operator: Address,
    ) -> Result<RoleTransfer> {
        self.operator.transfer(caller, new_operator)
    }

    /// Hand the governor role to `new_governor`.
    ///
    /// # Errors
    ///
    /// - [`AccessError::Unauthorized`] if `caller` is not the governor
    /// - [`AccessError::ZeroAddress`] if `new_governor` is zero
    pub fn transfer_governor(
        &mut self,
        caller: &Address,
        new_governor: Address,
    ) -> Result<RoleTransfer> {
        self.governor.transfer(caller, new_governor)
    }
}

impl Capabilities for AccessControl {
    fn is_operator(&self, caller: &Address) -> bool {
        self.operator.is_holder(caller)
    }

    fn is_governor(&self, caller: &Address) -> bool {
        self.governor.is_holder(caller)
    }
}
