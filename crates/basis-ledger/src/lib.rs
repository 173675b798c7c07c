//! # basis-ledger
//!
//! Delegated staking ledger with continuous per-provider reward accrual.
//!
//! Providers register to receive delegated capital. Delegators lock capital
//! with a provider for a lock period. Rewards injected for a provider are
//! emitted linearly over the reward period and accrue to that provider's
//! delegators pro rata, net of the provider's commission.
//!
//! Accrual uses a cumulative reward-per-share accumulator scaled by
//! [`SCALE`](basis_types::SCALE). Every operation that changes a delegator's
//! share or pays out rewards first settles that delegator against the
//! accumulator, so settlement is O(1) regardless of the number of delegators.
//!
//! ## Modules
//!
//! - [`registry`] — Provider records and registration
//! - [`delegation`] — Delegation positions and lock enforcement
//! - [`rewards`] — Reward-per-share accumulator and settlement
//! - [`commission`] — Commission split on reward withdrawal
//! - [`params`] — Governance-controlled parameters
//! - [`math`] — Wide fixed-point multiply-divide
//! - [`ledger`] — The [`StakingLedger`] state machine

pub mod commission;
pub mod delegation;
pub mod ledger;
pub mod math;
pub mod params;
pub mod registry;
pub mod rewards;

use basis_access::AccessError;
use basis_asset::AssetError;
use basis_types::{Address, Amount, Timestamp};

pub use delegation::Delegation;
pub use math::U256;
pub use ledger::{CallContext, StakingLedger};
pub use params::LedgerParams;
pub use registry::Provider;

/// Error types for ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Malformed argument.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Address is not a registered provider.
    #[error("provider not registered: {0}")]
    NotRegistered(Address),

    /// Caller already registered as a provider.
    #[error("provider already exists: {0}")]
    AlreadyExists(Address),

    /// Registry is at capacity.
    #[error("provider registry full: maximum {max}")]
    RegistryFull {
        /// Configured capacity.
        max: u32,
    },

    /// Asset allowance toward the ledger is too small.
    #[error("approved amount is not sufficient: required {required}, approved {approved}")]
    InsufficientApproval {
        /// Amount requested.
        required: Amount,
        /// Allowance available.
        approved: Amount,
    },

    /// Asset balance is too small.
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        /// Amount requested.
        required: Amount,
        /// Balance available.
        available: Amount,
    },

    /// Principal is still locked.
    #[error("delegation locked until {unlock_time}, current time {now}")]
    Locked {
        /// When the principal unlocks.
        unlock_time: Timestamp,
        /// The current time.
        now: Timestamp,
    },

    /// No delegation for this (delegator, provider) pair.
    #[error("no delegation from {delegator} to {provider}")]
    NoDelegation {
        /// Delegator address.
        delegator: Address,
        /// Provider address.
        provider: Address,
    },

    /// Nothing accrued to withdraw.
    #[error("nothing to withdraw")]
    NothingToWithdraw,

    /// Caller lacks the required capability.
    #[error("{caller} is not the {role}")]
    Unauthorized {
        /// Required role.
        role: &'static str,
        /// The rejected caller.
        caller: Address,
    },

    /// Fixed-point arithmetic left the representable range.
    #[error("arithmetic overflow in ledger calculation")]
    Overflow,
}

impl From<AssetError> for LedgerError {
    fn from(err: AssetError) -> Self {
        match err {
            AssetError::InsufficientApproval { required, approved } => {
                Self::InsufficientApproval { required, approved }
            }
            AssetError::InsufficientBalance {
                required,
                available,
            } => Self::InsufficientBalance {
                required,
                available,
            },
            AssetError::Overflow => Self::Overflow,
        }
    }
}

impl From<AccessError> for LedgerError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Unauthorized { role, caller } => Self::Unauthorized { role, caller },
            AccessError::ZeroAddress(role) => {
                Self::InvalidInput(format!("zero address given for new {role}"))
            }
        }
    }
}

/// Convenience result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
