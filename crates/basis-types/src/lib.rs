//! # basis-types
//!
//! Shared domain types used across the Basis staking workspace.

pub mod address;
pub mod events;

pub use address::{Address, AddressError};
pub use events::LedgerEvent;

/// Asset base units.
pub type Amount = u128;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Fixed-point scale of the reward-per-share accumulator (1e18).
pub const SCALE: u128 = 1_000_000_000_000_000_000;

/// Maximum provider description length, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 50;

/// Upper bound (inclusive) of a provider's commission.
pub const MAX_COMMISSION_PERCENT: u8 = 100;

/// Default lock period in seconds (21 days).
pub const DEFAULT_LOCK_PERIOD_SECS: u64 = 21 * 24 * 60 * 60;

/// Default registry capacity.
pub const DEFAULT_MAX_PROVIDERS: u32 = 50;
