//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use basis_access::AccessControl;
use basis_asset::{Asset, MemoryAsset};
use basis_ledger::{CallContext, LedgerParams, StakingLedger};
use basis_types::{Address, Amount, Timestamp};

/// One whole token at 18 decimals.
pub const TOKEN: Amount = 1_000_000_000_000_000_000;

/// Base timestamp for test scenarios.
pub const BASE_TIME: Timestamp = 1_700_000_000;

pub const DAY: u64 = 24 * 60 * 60;

/// Default lock period, also the reward emission period.
pub const LOCK: u64 = 21 * DAY;

/// Accrual truncates at every step; a millionth of a token covers it.
pub const TOLERANCE: Amount = TOKEN / 1_000_000;

pub const DEPLOYER: Address = Address::repeat(0x01);
pub const CUSTODY: Address = Address::repeat(0xcc);
pub const ASSET: Address = Address::repeat(0xba);
pub const PROVIDER: Address = Address::repeat(0x11);
pub const ALICE: Address = Address::repeat(0xa1);
pub const BOB: Address = Address::repeat(0xb0);

pub type Ledger = StakingLedger<MemoryAsset>;

/// Ledger with default params, `DEPLOYER` holding both roles, and 10 000
/// tokens each for `DEPLOYER`, `ALICE` and `BOB`.
pub fn new_ledger() -> Ledger {
    let mut asset = MemoryAsset::new();
    for who in [DEPLOYER, ALICE, BOB] {
        asset.mint(&who, 10_000 * TOKEN).expect("mint");
    }
    StakingLedger::new(
        LedgerParams::default(),
        CUSTODY,
        ASSET,
        asset,
        AccessControl::new(DEPLOYER),
    )
    .expect("ledger")
}

pub fn at(caller: Address, now: Timestamp) -> CallContext {
    CallContext::new(caller, now)
}

/// Register `PROVIDER` with `commission` percent.
pub fn register_provider(ledger: &mut Ledger, commission: u8) {
    ledger
        .create_provider(&at(PROVIDER, BASE_TIME), "Provider One", commission)
        .expect("create provider");
}

/// Approve custody and delegate `amount` from `who` to `PROVIDER`.
pub fn delegate(ledger: &mut Ledger, who: Address, amount: Amount, now: Timestamp) {
    ledger.asset_mut().approve(&who, &CUSTODY, amount);
    ledger
        .delegate(&at(who, now), PROVIDER, amount)
        .expect("delegate");
}

/// Fund custody from the deployer and start a reward period for `PROVIDER`.
pub fn inject_reward(ledger: &mut Ledger, amount: Amount, now: Timestamp) {
    ledger
        .asset_mut()
        .transfer(&DEPLOYER, &CUSTODY, amount)
        .expect("fund custody");
    ledger
        .notify_reward_amount(&at(DEPLOYER, now), PROVIDER, amount)
        .expect("notify reward");
}

pub fn assert_close(actual: Amount, expected: Amount, what: &str) {
    assert!(
        actual.abs_diff(expected) <= TOLERANCE,
        "{what}: {actual} not within {TOLERANCE} of {expected}"
    );
}
