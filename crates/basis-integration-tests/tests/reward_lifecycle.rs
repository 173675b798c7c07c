//! Integration test: single delegator reward lifecycle.
//!
//! Exercises the complete path of one reward period:
//! 1. Register a provider at 10% commission
//! 2. Delegate 1000 tokens
//! 3. Inject 100 tokens of reward over the 21-day period
//! 4. Check accrual halfway through
//! 5. Withdraw at period end and check the 90/10 split
//! 6. Withdraw the provider's commission
//! 7. Check the event journal

mod common;

use basis_asset::Asset;
use basis_ledger::LedgerError;
use basis_types::LedgerEvent;
use common::*;

#[test]
fn reward_accrues_linearly_over_period() {
    let mut ledger = new_ledger();
    register_provider(&mut ledger, 10);
    delegate(&mut ledger, ALICE, 1_000 * TOKEN, BASE_TIME);
    inject_reward(&mut ledger, 100 * TOKEN, BASE_TIME);

    let half = BASE_TIME + LOCK / 2;
    let earned = ledger.earned(&ALICE, &PROVIDER, half).expect("earned");
    assert_close(earned, 50 * TOKEN, "earned at 10.5 days");

    let quarter = ledger
        .earned(&ALICE, &PROVIDER, BASE_TIME + LOCK / 4)
        .expect("earned");
    assert_close(quarter, 25 * TOKEN, "earned at 5.25 days");

    // Nothing accrues past the end of the period.
    let end = ledger
        .earned(&ALICE, &PROVIDER, BASE_TIME + LOCK)
        .expect("earned");
    let later = ledger
        .earned(&ALICE, &PROVIDER, BASE_TIME + 3 * LOCK)
        .expect("earned");
    assert_eq!(end, later);
    assert!(end <= 100 * TOKEN);
    assert_close(end, 100 * TOKEN, "earned at period end");
}

#[test]
fn withdrawal_splits_commission() {
    let mut ledger = new_ledger();
    register_provider(&mut ledger, 10);
    delegate(&mut ledger, ALICE, 1_000 * TOKEN, BASE_TIME);
    inject_reward(&mut ledger, 100 * TOKEN, BASE_TIME);

    let end = BASE_TIME + LOCK;
    let earned = ledger.earned(&ALICE, &PROVIDER, end).expect("earned");
    let before = ledger.asset().balance_of(&ALICE);

    let net = ledger
        .withdraw_delegator_reward(&at(ALICE, end), PROVIDER)
        .expect("withdraw");

    assert_close(net, 90 * TOKEN, "delegator net");
    assert_eq!(ledger.asset().balance_of(&ALICE), before + net);

    let commission = ledger.get_provider(&PROVIDER).commission_rewards;
    assert_close(commission, 10 * TOKEN, "provider commission");
    assert_eq!(net + commission, earned);

    // A second withdrawal in the same second pays nothing more.
    let again = ledger
        .withdraw_delegator_reward(&at(ALICE, end), PROVIDER)
        .expect("second withdraw");
    assert_eq!(again, 0);
}

#[test]
fn provider_collects_commission_once() {
    let mut ledger = new_ledger();
    register_provider(&mut ledger, 10);
    delegate(&mut ledger, ALICE, 1_000 * TOKEN, BASE_TIME);
    inject_reward(&mut ledger, 100 * TOKEN, BASE_TIME);

    let end = BASE_TIME + LOCK;
    ledger
        .withdraw_delegator_reward(&at(ALICE, end), PROVIDER)
        .expect("withdraw");

    let owed = ledger.get_provider(&PROVIDER).commission_rewards;
    let paid = ledger
        .withdraw_provider_commission(&at(PROVIDER, end))
        .expect("commission");
    assert_eq!(paid, owed);
    assert_eq!(ledger.asset().balance_of(&PROVIDER), owed);

    assert_eq!(
        ledger.withdraw_provider_commission(&at(PROVIDER, end)),
        Err(LedgerError::NothingToWithdraw)
    );
}

#[test]
fn commission_rate_at_withdrawal_applies() {
    let mut ledger = new_ledger();
    register_provider(&mut ledger, 10);
    delegate(&mut ledger, ALICE, 1_000 * TOKEN, BASE_TIME);
    inject_reward(&mut ledger, 100 * TOKEN, BASE_TIME);

    let end = BASE_TIME + LOCK;
    ledger
        .edit_provider(&at(PROVIDER, end), "Provider One", 50)
        .expect("edit");
    let earned = ledger.earned(&ALICE, &PROVIDER, end).expect("earned");

    let net = ledger
        .withdraw_delegator_reward(&at(ALICE, end), PROVIDER)
        .expect("withdraw");
    assert_eq!(net, earned - earned / 2);
}

#[test]
fn custody_balances_after_full_lifecycle() {
    let mut ledger = new_ledger();
    register_provider(&mut ledger, 10);
    delegate(&mut ledger, ALICE, 1_000 * TOKEN, BASE_TIME);
    inject_reward(&mut ledger, 100 * TOKEN, BASE_TIME);

    let end = BASE_TIME + LOCK;
    let principal = ledger
        .undelegate(&at(ALICE, end), PROVIDER)
        .expect("undelegate");
    assert_eq!(principal, 1_000 * TOKEN);
    assert_eq!(ledger.total_share(), 0);

    let net = ledger
        .withdraw_delegator_reward(&at(ALICE, end), PROVIDER)
        .expect("withdraw after undelegate");
    let commission = ledger
        .withdraw_provider_commission(&at(PROVIDER, end))
        .expect("commission");

    // Only the truncation dust of the reward stays in custody.
    let dust = ledger.asset().balance_of(&CUSTODY);
    assert_eq!(dust + net + commission, 100 * TOKEN);
    assert!(dust <= TOLERANCE);
}

#[test]
fn event_journal_records_lifecycle() {
    let mut ledger = new_ledger();
    register_provider(&mut ledger, 10);
    delegate(&mut ledger, ALICE, 1_000 * TOKEN, BASE_TIME);
    inject_reward(&mut ledger, 100 * TOKEN, BASE_TIME);
    let end = BASE_TIME + LOCK;
    let net = ledger
        .withdraw_delegator_reward(&at(ALICE, end), PROVIDER)
        .expect("withdraw");

    let events = ledger.take_events();
    let names: Vec<&str> = events.iter().map(LedgerEvent::name).collect();
    assert_eq!(
        names,
        [
            "provider_created",
            "delegated",
            "reward_added",
            "delegator_reward_withdrawn"
        ]
    );
    assert_eq!(
        events[3],
        LedgerEvent::DelegatorRewardWithdrawn {
            delegator: ALICE,
            provider: PROVIDER,
            amount: net,
        }
    );

    let json = serde_json::to_value(&events[1]).expect("serialize");
    assert_eq!(json["event_type"], "delegated");
    assert_eq!(json["amount"], (1_000 * TOKEN).to_string());
    assert_eq!(json["delegator"], ALICE.to_string());
}
