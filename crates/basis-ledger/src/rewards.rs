//! Reward accrual engine.
//!
//! Each provider emits `reward_rate` base units per second until
//! `period_finish`. Emission is shared among the provider's delegators in
//! proportion to their share of `power`, tracked with a cumulative
//! reward-per-share accumulator:
//!
//! ```text
//! rps    = stored + (min(now, period_finish) - last_update) * rate * 1e18 / power
//! earned = share * (rps - paid) / 1e18 + rewards
//! ```
//!
//! The accumulator is a 256-bit [`U256`]: a provider with tiny power can
//! push it past `u128` while every `earned` value still fits. Divisions
//! truncate toward zero. A position must be settled (its
//! `rewards` and `reward_per_share_paid` brought up to date) before its
//! share changes, or reward earned under the old share is lost or counted
//! twice.

use basis_types::{Amount, Timestamp, SCALE};

use crate::delegation::Delegation;
use crate::math::{mul_div_wide, U256};
use crate::registry::Provider;
use crate::{LedgerError, Result};

/// Latest time at which the provider's current rate still applies.
pub fn last_time_reward_applicable(provider: &Provider, now: Timestamp) -> Timestamp {
    now.min(provider.period_finish)
}

/// Current value of the provider's reward-per-share accumulator.
///
/// With zero power nothing accrues and the stored value is returned as is.
///
/// # Errors
///
/// - [`LedgerError::Overflow`] if the accumulator leaves 256-bit range
pub fn reward_per_share(provider: &Provider, now: Timestamp) -> Result<U256> {
    if provider.power == 0 {
        return Ok(provider.reward_per_share_stored);
    }

    let elapsed = last_time_reward_applicable(provider, now).saturating_sub(provider.last_update_time);
    let emitted = provider
        .reward_rate
        .checked_mul(u128::from(elapsed))
        .ok_or(LedgerError::Overflow)?;
    let increment = mul_div_wide(emitted, SCALE, provider.power).ok_or(LedgerError::Overflow)?;

    provider
        .reward_per_share_stored
        .checked_add(increment)
        .ok_or(LedgerError::Overflow)
}

/// Rewards the position could withdraw at `now`, before commission.
///
/// # Errors
///
/// - [`LedgerError::Overflow`] on arithmetic overflow
pub fn earned(provider: &Provider, delegation: &Delegation, now: Timestamp) -> Result<Amount> {
    let rps = reward_per_share(provider, now)?;
    earned_at(rps, delegation)
}

fn earned_at(rps: U256, delegation: &Delegation) -> Result<Amount> {
    let accrued = rps
        .checked_sub(delegation.reward_per_share_paid)
        .and_then(|delta| delta.checked_mul_u128(delegation.share))
        .and_then(|scaled| scaled.checked_div_u128(SCALE))
        .and_then(U256::to_u128)
        .ok_or(LedgerError::Overflow)?;

    accrued
        .checked_add(delegation.rewards)
        .ok_or(LedgerError::Overflow)
}

/// Checkpoint the provider's accumulator and, if given, one position.
///
/// Passing `None` updates only the provider (used before a reward
/// injection). Settling twice at the same `now` with no share change in
/// between is a no-op the second time.
///
/// # Errors
///
/// - [`LedgerError::Overflow`] on arithmetic overflow; nothing is written
pub fn settle(
    provider: &mut Provider,
    delegation: Option<&mut Delegation>,
    now: Timestamp,
) -> Result<()> {
    let rps = reward_per_share(provider, now)?;
    let checkpoint = last_time_reward_applicable(provider, now);

    let settled = match delegation.as_deref() {
        Some(d) => Some(earned_at(rps, d)?),
        None => None,
    };

    provider.reward_per_share_stored = rps;
    provider.last_update_time = checkpoint;
    if let (Some(d), Some(rewards)) = (delegation, settled) {
        d.rewards = rewards;
        d.reward_per_share_paid = rps;
    }

    tracing::trace!(
        provider = %provider.address,
        %rps,
        last_update_time = checkpoint,
        "reward accumulator settled"
    );

    Ok(())
}

/// Start a new emission period of `duration` seconds carrying `amount`.
///
/// The provider must already be settled at `now`. If the previous period is
/// still running, its undistributed remainder rolls into the new rate.
///
/// # Errors
///
/// - [`LedgerError::InvalidInput`] if `duration` is zero
/// - [`LedgerError::Overflow`] on arithmetic overflow; nothing is written
pub fn schedule(
    provider: &mut Provider,
    amount: Amount,
    now: Timestamp,
    duration: u64,
) -> Result<()> {
    if duration == 0 {
        return Err(LedgerError::InvalidInput(
            "reward duration must be non-zero".to_string(),
        ));
    }

    let total = if now >= provider.period_finish {
        amount
    } else {
        let remaining = u128::from(provider.period_finish - now);
        let leftover = remaining
            .checked_mul(provider.reward_rate)
            .ok_or(LedgerError::Overflow)?;
        amount.checked_add(leftover).ok_or(LedgerError::Overflow)?
    };
    let period_finish = now.checked_add(duration).ok_or(LedgerError::Overflow)?;
    let reward_rate = total / u128::from(duration);

    provider.reward_rate = reward_rate;
    provider.last_update_time = now;
    provider.period_finish = period_finish;
    provider.reward_duration = duration;

    tracing::debug!(
        provider = %provider.address,
        amount,
        rolled_over = total - amount,
        reward_rate,
        period_finish,
        "reward period scheduled"
    );

    Ok(())
}

/// Total emission of the provider's current period at its current rate.
///
/// # Errors
///
/// - [`LedgerError::Overflow`] on arithmetic overflow
pub fn reward_for_duration(provider: &Provider) -> Result<Amount> {
    provider
        .reward_rate
        .checked_mul(u128::from(provider.reward_duration))
        .ok_or(LedgerError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use basis_types::Address;

    const DAY: u64 = 24 * 60 * 60;
    const PERIOD: u64 = 21 * DAY;
    const TOKEN: u128 = 1_000_000_000_000_000_000;
    const T0: Timestamp = 1_700_000_000;

    fn provider_with_power(power: Amount) -> Provider {
        Provider {
            address: Address::repeat(0x11),
            power,
            ..Provider::default()
        }
    }

    fn position(share: Amount) -> Delegation {
        Delegation {
            provider: Address::repeat(0x11),
            share,
            ..Delegation::default()
        }
    }

    #[test]
    fn test_last_time_reward_applicable() {
        let mut provider = provider_with_power(1);
        provider.period_finish = T0 + 100;
        assert_eq!(last_time_reward_applicable(&provider, T0), T0);
        assert_eq!(last_time_reward_applicable(&provider, T0 + 500), T0 + 100);
    }

    #[test]
    fn test_zero_power_returns_stored() {
        let mut provider = provider_with_power(0);
        provider.reward_per_share_stored = U256::from(77u128);
        provider.reward_rate = 1_000;
        provider.period_finish = T0 + PERIOD;
        provider.last_update_time = T0;
        assert_eq!(
            reward_per_share(&provider, T0 + DAY).expect("rps"),
            U256::from(77u128)
        );
    }

    #[test]
    fn test_unit_power_accumulator_exceeds_u128() {
        let mut provider = provider_with_power(1);
        let mut delegation = position(1);
        schedule(&mut provider, 1_000 * TOKEN, T0, PERIOD).expect("schedule");

        let end = T0 + PERIOD + 1;
        let rps = reward_per_share(&provider, end).expect("rps");
        assert!(rps > U256::from(u128::MAX));

        let owed = earned(&provider, &delegation, end).expect("earned");
        assert!(owed <= 1_000 * TOKEN);
        assert!(1_000 * TOKEN - owed < u128::from(PERIOD));

        settle(&mut provider, Some(&mut delegation), end).expect("settle");
        assert_eq!(delegation.rewards, owed);
        assert_eq!(provider.reward_per_share_stored, rps);
        assert_eq!(earned(&provider, &delegation, end).expect("after"), owed);
    }

    #[test]
    fn test_schedule_fresh_period() {
        let mut provider = provider_with_power(1_000 * TOKEN);
        schedule(&mut provider, 100 * TOKEN, T0, PERIOD).expect("schedule");

        assert_eq!(provider.reward_rate, 100 * TOKEN / u128::from(PERIOD));
        assert_eq!(provider.period_finish, T0 + PERIOD);
        assert_eq!(provider.last_update_time, T0);
        assert_eq!(provider.reward_duration, PERIOD);
    }

    #[test]
    fn test_half_period_accrual() {
        let mut provider = provider_with_power(1_000 * TOKEN);
        let delegation = position(1_000 * TOKEN);
        schedule(&mut provider, 100 * TOKEN, T0, PERIOD).expect("schedule");

        let half = earned(&provider, &delegation, T0 + PERIOD / 2).expect("earned");
        assert!(half.abs_diff(50 * TOKEN) < TOKEN, "earned {half}");
        assert!(half <= 50 * TOKEN);
    }

    #[test]
    fn test_accrual_stops_at_period_finish() {
        let mut provider = provider_with_power(1_000 * TOKEN);
        let delegation = position(1_000 * TOKEN);
        schedule(&mut provider, 100 * TOKEN, T0, PERIOD).expect("schedule");

        let at_end = earned(&provider, &delegation, T0 + PERIOD).expect("end");
        let later = earned(&provider, &delegation, T0 + 3 * PERIOD).expect("later");
        assert_eq!(at_end, later);
        assert!(at_end.abs_diff(100 * TOKEN) < TOKEN);
    }

    #[test]
    fn test_settle_is_idempotent() {
        let mut provider = provider_with_power(1_000 * TOKEN);
        let mut delegation = position(1_000 * TOKEN);
        schedule(&mut provider, 100 * TOKEN, T0, PERIOD).expect("schedule");

        let now = T0 + 3 * DAY;
        settle(&mut provider, Some(&mut delegation), now).expect("first");
        let after_first = (delegation.clone(), provider.clone());
        settle(&mut provider, Some(&mut delegation), now).expect("second");

        assert_eq!(delegation, after_first.0);
        assert_eq!(provider, after_first.1);
    }

    #[test]
    fn test_settle_preserves_earned() {
        let mut provider = provider_with_power(1_000 * TOKEN);
        let mut delegation = position(1_000 * TOKEN);
        schedule(&mut provider, 100 * TOKEN, T0, PERIOD).expect("schedule");

        let now = T0 + 5 * DAY;
        let before = earned(&provider, &delegation, now).expect("before");
        settle(&mut provider, Some(&mut delegation), now).expect("settle");

        assert_eq!(delegation.rewards, before);
        assert_eq!(delegation.reward_per_share_paid, provider.reward_per_share_stored);
        assert_eq!(earned(&provider, &delegation, now).expect("after"), before);
    }

    #[test]
    fn test_provider_only_settle_leaves_positions() {
        let mut provider = provider_with_power(1_000 * TOKEN);
        let delegation = position(1_000 * TOKEN);
        schedule(&mut provider, 100 * TOKEN, T0, PERIOD).expect("schedule");

        let now = T0 + 2 * DAY;
        let before = earned(&provider, &delegation, now).expect("before");
        settle(&mut provider, None, now).expect("settle provider");
        assert_eq!(provider.last_update_time, now);
        assert_eq!(earned(&provider, &delegation, now).expect("after"), before);
    }

    #[test]
    fn test_rollover_increases_rate() {
        let mut provider = provider_with_power(1_000 * TOKEN);
        schedule(&mut provider, 100 * TOKEN, T0, PERIOD).expect("first");
        let first_rate = provider.reward_rate;

        let mid = T0 + PERIOD / 2;
        settle(&mut provider, None, mid).expect("settle");
        schedule(&mut provider, 100 * TOKEN, mid, PERIOD).expect("second");

        let naive = 100 * TOKEN / u128::from(PERIOD);
        assert!(provider.reward_rate > naive);
        assert!(provider.reward_rate > first_rate);
        assert_eq!(provider.period_finish, mid + PERIOD);
    }

    #[test]
    fn test_schedule_after_finish_drops_leftover() {
        let mut provider = provider_with_power(1);
        schedule(&mut provider, 100 * TOKEN, T0, PERIOD).expect("first");
        schedule(&mut provider, 10 * TOKEN, T0 + PERIOD, PERIOD).expect("second");
        assert_eq!(provider.reward_rate, 10 * TOKEN / u128::from(PERIOD));
    }

    #[test]
    fn test_schedule_zero_duration_rejected() {
        let mut provider = provider_with_power(1);
        assert!(matches!(
            schedule(&mut provider, 1, T0, 0),
            Err(LedgerError::InvalidInput(_))
        ));
        assert_eq!(provider.reward_rate, 0);
    }

    #[test]
    fn test_reward_for_duration() {
        let mut provider = provider_with_power(1);
        schedule(&mut provider, 100 * TOKEN, T0, PERIOD).expect("schedule");
        let total = reward_for_duration(&provider).expect("duration");
        assert!(total <= 100 * TOKEN);
        assert!(100 * TOKEN - total < u128::from(PERIOD));
    }

    #[test]
    fn test_equal_shares_split_evenly() {
        let mut provider = provider_with_power(2_000 * TOKEN);
        let a = position(1_000 * TOKEN);
        let b = position(1_000 * TOKEN);
        schedule(&mut provider, 100 * TOKEN, T0, PERIOD).expect("schedule");

        let end = T0 + PERIOD;
        let ea = earned(&provider, &a, end).expect("a");
        let eb = earned(&provider, &b, end).expect("b");
        assert_eq!(ea, eb);
        assert!((ea + eb).abs_diff(100 * TOKEN) < TOKEN / 10);
    }
}
