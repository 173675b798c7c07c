//! Reward injection, accrual queries and withdrawal handlers.

use std::sync::Arc;

use serde_json::Value;

use super::{address, amount, amount_json, at, context};
use crate::rpc::RpcError;
use crate::NodeState;

type Result = std::result::Result<Value, RpcError>;

/// Start a reward period for `provider`. Operator only.
///
/// The reward funds are expected to be held by the custody address
/// already.
pub async fn notify_reward_amount(state: &Arc<NodeState>, params: &Value) -> Result {
    let ctx = context(params)?;
    let provider = address(params, "provider")?;
    let amount = amount(params, "amount")?;

    let mut ledger = state.ledger.lock().await;
    ledger.notify_reward_amount(&ctx, provider, amount)?;
    state.publish(ledger.take_events(), ctx.now);

    let record = ledger.get_provider(&provider);
    Ok(serde_json::json!({
        "provider": provider,
        "reward_rate": amount_json(record.reward_rate),
        "period_finish": record.period_finish,
    }))
}

/// Pay out the caller's rewards from `provider`, net of commission.
pub async fn withdraw_delegator_reward(state: &Arc<NodeState>, params: &Value) -> Result {
    let ctx = context(params)?;
    let provider = address(params, "provider")?;

    let mut ledger = state.ledger.lock().await;
    let net = ledger.withdraw_delegator_reward(&ctx, provider)?;
    state.publish(ledger.take_events(), ctx.now);

    Ok(serde_json::json!({
        "provider": provider,
        "amount": amount_json(net),
    }))
}

/// Pay out the caller's accumulated commission.
pub async fn withdraw_provider_commission(state: &Arc<NodeState>, params: &Value) -> Result {
    let ctx = context(params)?;

    let mut ledger = state.ledger.lock().await;
    let paid = ledger.withdraw_provider_commission(&ctx)?;
    state.publish(ledger.take_events(), ctx.now);

    Ok(serde_json::json!({ "amount": amount_json(paid) }))
}

/// Rewards `delegator` could withdraw from `provider`, before commission.
pub async fn earned(state: &Arc<NodeState>, params: &Value) -> Result {
    let delegator = address(params, "delegator")?;
    let provider = address(params, "provider")?;
    let now = at(params)?;

    let ledger = state.ledger.lock().await;
    let earned = ledger.earned(&delegator, &provider, now)?;
    Ok(serde_json::json!({ "earned": amount_json(earned), "at": now }))
}

/// Current reward-per-share accumulator of `provider`.
pub async fn reward_per_share(state: &Arc<NodeState>, params: &Value) -> Result {
    let provider = address(params, "provider")?;
    let now = at(params)?;

    let ledger = state.ledger.lock().await;
    let rps = ledger.reward_per_share(&provider, now)?;
    Ok(serde_json::json!({ "reward_per_share": rps, "at": now }))
}

/// `min(now, period_finish)` for `provider`.
pub async fn last_time_reward_applicable(state: &Arc<NodeState>, params: &Value) -> Result {
    let provider = address(params, "provider")?;
    let now = at(params)?;

    let ledger = state.ledger.lock().await;
    Ok(serde_json::json!({
        "last_time_reward_applicable": ledger.last_time_reward_applicable(&provider, now),
    }))
}

/// Expected emission of `provider`'s current period.
pub async fn get_reward_for_duration(state: &Arc<NodeState>, params: &Value) -> Result {
    let provider = address(params, "provider")?;

    let ledger = state.ledger.lock().await;
    let total = ledger.get_reward_for_duration(&provider)?;
    Ok(serde_json::json!({ "reward_for_duration": amount_json(total) }))
}
