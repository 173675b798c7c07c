//! Delegation command handlers.

use std::sync::Arc;

use basis_ledger::Delegation;
use serde_json::Value;

use super::{address, amount, amount_json, context};
use crate::rpc::RpcError;
use crate::NodeState;

type Result = std::result::Result<Value, RpcError>;

fn delegation_json(delegation: &Delegation) -> Value {
    serde_json::json!({
        "provider": delegation.provider,
        "share": amount_json(delegation.share),
        "unlock_time": delegation.unlock_time,
        "reward_per_share_paid": delegation.reward_per_share_paid,
        "rewards": amount_json(delegation.rewards),
    })
}

/// Delegate `amount` to `provider`. The caller must have approved the
/// custody address beforehand.
pub async fn delegate(state: &Arc<NodeState>, params: &Value) -> Result {
    let ctx = context(params)?;
    let provider = address(params, "provider")?;
    let amount = amount(params, "amount")?;

    let mut ledger = state.ledger.lock().await;
    ledger.delegate(&ctx, provider, amount)?;
    state.publish(ledger.take_events(), ctx.now);

    Ok(delegation_json(&ledger.get_delegation(&ctx.caller, &provider)))
}

/// Withdraw the caller's whole share from `provider`.
pub async fn undelegate(state: &Arc<NodeState>, params: &Value) -> Result {
    let ctx = context(params)?;
    let provider = address(params, "provider")?;

    let mut ledger = state.ledger.lock().await;
    let returned = ledger.undelegate(&ctx, provider)?;
    state.publish(ledger.take_events(), ctx.now);

    Ok(serde_json::json!({
        "provider": provider,
        "amount": amount_json(returned),
    }))
}

/// Position of `delegator` with `provider`; all zero if none.
pub async fn get_delegation(state: &Arc<NodeState>, params: &Value) -> Result {
    let delegator = address(params, "delegator")?;
    let provider = address(params, "provider")?;

    let ledger = state.ledger.lock().await;
    Ok(delegation_json(&ledger.get_delegation(&delegator, &provider)))
}

/// Sum of all live shares.
pub async fn total_share(state: &Arc<NodeState>) -> Result {
    let ledger = state.ledger.lock().await;
    Ok(serde_json::json!({ "total_share": amount_json(ledger.total_share()) }))
}
