//! Provider registry command handlers.

use std::sync::Arc;

use basis_ledger::Provider;
use serde_json::Value;

use super::{address, amount_json, context};
use crate::rpc::RpcError;
use crate::NodeState;

type Result = std::result::Result<Value, RpcError>;

pub(crate) fn provider_json(provider: &Provider) -> Value {
    serde_json::json!({
        "address": provider.address,
        "description": provider.description,
        "commission": provider.commission_percent,
        "power": amount_json(provider.power),
        "reward_rate": amount_json(provider.reward_rate),
        "period_finish": provider.period_finish,
        "last_update_time": provider.last_update_time,
        "reward_per_share_stored": provider.reward_per_share_stored,
        "reward_duration": provider.reward_duration,
        "commission_rewards": amount_json(provider.commission_rewards),
    })
}

fn profile(params: &Value) -> std::result::Result<(String, u8), RpcError> {
    let description = params
        .get("description")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("description required"))?;
    let commission = params
        .get("commission")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| RpcError::invalid_params("commission required"))?;
    let commission = u8::try_from(commission)
        .map_err(|_| RpcError::invalid_params("commission must be 0-100"))?;
    Ok((description.to_string(), commission))
}

/// Register the caller as a provider.
pub async fn create_provider(state: &Arc<NodeState>, params: &Value) -> Result {
    let ctx = context(params)?;
    let (description, commission) = profile(params)?;

    let mut ledger = state.ledger.lock().await;
    ledger.create_provider(&ctx, description, commission)?;
    state.publish(ledger.take_events(), ctx.now);

    Ok(provider_json(&ledger.get_provider(&ctx.caller)))
}

/// Update the caller's description and commission.
pub async fn edit_provider(state: &Arc<NodeState>, params: &Value) -> Result {
    let ctx = context(params)?;
    let (description, commission) = profile(params)?;

    let mut ledger = state.ledger.lock().await;
    ledger.edit_provider(&ctx, description, commission)?;
    state.publish(ledger.take_events(), ctx.now);

    Ok(provider_json(&ledger.get_provider(&ctx.caller)))
}

/// Provider record; the all-zero record for unknown addresses.
pub async fn get_provider(state: &Arc<NodeState>, params: &Value) -> Result {
    let provider = address(params, "provider")?;
    let ledger = state.ledger.lock().await;
    let mut value = provider_json(&ledger.get_provider(&provider));
    value["registered"] = Value::Bool(ledger.is_provider(&provider));
    Ok(value)
}

/// All registered providers.
pub async fn list_providers(state: &Arc<NodeState>) -> Result {
    let ledger = state.ledger.lock().await;
    let providers: Vec<Value> = ledger.providers().map(provider_json).collect();
    Ok(serde_json::json!({
        "count": ledger.provider_count(),
        "max_providers": ledger.params().max_providers,
        "providers": providers,
    }))
}
