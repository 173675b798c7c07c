//! In-memory asset handlers.
//!
//! The node runs against a [`MemoryAsset`](basis_asset::MemoryAsset); these
//! commands stand in for the external token contract a real host would
//! talk to. Minting is limited to the current governor.

use std::sync::Arc;

use basis_access::Capabilities;
use basis_asset::Asset;
use serde_json::Value;

use super::{address, amount, amount_json};
use crate::rpc::RpcError;
use crate::NodeState;

type Result = std::result::Result<Value, RpcError>;

/// Credit new supply to `to`. Governor only.
pub async fn asset_mint(state: &Arc<NodeState>, params: &Value) -> Result {
    let caller = address(params, "caller")?;
    let to = address(params, "to")?;
    let amount = amount(params, "amount")?;

    let mut ledger = state.ledger.lock().await;
    if !ledger.access().is_governor(&caller) {
        return Err(RpcError::unauthorized("only the governor may mint"));
    }

    ledger
        .asset_mut()
        .mint(&to, amount)
        .map_err(|e| RpcError::internal_error(&e.to_string()))?;

    Ok(serde_json::json!({
        "to": to,
        "balance": amount_json(ledger.asset().balance_of(&to)),
    }))
}

/// Set the allowance `spender` has over the caller's balance.
pub async fn asset_approve(state: &Arc<NodeState>, params: &Value) -> Result {
    let caller = address(params, "caller")?;
    let spender = address(params, "spender")?;
    let amount = amount(params, "amount")?;

    let mut ledger = state.ledger.lock().await;
    ledger.asset_mut().approve(&caller, &spender, amount);

    Ok(serde_json::json!({
        "owner": caller,
        "spender": spender,
        "allowance": amount_json(amount),
    }))
}

/// Balance of `holder`, plus its allowance toward `spender` if given.
pub async fn asset_balance(state: &Arc<NodeState>, params: &Value) -> Result {
    let holder = address(params, "holder")?;

    let ledger = state.ledger.lock().await;
    let mut value = serde_json::json!({
        "holder": holder,
        "balance": amount_json(ledger.asset().balance_of(&holder)),
    });
    if params.get("spender").is_some() {
        let spender = address(params, "spender")?;
        value["allowance"] = amount_json(ledger.asset().allowance(&holder, &spender));
    }
    Ok(value)
}
