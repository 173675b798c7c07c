//! Parameter and role command handlers.

use std::sync::Arc;

use basis_asset::{Asset, MemoryAsset};
use serde_json::Value;

use super::{address, amount_json, context, uint};
use crate::rpc::RpcError;
use crate::NodeState;

type Result = std::result::Result<Value, RpcError>;

/// Current parameters and wiring.
pub async fn get_params(state: &Arc<NodeState>) -> Result {
    let ledger = state.ledger.lock().await;
    let params = ledger.params();
    Ok(serde_json::json!({
        "lock_period": params.lock_period,
        "max_providers": params.max_providers,
        "custody": ledger.custody(),
        "asset": ledger.asset_address(),
    }))
}

/// Current role holders.
pub async fn get_roles(state: &Arc<NodeState>) -> Result {
    let ledger = state.ledger.lock().await;
    Ok(serde_json::json!({
        "operator": ledger.access().operator(),
        "governor": ledger.access().governor(),
    }))
}

/// Change the lock period. Governor only.
pub async fn set_lock_period(state: &Arc<NodeState>, params: &Value) -> Result {
    let ctx = context(params)?;
    let lock_period = uint(params, "lock_period")?;

    let mut ledger = state.ledger.lock().await;
    ledger.set_lock_period(&ctx, lock_period)?;
    state.publish(ledger.take_events(), ctx.now);

    Ok(serde_json::json!({ "lock_period": lock_period }))
}

/// Change the registry capacity. Governor only.
pub async fn set_max_providers(state: &Arc<NodeState>, params: &Value) -> Result {
    let ctx = context(params)?;
    let max_providers = u32::try_from(uint(params, "max_providers")?)
        .map_err(|_| RpcError::invalid_params("max_providers out of range"))?;

    let mut ledger = state.ledger.lock().await;
    ledger.set_max_providers(&ctx, max_providers)?;
    state.publish(ledger.take_events(), ctx.now);

    Ok(serde_json::json!({ "max_providers": max_providers }))
}

/// Switch to a fresh in-memory asset at `asset`. Governor only.
///
/// Balances of the previous asset are not carried over; the response
/// reports what custody held there.
pub async fn migrate_asset(state: &Arc<NodeState>, params: &Value) -> Result {
    let ctx = context(params)?;
    let asset = address(params, "asset")?;

    let mut ledger = state.ledger.lock().await;
    let old_address = ledger.asset_address();
    let previous = ledger.migrate_asset(&ctx, asset, MemoryAsset::new())?;
    state.publish(ledger.take_events(), ctx.now);

    tracing::warn!(
        old = %old_address,
        new = %asset,
        "asset migrated; previous in-memory balances dropped"
    );

    Ok(serde_json::json!({
        "old_asset": old_address,
        "new_asset": asset,
        "previous_custody_balance": amount_json(previous.balance_of(&ledger.custody())),
    }))
}

/// Hand the operator role on. Operator only.
pub async fn transfer_operator(state: &Arc<NodeState>, params: &Value) -> Result {
    let ctx = context(params)?;
    let new_operator = address(params, "new_operator")?;

    let mut ledger = state.ledger.lock().await;
    ledger.transfer_operator(&ctx, new_operator)?;
    state.publish(ledger.take_events(), ctx.now);

    Ok(serde_json::json!({ "operator": new_operator }))
}

/// Hand the governor role on. Governor only.
pub async fn transfer_governor(state: &Arc<NodeState>, params: &Value) -> Result {
    let ctx = context(params)?;
    let new_governor = address(params, "new_governor")?;

    let mut ledger = state.ledger.lock().await;
    ledger.transfer_governor(&ctx, new_governor)?;
    state.publish(ledger.take_events(), ctx.now);

    Ok(serde_json::json!({ "governor": new_governor }))
}

#[cfg(test)]
mod tests {
    use basis_types::Address;

    use crate::commands::tests::{call_err, call_ok, test_state, ALICE, CUSTODY, DEPLOYER, TOKEN};

    #[tokio::test]
    async fn test_governor_updates_params() {
        let state = test_state();
        let mut rx = state.event_bus.subscribe();

        call_ok(
            &state,
            "set_lock_period",
            serde_json::json!({"caller": DEPLOYER.to_string(), "lock_period": 3600}),
        )
        .await;
        call_ok(
            &state,
            "set_max_providers",
            serde_json::json!({"caller": DEPLOYER.to_string(), "max_providers": 3}),
        )
        .await;

        let params = call_ok(&state, "get_params", serde_json::json!({})).await;
        assert_eq!(params["lock_period"], 3600);
        assert_eq!(params["max_providers"], 3);
        assert_eq!(params["custody"], CUSTODY.to_string());

        assert_eq!(rx.try_recv().expect("event").event.name(), "lock_period_updated");
        assert_eq!(rx.try_recv().expect("event").event.name(), "max_providers_updated");
    }

    #[tokio::test]
    async fn test_non_governor_rejected() {
        let state = test_state();
        let params = serde_json::json!({"caller": ALICE.to_string(), "lock_period": 3600});
        assert_eq!(call_err(&state, "set_lock_period", params).await, -32060);

        let params = serde_json::json!({"caller": DEPLOYER.to_string(), "lock_period": 0});
        assert_eq!(call_err(&state, "set_lock_period", params).await, -32020);
    }

    #[tokio::test]
    async fn test_role_transfer() {
        let state = test_state();
        call_ok(
            &state,
            "transfer_operator",
            serde_json::json!({"caller": DEPLOYER.to_string(), "new_operator": ALICE.to_string()}),
        )
        .await;
        let roles = call_ok(&state, "get_roles", serde_json::json!({})).await;
        assert_eq!(roles["operator"], ALICE.to_string());
        assert_eq!(roles["governor"], DEPLOYER.to_string());

        let params = serde_json::json!({
            "caller": DEPLOYER.to_string(),
            "new_governor": Address::ZERO.to_string(),
        });
        assert_eq!(call_err(&state, "transfer_governor", params).await, -32020);
    }

    #[tokio::test]
    async fn test_migrate_asset_reports_previous_custody() {
        let state = test_state();
        call_ok(
            &state,
            "asset_mint",
            serde_json::json!({
                "caller": DEPLOYER.to_string(),
                "to": CUSTODY.to_string(),
                "amount": (5 * TOKEN).to_string(),
            }),
        )
        .await;

        let new_asset = Address::repeat(0xbb);
        let migrated = call_ok(
            &state,
            "migrate_asset",
            serde_json::json!({"caller": DEPLOYER.to_string(), "asset": new_asset.to_string()}),
        )
        .await;
        assert_eq!(migrated["new_asset"], new_asset.to_string());
        assert_eq!(migrated["previous_custody_balance"], (5 * TOKEN).to_string());

        let balance = call_ok(
            &state,
            "asset_balance",
            serde_json::json!({"holder": CUSTODY.to_string()}),
        )
        .await;
        assert_eq!(balance["balance"], "0");
    }
}
