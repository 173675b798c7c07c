//! IPC command handlers.
//!
//! Each submodule implements the commands for one area of the ledger.
//! Mutating commands take the caller from the `caller` param and the time
//! from the wall clock; read-only commands accept an optional `at`
//! timestamp to evaluate accrual at another moment.

pub mod asset;
pub mod delegation;
pub mod governance;
pub mod provider;
pub mod rewards;

use std::str::FromStr;

use basis_ledger::CallContext;
use basis_types::{Address, Amount, Timestamp};
use serde_json::Value;

use crate::rpc::RpcError;
use crate::unix_now;

/// Required address param.
pub fn address(params: &Value, key: &str) -> Result<Address, RpcError> {
    let raw = params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params(&format!("{key} required")))?;
    Address::from_str(raw).map_err(|e| RpcError::invalid_params(&format!("{key}: {e}")))
}

/// Call context from the `caller` param and the wall clock.
pub fn context(params: &Value) -> Result<CallContext, RpcError> {
    Ok(CallContext::new(address(params, "caller")?, unix_now()))
}

/// Required amount param, as a decimal string or a JSON integer.
pub fn amount(params: &Value, key: &str) -> Result<Amount, RpcError> {
    let value = params
        .get(key)
        .ok_or_else(|| RpcError::invalid_params(&format!("{key} required")))?;
    match value {
        Value::String(s) => s
            .parse::<Amount>()
            .map_err(|e| RpcError::invalid_params(&format!("{key}: {e}"))),
        Value::Number(n) => n
            .as_u64()
            .map(Amount::from)
            .ok_or_else(|| RpcError::invalid_params(&format!("{key} must be a non-negative integer"))),
        _ => Err(RpcError::invalid_params(&format!(
            "{key} must be a decimal string or integer"
        ))),
    }
}

/// Required unsigned integer param.
pub fn uint(params: &Value, key: &str) -> Result<u64, RpcError> {
    params
        .get(key)
        .and_then(|v| v.as_u64())
        .ok_or_else(|| RpcError::invalid_params(&format!("{key} required")))
}

/// Optional `at` timestamp, defaulting to now.
pub fn at(params: &Value) -> Result<Timestamp, RpcError> {
    match params.get("at") {
        None | Some(Value::Null) => Ok(unix_now()),
        Some(v) => v
            .as_u64()
            .ok_or_else(|| RpcError::invalid_params("at must be a Unix timestamp")),
    }
}

/// Amounts leave the node as decimal strings.
pub fn amount_json(amount: Amount) -> Value {
    Value::String(amount.to_string())
}
