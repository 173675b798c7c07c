//! JSON-RPC server over Unix socket.
//!
//! Listens on a Unix domain socket, accepts connections, and dispatches
//! newline-delimited JSON-RPC method calls to the command handlers. A
//! connection that calls `subscribe_events` additionally receives
//! matching ledger events as `event` notifications.

use std::path::PathBuf;
use std::sync::Arc;

use basis_ledger::LedgerError;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::commands;
use crate::events::{Event, EventFilter};
use crate::NodeState;

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Method name.
    pub method: String,
    /// Parameters.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC response.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    /// JSON-RPC version.
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Result or error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// Server-pushed notification.
#[derive(Debug, Serialize)]
pub struct RpcNotification<'a> {
    /// JSON-RPC version.
    pub jsonrpc: &'static str,
    /// Always "event".
    pub method: &'static str,
    /// The event.
    pub params: &'a Event,
}

/// JSON-RPC error object.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RpcError {
    /// Error code.
    pub code: i32,
    /// Error name.
    pub message: String,
    /// Optional structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcResponse {
    /// Create a success response.
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: serde_json::Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

impl RpcError {
    fn new(code: i32, message: &str, data: Option<serde_json::Value>) -> Self {
        Self {
            code,
            message: message.to_string(),
            data,
        }
    }

    // Standard JSON-RPC errors

    /// Parse error (-32700).
    pub fn parse_error() -> Self {
        Self::new(-32700, "PARSE_ERROR", None)
    }

    /// Invalid request (-32600).
    pub fn invalid_request() -> Self {
        Self::new(-32600, "INVALID_REQUEST", None)
    }

    /// Method not found (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            -32601,
            "METHOD_NOT_FOUND",
            Some(serde_json::json!({"method": method})),
        )
    }

    /// Invalid params (-32602).
    pub fn invalid_params(detail: &str) -> Self {
        Self::new(
            -32602,
            "INVALID_PARAMS",
            Some(serde_json::json!({"detail": detail})),
        )
    }

    /// Internal error (-32603).
    pub fn internal_error(detail: &str) -> Self {
        Self::new(
            -32603,
            "INTERNAL_ERROR",
            Some(serde_json::json!({"detail": detail})),
        )
    }

    /// Caller lacks a required role (-32060).
    pub fn unauthorized(detail: &str) -> Self {
        Self::new(
            -32060,
            "UNAUTHORIZED",
            Some(serde_json::json!({"detail": detail})),
        )
    }
}

impl From<LedgerError> for RpcError {
    fn from(err: LedgerError) -> Self {
        let detail = err.to_string();
        let (code, message, data) = match &err {
            LedgerError::InvalidInput(_) => (-32020, "INVALID_INPUT", serde_json::json!({})),
            LedgerError::NotRegistered(provider) => (
                -32021,
                "PROVIDER_NOT_REGISTERED",
                serde_json::json!({"provider": provider}),
            ),
            LedgerError::AlreadyExists(provider) => (
                -32022,
                "PROVIDER_EXISTS",
                serde_json::json!({"provider": provider}),
            ),
            LedgerError::RegistryFull { max } => {
                (-32023, "REGISTRY_FULL", serde_json::json!({"max": max}))
            }
            LedgerError::Locked { unlock_time, now } => (
                -32030,
                "DELEGATION_LOCKED",
                serde_json::json!({"unlock_time": unlock_time, "now": now}),
            ),
            LedgerError::NoDelegation {
                delegator,
                provider,
            } => (
                -32031,
                "NO_DELEGATION",
                serde_json::json!({"delegator": delegator, "provider": provider}),
            ),
            LedgerError::NothingToWithdraw => {
                (-32032, "NOTHING_TO_WITHDRAW", serde_json::json!({}))
            }
            LedgerError::InsufficientBalance {
                required,
                available,
            } => (
                -32040,
                "INSUFFICIENT_BALANCE",
                serde_json::json!({
                    "required": required.to_string(),
                    "available": available.to_string(),
                }),
            ),
            LedgerError::InsufficientApproval { required, approved } => (
                -32041,
                "INSUFFICIENT_APPROVAL",
                serde_json::json!({
                    "required": required.to_string(),
                    "approved": approved.to_string(),
                }),
            ),
            LedgerError::Overflow => (-32050, "ARITHMETIC_OVERFLOW", serde_json::json!({})),
            LedgerError::Unauthorized { role, caller } => (
                -32060,
                "UNAUTHORIZED",
                serde_json::json!({"role": role, "caller": caller}),
            ),
        };

        let mut data = data;
        if let Some(obj) = data.as_object_mut() {
            obj.insert("detail".to_string(), serde_json::Value::String(detail));
        }
        Self::new(code, message, Some(data))
    }
}

/// The RPC server.
pub struct RpcServer {
    state: Arc<NodeState>,
    socket_path: PathBuf,
}

impl RpcServer {
    /// Create a new RPC server.
    pub fn new(state: Arc<NodeState>, socket_path: PathBuf) -> Self {
        Self { state, socket_path }
    }

    /// Run the server, accepting connections.
    pub async fn run(&self) -> anyhow::Result<()> {
        // Remove stale socket file
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        info!("IPC server listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(state, stream).await {
                            warn!("Connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Event subscription held by one connection.
struct Subscription {
    receiver: broadcast::Receiver<Event>,
    filter: EventFilter,
}

/// Wait for the next event, or forever if not subscribed.
async fn next_event(subscription: &mut Option<Subscription>) -> Option<Event> {
    let Some(sub) = subscription.as_mut() else {
        return std::future::pending().await;
    };
    loop {
        match sub.receiver.recv().await {
            Ok(event) if sub.filter.matches(&event) => return Some(event),
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "event subscriber lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

/// Handle a single client connection.
async fn handle_connection<S>(state: Arc<NodeState>, stream: S) -> anyhow::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut lines = BufReader::new(reader).lines();
    let mut subscription: Option<Subscription> = None;

    loop {
        let mut payload = tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break; // EOF
                };
                let response = match serde_json::from_str::<RpcRequest>(&line) {
                    Ok(request) => match request.method.as_str() {
                        "subscribe_events" => subscribe(&state, &mut subscription, request),
                        "unsubscribe_events" => {
                            subscription = None;
                            RpcResponse::success(request.id, serde_json::json!({"subscribed": false}))
                        }
                        _ => dispatch_request(state.clone(), request).await,
                    },
                    Err(_) => RpcResponse::error(serde_json::Value::Null, RpcError::parse_error()),
                };
                serde_json::to_string(&response)?
            }
            event = next_event(&mut subscription) => {
                let Some(event) = event else {
                    subscription = None;
                    continue;
                };
                serde_json::to_string(&RpcNotification {
                    jsonrpc: "2.0",
                    method: "event",
                    params: &event,
                })?
            }
        };

        payload.push('\n');
        writer.write_all(payload.as_bytes()).await?;
        writer.flush().await?;
    }

    Ok(())
}

fn subscribe(
    state: &Arc<NodeState>,
    subscription: &mut Option<Subscription>,
    request: RpcRequest,
) -> RpcResponse {
    let filter = if request.params.is_null() {
        EventFilter::default()
    } else {
        match serde_json::from_value::<EventFilter>(request.params) {
            Ok(filter) => filter,
            Err(e) => {
                return RpcResponse::error(
                    request.id,
                    RpcError::invalid_params(&format!("bad event filter: {e}")),
                )
            }
        }
    };

    *subscription = Some(Subscription {
        receiver: state.event_bus.subscribe(),
        filter,
    });
    RpcResponse::success(
        request.id,
        serde_json::json!({
            "subscribed": true,
            "sequence": state.event_bus.sequence(),
        }),
    )
}

/// Dispatch a JSON-RPC request to the appropriate command handler.
pub async fn dispatch_request(state: Arc<NodeState>, request: RpcRequest) -> RpcResponse {
    let id = request.id.clone();
    let method = request.method.as_str();

    if request.jsonrpc != "2.0" {
        return RpcResponse::error(id, RpcError::invalid_request());
    }

    debug!("Dispatching RPC method: {}", method);

    let params = &request.params;
    let result = match method {
        // Provider registry
        "create_provider" => commands::provider::create_provider(&state, params).await,
        "edit_provider" => commands::provider::edit_provider(&state, params).await,
        "get_provider" => commands::provider::get_provider(&state, params).await,
        "list_providers" => commands::provider::list_providers(&state).await,

        // Delegation
        "delegate" => commands::delegation::delegate(&state, params).await,
        "undelegate" => commands::delegation::undelegate(&state, params).await,
        "get_delegation" => commands::delegation::get_delegation(&state, params).await,
        "total_share" => commands::delegation::total_share(&state).await,

        // Rewards
        "notify_reward_amount" => commands::rewards::notify_reward_amount(&state, params).await,
        "withdraw_delegator_reward" => {
            commands::rewards::withdraw_delegator_reward(&state, params).await
        }
        "withdraw_provider_commission" => {
            commands::rewards::withdraw_provider_commission(&state, params).await
        }
        "earned" => commands::rewards::earned(&state, params).await,
        "reward_per_share" => commands::rewards::reward_per_share(&state, params).await,
        "last_time_reward_applicable" => {
            commands::rewards::last_time_reward_applicable(&state, params).await
        }
        "get_reward_for_duration" => {
            commands::rewards::get_reward_for_duration(&state, params).await
        }

        // Governance
        "get_params" => commands::governance::get_params(&state).await,
        "get_roles" => commands::governance::get_roles(&state).await,
        "set_lock_period" => commands::governance::set_lock_period(&state, params).await,
        "set_max_providers" => commands::governance::set_max_providers(&state, params).await,
        "migrate_asset" => commands::governance::migrate_asset(&state, params).await,
        "transfer_operator" => commands::governance::transfer_operator(&state, params).await,
        "transfer_governor" => commands::governance::transfer_governor(&state, params).await,

        // In-memory asset
        "asset_mint" => commands::asset::asset_mint(&state, params).await,
        "asset_approve" => commands::asset::asset_approve(&state, params).await,
        "asset_balance" => commands::asset::asset_balance(&state, params).await,

        _ => Err(RpcError::method_not_found(method)),
    };

    match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(err) => {
            debug!(method, code = err.code, "RPC call rejected");
            RpcResponse::error(id, err)
        }
    }
}
