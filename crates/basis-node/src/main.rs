//! basis-node: host daemon for the staking ledger.
//!
//! Single OS process running a Tokio async runtime. Owns one
//! [`StakingLedger`] over an in-memory asset and serves it via JSON-RPC
//! over a Unix socket.

mod commands;
mod config;
mod events;
mod rpc;

use std::sync::Arc;

use basis_access::AccessControl;
use basis_asset::MemoryAsset;
use basis_ledger::StakingLedger;
use basis_types::{LedgerEvent, Timestamp};
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::config::NodeConfig;
use crate::events::EventBus;
use crate::rpc::RpcServer;

/// The ledger type served by this node.
pub type Ledger = StakingLedger<MemoryAsset, AccessControl>;

/// Node-wide shared state.
pub struct NodeState {
    /// The ledger. Calls are serialised through this lock.
    pub ledger: Mutex<Ledger>,
    /// Configuration.
    pub config: NodeConfig,
    /// Event bus for pushing events to subscribers.
    pub event_bus: EventBus,
}

impl NodeState {
    /// Build the ledger described by `config`.
    pub fn new(config: NodeConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let ledger = StakingLedger::new(
            config.ledger.clone(),
            config.roles.custody,
            config.roles.asset,
            MemoryAsset::new(),
            AccessControl::new(config.roles.deployer),
        )?;
        let event_bus = EventBus::new(config.rpc.event_buffer);

        Ok(Self {
            ledger: Mutex::new(ledger),
            config,
            event_bus,
        })
    }

    /// Publish drained ledger events stamped with `timestamp`.
    pub fn publish(&self, events: Vec<LedgerEvent>, timestamp: Timestamp) {
        for event in events {
            self.event_bus.emit(event, timestamp);
        }
    }
}

/// Current wall-clock time in Unix seconds.
pub fn unix_now() -> Timestamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = NodeConfig::load()?;

    // 2. Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("basis={}", config.logging.log_level).parse()?),
        )
        .init();

    info!("Basis node starting");

    // 3. Build node state
    let socket_path = config.socket_path();
    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let state = Arc::new(NodeState::new(config)?);

    // 4. Start IPC server
    let rpc_server = RpcServer::new(state.clone(), socket_path.clone());
    info!("Starting JSON-RPC server on {:?}", socket_path);

    // 5. Run the RPC server until shutdown
    tokio::select! {
        result = rpc_server.run() => {
            if let Err(e) = result {
                error!("RPC server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    // Clean up socket file
    let _ = std::fs::remove_file(&socket_path);

    info!("Node stopped");
    Ok(())
}
