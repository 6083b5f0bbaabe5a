//! sapar-daemon: the Sapar ride-dispatch daemon.
//!
//! Single OS process running a Tokio async runtime. The conversation flow
//! and the messaging bridge communicate with the daemon via JSON-RPC over
//! a Unix socket; outbound notices queue up for the bridge to drain.

mod commands;
mod config;
mod events;
mod notices;
mod rpc;

use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tracing::{error, info};

use sapar_dispatch::Coordinator;

use crate::config::DaemonConfig;
use crate::events::EventBus;
use crate::notices::NoticeQueue;
use crate::rpc::RpcServer;

/// Daemon-wide shared state.
pub struct DaemonState {
    /// Database connection.
    pub db: Arc<Mutex<rusqlite::Connection>>,
    /// Configuration.
    pub config: DaemonConfig,
    /// Event bus for pushing events to subscribers.
    pub event_bus: EventBus,
    /// Outbound notice queue drained by the messaging bridge.
    pub notices: Arc<NoticeQueue>,
    /// The dispatch coordinator.
    pub coordinator: Coordinator,
    /// Shutdown signal sender.
    pub shutdown_tx: broadcast::Sender<()>,
}

impl DaemonState {
    /// Emit a domain event onto the bus.
    pub fn emit_event(&self, event_type: &str, payload: serde_json::Value) {
        self.event_bus.emit(events::Event {
            event_type: event_type.to_string(),
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            payload,
        });
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sapar=info".parse()?),
        )
        .init();

    info!("Sapar daemon starting");

    // 1. Load config
    let config = DaemonConfig::load()?;
    let data_dir = config.data_dir();

    // Ensure data directory exists
    std::fs::create_dir_all(&data_dir)?;

    // 2. Open database
    let db_path = data_dir.join("sapar.db");
    let conn = sapar_db::open(&db_path)?;
    let db = Arc::new(Mutex::new(conn));

    // 3. Create event bus and notice queue
    let event_bus = EventBus::new(config.dispatch.event_buffer);
    let notices = Arc::new(NoticeQueue::new(
        config.dispatch.notice_queue,
        event_bus.clone(),
    ));

    // 4. Build the coordinator around the shared store handle
    let coordinator = Coordinator::new(db.clone(), notices.clone(), config.price_bounds());

    // 5. Create shutdown channel
    let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);

    // 6. Build daemon state
    let state = Arc::new(DaemonState {
        db,
        config,
        event_bus,
        notices,
        coordinator,
        shutdown_tx: shutdown_tx.clone(),
    });

    // 7. Start IPC server
    let socket_path = data_dir.join("daemon.sock");
    let rpc_server = RpcServer::new(state.clone(), socket_path.clone());

    info!("Starting JSON-RPC server on {:?}", socket_path);

    // 8. Emit DaemonStarted event
    state.emit_event(
        "DaemonStarted",
        serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
        }),
    );

    // 9. Run the RPC server until shutdown
    let mut shutdown_rx = shutdown_tx.subscribe();
    tokio::select! {
        result = rpc_server.run() => {
            if let Err(e) = result {
                error!("RPC server error: {}", e);
            }
        }
        _ = shutdown_rx.recv() => {
            info!("Shutdown signal received");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    // Graceful shutdown
    info!("Daemon shutting down gracefully");

    // Clean up socket file
    let _ = std::fs::remove_file(&socket_path);

    info!("Daemon stopped");
    Ok(())
}
