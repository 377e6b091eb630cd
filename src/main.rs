//! wsgate server: accepts WebSocket connections on a TCP port and relays
//! every message a client sends to all other connected clients.
//!
//! Message handlers see payload bytes only, so relayed frames are re-typed
//! by content: a binary frame whose bytes are valid UTF-8 reaches the other
//! clients as a text frame.

use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

use wsgate_core::config::AppConfig;
use wsgate_core::error::AppError;
use wsgate_realtime::{Frame, Manager, WsUpgrader};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from `config/` and `WSGATE__*` environment variables
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("WSGATE_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting wsgate v{}", env!("CARGO_PKG_VERSION"));

    let manager = Manager::new(WsUpgrader, config.realtime.clone());
    register_relay_handlers(&manager);

    let addr = config.server.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("wsgate listening on {}", addr);

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, peer_addr)) => {
                        let manager = manager.clone();
                        tokio::spawn(async move {
                            if let Err(e) = manager.handle_new_connection(stream).await {
                                tracing::debug!(peer = %peer_addr, error = %e, "Rejected connection");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!("Accept error: {}", e);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                break;
            }
        }
    }

    tracing::info!(
        open_connections = manager.connection_count(),
        metrics = ?manager.metrics(),
        "wsgate stopped"
    );
    Ok(())
}

/// Join/leave logging plus a relay that forwards each message to every
/// other open connection.
fn register_relay_handlers(manager: &Manager<WsUpgrader>) {
    manager.register_connection_handler(|connection| {
        tracing::info!(
            conn_id = %connection.id(),
            peer = connection.peer().unwrap_or("unknown"),
            "Client joined"
        );
        Ok(())
    });

    // The relay keeps a handle to its own manager for the life of the process.
    let relay = manager.clone();
    manager.register_message_handler(move |connection, payload| {
        let frame = relay_frame(payload);

        let delivered = relay
            .connections()
            .iter()
            .filter(|peer| peer.id() != connection.id())
            .filter(|peer| peer.send(frame.clone()))
            .count();

        tracing::debug!(conn_id = %connection.id(), delivered, "Relayed message");
        Ok(())
    });

    manager.register_close_handler(|connection| {
        tracing::info!(conn_id = %connection.id(), "Client left");
        Ok(())
    });
}

/// Frame used to relay `payload`: text when it is valid UTF-8, binary
/// otherwise.
fn relay_frame(payload: &[u8]) -> Frame {
    match std::str::from_utf8(payload) {
        Ok(text) => Frame::text(text),
        Err(_) => Frame::binary(payload.to_vec()),
    }
}
