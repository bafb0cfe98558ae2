//! # Atrium Server
//!
//! Main binary that hosts the virtual room:
//! - WebSocket gateway (identify, join/leave, presence dispatch)
//! - REST surface (room info, roster, avatar catalog, health)
//!
//! Presence is transport-ephemeral — nothing is persisted, and a restart
//! empties the room.

use std::net::SocketAddr;
use std::sync::Arc;

use atrium_gateway::{build_router, GatewayState};
use atrium_presence::{MemoryTransport, RoomRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = atrium_common::config::init()?;

    // Initialize tracing (structured logging)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atrium=debug".into()),
        )
        .with_target(true)
        .init();

    tracing::info!("🚀 Starting Atrium v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        room = %config.room.id,
        max_occupants = config.room.max_occupants,
        "Hosting room '{}'",
        config.room.name
    );

    // === Presence core ===
    // The in-process transport is the single-node mode; a clustered
    // deployment would swap in a broker-backed transport here.
    let registry = Arc::new(RoomRegistry::from_config(&config.room));
    let transport = Arc::new(MemoryTransport::new());
    let state = GatewayState::new(registry, transport, config.presence.clone());

    // === Gateway ===
    let router = build_router(state);
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("🌐 Gateway listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
