//! Boardwalk host binary: serves a game room over the WebSocket backend.

use boardwalk_core::{GameAction, JoinRequest};
use boardwalk_net::{ActionChannel, GameHost, HostConfig, TracingSink, WsTransport};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr: SocketAddr = std::env::var("BOARDWALK_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".into())
        .parse()?;
    let room = std::env::var("BOARDWALK_ROOM").unwrap_or_else(|_| "boardwalk".into());
    let host_name = std::env::var("BOARDWALK_NAME").unwrap_or_else(|_| "Host".into());

    info!("Starting Boardwalk host...");

    let (transport, incoming) = WsTransport::host(addr).await?;
    info!("Boardwalk host listening on {}", addr);

    let config = HostConfig {
        room_id: room,
        ..HostConfig::default()
    };
    let host = GameHost::spawn(transport, incoming, Arc::new(TracingSink), config);

    // The host participant takes the first seat.
    if let Err(e) = host.request_action(GameAction::Join(JoinRequest {
        name: host_name,
        color: None,
        avatar: None,
        uid: None,
    })) {
        warn!("could not seat the host player: {}", e);
    }

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    Ok(())
}
