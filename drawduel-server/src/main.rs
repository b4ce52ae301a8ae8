//! DrawDuel Game Server
//!
//! Authoritative room server. Configuration comes from `DRAWDUEL_*` and
//! `AUTH_*` environment variables; log filtering from `RUST_LOG`.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use drawduel::{
    VERSION,
    network::{GameServer, ServerConfig},
};

#[cfg(feature = "debug-tracing")]
const DEFAULT_FILTER: &str = "debug";
#[cfg(not(feature = "debug-tracing"))]
const DEFAULT_FILTER: &str = "info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig::from_env();
    info!("DrawDuel Server v{}", VERSION);
    info!(
        "Rooms: {} max, {} players each, round {}s draw / {}s choose",
        config.max_rooms,
        config.room.max_players,
        config.room.round.drawing_ms / 1000,
        config.room.round.choose_word_ms / 1000,
    );
    if config.auth.is_configured() {
        info!("JWT authentication enabled");
    }

    let server = std::sync::Arc::new(GameServer::new(config));

    let signal_server = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received");
            signal_server.shutdown();
        }
    });

    server.run().await.context("server failed")?;
    info!("Server stopped");
    Ok(())
}
