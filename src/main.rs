//! Territory Game Server - Authoritative multiplayer session server
//!
//! This is the main entry point for the game server. It handles:
//! - WebSocket connections for real-time gameplay
//! - The 20 Hz sync tick driving match phases and force field expiry
//! - A health endpoint and client asset delivery

mod app;
mod config;
mod game;
mod http;
mod util;
mod ws;

use std::future::IntoFuture;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::AppState;
use crate::config::Config;
use crate::game::{GameSession, SessionSettings};
use crate::http::build_router;
use crate::util::time::{init_server_time, uptime_secs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    // Initialize server time tracking
    init_server_time();

    info!("Starting Territory Game Server");
    info!("Server address: {}", config.server_addr);
    info!(asset_mode = ?config.asset_mode, "Asset mode");

    // Spawn the session actor that owns all game state
    let (session, session_handle, commands) = GameSession::new(SessionSettings {
        max_force_fields_per_player: config.max_force_fields_per_player,
    });
    let mut session_task = tokio::spawn(session.run(commands));

    // Build router
    let state = AppState::new(config.clone(), session_handle);
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config.server_addr;
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("Health check: http://{}/api/health", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    let server = axum::serve(listener, router).with_graceful_shutdown(shutdown_signal());

    // The router holds a session handle, so the actor only stops early if it fails
    tokio::select! {
        result = server.into_future() => result?,
        result = &mut session_task => {
            match result {
                Ok(()) => error!("Game session stopped while serving"),
                Err(e) => error!(error = %e, "Game session task failed"),
            }
            anyhow::bail!("game session actor exited");
        }
    }

    info!(uptime_secs = uptime_secs(), "Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
