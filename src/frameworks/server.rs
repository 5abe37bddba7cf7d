// Framework bootstrap for the game server runtime.

use crate::domain::Role;
use crate::frameworks::config::{self, GameConfig};
use crate::interface_adapters::net::{seed_pickups_handler, world_update_serializer, ws_handler};
use crate::interface_adapters::state::AppState;
use crate::use_cases::game::world_task;
use crate::use_cases::{GameEvent, SessionCoordinator, SessionState, WorldUpdate};

use axum::{
    Router,
    extract::ws::Utf8Bytes,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};
use tokio::sync::{broadcast, mpsc, watch};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// Serves one session on `listener` until it terminates.
pub async fn run(listener: tokio::net::TcpListener, config: GameConfig) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state(config)?;
    let mut session_state_rx = state.session_state_tx.subscribe();

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/internal/pickups", post(seed_pickups_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = session_state_rx
                .wait_for(|s| *s == SessionState::Terminated)
                .await;
            tracing::info!("session terminated; shutting down");
        })
        .await
        .inspect_err(|e| {
            tracing::error!(error = %e, "server error");
        })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let path = config::session_config_path().map_err(|e| {
        tracing::error!(error = %e, "session config not found");
        std::io::Error::other(e)
    })?;
    tracing::info!(path = %path.display(), "loading session config");
    let config = GameConfig::load(&path).map_err(|e| {
        tracing::error!(error = %e, "invalid session config");
        std::io::Error::other(e)
    })?;

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener, config).await
}

fn build_state(config: GameConfig) -> Result<Arc<AppState>> {
    let tick_interval = config.session.tick_interval();
    let session = SessionCoordinator::new(config.session, Role::Authority, config.level)
        .map_err(|e| std::io::Error::other(format!("failed to start session: {e}")))?;

    // input_tx/rx: every connection feeds the single world task.
    let (input_tx, input_rx) = mpsc::channel::<GameEvent>(config::INPUT_CHANNEL_CAPACITY);
    let (world_tx, _world_rx) =
        broadcast::channel::<WorldUpdate>(config::WORLD_BROADCAST_CAPACITY);
    let (world_bytes_tx, _world_bytes_rx) =
        broadcast::channel::<Utf8Bytes>(config::WORLD_BROADCAST_CAPACITY);
    let (world_latest_tx, _world_latest_rx) = watch::channel::<Utf8Bytes>(Utf8Bytes::from(""));
    let (session_state_tx, _session_state_rx) = watch::channel(SessionState::Idle);

    tokio::spawn(world_task(
        session,
        input_rx,
        world_tx.clone(),
        session_state_tx.clone(),
        tick_interval,
    ));
    tokio::spawn(world_update_serializer(
        world_tx.subscribe(),
        world_bytes_tx.clone(),
        world_latest_tx.clone(),
    ));

    Ok(Arc::new(AppState {
        input_tx,
        world_bytes_tx,
        world_latest_tx,
        session_state_tx,
    }))
}
