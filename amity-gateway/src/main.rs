//! Amity Event Gateway
//!
//! The single real-time connection per authenticated user. Provides:
//! - WebSocket endpoint routing friend-lifecycle intents, chat messages,
//!   and typing indicators
//! - addressed delivery via a connection registry keyed by user id
//! - HTTP endpoints for health checks and Prometheus metrics

use std::sync::Arc;
use std::time::Instant;

use amity_core::protocol::TypingIndicator;
use amity_core::{FriendCoordinator, Storage, TypingTracker};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tracing::{error, info};

use amity_gateway::config::GatewayConfig;
use amity_gateway::handler;
use amity_gateway::http::{create_router, HttpState};
use amity_gateway::metrics::GatewayMetrics;
use amity_gateway::rate_limit::RateLimiter;
use amity_gateway::registry::ConnectionRegistry;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("amity_gateway=info".parse().unwrap()),
        )
        .init();

    // Load configuration
    let config = GatewayConfig::from_env();
    info!("Starting Amity Gateway v{}", env!("CARGO_PKG_VERSION"));
    info!("WebSocket: {}", config.listen_addr);
    info!("HTTP (health/metrics): {}", config.http_addr);
    info!("Database: {}", config.database_path.display());

    // Initialize shared state
    let storage = Arc::new(Storage::open(&config.database_path).expect("Failed to open database"));
    let coordinator = Arc::new(FriendCoordinator::new(storage.clone()));
    let registry = Arc::new(ConnectionRegistry::new());
    let typing = Arc::new(TypingTracker::new());
    let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit_per_min));
    let metrics = GatewayMetrics::new();
    let start_time = Instant::now();

    // Start HTTP server for health/metrics
    let http_state = HttpState {
        metrics: metrics.clone(),
        registry: registry.clone(),
        storage: storage.clone(),
        start_time,
    };
    let http_router = create_router(http_state);
    let http_addr = config.http_addr;
    let http_listener = TcpListener::bind(http_addr)
        .await
        .expect("Failed to bind HTTP listener");
    tokio::spawn(async move {
        info!("HTTP server listening on {}", http_addr);
        axum::serve(http_listener, http_router).await.unwrap();
    });

    // Sweep stale typing flags: entries whose last keystroke is older than
    // the TTL get a relayed `hidden` so peers don't watch dots forever.
    let sweep_typing = typing.clone();
    let sweep_registry = registry.clone();
    let sweep_coordinator = coordinator.clone();
    let typing_ttl = config.typing_ttl();
    let sweep_interval = config.typing_sweep_interval();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(sweep_interval).await;
            for (user_id, room_id) in sweep_typing.sweep_stale(typing_ttl) {
                if let Ok(events) =
                    sweep_coordinator.typing(&user_id, &room_id, TypingIndicator::Hidden)
                {
                    sweep_registry.deliver(&events);
                }
            }
        }
    });

    let shared = Arc::new(handler::Shared {
        storage,
        coordinator,
        registry,
        typing,
        rate_limiter,
        metrics,
        max_frame_bytes: config.max_frame_bytes,
        history_limit: config.history_limit,
    });

    // Accept connections
    let listener = TcpListener::bind(config.listen_addr)
        .await
        .expect("Failed to bind");
    while let Ok((stream, addr)) = listener.accept().await {
        let shared = shared.clone();
        tokio::spawn(async move {
            match accept_async(stream).await {
                Ok(ws_stream) => {
                    info!("New connection from {}", addr);
                    handler::handle_connection(ws_stream, shared).await;
                    info!("Connection closed: {}", addr);
                }
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                }
            }
        });
    }
}
