//! amora server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use amora_api::{AppState, RateLimiterState, router as api_router};
use amora_common::Config;
use axum::{Router, middleware};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often idle rate limiter entries and confirmation gates are swept.
const RATE_LIMIT_SWEEP: Duration = Duration::from_secs(300);

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "amora=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting amora server...");

    let config = Config::load()?;

    let db = amora_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    amora_db::migrate(&db).await?;
    info!("Migrations completed");

    let state = AppState::new(Arc::new(db), &config);
    let rate_limiter = RateLimiterState::new();

    // Sweep stale rate limiter windows and idle gates in the background
    {
        let rate_limiter = rate_limiter.clone();
        let auto_like_limiter = state.auto_like_limiter.clone();
        let confirmations = state.confirmations.clone();
        let auto_like_window = config.bots.auto_like_window_secs;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(RATE_LIMIT_SWEEP);
            loop {
                interval.tick().await;
                rate_limiter.user_limiter.cleanup(60).await;
                rate_limiter.ip_limiter.cleanup(60).await;
                auto_like_limiter.cleanup(auto_like_window).await;
                let swept = confirmations.sweep().await;
                if swept > 0 {
                    tracing::debug!(swept, "Dropped idle confirmation gates");
                }
            }
        });
    }

    // Layers run bottom-up: auth must resolve the user before rate limiting
    let app = Router::new()
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            amora_api::rate_limit::rate_limit_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            amora_api::middleware::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
