mod clock;
mod config;
mod error;
mod handlers;
mod services;
mod state;
mod stores;
#[cfg(test)]
mod test_utils;

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use axum::{Router, http};
use chrono::Utc;
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    clock::SystemClock,
    config::Config,
    services::RedemptionService,
    state::AppState,
    stores::{MemoryRedemptionStore, RedemptionStore, RedisRedemptionStore},
};

/// Cadence of the memory-store reclamation pass. Purely a memory bound;
/// correctness never depends on it.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    let config = envy::prefixed("REDEEM_").from_env::<Config>()?;

    // Initialize Sentry for error tracking (must be done early, guard must stay alive)
    let _sentry_guard = config.sentry_dsn.as_ref().map(|dsn| {
        sentry::init((
            dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                environment: Some(config.env.clone().into()),
                ..Default::default()
            },
        ))
    });

    // Set up tracing: JSON in production, human-readable otherwise
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.is_production() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .init();
    }

    anyhow::ensure!(
        config.token_ttl_secs > 0,
        "REDEEM_TOKEN_TTL_SECS must be positive"
    );

    // Backend selection: a Redis URL means shared state across instances;
    // without one the store is process-local and volatile.
    let store: std::sync::Arc<dyn RedemptionStore> = match &config.redis_url {
        Some(url) => {
            tracing::info!("using shared Redis redemption store");
            let client = redis::Client::open(url.as_str())?;
            std::sync::Arc::new(RedisRedemptionStore::new(client))
        }
        None => {
            tracing::info!("using process-local redemption store (state is volatile)");
            let memory = std::sync::Arc::new(MemoryRedemptionStore::new());

            // Lazy deletion only reclaims records that get read again;
            // the sweep bounds growth from tokens redeemed once and never
            // queried.
            let sweeper = memory.clone();
            tokio::spawn(async move {
                let mut tick = tokio::time::interval(SWEEP_INTERVAL);
                loop {
                    tick.tick().await;
                    let purged = sweeper.purge_expired(Utc::now());
                    if purged > 0 {
                        tracing::debug!(purged, "expired redemption records reclaimed");
                    }
                }
            });

            memory
        }
    };

    let redemption = RedemptionService::new(
        store.clone(),
        std::sync::Arc::new(SystemClock),
        config.token_ttl_secs,
    );

    let state = AppState {
        config: config.clone(),
        store,
        redemption,
    };

    // Request ID header name
    let x_request_id = http::HeaderName::from_static("x-request-id");

    let app = Router::new()
        .nest("/health", handlers::health::router())
        .merge(handlers::redemptions::router())
        .with_state(state)
        // Request ID: generate UUID, include in logs, return in response
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &http::Request<axum::body::Body>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            },
        ))
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
        .layer(RequestBodyLimitLayer::new(16 * 1024)); // tokens are tiny

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
