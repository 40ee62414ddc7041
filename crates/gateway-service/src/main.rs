//! Token Gateway
//!
//! Entry point for the bearer-token gated HTTP gateway.

use gateway_service::config::{AuthMode, Config};
use gateway_service::observability::metrics::init_metrics_recorder;
use gateway_service::routes::{self, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is normal outside development
    let dotenv_result = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gateway_service=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match dotenv_result {
        Ok(path) => info!(path = %path.display(), "Loaded environment from file"),
        Err(e) => debug!(error = %e, "No .env file loaded"),
    }

    info!("Starting Token Gateway");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    match &config.auth {
        AuthMode::Enforced(settings) => info!(
            bind_address = %config.bind_address,
            tenant_id = %settings.tenant_id,
            audience = %settings.audience,
            accepted_issuers = ?settings.accepted_issuers,
            jwks_url = %settings.jwks_url,
            jwt_clock_skew_seconds = settings.jwt_clock_skew_seconds,
            jwks_cache_ttl_seconds = settings.jwks_cache_ttl_seconds,
            excluded_paths = ?config.excluded_paths,
            "Configuration loaded successfully"
        ),
        AuthMode::Disabled => {
            warn!("==============================================================");
            warn!("AUTHENTICATION IS DISABLED (ENABLE_AUTH=false)");
            warn!("Every request is served as the placeholder development user.");
            warn!("Do not run this configuration outside local development.");
            warn!("==============================================================");
            info!(
                bind_address = %config.bind_address,
                excluded_paths = ?config.excluded_paths,
                "Configuration loaded successfully"
            );
        }
    }

    // Must be installed before any metric is recorded
    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics: {}", e);
        e
    })?;

    // Parse bind address before moving config
    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;
    let drain_seconds = config.drain_seconds;

    let state = Arc::new(AppState::from_config(config));
    let app = routes::build_routes(state, metrics_handle);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Token Gateway listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(drain_seconds))
        .await?;

    info!("Token Gateway shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Returns when a shutdown signal is received and drain period is complete.
async fn shutdown_signal(drain_seconds: u64) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    if drain_seconds > 0 {
        warn!("Draining connections for {} seconds...", drain_seconds);
        tokio::time::sleep(Duration::from_secs(drain_seconds)).await;
        info!("Drain period complete");
    } else {
        info!("Skipping drain period (GATEWAY_DRAIN_SECONDS=0)");
    }
}
