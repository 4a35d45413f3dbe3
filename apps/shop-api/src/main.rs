//! # Shoe Haven Shop API
//!
//! HTTP server for the Shoe Haven storefront.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shop API Server                                  │
//! │                                                                         │
//! │  Storefront ───► HTTP (8000) ───► Handlers ───► Services ───► SQLite  │
//! │                                                     │                   │
//! │                                                     ▼                   │
//! │  M-Pesa / PayPal ◄──── gateway adapters ────────────┘                   │
//! │        │                                                                │
//! │        └──── payment callback ───► /api/orders/callback                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use haven_db::{Database, DbConfig};
use haven_shop_api::auth::JwtManager;
use haven_shop_api::config::ShopConfig;
use haven_shop_api::gateway::mpesa::MpesaClient;
use haven_shop_api::gateway::paypal::PayPalClient;
use haven_shop_api::routes::router;
use haven_shop_api::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("Starting Shoe Haven shop API server...");

    // Load configuration
    let config = ShopConfig::load()?;
    info!(
        port = config.http_port,
        db_path = %config.database_path,
        "Configuration loaded"
    );

    // Connect to database and run migrations
    let db = Database::new(DbConfig::new(&config.database_path)).await?;
    info!("Connected to SQLite, migrations complete");

    // Construct gateway clients with injected credentials
    let push_gateway = Arc::new(MpesaClient::new(config.mpesa.clone())?);
    let capture_gateway = Arc::new(PayPalClient::new(config.paypal.clone())?);

    let jwt = JwtManager::new(config.jwt_secret.clone(), config.jwt_access_lifetime_secs);

    let state = Arc::new(AppState::new(
        db,
        push_gateway,
        capture_gateway,
        jwt,
        config.clone(),
    ));

    let addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    info!(%addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
