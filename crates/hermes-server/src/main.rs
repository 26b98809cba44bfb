mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use hermes_api::{AppState, AppStateInner};
use hermes_crypto::{PasswordScheme, TokenKeys};
use hermes_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hermes=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    let db = Database::open(&config.db).context("Failed to open database")?;
    let tokens = TokenKeys::from_pem(
        config.jwt.private_key_pem.as_bytes(),
        config.jwt.public_key_pem.as_bytes(),
        config.jwt.ttl,
    )?;
    let passwords = PasswordScheme::new(
        config.password.pepper.clone(),
        config.password.time_cost,
        config.password.memory_kib,
    )?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        tokens,
        passwords,
    });

    let app = hermes_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address().parse()?;
    info!("Hermes server listening on {}", addr);
    info!(
        "Token lifetime: {} hours, password hash cost: {}",
        config.jwt.ttl.num_hours(),
        config.password.time_cost
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
