use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ocelot::auth::AuthService;
use ocelot::config::{AuthMode, Config};
use ocelot::reaper::Reaper;
use ocelot::{api, build_link_service, connect_storage};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    info!("Loaded configuration");

    let storage = connect_storage(&config).await?;
    info!("Database initialized successfully");

    let auth_service = Arc::new(AuthService::new(config.auth.clone())?);
    match auth_service.mode() {
        AuthMode::None => info!("🔓 Identity disabled - all callers are anonymous"),
        AuthMode::ApiKey => info!(
            "🔐 API key identity enabled ({} keys)",
            config.auth.api_keys.len()
        ),
        AuthMode::Header => info!(
            "🔐 Trusting upstream identity header '{}'",
            config.auth.user_id_header
        ),
    }

    let service = Arc::new(build_link_service(&config, Arc::clone(&storage)));
    let reaper = Reaper::new(Arc::clone(&storage), &config.reaper)?.spawn();

    let router = api::create_api_router(service, auth_service);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Link server listening on http://{}", addr);

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    info!("Stopping reaper...");
    reaper.shutdown().await;

    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl+C: {}. Shutting down.", e);
    }
    info!("Shutdown signal received");
}
