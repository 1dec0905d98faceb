use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, router};
use lims_core::{CoreConfig, constants::DEFAULT_REST_ADDR};

/// Main entry point for the LIMS application
///
/// Serves the REST API for result entry, the submission gate and sample reception.
///
/// # Environment Variables
/// - `LIMS_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `LIMS_SITE_CODE`: Site code stamped on audit events (default: "lims.dev.1")
/// - `LIMS_SEED_DEMO`: Load the demo result set and samples at startup (default: false)
/// - `API_KEY`: When set, mutating endpoints require a matching `x-api-key` header
///
/// # Returns
/// * `Ok(())` - If the server starts and shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration, startup or serving fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lims=info".parse()?)
                .add_directive("lims_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr: SocketAddr = std::env::var("LIMS_REST_ADDR")
        .unwrap_or_else(|_| DEFAULT_REST_ADDR.into())
        .parse()?;

    let cfg = Arc::new(CoreConfig::from_values(
        std::env::var("LIMS_SITE_CODE").ok(),
        std::env::var("LIMS_SEED_DEMO").ok(),
    )?);

    let api_key = std::env::var("API_KEY").ok();
    if api_key.is_none() {
        tracing::warn!("API_KEY not set; mutating endpoints are open");
    }

    let state = AppState::new(cfg.clone(), api_key);
    if cfg.seed_demo() {
        state.seed_demo()?;
    }

    tracing::info!("++ Starting LIMS REST on {} (site {})", rest_addr, cfg.site_code());

    let listener = tokio::net::TcpListener::bind(rest_addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("-- LIMS REST stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
