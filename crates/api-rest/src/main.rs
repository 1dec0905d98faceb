//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! Useful for development and debugging of the REST surface. The workspace's main `lims-run`
//! binary serves the same router with the same configuration.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{router, AppState};
use lims_core::{constants::DEFAULT_REST_ADDR, CoreConfig};

/// Main entry point for the LIMS REST API server
///
/// # Environment Variables
/// - `LIMS_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `LIMS_SITE_CODE`: Site code stamped on audit events (default: "lims.dev.1")
/// - `LIMS_SEED_DEMO`: Load the demo result set and samples at startup (default: false)
/// - `API_KEY`: When set, mutating endpoints require a matching `x-api-key` header
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the site code or seed flag is invalid,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("lims_core=info".parse()?)
                .add_directive("lims=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("LIMS_REST_ADDR").unwrap_or_else(|_| DEFAULT_REST_ADDR.into());

    let cfg = Arc::new(CoreConfig::from_values(
        std::env::var("LIMS_SITE_CODE").ok(),
        std::env::var("LIMS_SEED_DEMO").ok(),
    )?);

    let state = AppState::new(cfg.clone(), std::env::var("API_KEY").ok());
    if cfg.seed_demo() {
        state.seed_demo()?;
    }

    tracing::info!("-- Starting LIMS REST API on {} (site {})", addr, cfg.site_code());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
