pub mod agents;
pub mod cli;
pub mod config;
pub mod http;
pub mod orchestrator;
pub mod output;
pub mod process;
pub mod prompts;
pub mod session;

use std::sync::Arc;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use crate::config::{ConfigError, ConfigStore};
use crate::http::state::AppState;
use crate::orchestrator::Orchestrator;
use crate::process::CliLauncher;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("HTTP server error: {0}")]
    Http(#[from] std::io::Error),
}

/// Load configuration, build the orchestrator and serve the HTTP control
/// plane until Ctrl-C. Active sessions are stopped on the way out.
pub async fn run() -> Result<(), AppError> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let store = ConfigStore::new()?;
    let config = store.load_config()?;
    tracing::info!("Loaded config from {:?}", store.config_path());

    if config.force_color {
        colored::control::set_override(true);
    }

    let orchestrator = Orchestrator::new(&config, Arc::new(CliLauncher));

    if !config.api.enabled {
        tracing::warn!("HTTP API disabled in config, nothing to serve");
        return Ok(());
    }

    tracing::info!("Starting HTTP API on port {}", config.api.port);
    let state = Arc::new(AppState::new(orchestrator.clone()));
    let result = http::serve(state, config.api.port, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
        tracing::info!("Shutdown requested");
    })
    .await;

    orchestrator.shutdown();
    result.map_err(AppError::from)
}
