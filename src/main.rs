use anyhow::{Context, Result};
use game_runner::GameRunner;
use game_runner::api::start_api;
use game_runner::config::{Config, validate_config};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const CONFIG_ENV: &str = "GAME_RUNNER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.json";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting game-runner {}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(CONFIG_ENV).ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let config = if config_path.exists() {
        info!("Loading configuration from {}", config_path.display());
        Config::from_file(&config_path)
            .with_context(|| format!("loading {}", config_path.display()))?
    } else {
        info!(
            "No configuration at {}, using defaults",
            config_path.display()
        );
        Config::default()
    };
    validate_config(&config).context("validating configuration")?;

    let http_config = config.http.clone();
    let runner = GameRunner::load(config)
        .await
        .context("loading server registry")?;
    runner.start_reconciler()?;

    let api = start_api(runner.clone(), &http_config).context("starting HTTP API")?;
    info!("Listening on {:?}", api.addrs());

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl+C")?;
    info!("Received Ctrl+C, shutting down");

    if let Err(e) = api.shutdown().await {
        error!("Failed to stop HTTP API: {}", e);
    }

    runner
        .shutdown()
        .await
        .context("final registry snapshot was not written")?;

    info!("Shutdown complete");
    Ok(())
}
