//! Notescribe backend server
//!
//! Main entry point: loads configuration, starts the log shipper, wires
//! the gateway, session store, and workspace into the HTTP server, and
//! drains the log queue on shutdown.

use anyhow::Result;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use notescribe_server::cli::Cli;
use notescribe_server::config::Config;
use notescribe_server::gateway::{Gateway, GeminiProvider};
use notescribe_server::http::{self, AppState};
use notescribe_server::logship::{LogQueue, LogShipper};
use notescribe_server::session::SessionStore;
use notescribe_server::workspace::Workspace;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Start the log shipper before tracing so every event is captured
    let (shipper, queue) = LogShipper::spawn(config.logging.clone())?;
    init_tracing(cli.verbose, queue);

    tracing::info!("Starting notescribe-server v{}", env!("CARGO_PKG_VERSION"));

    if config.provider.gemini.api_key.is_none() {
        tracing::warn!("No Gemini API key configured; generation endpoints will return 503");
    }
    let provider = GeminiProvider::new(config.provider.gemini.clone())?;

    let state = AppState {
        gateway: Gateway::new(Arc::new(provider)),
        sessions: SessionStore::new(),
        workspace: Arc::new(Workspace::new(&config.workspace)?),
    };

    http::serve(
        &config.server.host,
        config.server.port,
        state,
        shutdown_signal(),
    )
    .await?;

    // Drain remaining log records before exiting
    shipper.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}

fn init_tracing(verbose: bool, queue: LogQueue) {
    let default = if verbose {
        "notescribe_server=debug"
    } else {
        "notescribe_server=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(notescribe_server::logship::ShipperLayer::new(queue))
        .init();
}
