//! Proxychat - Discord chat relay for multi-server game proxy networks
//!
//! Runs the relay with a console standing in for the proxy network.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info};

use proxychat::common::LogReporter;
use proxychat::config::env::get_config_path;
use proxychat::config::{load_and_validate, ConfigStore};
use proxychat::console::{run_console, ConsoleProxy};
use proxychat::discord::SerenityService;
use proxychat::relay::RelayController;

/// Max player count reported by the console proxy.
const CONSOLE_MAX_PLAYERS: usize = 100;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Proxychat v{} starting...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_path = get_config_path();
    info!("Loading configuration from {}...", config_path);

    let config = load_and_validate(&config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!("Please ensure {} exists and is properly formatted.", config_path);
        error!("See proxychat.conf.example for reference.");
        e
    })?;

    info!("Configuration loaded successfully");
    info!("  Relay enabled: {}", config.discord.is_active());
    info!("  Bridge channel: {}", config.discord.channel_id);
    if !config.discord.private_channel_id.is_empty() {
        info!("  Private channel: {}", config.discord.private_channel_id);
    }

    let token = config.discord.token.clone();
    let store = ConfigStore::new(config);

    // Discord -> proxy ingress
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

    let service = Arc::new(SerenityService::new(token, inbound_tx));
    let proxy = Arc::new(ConsoleProxy::new(store.clone(), CONSOLE_MAX_PLAYERS));
    let controller = Arc::new(RelayController::new(
        service,
        store.clone(),
        proxy.clone(),
        Arc::new(LogReporter),
        inbound_rx,
    ));

    controller.start();

    let reload_task = tokio::spawn(reload_on_hangup(store.clone(), PathBuf::from(&config_path)));
    let mut console_task = tokio::spawn(run_console(
        controller.clone(),
        proxy,
        store,
        PathBuf::from(&config_path),
    ));

    tokio::select! {
        _ = shutdown_signal() => info!("Shutdown signal received - stopping relay..."),
        _ = &mut console_task => info!("Console closed - stopping relay..."),
    }

    controller.stop().await;
    reload_task.abort();
    console_task.abort();

    info!("Exiting...");
    // A blocked stdin read would keep the runtime from shutting down.
    std::process::exit(0);
}

/// Reload the configuration file on SIGHUP.
#[cfg(unix)]
async fn reload_on_hangup(store: ConfigStore, path: PathBuf) {
    let mut hangup = match signal::unix::signal(signal::unix::SignalKind::hangup()) {
        Ok(hangup) => hangup,
        Err(e) => {
            error!("Failed to install SIGHUP handler: {}", e);
            return;
        }
    };

    while hangup.recv().await.is_some() {
        info!("Received SIGHUP, reloading configuration");
        if let Err(e) = store.reload_from(&path) {
            error!("Reload failed, keeping current configuration: {}", e);
        }
    }
}

#[cfg(not(unix))]
async fn reload_on_hangup(_store: ConfigStore, _path: PathBuf) {}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
