use anyhow::{Context, Result};
use clap::Parser;
use kirbec_cli::config::default_config_path;
use kirbec_cli::logging::init_logging;
use kirbec_cli::{load_or_default, Backend, Config, JsonPresenceSource, VERSION};
use kirbec_ledger::PresenceTracker;
use kirbec_storage::{DocumentStore, MemoryStore, SledStore, Vault};
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "kirbecd")]
#[command(about = "Kirbec presence daemon")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Show version
    #[arg(short, long)]
    version: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("kirbecd {}", VERSION);
        return Ok(());
    }

    let config_path = cli.config.unwrap_or_else(default_config_path);
    let (config, defaulted) = load_or_default(&config_path)?;
    init_logging(&config.logging.level)?;

    if defaulted {
        warn!(path = %config_path.display(), "Config file not found, using defaults");
    }
    info!(version = VERSION, "Starting kirbecd");

    match config.storage.backend {
        Backend::Sled => {
            let path = config.storage.resolved_path();
            let store = SledStore::open(&path)
                .with_context(|| format!("Failed to open store at {}", path.display()))?;
            info!(path = %path.display(), "Store opened");
            serve(Vault::new(store), &config).await
        }
        Backend::Memory => {
            warn!("Using in-memory store, nothing will be persisted");
            serve(Vault::new(MemoryStore::new()), &config).await
        }
    }
}

async fn serve<S: DocumentStore>(vault: Vault<S>, config: &Config) -> Result<()> {
    let tracker = PresenceTracker::new(vault, config.presence.settings());
    let source = JsonPresenceSource::new(config.presence.resolved_snapshot_path());
    let interval = config.presence.interval();
    info!(snapshot = %source.path().display(), "Reading voice presence");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let presence = tokio::spawn(async move {
        tracker.run(&source, interval, shutdown_rx).await;
    });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown requested");

    let _ = shutdown_tx.send(true);
    presence.await.context("Presence task failed")?;

    info!("kirbecd stopped");
    Ok(())
}
