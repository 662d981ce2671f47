//! Kirbec CLI - query and operate a community ledger

use anyhow::{Context, Result};
use clap::Parser;
use kirbec_cli::config::default_config_path;
use kirbec_cli::logging::init_logging;
use kirbec_cli::{execute, load_or_default, Backend, Cli};
use kirbec_ledger::CommunityId;
use kirbec_storage::{MemoryStore, SledStore, Vault};
use tracing::{error, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let (config, defaulted) = load_or_default(&config_path)?;
    // Keep stdout for command output
    init_logging("warn")?;

    if defaulted {
        warn!(path = %config_path.display(), "Config file not found, using defaults");
    }

    let community = CommunityId(cli.community);
    let result = match config.storage.backend {
        Backend::Sled => {
            let path = config.storage.resolved_path();
            let store = SledStore::open(&path)
                .with_context(|| format!("Failed to open store at {}", path.display()))?;
            execute(&Vault::new(store), community, cli.command, cli.json).await
        }
        Backend::Memory => {
            warn!("Using in-memory store, nothing will be persisted");
            execute(&Vault::new(MemoryStore::new()), community, cli.command, cli.json).await
        }
    };
    let output = result.inspect_err(|e| {
        error!(community = %community, error = %e, "Command failed");
    })?;

    println!("{}", output);
    Ok(())
}
