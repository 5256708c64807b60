mod output;
mod replay;
mod session;

use std::path::PathBuf;

use anyhow::Result;
use timeline_sync_core::SyncConfig;
use tracing_subscriber::EnvFilter;

use crate::replay::ReplayLog;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: timeline-sync <replay.json> [config.toml]");
        std::process::exit(1);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let log = ReplayLog::load(&PathBuf::from(&args[1]))?;
    let config = match args.get(2) {
        Some(path) => SyncConfig::load_from(&PathBuf::from(path))?,
        None => SyncConfig::default(),
    };

    let written = session::replay(log, config, std::io::stdout().lock()).await?;
    tracing::info!(records = written, "replay finished");
    Ok(())
}
