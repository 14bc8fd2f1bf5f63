//! `arbor`: field inventory of urban trees.
//!
//! Records trees with their measurements and risk factors, scores them,
//! captures GPS positions, and moves the whole inventory in and out as a zip
//! bundle.
//!
//! # Usage
//!
//! ```text
//! arbor add --species "Tipuana tipu" --x 333288 --y 7394588 --factor trunk_cracks
//! arbor list --level high
//! arbor export inventory.zip
//! arbor gps --apply 3 < fixes.txt
//! ```

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Context as _;
use arbor_core::inventory::Inventory;
use arbor_store_sqlite::SqliteStore;
use clap::Parser;
use commands::Command;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::ArborConfig;

#[derive(Parser)]
#[command(name = "arbor", author, version, about = "Field inventory of urban trees")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, value_name = "FILE", default_value = "arbor.toml")]
  config: PathBuf,

  /// Inventory database, overriding `store_path` from the configuration.
  #[arg(long, value_name = "FILE")]
  store: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

/// The inventory the commands operate on; one SQLite file backs both
/// records and photos.
pub type Store = Inventory<SqliteStore, SqliteStore>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = ArborConfig::load(&cli.config)?;

  // Conversions and the factor table need no store.
  if !cli.command.needs_store() {
    return commands::run_offline(cli.command, &cfg);
  }

  let store_path = cli
    .store
    .as_deref()
    .map(config::expand_tilde)
    .unwrap_or_else(|| cfg.store_path());
  if let Some(dir) = store_path.parent().filter(|d| !d.as_os_str().is_empty()) {
    std::fs::create_dir_all(dir)
      .with_context(|| format!("failed to create {}", dir.display()))?;
  }

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let mut inv = Inventory::open(store.clone(), store.clone(), cfg.weights())
    .await
    .context("failed to load inventory")?;
  commands::print_notices(&mut inv);

  let result = commands::run(cli.command, &mut inv, &cfg).await;
  commands::print_notices(&mut inv);

  drop(inv);
  if let Err(e) = store.close().await {
    tracing::warn!(error = %e, "failed to close store cleanly");
  }
  result
}
