//! Parley API server binary.
//!
//! Loads [`ServerConfig`] from `config.toml` (or `--config`) and the
//! environment, opens the SQLite store, and serves the JSON API.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for an account's `password_hash`:
//!
//! ```text
//! cargo run -p parley-api --bin server -- --hash-password
//! ```

use std::{
  io::{self, BufRead, Write},
  path::PathBuf,
  sync::Arc,
};

use anyhow::{Context as _, anyhow};
use clap::Parser;
use parley_api::{AppState, ServerConfig, auth};
use parley_core::clock::SystemClock;
use parley_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Parley discussion API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_password {
    let password = prompt("Password: ")?;
    let hash = auth::hash_password(&password).map_err(|e| anyhow!("argon2 error: {e}"))?;
    println!("{hash}");
    return Ok(());
  }

  let config = ServerConfig::load(&cli.config)
    .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
  serve(config).await
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
  if config.accounts.is_empty() {
    warn!("no accounts configured; every request will be rejected");
  }

  let store_path = config.resolved_store_path();
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("opening store at {}", store_path.display()))?;

  let listener = TcpListener::bind((config.host.as_str(), config.port))
    .await
    .with_context(|| format!("binding {}:{}", config.host, config.port))?;
  info!(
    address = %listener.local_addr()?,
    store = %store_path.display(),
    accounts = config.accounts.len(),
    "serving parley api"
  );

  let state = AppState {
    store:  Arc::new(store),
    config: Arc::new(config),
    clock:  Arc::new(SystemClock),
  };
  axum::serve(listener, parley_api::router(state))
    .await
    .context("server error")
}

/// Read one line from stdin after printing `label`.
fn prompt(label: &str) -> io::Result<String> {
  print!("{label}");
  io::stdout().flush()?;
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_owned())
}
