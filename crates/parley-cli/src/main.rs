//! `parley`: command-line client for a Parley server.
//!
//! Votes and edits go through the optimistic reconcilers: the projected state
//! is printed first, then whatever the server confirmed.
//!
//! # Usage
//!
//! ```
//! parley --url http://localhost:8080 --user alice --password secret thread <TOPIC>
//! parley --config ~/.config/parley/config.toml vote reply <REPLY> up
//! ```

mod client;
mod render;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use client::{ApiClient, ApiConfig};
use parley_core::{
  reconcile::{EditReconciler, Settled, VoteReconciler},
  subject::{SubjectRef, SubjectType},
  thread::SortMode,
  vote::VoteValue,
};
use serde::Deserialize;
use tracing::debug;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "parley", about = "Command-line client for a Parley server")]
struct Args {
  /// Path to a TOML config file (url, username, password).
  #[arg(short, long, value_name = "FILE")]
  config: Option<std::path::PathBuf>,

  /// Base URL of the parley server (default: http://localhost:8080).
  #[arg(long, env = "PARLEY_URL")]
  url: Option<String>,

  /// API username.
  #[arg(long, env = "PARLEY_USER")]
  user: Option<String>,

  /// API password (plaintext).
  #[arg(long, env = "PARLEY_PASSWORD")]
  password: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Cast, switch or retract a vote. Repeating your current vote retracts it.
  Vote {
    subject_type: SubjectArg,
    subject_id:   Uuid,
    direction:    DirectionArg,
  },
  /// Print a topic's replies as an indented thread.
  Thread {
    topic_id:  Uuid,
    #[arg(long, value_enum, default_value_t = SortArg::Oldest)]
    sort:      SortArg,
    /// Deeper replies are drawn at this level.
    #[arg(long, default_value_t = 6)]
    max_depth: usize,
  },
  /// Replace the content of one of your replies.
  Edit { reply_id: Uuid, content: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SubjectArg {
  Topic,
  Reply,
}

impl From<SubjectArg> for SubjectType {
  fn from(arg: SubjectArg) -> Self {
    match arg {
      SubjectArg::Topic => Self::Topic,
      SubjectArg::Reply => Self::Reply,
    }
  }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DirectionArg {
  Up,
  Down,
  None,
}

impl From<DirectionArg> for VoteValue {
  fn from(arg: DirectionArg) -> Self {
    match arg {
      DirectionArg::Up => Self::Up,
      DirectionArg::Down => Self::Down,
      DirectionArg::None => Self::None,
    }
  }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SortArg {
  Oldest,
  Newest,
  MostVoted,
}

impl From<SortArg> for SortMode {
  fn from(arg: SortArg) -> Self {
    match arg {
      SortArg::Oldest => Self::Oldest,
      SortArg::Newest => Self::Newest,
      SortArg::MostVoted => Self::MostVoted,
    }
  }
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:      String,
  #[serde(default)]
  username: String,
  #[serde(default)]
  password: String,
}

fn non_empty(s: String) -> Option<String> { (!s.is_empty()).then_some(s) }

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let api_config = ApiConfig {
    base_url: args
      .url
      .or_else(|| non_empty(file_cfg.url))
      .unwrap_or_else(|| "http://localhost:8080".to_string()),
    username: args.user.or_else(|| non_empty(file_cfg.username)).unwrap_or_default(),
    password: args
      .password
      .or_else(|| non_empty(file_cfg.password))
      .unwrap_or_default(),
  };
  debug!(url = %api_config.base_url, "using server");

  let client = ApiClient::new(api_config).context("building http client")?;

  match args.command {
    Command::Vote { subject_type, subject_id, direction } => {
      let subject = SubjectRef { subject_type: subject_type.into(), subject_id };
      vote(client, subject, direction.into()).await
    }
    Command::Thread { topic_id, sort, max_depth } => {
      let rows = client
        .thread(topic_id, sort.into(), max_depth)
        .await
        .with_context(|| format!("loading thread {topic_id}"))?;
      if rows.is_empty() {
        println!("no replies");
      } else {
        print!("{}", render::thread(&rows));
      }
      Ok(())
    }
    Command::Edit { reply_id, content } => edit(client, reply_id, content).await,
  }
}

// ─── Commands ─────────────────────────────────────────────────────────────────

async fn vote(client: ApiClient, subject: SubjectRef, requested: VoteValue) -> Result<()> {
  let reconciler = VoteReconciler::new(client);
  let pending = reconciler
    .prepare(subject, requested)
    .await
    .with_context(|| format!("loading vote state for {subject}"))?;
  println!("projected: {}", render::vote(pending.projected()));

  match reconciler.commit(pending).await {
    Ok(Settled::Confirmed(summary)) => {
      println!("confirmed: {}", render::vote(summary));
      Ok(())
    }
    Ok(Settled::Superseded) => {
      println!("superseded by a newer vote");
      Ok(())
    }
    Err(e) => {
      if let Some(shown) = reconciler.shown(subject) {
        println!("rolled back: {}", render::vote(shown));
      }
      Err(e).with_context(|| format!("casting vote on {subject}"))
    }
  }
}

async fn edit(client: ApiClient, reply_id: Uuid, content: String) -> Result<()> {
  let reconciler = EditReconciler::new(client);
  let pending = reconciler
    .prepare(reply_id, content)
    .await
    .with_context(|| format!("loading reply {reply_id}"))?;
  println!("projected: {}", render::reply(pending.projected()));

  match reconciler.commit(pending).await {
    Ok(Settled::Confirmed(reply)) => {
      println!("confirmed: {}", render::reply(&reply));
      Ok(())
    }
    Ok(Settled::Superseded) => {
      println!("superseded by a newer edit");
      Ok(())
    }
    Err(e) => {
      if let Some(shown) = reconciler.shown(reply_id) {
        println!("rolled back: {}", render::reply(&shown));
      }
      Err(e).with_context(|| format!("editing reply {reply_id}"))
    }
  }
}
