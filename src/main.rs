mod app;
mod cache;
mod commands;
mod config;
mod event;
mod listing;
mod query;
mod registration;
mod school;
mod store;
mod ui;

use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cache::age_display;
use school::{CachedSchoolClient, Feature, SchoolClient};
use store::{MemoryStore, NoopStore, SharedStore, SqliteStore};

#[derive(Parser, Debug)]
#[command(name = "olshconnect")]
#[command(about = "A terminal client for the OLSHCOnnect school information system")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/olshconnect/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Page to open at startup (e.g. payments, grades, register)
  #[arg(short, long)]
  page: Option<String>,

  /// Skip the local cache and fetch every page from the server
  #[arg(long)]
  no_cache: bool,

  #[command(subcommand)]
  command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
  /// Inspect or clear the local response cache
  Cache {
    #[command(subcommand)]
    action: CacheAction,
  },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
  /// Show each feature's cache age and freshness
  Status,
  /// Clear one feature's cache (e.g. studentBalances), or all of them
  Clear { feature: Option<String> },
}

/// Log to a daily file under the data dir; the TUI owns stdout.
/// Use RUST_LOG to control the level (e.g. RUST_LOG=olshconnect=debug).
fn init_tracing() -> Option<WorkerGuard> {
  let log_dir = dirs::data_dir()?.join("olshconnect").join("logs");
  let appender = tracing_appender::rolling::daily(log_dir, "olshconnect.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .with(filter)
    .init();

  Some(guard)
}

fn open_store(config: &config::Config, no_cache: bool) -> SharedStore {
  if no_cache || !config.cache.enabled {
    info!("Cache disabled");
    return Arc::new(NoopStore);
  }
  let opened = match &config.cache.path {
    Some(path) => SqliteStore::open_at(path),
    None => SqliteStore::open(),
  };
  match opened {
    Ok(store) => Arc::new(store),
    Err(e) => {
      // Cache for this session only
      warn!("Could not open cache database, using memory: {}", e);
      Arc::new(MemoryStore::new())
    }
  }
}

fn run_cache_command(school: &CachedSchoolClient, action: CacheAction) -> Result<()> {
  match action {
    CacheAction::Status => {
      for feature in Feature::ALL {
        let status = school.cache_status(feature);
        let state = match (status.present, status.age_ms) {
          (true, Some(age)) => format!(
            "{} ({})",
            age_display(age),
            if status.fresh { "fresh" } else { "stale" }
          ),
          _ => "empty".to_string(),
        };
        println!("{:<18} {}", feature.name(), state);
      }
    }
    CacheAction::Clear { feature } => {
      let feature = match feature {
        Some(name) => Some(
          Feature::from_name(&name).ok_or_else(|| eyre!("Unknown feature: {}", name))?,
        ),
        None => None,
      };
      for cleared in school.clear_cache(feature) {
        println!("Cleared {}", cleared.name());
      }
    }
  }
  Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _guard = init_tracing();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;
  let store = open_store(&config, args.no_cache);
  let school = CachedSchoolClient::new(SchoolClient::new(&config)?, store, config.cache.clone());

  if let Some(CliCommand::Cache { action }) = args.command {
    return run_cache_command(&school, action);
  }

  let page = match args.page.as_deref() {
    Some(name) => Some(app::resolve_page(name).ok_or_else(|| eyre!("Unknown page: {}", name))?),
    None => None,
  };

  info!(api = %config.api.base_url, "OLSHCOnnect starting");

  // Initialize and run the app
  let mut app = app::App::new(&config, school, page);
  app.run().await?;

  Ok(())
}
