//! skyreplay server binary.
//!
//! Reads `skyreplay.toml` (or the path given with `--config`), opens the
//! SQLite sample store, starts the ingest poller and serves the replay API
//! under `/api`.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use axum::Router;
use clap::Parser;
use skyreplay_api::AppState;
use skyreplay_geo::BoundaryCache;
use skyreplay_server::{
  ServerConfig,
  feed::FeedClient,
  poller::{CycleOutcome, PollSettings, Poller},
};
use skyreplay_store_sqlite::SqliteStore;
use tokio::{net::TcpListener, sync::watch};
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Aircraft and ATC replay server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "skyreplay.toml")]
  config: PathBuf,

  /// Run a single ingest cycle and exit.
  #[arg(long)]
  once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("SKYREPLAY"))
    .build()
    .context("failed to read config file")?;

  let cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&cfg.store_path);

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let store = Arc::new(store);

  if cfg.boundary_sources.is_empty() {
    tracing::warn!("no boundary sources configured; pilots will not be labelled");
  }
  let boundaries = Arc::new(
    BoundaryCache::new(cfg.boundary_sources.clone(), cfg.boundary_timeout())
      .context("failed to build boundary client")?,
  );
  let feed = Arc::new(
    FeedClient::new(cfg.feed_url.clone(), cfg.feed_timeout(), cfg.feed_max_stale())
      .context("failed to build feed client")?,
  );

  let poller = Arc::new(Poller::new(store.clone(), feed, boundaries.clone(), PollSettings {
    interval:         cfg.poll_interval(),
    boundary_max_age: cfg.boundary_max_age(),
    retention:        cfg.retention(),
    prune_every:      cfg.prune_every,
  }));

  // Helper mode: one cycle and exit.
  if cli.once {
    return match poller.run_cycle().await {
      CycleOutcome::Ingested { timestamp, rows, origin } => {
        tracing::info!(timestamp, rows, ?origin, "single cycle complete");
        Ok(())
      }
      outcome => Err(anyhow::anyhow!("ingest cycle did not complete: {outcome:?}")),
    };
  }

  let (stop_tx, mut stop_rx) = watch::channel(false);
  let poll_task = tokio::spawn(poller.run(async move {
    let _ = stop_rx.changed().await;
  }));

  let app = Router::new()
    .nest("/api", skyreplay_api::api_router(AppState { store, boundaries }))
    .layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", cfg.host, cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      let _ = tokio::signal::ctrl_c().await;
      tracing::info!("shutting down");
    })
    .await
    .context("server error")?;

  let _ = stop_tx.send(true);
  poll_task.await.context("poller task panicked")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
