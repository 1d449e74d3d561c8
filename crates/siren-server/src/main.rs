//! siren-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered under
//! `SIREN_*` environment variables, opens the SQLite store and media vault,
//! and serves the dispatch API over HTTP.
//!
//! # Token secret generation
//!
//! ```sh
//! cargo run -p siren-server -- --generate-secret
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use clap::Parser;
use rand_core::{OsRng, RngCore};
use siren_api::{AppState, vault::DiskMediaVault};
use siren_core::eta::StraightLineOracle;
use siren_server::{Oracle, OsrmOracle, ServerConfig};
use siren_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Siren emergency dispatch server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print a random token-signing secret and exit.
  #[arg(long)]
  generate_secret: bool,
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

  if cli.generate_secret {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    println!("{}", URL_SAFE_NO_PAD.encode(bytes));
    return Ok(());
  }

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("SIREN"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  let api_settings = server_cfg.api_settings().context("invalid configuration")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(dir) = store_path.parent().filter(|d| !d.as_os_str().is_empty()) {
    tokio::fs::create_dir_all(dir)
      .await
      .with_context(|| format!("failed to create {dir:?}"))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let media_dir = expand_tilde(&server_cfg.media_dir);
  tokio::fs::create_dir_all(&media_dir)
    .await
    .with_context(|| format!("failed to create media dir {media_dir:?}"))?;

  let oracle = match &server_cfg.oracle_url {
    Some(url) => {
      tracing::info!(%url, "using OSRM for ETAs");
      Oracle::Osrm(OsrmOracle::new(url.clone(), api_settings.eta.timeout)?)
    }
    None => {
      tracing::info!(speed_kmh = server_cfg.average_speed_kmh, "using straight-line ETAs");
      Oracle::StraightLine(StraightLineOracle::new(server_cfg.average_speed_kmh)?)
    }
  };

  let (state, worker) = AppState::new(
    Arc::new(store),
    Arc::new(oracle),
    Arc::new(DiskMediaVault::new(media_dir)),
    api_settings,
  );
  worker.spawn();

  let app = siren_api::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

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
