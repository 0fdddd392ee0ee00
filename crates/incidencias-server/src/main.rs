//! incidencias-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) plus
//! `INCIDENCIAS_*` environment variables, opens the SQLite store and serves
//! the REST API, uploaded photos and an optional static frontend.
//!
//! # Admin account
//!
//! Registration only creates `user` accounts. Seed an administrator with:
//!
//! ```
//! incidencias-server create-admin --username admin --password admin123
//! ```

mod settings;

use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use incidencias_api::{AppState, UploadDir};
use incidencias_core::{auth::AuthService, user::Role};
use incidencias_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::ServerConfig;

#[derive(Parser)]
#[command(author, version, about = "Incidencias incident-reporting server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: std::path::PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,
  /// Create an admin account if the username is free, then exit.
  CreateAdmin {
    #[arg(long, default_value = "admin")]
    username: String,
    #[arg(long, env = "INCIDENCIAS_ADMIN_PASSWORD")]
    password: String,
    #[arg(long, default_value = "Administrador Sistema")]
    name:     String,
  },
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
  let cfg = ServerConfig::load(&cli.config)?;

  let store = SqliteStore::open(&cfg.database_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.database_path))?;
  let store = Arc::new(store);

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(cfg, store).await,
    Command::CreateAdmin { username, password, name } => {
      let info = AuthService::new(store)
        .seed_admin(&username, &password, &name)
        .await
        .context("failed to create admin account")?;
      if info.role == Role::Admin {
        println!("admin account {:?} ready ({})", info.username, info.id);
      } else {
        println!("account {:?} already exists with role {:?}; left unchanged", info.username, info.role);
      }
      Ok(())
    }
  }
}

async fn serve(cfg: ServerConfig, store: Arc<SqliteStore>) -> anyhow::Result<()> {
  let uploads = UploadDir::create(&cfg.upload_dir, cfg.max_upload_bytes)
    .await
    .with_context(|| format!("failed to create upload dir {:?}", cfg.upload_dir))?;

  let state = AppState::new(store, uploads);
  let app = incidencias_api::router(state, cfg.static_dir.as_deref());
  let address = cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
