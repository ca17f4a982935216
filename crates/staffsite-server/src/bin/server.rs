//! staffsite server binary.
//!
//! Reads `staffsite.toml` (or the path given with `--config`) overlaid by
//! `STAFFSITE_*` environment variables, validates it, opens the SQLite store
//! and serves the site backend over HTTP.
//!
//! # Provisioning
//!
//! ```text
//! server hash-password
//! server add-user --email jana@agency.example --name "Jana K." --role editor
//! ```

use std::{
  io::{self, BufRead, Write},
  path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use staffsite_core::{AppConfig, RawConfig, Role, store::NewUser, store::SiteStore, validate};
use staffsite_server::{AppState, auth::hash_password};
use staffsite_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "staffsite backend server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "staffsite.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve HTTP (the default).
  Serve,
  /// Print the argon2 hash for a password entered on stdin and exit.
  HashPassword,
  /// Create a user; the password is read from stdin.
  AddUser {
    #[arg(long)]
    email:      String,
    #[arg(long)]
    name:       String,
    #[arg(long)]
    role:       Role,
    #[arg(long)]
    department: Option<String>,
  },
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

  match cli.command.unwrap_or(Command::Serve) {
    Command::HashPassword => {
      let hash = hash_password(&read_password()?)?;
      println!("{hash}");
      Ok(())
    }
    Command::AddUser { email, name, role, department } => {
      let config = load_config(&cli.config)?;
      let store = open_store(&config).await?;
      let identity = store
        .create_user(NewUser {
          name,
          email,
          password_hash: hash_password(&read_password()?)?,
          role: role.to_string(),
          department,
        })
        .await
        .context("failed to create user")?;
      println!("{}", identity.id);
      Ok(())
    }
    Command::Serve => serve(load_config(&cli.config)?).await,
  }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
  let store = open_store(&config).await?;
  let address = config.bind_addr();
  tracing::info!(mode = %config.mode(), public_url = %config.public_url(), "starting");

  let app = staffsite_server::router(AppState::new(store, config));

  let listener = TcpListener::bind(address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;
  tracing::info!("Listening on http://{address}");

  axum::serve(listener, app).await.context("server error")?;
  Ok(())
}

/// Validate configuration once; any violation stops the process here.
fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
  let raw = RawConfig::load(path).context("failed to read configuration")?;
  validate(raw).context("configuration is invalid; refusing to start")
}

async fn open_store(config: &AppConfig) -> anyhow::Result<SqliteStore> {
  SqliteStore::connect(config.database_url())
    .await
    .with_context(|| format!("failed to open store at {:?}", config.database_url()))
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  eprint!("Password: ");
  io::stderr().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  let password = line.trim_end_matches(['\n', '\r']).to_string();
  anyhow::ensure!(!password.is_empty(), "password must not be empty");
  Ok(password)
}
