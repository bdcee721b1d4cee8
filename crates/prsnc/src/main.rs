//! prsnc - realtime presence and chat gateway.
//!
//! ## Configuration
//!
//! Loaded from `prsnc.toml` (or `--config`), with `PRSNC`-prefixed
//! environment overrides (`__` as separator):
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8090
//!
//! [auth]
//! jwt_secret = "env:PRSNC_JWT_SECRET"
//! handshake_timeout_secs = 10
//!
//! [[directory.users]]
//! id = "u1"
//! display_name = "Alice"
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Run with the default config path (./prsnc.toml, created on first run)
//! prsnc
//!
//! # Custom config and listener
//! prsnc --config /etc/prsnc/config.toml --port 9000
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use prsnc::api::{AppState, build_router};
use prsnc::auth::TokenVerifier;
use prsnc::config::{self, AppConfig};
use prsnc::directory::StaticDirectory;

/// Realtime presence and chat gateway.
#[derive(Debug, Parser)]
#[command(name = "prsnc", version)]
struct Opts {
    /// Path to the config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the listener host.
    #[arg(long)]
    host: Option<String>,

    /// Override the listener port.
    #[arg(long)]
    port: Option<u16>,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let opts = Opts::parse();
    init_logging(opts.verbose);

    let config = load_config(&opts)?;
    config
        .auth
        .validate()
        .context("invalid auth configuration")?;
    let secret = config
        .auth
        .resolve_jwt_secret()?
        .context("jwt secret vanished after validation")?;

    let directory = Arc::new(StaticDirectory::new(&config.directory.users));
    let state = AppState::new(
        TokenVerifier::new(&secret),
        directory,
        Duration::from_secs(config.auth.handshake_timeout_secs),
    );
    let app = build_router(state, &config.auth.allowed_origins);

    let host = opts.host.unwrap_or(config.server.host);
    let port = opts.port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

fn load_config(opts: &Opts) -> Result<AppConfig> {
    let path = match &opts.config {
        Some(path) => path.clone(),
        None => {
            // Seed a commented default next to the binary's working dir so a
            // first run has something to edit.
            let path = PathBuf::from("prsnc.toml");
            config::write_default_config(&path)?;
            path
        }
    };
    config::load_config(&path)
}

fn init_logging(verbose: u8) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("prsnc={level},tower_http={level}")));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .ok();

    // Also init env_logger for compatibility with log crate users
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .try_init()
        .ok();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", err);
    }
}
