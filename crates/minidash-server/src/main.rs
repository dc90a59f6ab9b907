//! MiniDashboard backend.
//!
//! Serves the JSON-file item store over HTTP. The backing file is created
//! with sample data on first run.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use minidash_core::config::ServerConfig;
use minidash_core::server::serve_with_shutdown;
use minidash_core::JsonFileStore;

#[derive(Debug, Parser)]
#[command(name = "minidash-server", version, about = "Serve the MiniDashboard item catalog")]
struct Args {
    /// Address to listen on (overrides MINIDASH_BIND)
    #[arg(long)]
    bind: Option<String>,

    /// Path of the JSON backing file (overrides MINIDASH_DATA_FILE)
    #[arg(long)]
    data_file: Option<PathBuf>,
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    init_tracing();

    let mut config = ServerConfig::from_env();
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(data_file) = args.data_file {
        config.data_file = data_file;
    }

    info!(data_file = %config.data_file.display(), "MiniDashboard server starting");
    let store = JsonFileStore::open(&config.data_file)
        .with_context(|| format!("Failed to open store at {}", config.data_file.display()))?;

    serve_with_shutdown(Arc::new(store), &config.bind_addr, shutdown_signal())
        .await
        .with_context(|| format!("Server on {} failed", config.bind_addr))?;

    info!("MiniDashboard server stopped");
    Ok(())
}
