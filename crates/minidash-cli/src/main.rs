//! MiniDashboard client - browse and edit the item catalog.
//!
//! Reads go through the offline snapshot, so `minidash list` keeps working
//! while the backend is down. Writes always need the backend.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use minidash_core::config::ClientConfig;
use minidash_core::utils::{format_price, truncate_string};
use minidash_core::{
    ApiClient, CacheManager, CachedData, Dashboard, DashboardState, Item, ResilientClient,
};

/// Column width for item names in list output.
const NAME_WIDTH: usize = 24;

/// Column width for descriptions in list output.
const DESCRIPTION_WIDTH: usize = 36;

#[derive(Debug, Parser)]
#[command(name = "minidash", version, about = "Browse and edit the MiniDashboard catalog")]
struct Cli {
    /// Backend base URL (overrides config and MINIDASH_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List items, optionally filtered by name
    List {
        #[arg(long, short)]
        search: Option<String>,
    },
    /// Show one item
    Get { id: i64 },
    /// Create an item
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        price: Decimal,
    },
    /// Change an existing item
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        price: Option<Decimal>,
    },
    /// Delete an item
    Delete { id: i64 },
    /// Show the client configuration, or change the saved backend URL
    Config {
        #[arg(long)]
        set_url: Option<String>,
    },
}

/// Log to a daily file in the cache directory so stdout stays clean.
fn init_tracing(log_dir: &Path) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(log_dir, "minidash.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();
    guard
}

fn print_items(state: &DashboardState) {
    println!(
        "{:>5}  {:<name$}  {:<desc$}  {:>10}",
        "ID",
        "NAME",
        "DESCRIPTION",
        "PRICE",
        name = NAME_WIDTH,
        desc = DESCRIPTION_WIDTH
    );
    for item in &state.items {
        println!(
            "{:>5}  {:<name$}  {:<desc$}  {:>10}",
            item.id,
            truncate_string(&item.name, NAME_WIDTH),
            truncate_string(&item.description, DESCRIPTION_WIDTH),
            format_price(&item.price),
            name = NAME_WIDTH,
            desc = DESCRIPTION_WIDTH
        );
    }
    if let Some(cached_at) = state.stale_since {
        let snapshot = CachedData { data: (), cached_at };
        println!(
            "(offline - backend unreachable, showing items last updated {})",
            snapshot.age_display()
        );
        if snapshot.is_stale() {
            println!("(warning: snapshot is more than an hour old)");
        }
    }
}

fn print_item(item: &Item) {
    println!("Id:          {}", item.id);
    println!("Name:        {}", item.name);
    println!("Description: {}", item.description);
    println!("Price:       {}", format_price(&item.price));
}

fn configure(mut config: ClientConfig, set_url: Option<String>) -> Result<()> {
    if let Some(url) = set_url {
        config.base_url = url;
        config.save()?;
        println!("Saved backend URL {}", config.base_url);
    }
    println!("Backend URL: {}", config.base_url);
    let cache_dir = config.cache_dir()?;
    println!("Cache dir:   {}", cache_dir.display());
    println!("Timeout:     {}s", config.request_timeout_secs);
    println!("Snapshot:    {}", CacheManager::new(cache_dir)?.items_age());
    Ok(())
}

async fn run(command: Command, config: ClientConfig, dashboard: &Dashboard<ApiClient>) -> Result<()> {
    match command {
        Command::List { search } => {
            match search.as_deref() {
                Some(text) => dashboard.search(text).await?,
                None => dashboard.load().await?,
            };
            print_items(&dashboard.snapshot().await);
        }
        Command::Get { id } => {
            let item = dashboard.client().get_item(id).await?;
            print_item(&item);
        }
        Command::Add {
            name,
            description,
            price,
        } => {
            let created = dashboard.add(&name, &description, price).await?;
            println!("Created item {}", created.id);
            print_item(&created);
        }
        Command::Update {
            id,
            name,
            description,
            price,
        } => {
            let mut item = dashboard.client().get_item(id).await?;
            if let Some(name) = name {
                item.name = name;
            }
            if let Some(description) = description {
                item.description = description;
            }
            if let Some(price) = price {
                item.price = price;
            }
            dashboard.update(item.clone()).await?;
            println!("Updated item {}", id);
            print_item(&item);
        }
        Command::Delete { id } => {
            dashboard.delete_id(id).await?;
            println!("Deleted item {}", id);
        }
        Command::Config { set_url } => configure(config, set_url)?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = ClientConfig::load()?;
    if let Some(ref url) = cli.api_url {
        config.base_url = url.clone();
    }
    let cache_dir = config.cache_dir()?;
    let cache = CacheManager::new(cache_dir.clone())?;
    let _log_guard = init_tracing(&cache_dir);
    info!(base_url = %config.base_url, "MiniDashboard client starting");

    let api = ApiClient::with_timeout(
        config.base_url.clone(),
        std::time::Duration::from_secs(config.request_timeout_secs),
    )
    .context("Failed to build HTTP client")?;
    let dashboard = Dashboard::new(ResilientClient::new(api, cache));

    if let Err(e) = run(cli.command, config, &dashboard).await {
        eprintln!("Error: {}", e);
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
