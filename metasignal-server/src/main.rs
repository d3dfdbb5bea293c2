//! metasignal server
//!
//! Indexes swaps of the configured pools, delivers them to the feeds of the
//! traders' followers and serves feeds and price quotes over HTTP.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::{ConfigLoader, get_database_url};
use metasignal_core::config::ConfigStore;
use metasignal_core::ledger::{FactoryDirectory, JsonRpcLedger};
use metasignal_core::processors::{PollScheduler, PoolDiscovery};
use metasignal_core::store::postgres::PgStore;
use server::{build_router, run_server};
use shutdown::spawn_config_reload_handler;
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// metasignal - swap feed indexer and quote service
#[derive(Parser, Debug)]
#[command(name = "metasignal-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./metasignal.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Run database migrations on startup
    #[arg(long, default_value = "false")]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();

    tracing::info!("Starting metasignal-server v{}", env!("CARGO_PKG_VERSION"));

    let config_loader = Arc::new(ConfigLoader::new(&args.config, args.listen));
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!(
        pools = loaded_config.pools.len(),
        "Configuration loaded from {:?}",
        args.config
    );

    let database_url = get_database_url().map_err(|e| {
        tracing::error!("DATABASE_URL environment variable not set");
        e
    })?;

    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    if args.migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&db_pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                e
            })?;
        tracing::info!("Migrations completed successfully");
    }

    let store = Arc::new(PgStore::new(
        db_pool.clone(),
        loaded_config.feed.retain_latest,
    ));
    let ledger = Arc::new(JsonRpcLedger::new(
        loaded_config.ledger.rpc_url.clone(),
        loaded_config.ledger.request_timeout,
    ));
    let pools = ConfigStore::new(loaded_config.pools.clone());

    // Polling pipeline
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = PollScheduler::new(
        ledger.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        loaded_config.scheduler.clone(),
    );
    let scheduler = match loaded_config.ledger.factory {
        Some(factory) => {
            tracing::info!(%factory, "Discovering pools from factory");
            scheduler.with_discovery(PoolDiscovery::new(Arc::new(FactoryDirectory::new(
                ledger.clone(),
                factory,
            ))))
        }
        None => scheduler,
    };
    let scheduler_handle = tokio::spawn(scheduler.run(shutdown_rx, pools.clone()));

    let reload_notify = spawn_config_reload_handler(config_loader, pools.clone());

    let state = AppState {
        feeds: store.clone(),
        registry: store.clone(),
        health: store,
        reserves: ledger,
        pools,
        fee: loaded_config.fee,
    };
    let router = build_router(state);

    tracing::info!("Starting HTTP server on {}", loaded_config.listen);
    let result = run_server(router, loaded_config.listen).await;

    // Stop background tasks
    reload_notify.notify_one();
    let _ = shutdown_tx.send(true);
    if let Err(e) = scheduler_handle.await {
        tracing::error!(error = %e, "PollScheduler task failed");
    }

    tracing::info!("Closing database connections...");
    db_pool.close().await;
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
