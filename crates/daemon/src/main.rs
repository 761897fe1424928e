//! Waitline Daemon - Main Entry Point
//! Wires the queue engine to a store and serves it over JSON-RPC

mod config;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{DaemonConfig, LogFormat, StoreKind};
use waitline_api_rpc::{RpcServer, RpcServerConfig};
use waitline_core::application::{QueueEngine, QueueEventHub};
use waitline_core::port::id_provider::UuidProvider;
use waitline_core::port::time_provider::SystemTimeProvider;
use waitline_core::port::QueueStore;
use waitline_infra_memory::InMemoryQueueStore;
use waitline_infra_sqlite::{create_pool, run_migrations, SqliteQueueStore};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration
    let config = DaemonConfig::from_env().context("Invalid daemon configuration")?;

    // 2. Initialize logging
    init_logging(config.log_format)?;

    info!("Waitline daemon v{} starting...", VERSION);

    // 3. Open the queue store
    let store = open_store(&config).await?;

    // 4. Setup dependencies (DI wiring)
    let events = Arc::new(QueueEventHub::new(config.event_capacity));
    let engine = Arc::new(QueueEngine::new(
        store,
        Arc::new(UuidProvider),
        Arc::new(SystemTimeProvider),
        events.clone(),
    ));

    // 5. Start JSON-RPC server
    let rpc_config = RpcServerConfig {
        host: config.rpc_host.clone(),
        port: config.rpc_port,
        require_host_token: config.require_host_token,
    };
    let (rpc_handle, addr) = RpcServer::new(rpc_config, engine, events)
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    info!(addr = %addr, "System ready. Press Ctrl+C to shutdown");

    // 6. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");

    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    rpc_handle.stopped().await;

    info!("Shutdown complete.");

    Ok(())
}

fn init_logging(format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("waitline=info"))
        .context("Failed to create env filter")?;

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty())
            .init(),
    }
    Ok(())
}

async fn open_store(config: &DaemonConfig) -> Result<Arc<dyn QueueStore>> {
    match &config.store {
        StoreKind::Memory => {
            info!("Using in-memory queue store (state is lost on exit)");
            Ok(Arc::new(InMemoryQueueStore::new(config.lock_timeout)))
        }
        StoreKind::Sqlite { db_path } => {
            info!(db_path = %db_path, "Initializing database...");

            if let Some(parent) = Path::new(db_path).parent() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory {}", parent.display())
                })?;
            }

            let pool = create_pool(db_path)
                .await
                .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
            run_migrations(&pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

            Ok(Arc::new(SqliteQueueStore::new(pool, config.lock_timeout)))
        }
    }
}
