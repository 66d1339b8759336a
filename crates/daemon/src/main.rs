//! Waitline Daemon - Main Entry Point
//! Composition root: wires the store, queue service, RPC server and
//! background sweeper together.

mod notifier;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use waitline_api_rpc::{handler::RpcHandler, RpcServer, RpcServerConfig};
use waitline_core::application::{
    Broadcaster, GuestSweeper, NotificationService, QueueRouter, QueueService, WaitEstimator,
};
use waitline_core::port::code_provider::RandomCodeProvider;
use waitline_core::port::id_provider::UuidProvider;
use waitline_core::port::time_provider::SystemTimeProvider;
use waitline_core::port::{QueueStore, TransactionalQueueStore};
use waitline_infra_sqlite::{create_pool, run_migrations, SqliteQueueStore};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_DB_PATH: &str = "~/.waitline/waitline.db";

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize logging
    let log_format = std::env::var("WAITLINE_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .expect("Failed to create env filter");

    match log_format.as_str() {
        "json" => {
            // Production: JSON structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            // Development: Pretty formatting with colors
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }

    info!("Waitline v{} starting...", VERSION);

    // 2. Load configuration
    let db_path = std::env::var("WAITLINE_DB_PATH")
        .unwrap_or_else(|_| shellexpand::tilde(DEFAULT_DB_PATH).into_owned());

    let rpc_port: u16 = std::env::var("WAITLINE_RPC_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(9630);

    let lock_timeout_ms: u64 = std::env::var("WAITLINE_LOCK_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(5_000);

    let guest_sweep_hours: u64 = std::env::var("WAITLINE_GUEST_SWEEP_HOURS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(24);

    info!(db_path = %db_path, "Initializing database...");

    // 3. Initialize database
    let pool = create_pool(&db_path)
        .await
        .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    // 4. Setup dependencies (DI wiring)
    let sqlite_store = Arc::new(SqliteQueueStore::new(pool.clone()));
    let store: Arc<dyn QueueStore> = sqlite_store.clone();
    let tx_store: Arc<dyn TransactionalQueueStore> = sqlite_store;

    let time_provider = Arc::new(SystemTimeProvider);
    let id_provider = Arc::new(UuidProvider);
    let code_provider = Arc::new(RandomCodeProvider::default());

    let router = Arc::new(QueueRouter::new(Duration::from_millis(lock_timeout_ms)));
    let estimator = Arc::new(WaitEstimator::new(store.clone()));
    let broadcaster = Arc::new(Broadcaster::default());
    let notifications = Arc::new(NotificationService::new(
        store.clone(),
        Arc::new(notifier::TracingNotifier),
        id_provider.clone(),
        time_provider.clone(),
    ));

    let service = Arc::new(QueueService::new(
        store.clone(),
        tx_store,
        router,
        estimator,
        broadcaster.clone(),
        notifications,
        id_provider,
        code_provider,
        time_provider,
    ));

    // 5. Start background guest sweeper
    info!("Starting guest sweeper...");
    let sweeper = GuestSweeper::new(store.clone(), guest_sweep_hours);
    tokio::spawn(async move {
        sweeper.run().await;
    });

    // 6. Start JSON-RPC server
    info!("Starting JSON-RPC server...");
    let rpc_config = RpcServerConfig {
        port: rpc_port,
        ..Default::default()
    };
    let rpc_server = RpcServer::new(rpc_config, RpcHandler::new(service, broadcaster));
    let rpc_handle = rpc_server
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    info!("System ready. Waiting for requests...");
    info!("Press Ctrl+C to shutdown");

    // 7. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");

    // 8. Graceful shutdown. In-flight follow-up tasks only append history
    // or rewrite estimates, both safe to drop.
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    rpc_handle.stopped().await;

    info!("Shutdown complete.");

    Ok(())
}
