// region:    --- Imports
use auction_market::clock::SystemClock;
use auction_market::config::{Config, StorageBackend};
use auction_market::handlers;
use auction_market::storage::{
    DatabaseManager, FileStorage, MemoryStorage, PostgresStorage, Storage,
};
use auction_market::Marketplace;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
// endregion: --- Imports

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    let config = Config::load();

    let storage = match open_storage(&config.storage).await {
        Ok(storage) => storage,
        Err(e) => {
            error!("{:<12} --> storage initialization failed: {:?}", "Main", e);
            return Err(e);
        }
    };
    info!(
        "{:<12} --> storage ready: {}",
        "Main",
        config.storage.describe()
    );

    let market = Marketplace::open(storage, Arc::new(SystemClock), config.market.clone()).await;

    let scheduler = market.scheduler();
    let _sweeper = scheduler.start();
    info!(
        "{:<12} --> status sweep every {:?}",
        "Main",
        scheduler.period()
    );

    let routes_all = handlers::router(market);

    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}

async fn open_storage(
    backend: &StorageBackend,
) -> Result<Arc<dyn Storage>, Box<dyn std::error::Error>> {
    let storage: Arc<dyn Storage> = match backend {
        StorageBackend::Memory => Arc::new(MemoryStorage::new()),
        StorageBackend::File(dir) => Arc::new(FileStorage::open(dir).await?),
        StorageBackend::Postgres(url) => {
            let db = Arc::new(DatabaseManager::connect(url).await?);
            db.initialize_database().await?;
            Arc::new(PostgresStorage::new(db))
        }
    };
    Ok(storage)
}
// endregion: --- Main
