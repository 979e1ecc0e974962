use crate::auction::model::Amount;
use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};
use tracing::{info, warn};

/// Which persistence adapter the binary uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    File(PathBuf),
    Postgres(String),
}

impl StorageBackend {
    /// Log-safe description; never includes the database url.
    pub fn describe(&self) -> String {
        match self {
            StorageBackend::Memory => "memory".to_string(),
            StorageBackend::File(dir) => format!("file ({})", dir.display()),
            StorageBackend::Postgres(_) => "postgres".to_string(),
        }
    }
}

/// Store-level knobs.
#[derive(Debug, Clone)]
pub struct MarketSettings {
    /// Balance of a freshly registered account.
    pub starting_balance: Amount,
    /// How long an ended auction stays listed before the sweep prunes it.
    pub ended_retention: chrono::Duration,
    /// Simulated processing time of deposits and withdrawals.
    pub wallet_delay: Duration,
    pub sweep_interval: Duration,
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self {
            starting_balance: 1000,
            ended_retention: chrono::Duration::hours(1),
            wallet_delay: Duration::from_millis(2000),
            sweep_interval: Duration::from_millis(1000),
        }
    }
}

pub struct Config {
    pub port: u16,
    pub storage: StorageBackend,
    pub market: MarketSettings,
}

impl Config {
    pub fn load() -> Self {
        let defaults = MarketSettings::default();
        Self {
            port: try_load("AUCTION_PORT", 3000),
            storage: load_storage(),
            market: MarketSettings {
                starting_balance: try_load("AUCTION_STARTING_BALANCE", defaults.starting_balance),
                ended_retention: chrono::Duration::seconds(try_load(
                    "AUCTION_ENDED_RETENTION_SECS",
                    defaults.ended_retention.num_seconds(),
                )),
                wallet_delay: Duration::from_millis(try_load(
                    "AUCTION_WALLET_DELAY_MS",
                    defaults.wallet_delay.as_millis() as u64,
                )),
                sweep_interval: Duration::from_millis(try_load(
                    "AUCTION_SWEEP_INTERVAL_MS",
                    defaults.sweep_interval.as_millis() as u64,
                )),
            },
        }
    }
}

fn load_storage() -> StorageBackend {
    let kind: String = try_load("AUCTION_STORAGE", "file".to_string());
    match kind.as_str() {
        "memory" => StorageBackend::Memory,
        "postgres" => match var("DATABASE_URL") {
            Some(url) => StorageBackend::Postgres(url),
            None => {
                warn!("DATABASE_URL not set, falling back to file storage");
                file_backend()
            }
        },
        "file" => file_backend(),
        other => {
            warn!("Unknown AUCTION_STORAGE value {other}, using file storage");
            file_backend()
        }
    }
}

fn file_backend() -> StorageBackend {
    StorageBackend::File(PathBuf::from(try_load(
        "AUCTION_DATA_DIR",
        "./data".to_string(),
    )))
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    let Some(raw) = var(key) else {
        info!("{key} not set, using default: {default}");
        return default;
    };
    raw.parse().unwrap_or_else(|e| {
        warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
        default
    })
}
