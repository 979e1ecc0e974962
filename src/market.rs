// region:    --- Imports
use crate::account::model::User;
use crate::auction::model::Amount;
use crate::auction::{AuctionStore, SweepReport};
use crate::clock::Clock;
use crate::config::MarketSettings;
use crate::error::MarketError;
use crate::scheduler::AuctionScheduler;
use crate::storage::Storage;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;
// endregion: --- Imports

/// Shared handle to the auction store.
///
/// Every operation holds the store lock from start to finish, so operations
/// never interleave.
#[derive(Clone)]
pub struct Marketplace {
    store: Arc<Mutex<AuctionStore>>,
    wallet_delay: Duration,
    sweep_interval: Duration,
}

impl Marketplace {
    /// Loads (or seeds) the store from `storage`.
    pub async fn open(
        storage: Arc<dyn Storage>,
        clock: Arc<dyn Clock>,
        settings: MarketSettings,
    ) -> Self {
        let store = AuctionStore::load(storage, clock, &settings).await;
        Self::from_store(store, &settings)
    }

    pub fn from_store(store: AuctionStore, settings: &MarketSettings) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            wallet_delay: settings.wallet_delay,
            sweep_interval: settings.sweep_interval,
        }
    }

    /// Exclusive access to the store for the duration of the guard.
    pub async fn lock(&self) -> MutexGuard<'_, AuctionStore> {
        self.store.lock().await
    }

    pub async fn sweep(&self) -> Result<SweepReport, MarketError> {
        self.lock().await.sweep().await
    }

    /// Recurring sweep task bound to this marketplace.
    pub fn scheduler(&self) -> AuctionScheduler {
        AuctionScheduler::new(self.clone(), self.sweep_interval)
    }

    /// Simulated payment processing, then a credit to the session user.
    /// The delay is taken before the store lock, so other operations keep
    /// running meanwhile.
    pub async fn deposit(&self, amount: Amount) -> Result<User, MarketError> {
        info!("{:<12} --> processing deposit of {}", "Wallet", amount);
        tokio::time::sleep(self.wallet_delay).await;
        self.lock().await.deposit(amount).await
    }

    pub async fn withdraw(&self, amount: Amount) -> Result<User, MarketError> {
        info!("{:<12} --> processing withdrawal of {}", "Wallet", amount);
        tokio::time::sleep(self.wallet_delay).await;
        self.lock().await.withdraw(amount).await
    }
}
