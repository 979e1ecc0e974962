/// Auction status scheduler.
/// Drives the store's sweep on a fixed interval: upcoming auctions open,
/// active auctions close, long-ended auctions are pruned.
// region:    --- Imports
use crate::auction::SweepReport;
use crate::error::MarketError;
use crate::market::Marketplace;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error};

// endregion: --- Imports

// region:    --- Auction Scheduler
pub struct AuctionScheduler {
    market: Marketplace,
    period: Duration,
}

impl AuctionScheduler {
    pub fn new(market: Marketplace, period: Duration) -> Self {
        Self { market, period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Spawns the recurring sweep. Abort the returned handle to stop it.
    pub fn start(&self) -> JoinHandle<()> {
        let market = self.market.clone();
        let period = self.period;
        tokio::spawn(async move {
            let mut interval = interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if let Err(e) = market.sweep().await {
                    error!(
                        "{:<12} --> auction status sweep failed: {:?}",
                        "Scheduler", e
                    );
                }
            }
        })
    }

    /// Runs exactly one sweep.
    pub async fn tick(&self) -> Result<SweepReport, MarketError> {
        let report = self.market.sweep().await?;
        debug!("{:<12} --> manual tick: {:?}", "Scheduler", report);
        Ok(report)
    }
}
// endregion: --- Auction Scheduler
