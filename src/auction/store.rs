/// Auction lifecycle, bidding, deletion with refunds, notifications and the
/// wallet. Owns the account store so that balance changes and auction
/// changes are committed together.
// region:    --- Imports
use super::model::{Amount, Auction, AuctionId, AuctionStatus, Bid, NewAuction, UserId};
use super::seed::sample_auctions;
use crate::account::model::User;
use crate::account::UserStore;
use crate::clock::Clock;
use crate::config::MarketSettings;
use crate::error::MarketError;
use crate::new_id;
use crate::notification::Notification;
use crate::query::{self, AuctionFilter, MarketStats};
use crate::storage::{
    load_typed, Storage, WriteBatch, AUCTIONS_KEY, BIDS_KEY, NOTIFICATIONS_KEY,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
// endregion: --- Imports

// region:    --- Reports
/// Outcome of one status sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub activated: Vec<AuctionId>,
    pub ended: Vec<AuctionId>,
    pub pruned: Vec<AuctionId>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.activated.is_empty() && self.ended.is_empty() && self.pruned.is_empty()
    }
}

/// Money returned to one bidder when an auction is deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Refund {
    pub user_id: UserId,
    pub amount: Amount,
}
// endregion: --- Reports

// region:    --- Auction Store
pub struct AuctionStore {
    auctions: Vec<Auction>,
    bids: Vec<Bid>,
    notifications: Vec<Notification>,
    accounts: UserStore,
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    ended_retention: chrono::Duration,
}

impl AuctionStore {
    /// Loads every collection from storage, seeding the sample auctions on
    /// first run.
    pub async fn load(
        storage: Arc<dyn Storage>,
        clock: Arc<dyn Clock>,
        settings: &MarketSettings,
    ) -> Self {
        let accounts = UserStore::load(
            Arc::clone(&storage),
            Arc::clone(&clock),
            settings.starting_balance,
        )
        .await;
        Self::with_accounts(accounts, storage, clock, settings).await
    }

    /// Like `load`, with an account store prepared by the caller (for
    /// example one with a custom credential verifier).
    pub async fn with_accounts(
        accounts: UserStore,
        storage: Arc<dyn Storage>,
        clock: Arc<dyn Clock>,
        settings: &MarketSettings,
    ) -> Self {
        let mut store = Self {
            auctions: Vec::new(),
            bids: Vec::new(),
            notifications: Vec::new(),
            accounts,
            storage,
            clock,
            ended_retention: settings.ended_retention,
        };
        store.load_collections().await;
        store
    }

    async fn load_collections(&mut self) {
        self.auctions = match load_typed(&*self.storage, AUCTIONS_KEY).await {
            Some(auctions) => auctions,
            None => self.seed().await,
        };
        self.bids = load_typed(&*self.storage, BIDS_KEY)
            .await
            .unwrap_or_default();
        self.notifications = load_typed(&*self.storage, NOTIFICATIONS_KEY)
            .await
            .unwrap_or_default();
        info!(
            "{:<12} --> loaded {} auctions, {} bids, {} notifications",
            "Auction",
            self.auctions.len(),
            self.bids.len(),
            self.notifications.len()
        );
    }

    async fn seed(&self) -> Vec<Auction> {
        let auctions = sample_auctions(self.clock.now());
        let mut batch = WriteBatch::new();
        let persisted = match batch.put(AUCTIONS_KEY, &auctions) {
            Ok(()) => self.storage.apply(batch).await,
            Err(e) => Err(e),
        };
        match persisted {
            Ok(()) => info!("{:<12} --> seeded {} sample auctions", "Auction", auctions.len()),
            Err(e) => warn!("{:<12} --> sample auctions not persisted: {}", "Auction", e),
        }
        auctions
    }

    /// Reloads accounts and collections from storage.
    pub async fn refresh(&mut self) {
        self.accounts.reload().await;
        self.load_collections().await;
    }

    // region:    --- Accessors
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn accounts(&self) -> &UserStore {
        &self.accounts
    }

    pub fn accounts_mut(&mut self) -> &mut UserStore {
        &mut self.accounts
    }

    pub fn auctions(&self) -> &[Auction] {
        &self.auctions
    }

    pub fn auction(&self, auction_id: &str) -> Option<&Auction> {
        self.auctions.iter().find(|a| a.id == auction_id)
    }

    pub fn bids(&self) -> &[Bid] {
        &self.bids
    }

    /// Every notification, for every user.
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Notifications addressed to the session user; empty when logged out.
    pub fn current_notifications(&self) -> Vec<&Notification> {
        match self.accounts.current_user() {
            Some(user) => self
                .notifications
                .iter()
                .filter(|n| n.user_id == user.id)
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn unread_count(&self) -> usize {
        self.current_notifications()
            .iter()
            .filter(|n| !n.read)
            .count()
    }

    pub fn search(&self, filter: &AuctionFilter) -> Vec<&Auction> {
        query::filter_auctions(&self.auctions, filter)
    }

    pub fn categories(&self) -> Vec<String> {
        query::categories(&self.auctions)
    }

    pub fn stats(&self) -> MarketStats {
        MarketStats::collect(&self.auctions, &self.bids)
    }

    /// Bids on one auction, most recent first.
    pub fn auction_bids(&self, auction_id: &str) -> Vec<Bid> {
        let mut bids: Vec<Bid> = self
            .bids
            .iter()
            .filter(|b| b.auction_id == auction_id)
            .cloned()
            .collect();
        bids.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        bids
    }
    // endregion: --- Accessors

    /// 1. Create auction
    /// Trusts the caller: validation happens before `NewAuction` is built.
    pub async fn create_auction(&mut self, new: NewAuction) -> Result<Auction, MarketError> {
        let auction = Auction::open(new_id(), new, self.clock.now());

        let mut auctions = self.auctions.clone();
        auctions.push(auction.clone());

        let mut batch = WriteBatch::new();
        batch.put(AUCTIONS_KEY, &auctions)?;
        self.storage.apply(batch).await?;

        self.auctions = auctions;
        info!(
            "{:<12} --> created auction {} \"{}\" ({:?})",
            "Auction", auction.id, auction.title, auction.status
        );
        Ok(auction)
    }

    /// 2. Place bid
    pub async fn place_bid(&mut self, auction_id: &str, amount: Amount) -> Result<Bid, MarketError> {
        let bidder = self.accounts.require_user()?.clone();
        info!(
            "{:<12} --> bid of {} on {} by {}",
            "Auction", amount, auction_id, bidder.username
        );

        let index = self
            .auctions
            .iter()
            .position(|a| a.id == auction_id)
            .ok_or_else(|| MarketError::AuctionNotFound(auction_id.to_string()))?;
        let auction = &self.auctions[index];

        if auction.status != AuctionStatus::Active {
            return Err(MarketError::AuctionNotActive(auction_id.to_string()));
        }
        if amount <= auction.current_bid {
            return Err(MarketError::BidTooLow {
                amount,
                current: auction.current_bid,
            });
        }
        if bidder.balance < amount {
            return Err(MarketError::InsufficientBalance {
                balance: bidder.balance,
                amount,
            });
        }

        let now = self.clock.now();
        let mut accounts = self.accounts.stage();
        let mut notifications = self.notifications.clone();

        accounts.set_balance(&bidder.id, bidder.balance - amount);

        if let Some(previous) = auction.highest_bidder.as_deref() {
            if previous != bidder.id {
                if accounts.credit(previous, auction.current_bid)? {
                    notifications.push(Notification::outbid(
                        new_id(),
                        previous.to_string(),
                        auction.id.clone(),
                        &auction.title,
                        now,
                    ));
                } else {
                    warn!(
                        "{:<12} --> outbid account {} no longer exists, no refund",
                        "Auction", previous
                    );
                }
            }
        }

        let bid = Bid {
            id: new_id(),
            auction_id: auction.id.clone(),
            user_id: bidder.id.clone(),
            username: bidder.username.clone(),
            amount,
            timestamp: now,
        };

        let mut auctions = self.auctions.clone();
        auctions[index].current_bid = amount;
        auctions[index].highest_bidder = Some(bidder.id.clone());

        let mut bids = self.bids.clone();
        bids.push(bid.clone());

        let mut batch = WriteBatch::new();
        self.accounts.write_into(&accounts, &mut batch)?;
        batch.put(AUCTIONS_KEY, &auctions)?;
        batch.put(BIDS_KEY, &bids)?;
        batch.put(NOTIFICATIONS_KEY, &notifications)?;
        self.storage.apply(batch).await?;

        self.accounts.install(accounts);
        self.auctions = auctions;
        self.bids = bids;
        self.notifications = notifications;
        info!(
            "{:<12} --> bid accepted: {} is now {}",
            "Auction", auction_id, amount
        );
        Ok(bid)
    }

    /// 3. Delete auction
    /// Owner or admin only. Every distinct bidder gets their highest bid on
    /// the auction back, then the auction and its bids are removed.
    pub async fn delete_auction(&mut self, auction_id: &str) -> Result<Vec<Refund>, MarketError> {
        let user = self.accounts.require_user()?;
        let auction = self
            .auction(auction_id)
            .ok_or_else(|| MarketError::AuctionNotFound(auction_id.to_string()))?;

        if !user.is_admin() && auction.created_by != user.id {
            warn!(
                "{:<12} --> {} may not delete auction {}",
                "Auction", user.username, auction_id
            );
            return Err(MarketError::PermissionDenied);
        }

        // highest bid per bidder, in first-bid order
        let mut highest: Vec<Refund> = Vec::new();
        for bid in self.bids.iter().filter(|b| b.auction_id == auction_id) {
            match highest.iter_mut().find(|r| r.user_id == bid.user_id) {
                Some(refund) => refund.amount = refund.amount.max(bid.amount),
                None => highest.push(Refund {
                    user_id: bid.user_id.clone(),
                    amount: bid.amount,
                }),
            }
        }

        let now = self.clock.now();
        let mut accounts = self.accounts.stage();
        let mut notifications = self.notifications.clone();
        let mut refunds = Vec::with_capacity(highest.len());
        for refund in highest {
            if !accounts.credit(&refund.user_id, refund.amount)? {
                warn!(
                    "{:<12} --> bidder {} no longer exists, no refund",
                    "Auction", refund.user_id
                );
                continue;
            }
            notifications.push(Notification::refunded(
                new_id(),
                refund.user_id.clone(),
                auction.id.clone(),
                &auction.title,
                refund.amount,
                now,
            ));
            refunds.push(refund);
        }

        let auctions: Vec<Auction> = self
            .auctions
            .iter()
            .filter(|a| a.id != auction_id)
            .cloned()
            .collect();
        let bids: Vec<Bid> = self
            .bids
            .iter()
            .filter(|b| b.auction_id != auction_id)
            .cloned()
            .collect();

        let mut batch = WriteBatch::new();
        self.accounts.write_into(&accounts, &mut batch)?;
        batch.put(AUCTIONS_KEY, &auctions)?;
        batch.put(BIDS_KEY, &bids)?;
        batch.put(NOTIFICATIONS_KEY, &notifications)?;
        self.storage.apply(batch).await?;

        self.accounts.install(accounts);
        self.auctions = auctions;
        self.bids = bids;
        self.notifications = notifications;
        info!(
            "{:<12} --> deleted auction {}, {} bidders refunded",
            "Auction",
            auction_id,
            refunds.len()
        );
        Ok(refunds)
    }

    /// 4. Remove ended auctions
    /// Drops every ended auction and its bids. No refunds: ended auctions
    /// have already settled their winner.
    pub async fn remove_ended_auctions(&mut self) -> Result<Vec<AuctionId>, MarketError> {
        let removed: HashSet<AuctionId> = self
            .auctions
            .iter()
            .filter(|a| a.status == AuctionStatus::Ended)
            .map(|a| a.id.clone())
            .collect();
        if removed.is_empty() {
            return Ok(Vec::new());
        }

        let ids = self.remove_auctions(&removed).await?;
        info!("{:<12} --> removed {} ended auctions", "Auction", ids.len());
        Ok(ids)
    }

    /// Removes the given auctions and their bids without touching balances.
    /// Returns the removed ids in listing order.
    async fn remove_auctions(
        &mut self,
        removed: &HashSet<AuctionId>,
    ) -> Result<Vec<AuctionId>, MarketError> {
        let (gone, kept): (Vec<Auction>, Vec<Auction>) = self
            .auctions
            .iter()
            .cloned()
            .partition(|a| removed.contains(&a.id));
        let bids: Vec<Bid> = self
            .bids
            .iter()
            .filter(|b| !removed.contains(&b.auction_id))
            .cloned()
            .collect();

        let mut batch = WriteBatch::new();
        batch.put(AUCTIONS_KEY, &kept)?;
        batch.put(BIDS_KEY, &bids)?;
        self.storage.apply(batch).await?;

        self.auctions = kept;
        self.bids = bids;
        Ok(gone.into_iter().map(|a| a.id).collect())
    }

    /// 5. Status sweep
    /// Advances every auction's status to match the clock, notifies winners
    /// of auctions that just ended, and prunes auctions that ended longer
    /// ago than the retention period. Pruning never refunds.
    pub async fn sweep(&mut self) -> Result<SweepReport, MarketError> {
        let now = self.clock.now();
        let mut report = SweepReport::default();
        let mut auctions = self.auctions.clone();
        let mut notifications = self.notifications.clone();

        for auction in auctions.iter_mut() {
            let next = auction
                .status
                .advance(now, auction.start_time, auction.end_time);
            if next == auction.status {
                continue;
            }

            if auction.status == AuctionStatus::Upcoming {
                report.activated.push(auction.id.clone());
            }
            if next == AuctionStatus::Ended {
                report.ended.push(auction.id.clone());
                if let Some(winner) = auction.highest_bidder.clone() {
                    notifications.push(Notification::won(
                        new_id(),
                        winner,
                        auction.id.clone(),
                        &auction.title,
                        auction.current_bid,
                        now,
                    ));
                }
            }
            auction.status = next;
        }

        let retention = self.ended_retention;
        let pruned: HashSet<AuctionId> = auctions
            .iter()
            .filter(|a| a.status == AuctionStatus::Ended && now - a.end_time > retention)
            .map(|a| a.id.clone())
            .collect();

        if report.is_empty() && pruned.is_empty() {
            return Ok(report);
        }

        let notified = notifications.len() != self.notifications.len();
        let mut batch = WriteBatch::new();
        let bids: Vec<Bid>;
        if pruned.is_empty() {
            bids = self.bids.clone();
        } else {
            report.pruned = auctions
                .iter()
                .filter(|a| pruned.contains(&a.id))
                .map(|a| a.id.clone())
                .collect();
            auctions.retain(|a| !pruned.contains(&a.id));
            bids = self
                .bids
                .iter()
                .filter(|b| !pruned.contains(&b.auction_id))
                .cloned()
                .collect();
            batch.put(BIDS_KEY, &bids)?;
        }
        batch.put(AUCTIONS_KEY, &auctions)?;
        if notified {
            batch.put(NOTIFICATIONS_KEY, &notifications)?;
        }
        self.storage.apply(batch).await?;

        self.auctions = auctions;
        self.bids = bids;
        self.notifications = notifications;

        for id in &report.activated {
            info!("{:<12} --> auction {} is now active", "Auction", id);
        }
        for id in &report.ended {
            info!("{:<12} --> auction {} has ended", "Auction", id);
        }
        for id in &report.pruned {
            info!("{:<12} --> pruned ended auction {}", "Auction", id);
        }
        debug!("{:<12} --> sweep: {:?}", "Auction", report);
        Ok(report)
    }

    /// 6. Mark notification read
    /// Unknown ids are ignored.
    pub async fn mark_notification_read(&mut self, notification_id: &str) -> Result<(), MarketError> {
        let Some(index) = self
            .notifications
            .iter()
            .position(|n| n.id == notification_id)
        else {
            debug!(
                "{:<12} --> notification {} not found",
                "Auction", notification_id
            );
            return Ok(());
        };
        if self.notifications[index].read {
            return Ok(());
        }

        let mut notifications = self.notifications.clone();
        notifications[index].read = true;

        let mut batch = WriteBatch::new();
        batch.put(NOTIFICATIONS_KEY, &notifications)?;
        self.storage.apply(batch).await?;

        self.notifications = notifications;
        Ok(())
    }

    /// 7. Deposit
    /// Credits the session user and confirms with a notification.
    pub async fn deposit(&mut self, amount: Amount) -> Result<User, MarketError> {
        if amount == 0 {
            return Err(MarketError::InvalidAmount);
        }
        let user = self.accounts.require_user()?.clone();

        let mut accounts = self.accounts.stage();
        accounts.credit(&user.id, amount)?;
        let mut notifications = self.notifications.clone();
        notifications.push(Notification::deposit_confirmed(
            new_id(),
            user.id.clone(),
            amount,
            self.clock.now(),
        ));

        let mut batch = WriteBatch::new();
        self.accounts.write_into(&accounts, &mut batch)?;
        batch.put(NOTIFICATIONS_KEY, &notifications)?;
        self.storage.apply(batch).await?;

        self.accounts.install(accounts);
        self.notifications = notifications;
        info!("{:<12} --> {} deposited {}", "Auction", user.username, amount);
        self.accounts.require_user().cloned()
    }

    /// 8. Withdraw
    pub async fn withdraw(&mut self, amount: Amount) -> Result<User, MarketError> {
        if amount == 0 {
            return Err(MarketError::InvalidAmount);
        }
        let user = self.accounts.require_user()?;
        if amount > user.balance {
            return Err(MarketError::InsufficientBalance {
                balance: user.balance,
                amount,
            });
        }
        let remaining = user.balance - amount;
        let updated = self.accounts.update_balance(remaining).await?;
        info!("{:<12} --> {} withdrew {}", "Auction", updated.username, amount);
        Ok(updated)
    }
}
// endregion: --- Auction Store
