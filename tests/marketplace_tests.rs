use auction_market::account::model::{Role, User};
use auction_market::account::{CredentialVerifier, UserStore};
use auction_market::auction::model::{AuctionStatus, NewAuction};
use auction_market::auction::{AuctionStore, Refund};
use auction_market::clock::{Clock, ManualClock};
use auction_market::config::MarketSettings;
use auction_market::notification::NotificationKind;
use auction_market::storage::{
    FileStorage, MemoryStorage, Storage, AUCTIONS_KEY, BIDS_KEY, CURRENT_USER_KEY,
};
use auction_market::{MarketError, Marketplace};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;
use std::sync::Arc;

// region:    --- Fixtures
fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

struct Harness {
    storage: Arc<MemoryStorage>,
    clock: Arc<ManualClock>,
    store: AuctionStore,
}

async fn harness() -> Harness {
    let storage = Arc::new(MemoryStorage::new());
    let clock = Arc::new(ManualClock::new(t0()));
    let store = AuctionStore::load(storage.clone(), clock.clone(), &MarketSettings::default()).await;
    Harness {
        storage,
        clock,
        store,
    }
}

impl Harness {
    /// Registers (and thereby logs in) a user with the given balance.
    async fn signup(&mut self, username: &str, balance: u64) -> User {
        self.store
            .accounts_mut()
            .register(username, &format!("{username}@example.com"), "secret")
            .await
            .unwrap();
        self.store
            .accounts_mut()
            .update_balance(balance)
            .await
            .unwrap()
    }

    async fn login(&mut self, username: &str) {
        self.store
            .accounts_mut()
            .login(username, "whatever")
            .await
            .unwrap();
    }

    fn balance(&self, user_id: &str) -> u64 {
        self.store.accounts().find(user_id).unwrap().balance
    }

    /// Lists an auction owned by `owner` that starts now and runs two hours.
    async fn list(&mut self, owner: &str, starting_bid: u64) -> String {
        let now = self.clock.now();
        self.list_window(owner, starting_bid, now, now + Duration::hours(2))
            .await
    }

    async fn list_window(
        &mut self,
        owner: &str,
        starting_bid: u64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> String {
        let auction = self
            .store
            .create_auction(NewAuction {
                title: "Brass Telescope".into(),
                description: "Victorian brass telescope".into(),
                image_url: "https://example.com/telescope.jpg".into(),
                starting_bid,
                start_time: start,
                end_time: end,
                created_by: owner.into(),
                category: "Antiques".into(),
            })
            .await
            .unwrap();
        auction.id
    }

    fn assert_bids_never_below_start(&self) {
        for auction in self.store.auctions() {
            assert!(auction.current_bid >= auction.starting_bid, "{auction:?}");
        }
    }
}
// endregion: --- Fixtures

// region:    --- Bidding
/// Walks the reference scenario: two bidders, one rejected low bid, one
/// outbid refund.
#[tokio::test]
async fn two_bidders_with_outbid_refund() {
    let mut h = harness().await;
    let owner = h.signup("seller", 1000).await;
    let auction_id = h.list(&owner.id, 100).await;
    let a = h.signup("alice", 500).await;
    let b = h.signup("bob", 500).await;

    h.login("alice").await;
    h.store.place_bid(&auction_id, 150).await.unwrap();
    let auction = h.store.auction(&auction_id).unwrap();
    assert_eq!(auction.current_bid, 150);
    assert_eq!(auction.highest_bidder.as_deref(), Some(a.id.as_str()));
    assert_eq!(h.balance(&a.id), 350);

    h.clock.advance(Duration::seconds(5));
    h.login("bob").await;
    let err = h.store.place_bid(&auction_id, 120).await.unwrap_err();
    assert!(matches!(
        err,
        MarketError::BidTooLow {
            amount: 120,
            current: 150
        }
    ));
    assert_eq!(h.store.auction(&auction_id).unwrap().current_bid, 150);
    assert_eq!(h.balance(&b.id), 500);
    assert_eq!(h.store.auction_bids(&auction_id).len(), 1);

    h.store.place_bid(&auction_id, 200).await.unwrap();
    let auction = h.store.auction(&auction_id).unwrap();
    assert_eq!(auction.current_bid, 200);
    assert_eq!(auction.highest_bidder.as_deref(), Some(b.id.as_str()));
    assert_eq!(h.balance(&b.id), 300);
    assert_eq!(h.balance(&a.id), 500);

    let outbid: Vec<_> = h
        .store
        .notifications()
        .iter()
        .filter(|n| matches!(n.kind, NotificationKind::BidOutbid { .. }))
        .collect();
    assert_eq!(outbid.len(), 1);
    assert_eq!(outbid[0].user_id, a.id);
    assert_eq!(outbid[0].kind.auction_id(), Some(auction_id.as_str()));

    let history = h.store.auction_bids(&auction_id);
    assert_eq!(
        history.iter().map(|b| b.amount).collect::<Vec<_>>(),
        vec![200, 150]
    );
    assert_eq!(history[0].username, "bob");
    h.assert_bids_never_below_start();
}

#[tokio::test]
async fn rejected_bids_leave_everything_unchanged() {
    let mut h = harness().await;
    let owner = h.signup("seller", 1000).await;
    let auction_id = h.list(&owner.id, 100).await;
    let poor = h.signup("poor", 120).await;

    let before_auctions = h.store.auctions().to_vec();
    let before_storage = h.storage.snapshot();

    let err = h.store.place_bid(&auction_id, 130).await.unwrap_err();
    assert!(matches!(
        err,
        MarketError::InsufficientBalance {
            balance: 120,
            amount: 130
        }
    ));
    let err = h.store.place_bid(&auction_id, 100).await.unwrap_err();
    assert!(matches!(err, MarketError::BidTooLow { .. }));
    let err = h.store.place_bid("missing", 500).await.unwrap_err();
    assert!(matches!(err, MarketError::AuctionNotFound(_)));

    assert_eq!(h.store.auctions(), before_auctions.as_slice());
    assert_eq!(h.balance(&poor.id), 120);
    assert!(h.store.bids().is_empty());
    assert_eq!(h.storage.snapshot(), before_storage);
}

#[tokio::test]
async fn bids_need_a_session_and_an_active_auction() {
    let mut h = harness().await;
    let owner = h.signup("seller", 1000).await;
    let later = h.clock.now() + Duration::hours(1);
    let upcoming = h
        .list_window(&owner.id, 100, later, later + Duration::hours(1))
        .await;
    assert_eq!(
        h.store.auction(&upcoming).unwrap().status,
        AuctionStatus::Upcoming
    );

    let err = h.store.place_bid(&upcoming, 200).await.unwrap_err();
    assert!(matches!(err, MarketError::AuctionNotActive(_)));

    h.store.accounts_mut().logout().await.unwrap();
    let err = h.store.place_bid("1", 6000).await.unwrap_err();
    assert!(matches!(err, MarketError::NotAuthenticated));
}

#[tokio::test]
async fn raising_your_own_bid_is_not_refunded() {
    let mut h = harness().await;
    let owner = h.signup("seller", 1000).await;
    let auction_id = h.list(&owner.id, 100).await;
    let a = h.signup("alice", 1000).await;

    h.store.place_bid(&auction_id, 150).await.unwrap();
    h.clock.advance(Duration::seconds(1));
    h.store.place_bid(&auction_id, 200).await.unwrap();

    assert_eq!(h.balance(&a.id), 650);
    assert!(h
        .store
        .notifications()
        .iter()
        .all(|n| !matches!(n.kind, NotificationKind::BidOutbid { .. })));
}

#[tokio::test]
async fn failed_write_rolls_back_the_whole_bid() {
    let mut h = harness().await;
    let owner = h.signup("seller", 1000).await;
    let auction_id = h.list(&owner.id, 100).await;
    let a = h.signup("alice", 500).await;
    h.store.place_bid(&auction_id, 150).await.unwrap();
    let b = h.signup("bob", 500).await;

    h.storage.fail_writes(true);
    let err = h.store.place_bid(&auction_id, 300).await.unwrap_err();
    assert!(matches!(err, MarketError::Storage(_)));
    h.storage.fail_writes(false);

    let auction = h.store.auction(&auction_id).unwrap();
    assert_eq!(auction.current_bid, 150);
    assert_eq!(auction.highest_bidder.as_deref(), Some(a.id.as_str()));
    assert_eq!(h.balance(&a.id), 350);
    assert_eq!(h.balance(&b.id), 500);
    assert_eq!(h.store.bids().len(), 1);
    assert!(h.store.notifications().is_empty());

    h.store.refresh().await;
    assert_eq!(h.store.auction(&auction_id).unwrap().current_bid, 150);
    assert_eq!(h.balance(&b.id), 500);
}
// endregion: --- Bidding

// region:    --- Deletion
#[tokio::test]
async fn deletion_refunds_each_bidders_highest_bid() {
    let mut h = harness().await;
    let owner = h.signup("seller", 1000).await;
    let auction_id = h.list(&owner.id, 100).await;
    let a = h.signup("alice", 1000).await;
    let b = h.signup("bob", 1000).await;

    h.login("alice").await;
    h.store.place_bid(&auction_id, 150).await.unwrap();
    h.clock.advance(Duration::seconds(1));
    h.login("bob").await;
    h.store.place_bid(&auction_id, 200).await.unwrap();
    h.clock.advance(Duration::seconds(1));
    h.login("alice").await;
    h.store.place_bid(&auction_id, 250).await.unwrap();

    assert_eq!(h.balance(&a.id), 750);
    assert_eq!(h.balance(&b.id), 1000);

    h.login("seller").await;
    let refunds = h.store.delete_auction(&auction_id).await.unwrap();
    assert_eq!(
        refunds,
        vec![
            Refund {
                user_id: a.id.clone(),
                amount: 250
            },
            Refund {
                user_id: b.id.clone(),
                amount: 200
            },
        ]
    );

    // max, not sum: alice's 150 and 250 refund as 250
    assert_eq!(h.balance(&a.id), 1000);
    assert_eq!(h.balance(&b.id), 1200);
    assert!(h.store.auction(&auction_id).is_none());
    assert!(h.store.bids().iter().all(|b| b.auction_id != auction_id));

    let refund_notes: Vec<_> = h
        .store
        .notifications()
        .iter()
        .filter_map(|n| match &n.kind {
            NotificationKind::AuctionEnded { refunded, .. } => Some((n.user_id.clone(), *refunded)),
            _ => None,
        })
        .collect();
    assert_eq!(refund_notes, vec![(a.id, 250), (b.id, 200)]);
}

#[tokio::test]
async fn only_owner_or_admin_may_delete() {
    let mut h = harness().await;
    let owner = h.signup("seller", 1000).await;
    let auction_id = h.list(&owner.id, 100).await;
    let bidder = h.signup("alice", 1000).await;
    h.store.place_bid(&auction_id, 300).await.unwrap();

    let before = h.storage.snapshot();
    let err = h.store.delete_auction(&auction_id).await.unwrap_err();
    assert!(matches!(err, MarketError::PermissionDenied));
    assert!(h.store.auction(&auction_id).is_some());
    assert_eq!(h.balance(&bidder.id), 700);
    assert_eq!(h.storage.snapshot(), before);

    let admin = h.signup("admin", 0).await;
    assert_eq!(admin.role, Role::Admin);
    h.store.delete_auction(&auction_id).await.unwrap();
    assert!(h.store.auction(&auction_id).is_none());
    assert_eq!(h.balance(&bidder.id), 1000);

    let err = h.store.delete_auction(&auction_id).await.unwrap_err();
    assert!(matches!(err, MarketError::AuctionNotFound(_)));
}

#[tokio::test]
async fn removing_ended_auctions_never_refunds() {
    let mut h = harness().await;
    let owner = h.signup("seller", 1000).await;
    let now = h.clock.now();
    let short = h
        .list_window(&owner.id, 100, now, now + Duration::minutes(10))
        .await;
    let long = h.list(&owner.id, 100).await;
    let a = h.signup("alice", 1000).await;
    h.store.place_bid(&short, 400).await.unwrap();
    h.store.place_bid(&long, 300).await.unwrap();

    h.clock.advance(Duration::minutes(15));
    let report = h.store.sweep().await.unwrap();
    assert_eq!(report.ended, vec![short.clone()]);

    let removed = h.store.remove_ended_auctions().await.unwrap();
    assert_eq!(removed, vec![short.clone()]);
    assert!(h.store.auction(&short).is_none());
    assert!(h.store.auction(&long).is_some());
    assert!(h.store.bids().iter().all(|b| b.auction_id != short));
    assert_eq!(h.store.auction_bids(&long).len(), 1);
    assert_eq!(h.balance(&a.id), 300);

    assert!(h.store.remove_ended_auctions().await.unwrap().is_empty());
}
// endregion: --- Deletion

// region:    --- Sweep
#[tokio::test]
async fn sweep_follows_the_clock_and_ended_is_terminal() {
    let mut h = harness().await;
    let owner = h.signup("seller", 1000).await;
    let start = h.clock.now() + Duration::minutes(5);
    let end = start + Duration::minutes(30);
    let id = h.list_window(&owner.id, 100, start, end).await;

    h.clock.set(start - Duration::seconds(1));
    h.store.sweep().await.unwrap();
    assert_eq!(h.store.auction(&id).unwrap().status, AuctionStatus::Upcoming);

    h.clock.set(start);
    let report = h.store.sweep().await.unwrap();
    assert_eq!(report.activated, vec![id.clone()]);
    assert_eq!(h.store.auction(&id).unwrap().status, AuctionStatus::Active);

    let bidder = h.signup("alice", 1000).await;
    h.store.place_bid(&id, 500).await.unwrap();

    h.clock.set(end - Duration::seconds(1));
    h.store.sweep().await.unwrap();
    assert_eq!(h.store.auction(&id).unwrap().status, AuctionStatus::Active);

    h.clock.set(end);
    let report = h.store.sweep().await.unwrap();
    assert_eq!(report.ended, vec![id.clone()]);
    assert_eq!(h.store.auction(&id).unwrap().status, AuctionStatus::Ended);

    let won: Vec<_> = h
        .store
        .notifications()
        .iter()
        .filter(|n| matches!(n.kind, NotificationKind::AuctionWon { amount: 500, .. }))
        .collect();
    assert_eq!(won.len(), 1);
    assert_eq!(won[0].user_id, bidder.id);

    // moving the clock back never reopens an ended auction
    h.clock.set(start);
    let report = h.store.sweep().await.unwrap();
    assert!(report.is_empty());
    assert_eq!(h.store.auction(&id).unwrap().status, AuctionStatus::Ended);

    let err = h.store.place_bid(&id, 900).await.unwrap_err();
    assert!(matches!(err, MarketError::AuctionNotActive(_)));
}

#[tokio::test]
async fn ended_auctions_are_pruned_after_an_hour_without_refund() {
    let mut h = harness().await;
    let owner = h.signup("seller", 1000).await;
    let now = h.clock.now();
    let end = now + Duration::minutes(10);
    let id = h.list_window(&owner.id, 100, now, end).await;
    let bidder = h.signup("alice", 1000).await;
    h.store.place_bid(&id, 250).await.unwrap();

    h.clock.set(end + Duration::hours(1));
    let report = h.store.sweep().await.unwrap();
    assert!(report.ended.contains(&id));
    assert!(report.pruned.is_empty());

    h.clock.set(end + Duration::hours(1) + Duration::seconds(1));
    let report = h.store.sweep().await.unwrap();
    assert_eq!(report.pruned, vec![id.clone()]);
    assert!(h.store.auction(&id).is_none());
    assert!(h.store.bids().is_empty());
    assert_eq!(h.balance(&bidder.id), 750);
}

#[tokio::test]
async fn idle_sweep_does_not_write() {
    let mut h = harness().await;
    let before = h.storage.snapshot();
    h.storage.fail_writes(true);
    let report = h.store.sweep().await.unwrap();
    assert!(report.is_empty());
    h.storage.fail_writes(false);
    assert_eq!(h.storage.snapshot(), before);
}
// endregion: --- Sweep

// region:    --- Accounts
#[tokio::test]
async fn registration_login_and_logout() {
    let mut h = harness().await;
    let alice = h.signup("alice", 1000).await;
    assert_eq!(alice.role, Role::User);

    let err = h
        .store
        .accounts_mut()
        .register("alice", "other@example.com", "pw")
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::AccountExists));
    let err = h
        .store
        .accounts_mut()
        .register("alicia", "alice@example.com", "pw")
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::AccountExists));
    assert_eq!(h.store.accounts().users().len(), 1);

    h.store.accounts_mut().logout().await.unwrap();
    assert!(h.store.accounts().current_user().is_none());
    assert!(h.storage.load(CURRENT_USER_KEY).await.unwrap().is_none());
    assert_eq!(h.store.accounts().users().len(), 1);

    let err = h
        .store
        .accounts_mut()
        .login("mallory", "pw")
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::UnknownAccount(_)));

    // any password is accepted by the default verifier
    let user = h
        .store
        .accounts_mut()
        .login("alice", "not-the-password")
        .await
        .unwrap();
    assert_eq!(user.id, alice.id);
    assert_eq!(h.store.accounts().current_user().unwrap().id, alice.id);
}

struct RejectAll;

impl CredentialVerifier for RejectAll {
    fn verify(&self, _user: &User, _password: &str) -> bool {
        false
    }
}

#[tokio::test]
async fn custom_verifier_guards_login() {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(t0()));
    let settings = MarketSettings::default();
    let accounts = UserStore::load(storage.clone(), clock.clone(), settings.starting_balance)
        .await
        .with_credentials(Arc::new(RejectAll));
    let mut store = AuctionStore::with_accounts(accounts, storage, clock, &settings).await;

    store
        .accounts_mut()
        .register("alice", "alice@example.com", "pw")
        .await
        .unwrap();
    store.accounts_mut().logout().await.unwrap();

    let err = store
        .accounts_mut()
        .login("alice", "pw")
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::InvalidCredentials));
    assert!(store.accounts().current_user().is_none());
}

#[tokio::test]
async fn update_balance_requires_a_session() {
    let mut h = harness().await;
    let err = h
        .store
        .accounts_mut()
        .update_balance(10)
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::NotAuthenticated));

    let user = h.signup("alice", 42).await;
    assert_eq!(user.balance, 42);
    let persisted = h.storage.load(CURRENT_USER_KEY).await.unwrap().unwrap();
    assert_eq!(persisted["balance"], json!(42));
}
// endregion: --- Accounts

// region:    --- Notifications and Wallet
#[tokio::test]
async fn notifications_are_per_user_and_can_be_marked_read() {
    let mut h = harness().await;
    let owner = h.signup("seller", 1000).await;
    let auction_id = h.list(&owner.id, 100).await;
    h.signup("alice", 1000).await;
    h.store.place_bid(&auction_id, 150).await.unwrap();
    h.signup("bob", 1000).await;
    h.store.place_bid(&auction_id, 200).await.unwrap();

    assert!(h.store.current_notifications().is_empty());

    h.login("alice").await;
    let mine = h.store.current_notifications();
    assert_eq!(mine.len(), 1);
    assert_eq!(h.store.unread_count(), 1);
    let id = mine[0].id.clone();

    h.store.mark_notification_read(&id).await.unwrap();
    assert_eq!(h.store.unread_count(), 0);
    assert!(h.store.notifications().iter().find(|n| n.id == id).unwrap().read);

    h.store.mark_notification_read("no-such-id").await.unwrap();
    assert_eq!(h.store.notifications().len(), 1);
}

#[tokio::test]
async fn wallet_deposit_and_withdraw() {
    let h = harness().await;
    let settings = MarketSettings {
        wallet_delay: std::time::Duration::ZERO,
        ..MarketSettings::default()
    };
    let market = Marketplace::from_store(h.store, &settings);

    let err = market.deposit(100).await.unwrap_err();
    assert!(matches!(err, MarketError::NotAuthenticated));

    market
        .lock()
        .await
        .accounts_mut()
        .register("alice", "alice@example.com", "pw")
        .await
        .unwrap();

    let user = market.deposit(250).await.unwrap();
    assert_eq!(user.balance, 1250);
    assert!(matches!(
        market.deposit(0).await.unwrap_err(),
        MarketError::InvalidAmount
    ));

    let err = market.withdraw(5000).await.unwrap_err();
    assert!(matches!(
        err,
        MarketError::InsufficientBalance {
            balance: 1250,
            amount: 5000
        }
    ));
    let user = market.withdraw(1250).await.unwrap();
    assert_eq!(user.balance, 0);

    let store = market.lock().await;
    let confirmations: Vec<_> = store
        .current_notifications()
        .into_iter()
        .filter(|n| n.kind == NotificationKind::DepositConfirmed { amount: 250 })
        .collect();
    assert_eq!(confirmations.len(), 1);
}
#[tokio::test]
async fn overflowing_credit_is_rejected() {
    let mut h = harness().await;
    let user = h.signup("alice", 1000).await;
    let before = h.storage.snapshot();

    let err = h.store.deposit(u64::MAX).await.unwrap_err();
    assert!(matches!(err, MarketError::InvalidAmount));
    assert_eq!(h.balance(&user.id), 1000);
    assert!(h.store.notifications().is_empty());
    assert_eq!(h.storage.snapshot(), before);

    let user = h.store.deposit(u64::MAX - 1000).await.unwrap();
    assert_eq!(user.balance, u64::MAX);
}
// endregion: --- Notifications and Wallet

// region:    --- Persistence
#[tokio::test]
async fn first_run_seeds_three_sample_auctions() {
    let h = harness().await;
    let ids: Vec<_> = h.store.auctions().iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    let statuses: Vec<_> = h.store.auctions().iter().map(|a| a.status).collect();
    assert_eq!(
        statuses,
        vec![
            AuctionStatus::Active,
            AuctionStatus::Active,
            AuctionStatus::Upcoming
        ]
    );
    assert!(h.storage.load(AUCTIONS_KEY).await.unwrap().is_some());
}

#[tokio::test]
async fn existing_auctions_key_suppresses_seeding() {
    let storage = Arc::new(MemoryStorage::new());
    storage.save(AUCTIONS_KEY, json!([])).await.unwrap();
    let clock = Arc::new(ManualClock::new(t0()));
    let store = AuctionStore::load(storage.clone(), clock.clone(), &MarketSettings::default()).await;
    assert!(store.auctions().is_empty());

    // unreadable data is discarded and the demo data comes back
    storage.save(AUCTIONS_KEY, json!("garbage")).await.unwrap();
    storage.save(BIDS_KEY, json!(17)).await.unwrap();
    let store = AuctionStore::load(storage, clock, &MarketSettings::default()).await;
    assert_eq!(store.auctions().len(), 3);
    assert!(store.bids().is_empty());
}

#[tokio::test]
async fn state_survives_a_reload() {
    let mut h = harness().await;
    let owner = h.signup("seller", 1000).await;
    let auction_id = h.list(&owner.id, 100).await;
    h.signup("alice", 1000).await;
    h.store.place_bid(&auction_id, 150).await.unwrap();
    h.clock.advance(Duration::milliseconds(1500));
    h.signup("bob", 1000).await;
    h.store.place_bid(&auction_id, 200).await.unwrap();

    let reloaded = AuctionStore::load(
        h.storage.clone(),
        h.clock.clone(),
        &MarketSettings::default(),
    )
    .await;

    assert_eq!(reloaded.auctions(), h.store.auctions());
    assert_eq!(reloaded.bids(), h.store.bids());
    assert_eq!(reloaded.notifications(), h.store.notifications());
    assert_eq!(reloaded.accounts().users(), h.store.accounts().users());
    assert_eq!(
        reloaded.accounts().current_user(),
        h.store.accounts().current_user()
    );
}

#[tokio::test]
async fn file_storage_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(t0()));
    let settings = MarketSettings::default();

    let storage = Arc::new(FileStorage::open(dir.path()).await.unwrap());
    let mut store = AuctionStore::load(storage, clock.clone(), &settings).await;
    store
        .accounts_mut()
        .register("alice", "alice@example.com", "pw")
        .await
        .unwrap();
    store.place_bid("2", 900).await.unwrap();

    let storage = Arc::new(FileStorage::open(dir.path()).await.unwrap());
    let reloaded = AuctionStore::load(storage, clock, &settings).await;
    assert_eq!(reloaded.auctions(), store.auctions());
    assert_eq!(reloaded.bids(), store.bids());
    assert_eq!(reloaded.accounts().users(), store.accounts().users());
    assert_eq!(reloaded.auction("2").unwrap().current_bid, 900);
}
// endregion: --- Persistence

// region:    --- Scheduler
#[tokio::test]
async fn scheduler_tick_and_background_task() {
    let h = harness().await;
    let clock = h.clock.clone();
    let settings = MarketSettings {
        sweep_interval: std::time::Duration::from_millis(10),
        ..MarketSettings::default()
    };
    let market = Marketplace::from_store(h.store, &settings);
    let scheduler = market.scheduler();

    let report = scheduler.tick().await.unwrap();
    assert!(report.is_empty());

    // sample auction "3" opens thirty minutes after first run
    clock.advance(Duration::minutes(31));
    let handle = scheduler.start();
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    handle.abort();

    let store = market.lock().await;
    assert_eq!(store.auction("3").unwrap().status, AuctionStatus::Active);
}
// endregion: --- Scheduler
