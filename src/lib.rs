pub mod account;
pub mod auction;
pub mod clock;
pub mod commands;
pub mod config;
pub mod error;
pub mod handlers;
pub mod market;
pub mod notification;
pub mod query;
pub mod scheduler;
pub mod storage;

pub use error::{MarketError, StorageError};
pub use market::Marketplace;

/// Fresh identifier for users, auctions, bids and notifications.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
