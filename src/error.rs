use crate::auction::model::Amount;
use thiserror::Error;

/// Failures of the persistence port.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed stored value: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Rejections and failures of marketplace operations.
///
/// An `Err` always means the operation did not happen: neither memory nor
/// storage were changed.
#[derive(Error, Debug)]
pub enum MarketError {
    #[error("no user is logged in")]
    NotAuthenticated,

    #[error("an account with this username or email already exists")]
    AccountExists,

    #[error("unknown account: {0}")]
    UnknownAccount(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("auction not found: {0}")]
    AuctionNotFound(String),

    #[error("auction {0} is not accepting bids")]
    AuctionNotActive(String),

    #[error("bid of {amount} must be higher than the current bid of {current}")]
    BidTooLow { amount: Amount, current: Amount },

    #[error("insufficient balance: {balance} available, {amount} required")]
    InsufficientBalance { balance: Amount, amount: Amount },

    #[error("permission denied")]
    PermissionDenied,

    #[error("amount must be greater than zero")]
    InvalidAmount,

    #[error("invalid auction: {0}")]
    InvalidAuction(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl MarketError {
    /// Stable machine-readable code, used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            MarketError::NotAuthenticated => "NOT_AUTHENTICATED",
            MarketError::AccountExists => "ACCOUNT_EXISTS",
            MarketError::UnknownAccount(_) => "UNKNOWN_ACCOUNT",
            MarketError::InvalidCredentials => "INVALID_CREDENTIALS",
            MarketError::AuctionNotFound(_) => "AUCTION_NOT_FOUND",
            MarketError::AuctionNotActive(_) => "AUCTION_NOT_ACTIVE",
            MarketError::BidTooLow { .. } => "LOW_BID",
            MarketError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            MarketError::PermissionDenied => "PERMISSION_DENIED",
            MarketError::InvalidAmount => "INVALID_AMOUNT",
            MarketError::InvalidAuction(_) => "INVALID_AUCTION",
            MarketError::Storage(_) => "STORAGE_ERROR",
        }
    }
}
