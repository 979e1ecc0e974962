use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type Amount = u64;
pub type AuctionId = String;
pub type BidId = String;
pub type UserId = String;

// Auction status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuctionStatus {
    Upcoming,
    Active,
    Ended,
}

impl AuctionStatus {
    /// Status an auction should have at `now`, starting from `self`.
    /// `Ended` never changes.
    pub fn advance(self, now: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let mut status = self;
        if status == AuctionStatus::Upcoming && now >= start {
            status = AuctionStatus::Active;
        }
        if status == AuctionStatus::Active && now >= end {
            status = AuctionStatus::Ended;
        }
        status
    }
}

// Auction model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Auction {
    pub id: AuctionId,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub starting_bid: Amount,
    pub current_bid: Amount,
    pub highest_bidder: Option<UserId>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AuctionStatus,
    pub created_by: UserId,
    pub category: String,
}

impl Auction {
    /// Builds a fresh listing: no bids yet, status derived from `now`.
    pub fn open(id: AuctionId, new: NewAuction, now: DateTime<Utc>) -> Self {
        let status = if now >= new.start_time {
            AuctionStatus::Active
        } else {
            AuctionStatus::Upcoming
        };
        Self {
            id,
            title: new.title,
            description: new.description,
            image_url: new.image_url,
            starting_bid: new.starting_bid,
            current_bid: new.starting_bid,
            highest_bidder: None,
            start_time: new.start_time,
            end_time: new.end_time,
            status,
            created_by: new.created_by,
            category: new.category,
        }
    }
}

/// Caller-supplied fields of a new auction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAuction {
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub starting_bid: Amount,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_by: UserId,
    pub category: String,
}

// Bid model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    pub id: BidId,
    pub auction_id: AuctionId,
    pub user_id: UserId,
    pub username: String,
    pub amount: Amount,
    pub timestamp: DateTime<Utc>,
}
