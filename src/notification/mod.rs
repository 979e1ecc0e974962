use crate::auction::model::{Amount, AuctionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type NotificationId = String;

/// What a notification is about. Serialized as the record's `type` field,
/// with the variant payload flattened next to it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(
    tag = "type",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum NotificationKind {
    // superseded by a higher bid
    BidOutbid {
        auction_id: AuctionId,
    },
    AuctionWon {
        auction_id: AuctionId,
        #[serde(default)]
        amount: Amount,
    },
    // also used for refunds on deletion
    AuctionEnded {
        auction_id: AuctionId,
        #[serde(default)]
        refunded: Amount,
    },
    DepositConfirmed {
        #[serde(default)]
        amount: Amount,
    },
}

impl NotificationKind {
    pub fn auction_id(&self) -> Option<&str> {
        match self {
            NotificationKind::BidOutbid { auction_id }
            | NotificationKind::AuctionWon { auction_id, .. }
            | NotificationKind::AuctionEnded { auction_id, .. } => Some(auction_id),
            NotificationKind::DepositConfirmed { .. } => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    #[serde(flatten)]
    pub kind: NotificationKind,
    pub message: String,
    pub read: bool,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        id: NotificationId,
        user_id: UserId,
        kind: NotificationKind,
        message: String,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            kind,
            message,
            read: false,
            timestamp,
        }
    }

    pub fn outbid(id: NotificationId, user_id: UserId, auction_id: AuctionId, title: &str, at: DateTime<Utc>) -> Self {
        Self::new(
            id,
            user_id,
            NotificationKind::BidOutbid { auction_id },
            format!("You've been outbid on \"{title}\""),
            at,
        )
    }

    pub fn won(
        id: NotificationId,
        user_id: UserId,
        auction_id: AuctionId,
        title: &str,
        amount: Amount,
        at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            id,
            user_id,
            NotificationKind::AuctionWon { auction_id, amount },
            format!("Congratulations! You won \"{title}\" for ${amount}"),
            at,
        )
    }

    pub fn refunded(
        id: NotificationId,
        user_id: UserId,
        auction_id: AuctionId,
        title: &str,
        refunded: Amount,
        at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            id,
            user_id,
            NotificationKind::AuctionEnded {
                auction_id,
                refunded,
            },
            format!("Auction \"{title}\" was deleted. Your bid of ${refunded} has been refunded."),
            at,
        )
    }

    pub fn deposit_confirmed(id: NotificationId, user_id: UserId, amount: Amount, at: DateTime<Utc>) -> Self {
        Self::new(
            id,
            user_id,
            NotificationKind::DepositConfirmed { amount },
            format!("Deposit of ${amount} confirmed"),
            at,
        )
    }
}
