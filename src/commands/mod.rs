/// Request payloads accepted by the HTTP surface.
/// Auction creation from the user dialog and from the admin form both end
/// up in `CreateAuctionCommand::into_new_auction`.
// region:    --- Imports
use crate::auction::model::{Amount, NewAuction};
use crate::error::MarketError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
// endregion: --- Imports

/// Listing image used when the form leaves the url empty.
pub const DEFAULT_IMAGE_URL: &str =
    "https://images.pexels.com/photos/1598505/pexels-photo-1598505.jpeg?auto=compress&cs=tinysrgb&w=500";

/// Auction length when neither an end time nor a duration is given.
pub const DEFAULT_DURATION_HOURS: u32 = 24;

// region:    --- Commands
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RegisterCommand {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoginCommand {
    pub username: String,
    pub password: String,
}

/// Bid on the auction named in the path.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlaceBidCommand {
    pub amount: Amount,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WalletCommand {
    pub amount: Amount,
}

/// New listing as submitted by a form.
///
/// `start_time` absent means "now". The end is `end_time` when given,
/// otherwise `start + duration_hours`.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateAuctionCommand {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    pub starting_bid: Amount,
    pub category: String,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_hours: Option<u32>,
}

impl CreateAuctionCommand {
    /// Validates the form and fills in defaults.
    pub fn into_new_auction(
        self,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> Result<NewAuction, MarketError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(MarketError::InvalidAuction("title is required".into()));
        }
        let description = self.description.trim();
        if description.is_empty() {
            return Err(MarketError::InvalidAuction("description is required".into()));
        }
        if self.starting_bid == 0 {
            return Err(MarketError::InvalidAuction(
                "starting bid must be greater than 0".into(),
            ));
        }
        let category = self.category.trim();
        if category.is_empty() {
            return Err(MarketError::InvalidAuction("category is required".into()));
        }

        let start_time = self.start_time.unwrap_or(now);
        let end_time = match self.end_time {
            Some(end) => end,
            None => {
                let hours = self.duration_hours.unwrap_or(DEFAULT_DURATION_HOURS);
                start_time
                    .checked_add_signed(Duration::hours(i64::from(hours)))
                    .ok_or_else(|| {
                        MarketError::InvalidAuction("duration out of range".into())
                    })?
            }
        };
        if end_time <= start_time {
            return Err(MarketError::InvalidAuction(
                "end time must be after start time".into(),
            ));
        }

        let image_url = match self.image_url.trim() {
            "" => DEFAULT_IMAGE_URL.to_string(),
            url => url.to_string(),
        };

        Ok(NewAuction {
            title: title.to_string(),
            description: description.to_string(),
            image_url,
            starting_bid: self.starting_bid,
            start_time,
            end_time,
            created_by: created_by.to_string(),
            category: category.to_string(),
        })
    }
}
// endregion: --- Commands
