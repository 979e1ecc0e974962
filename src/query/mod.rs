/// Read-side helpers over the in-memory collections: listing filters,
/// category list and headline numbers.
// region:    --- Imports
use crate::auction::model::{Auction, AuctionStatus, Bid};
use serde::{Deserialize, Serialize};
// endregion: --- Imports

// region:    --- Filters
/// Listing filter. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuctionFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub status: Option<AuctionStatus>,
}

impl AuctionFilter {
    pub fn matches(&self, auction: &Auction) -> bool {
        let search = match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                auction.title.to_lowercase().contains(&term)
                    || auction.description.to_lowercase().contains(&term)
            }
            _ => true,
        };
        let category = match self.category.as_deref() {
            Some(category) if !category.is_empty() => auction.category == category,
            _ => true,
        };
        let status = self.status.map_or(true, |s| auction.status == s);

        search && category && status
    }
}

pub fn filter_auctions<'a>(auctions: &'a [Auction], filter: &AuctionFilter) -> Vec<&'a Auction> {
    auctions.iter().filter(|a| filter.matches(a)).collect()
}

/// Distinct categories in first-seen order.
pub fn categories(auctions: &[Auction]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for auction in auctions {
        if !seen.contains(&auction.category) {
            seen.push(auction.category.clone());
        }
    }
    seen
}
// endregion: --- Filters

// region:    --- Stats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketStats {
    pub total_auctions: usize,
    pub active: usize,
    pub upcoming: usize,
    pub ended: usize,
    pub total_bids: usize,
}

impl MarketStats {
    pub fn collect(auctions: &[Auction], bids: &[Bid]) -> Self {
        let count = |status| auctions.iter().filter(|a| a.status == status).count();
        Self {
            total_auctions: auctions.len(),
            active: count(AuctionStatus::Active),
            upcoming: count(AuctionStatus::Upcoming),
            ended: count(AuctionStatus::Ended),
            total_bids: bids.len(),
        }
    }
}
// endregion: --- Stats
