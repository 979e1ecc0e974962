use super::model::{Auction, AuctionStatus};
use chrono::{DateTime, Duration, Utc};

/// First-run demo listings: two running auctions and one that has not
/// started yet, all owned by the `admin` account id.
pub fn sample_auctions(now: DateTime<Utc>) -> Vec<Auction> {
    vec![
        Auction {
            id: "1".to_string(),
            title: "Vintage Rolex Submariner".to_string(),
            description: "Classic 1970s Rolex Submariner in excellent condition. All original parts, recently serviced.".to_string(),
            image_url: "https://images.pexels.com/photos/190819/pexels-photo-190819.jpeg?auto=compress&cs=tinysrgb&w=500".to_string(),
            starting_bid: 5000,
            current_bid: 5000,
            highest_bidder: None,
            start_time: now - Duration::minutes(30),
            end_time: now + Duration::hours(2),
            status: AuctionStatus::Active,
            created_by: "admin".to_string(),
            category: "Watches".to_string(),
        },
        Auction {
            id: "2".to_string(),
            title: "Rare Art Deco Vase".to_string(),
            description: "Beautiful 1920s art deco vase in perfect condition. Authenticated piece from renowned artist.".to_string(),
            image_url: "https://images.pexels.com/photos/1576717/pexels-photo-1576717.jpeg?auto=compress&cs=tinysrgb&w=500".to_string(),
            starting_bid: 800,
            current_bid: 800,
            highest_bidder: None,
            start_time: now - Duration::minutes(10),
            end_time: now + Duration::minutes(45),
            status: AuctionStatus::Active,
            created_by: "admin".to_string(),
            category: "Art".to_string(),
        },
        Auction {
            id: "3".to_string(),
            title: "Classic Ferrari Model".to_string(),
            description: "Limited edition Ferrari 250 GTO scale model. Perfect for collectors.".to_string(),
            image_url: "https://images.pexels.com/photos/3764958/pexels-photo-3764958.jpeg?auto=compress&cs=tinysrgb&w=500".to_string(),
            starting_bid: 200,
            current_bid: 200,
            highest_bidder: None,
            start_time: now + Duration::minutes(30),
            end_time: now + Duration::hours(3),
            status: AuctionStatus::Upcoming,
            created_by: "admin".to_string(),
            category: "Collectibles".to_string(),
        },
    ]
}
