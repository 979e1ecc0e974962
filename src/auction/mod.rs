pub mod model;
pub mod seed;
mod store;

pub use store::{AuctionStore, Refund, SweepReport};
