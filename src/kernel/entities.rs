use uuid::Uuid;

pub type AuctionId = Uuid;
pub type BidId = Uuid;
pub type UserId = Uuid;

/// Monetary amounts are integer minor units ("cents"). No floating point
/// enters the engine; any derived amount is truncated to an integer before it
/// is stored.
pub type Cents = i64;

/// Sanity ceiling for every persisted amount, visible or maximum.
pub const MAX_AMOUNT: Cents = 100_000_000;
