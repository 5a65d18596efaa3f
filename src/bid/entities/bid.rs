use {
    crate::kernel::entities::{
        AuctionId,
        BidId,
        Cents,
        UserId,
    },
    serde::{
        Deserialize,
        Serialize,
    },
    time::OffsetDateTime,
    utoipa::ToSchema,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RetractionReason {
    Typo,
    ItemDescriptionChanged,
    CannotContactSeller,
    Other,
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    pub id:                 BidId,
    pub auction_id:         AuctionId,
    pub user_id:            UserId,
    /// The visible bid. For proxy bids this is chosen by the engine, not the
    /// bidder.
    pub amount:             Cents,
    /// The bidder's private ceiling; null for direct bids.
    pub max_bid:            Option<Cents>,
    /// Optional per-bid override of the ladder step used to defend this bid.
    pub auto_bid_step:      Option<Cents>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp:          OffsetDateTime,
    pub is_winning:         bool,
    pub is_proxy_bid:       bool,
    pub is_retracted:       bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub retracted_at:       Option<OffsetDateTime>,
    pub retraction_reason:  Option<RetractionReason>,
    pub is_max_bid_reached: bool,
    pub message:            Option<String>,
}

impl Bid {
    /// Ordering used everywhere a leader is picked: highest amount first,
    /// earliest timestamp breaking ties.
    pub fn outranks(&self, other: &Bid) -> bool {
        self.amount > other.amount
            || (self.amount == other.amount && self.timestamp < other.timestamp)
    }
}

/// Domain input for a bid placement.
#[derive(Clone, Debug)]
pub struct BidCreate {
    pub auction_id:    AuctionId,
    pub user_id:       UserId,
    pub amount:        Cents,
    pub max_bid:       Option<Cents>,
    pub auto_bid_step: Option<Cents>,
}
