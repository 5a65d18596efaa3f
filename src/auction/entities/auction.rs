use {
    crate::kernel::entities::{
        AuctionId,
        Cents,
        UserId,
    },
    serde::Serialize,
    time::{
        Duration,
        OffsetDateTime,
    },
    utoipa::ToSchema,
};

/// End time assigned to auctions created without a time limit.
pub const NO_TIME_LIMIT_DURATION: Duration = Duration::days(365);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, serde::Deserialize, ToSchema, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AuctionStatus {
    Pending,
    Active,
    Ended,
    Unsold,
}

impl AuctionStatus {
    /// Terminal states are absorbing: no price, winner or bid mutation is
    /// permitted once reached.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AuctionStatus::Ended | AuctionStatus::Unsold)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Auction {
    pub id:                    AuctionId,
    pub title:                 String,
    pub description:           String,
    pub starting_price:        Cents,
    pub current_price:         Cents,
    /// Per-auction floor under the dynamic bid ladder.
    pub minimum_bid_increment: Cents,
    pub reserve_price:         Option<Cents>,
    pub buy_now_price:         Option<Cents>,
    pub reserve_met:           bool,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time:            OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_time:              OffsetDateTime,
    pub has_time_limit:        bool,
    pub status:                AuctionStatus,
    pub created_by:            UserId,
    pub winner_id:             Option<UserId>,
    pub bid_count:             u32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at:            OffsetDateTime,
}

impl Auction {
    pub fn computed_reserve_met(&self) -> bool {
        self.reserve_price
            .map(|reserve| self.current_price >= reserve)
            .unwrap_or(true)
    }

    pub fn refresh_reserve_met(&mut self) {
        self.reserve_met = self.computed_reserve_met();
    }

    /// Hard close: the end time itself is already outside the bidding window.
    pub fn can_accept_bids(&self, now: OffsetDateTime) -> bool {
        self.status == AuctionStatus::Active && now >= self.start_time && now < self.end_time
    }

    pub fn time_remaining(&self, now: OffsetDateTime) -> Duration {
        (self.end_time - now).max(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        uuid::Uuid,
    };

    fn active_auction(start: OffsetDateTime, end: OffsetDateTime) -> Auction {
        Auction {
            id:                    Uuid::new_v4(),
            title:                 "Vase".to_string(),
            description:           "A vase".to_string(),
            starting_price:        10_000,
            current_price:         10_000,
            minimum_bid_increment: 1,
            reserve_price:         None,
            buy_now_price:         None,
            reserve_met:           true,
            start_time:            start,
            end_time:              end,
            has_time_limit:        true,
            status:                AuctionStatus::Active,
            created_by:            Uuid::new_v4(),
            winner_id:             None,
            bid_count:             0,
            created_at:            start,
        }
    }

    #[test]
    fn end_time_is_exclusive() {
        let start = OffsetDateTime::now_utc() - Duration::hours(1);
        let end = start + Duration::hours(2);
        let auction = active_auction(start, end);

        assert!(auction.can_accept_bids(start));
        assert!(auction.can_accept_bids(end - Duration::milliseconds(1)));
        assert!(!auction.can_accept_bids(end));
        assert!(!auction.can_accept_bids(start - Duration::milliseconds(1)));
    }

    #[test]
    fn pending_auction_rejects_bids_inside_window() {
        let start = OffsetDateTime::now_utc() - Duration::hours(1);
        let mut auction = active_auction(start, start + Duration::hours(2));
        auction.status = AuctionStatus::Pending;
        assert!(!auction.can_accept_bids(OffsetDateTime::now_utc()));
    }

    #[test]
    fn reserve_met_follows_current_price() {
        let start = OffsetDateTime::now_utc();
        let mut auction = active_auction(start, start + Duration::hours(2));
        auction.reserve_price = Some(20_000);
        auction.refresh_reserve_met();
        assert!(!auction.reserve_met);

        auction.current_price = 20_000;
        auction.refresh_reserve_met();
        assert!(auction.reserve_met);
    }
}
