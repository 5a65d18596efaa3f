use {
    super::Service,
    crate::{
        api::RestError,
        auction::entities::{
            Auction,
            AuctionStatus,
        },
        bid::entities::BidCreate,
        kernel::entities::MAX_AMOUNT,
    },
    time::OffsetDateTime,
};

impl Service {
    /// Gate checks for a bid placement, run under the auction lock before any
    /// state is touched. Returns the auction snapshot the placement works on.
    pub(super) async fn verify_placement(
        &self,
        bid_create: &BidCreate,
        now: OffsetDateTime,
    ) -> Result<Auction, RestError> {
        let auction = self
            .store
            .get_auction(bid_create.auction_id)
            .await
            .ok_or(RestError::AuctionNotFound)?;
        self.store
            .get_user(bid_create.user_id)
            .await
            .ok_or(RestError::UserNotFound)?;

        if bid_create.user_id == auction.created_by {
            return Err(RestError::Forbidden(
                "bidding on your own auction is not allowed".to_string(),
            ));
        }
        if !auction.can_accept_bids(now) {
            let reason = match auction.status {
                AuctionStatus::Pending => "the auction has not started",
                AuctionStatus::Active if now < auction.start_time => "the auction has not started",
                AuctionStatus::Active => "the auction has closed",
                AuctionStatus::Ended | AuctionStatus::Unsold => "the auction has ended",
            };
            return Err(RestError::InvalidState(reason.to_string()));
        }

        if bid_create.amount <= 0 || bid_create.amount > MAX_AMOUNT {
            return Err(RestError::BadParameters(
                "bid amount is out of range".to_string(),
            ));
        }
        if let Some(max_bid) = bid_create.max_bid {
            if max_bid <= 0 || max_bid > MAX_AMOUNT {
                return Err(RestError::BadParameters(
                    "maximum bid is out of range".to_string(),
                ));
            }
        }
        if let Some(step) = bid_create.auto_bid_step {
            if step <= 0 || step > MAX_AMOUNT {
                return Err(RestError::BadParameters(
                    "auto bid step is out of range".to_string(),
                ));
            }
        }

        if !self.bid_limiter.check(bid_create.user_id) {
            return Err(RestError::TooManyBids);
        }
        Ok(auction)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::bid::service::tests::{
            new_for_test,
            place_max_bid,
            seed_auction,
            seed_user,
        },
        time::Duration,
    };

    #[tokio::test]
    async fn rejects_self_bids() {
        let (service, _events) = new_for_test();
        let auction = seed_auction(&service, 10_000, None, None).await;
        let result = place_max_bid(&service, auction.id, auction.created_by, 20_000).await;
        assert!(matches!(result, Err(RestError::Forbidden(_))));
    }

    #[tokio::test]
    async fn rejects_unknown_users_and_auctions() {
        let (service, _events) = new_for_test();
        let auction = seed_auction(&service, 10_000, None, None).await;
        let ghost = uuid::Uuid::new_v4();
        assert!(matches!(
            place_max_bid(&service, auction.id, ghost, 20_000).await,
            Err(RestError::UserNotFound)
        ));

        let bidder = seed_user(&service, "bidder").await;
        assert!(matches!(
            place_max_bid(&service, uuid::Uuid::new_v4(), bidder, 20_000).await,
            Err(RestError::AuctionNotFound)
        ));
    }

    #[tokio::test]
    async fn rejects_bids_outside_the_window() {
        let (service, _events) = new_for_test();
        let mut auction = seed_auction(&service, 10_000, None, None).await;
        let bidder = seed_user(&service, "bidder").await;

        // Hard close: the end time itself is out of the window.
        auction.end_time = OffsetDateTime::now_utc() - Duration::seconds(1);
        service.store.update_auction(auction.clone()).await.unwrap();
        assert!(matches!(
            place_max_bid(&service, auction.id, bidder, 20_000).await,
            Err(RestError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn rejects_out_of_range_amounts() {
        let (service, _events) = new_for_test();
        let auction = seed_auction(&service, 10_000, None, None).await;
        let bidder = seed_user(&service, "bidder").await;

        assert!(matches!(
            place_max_bid(&service, auction.id, bidder, 0).await,
            Err(RestError::BadParameters(_))
        ));
        assert!(matches!(
            place_max_bid(&service, auction.id, bidder, MAX_AMOUNT + 1).await,
            Err(RestError::BadParameters(_))
        ));
    }
}
