use {
    super::Service,
    crate::{
        api::{
            ws::UpdateEvent,
            RestError,
        },
        auction::entities::Auction,
        bid::entities::{
            Bid,
            RetractionReason,
        },
        kernel::entities::{
            BidId,
            UserId,
        },
    },
    time::{
        Duration,
        OffsetDateTime,
    },
};

/// A winning bid may be retracted for up to one hour after placement.
pub const RETRACTION_WINDOW: Duration = Duration::HOUR;

pub struct RetractBidInput {
    pub bid_id:  BidId,
    pub user_id: UserId,
    pub reason:  RetractionReason,
}

impl Service {
    #[tracing::instrument(
        skip_all,
        fields(bid_id = %input.bid_id, user_id = %input.user_id),
        err(level = tracing::Level::TRACE)
    )]
    pub async fn retract_bid(&self, input: RetractBidInput) -> Result<Bid, RestError> {
        let bid = self
            .store
            .get_bid(input.bid_id)
            .await
            .ok_or(RestError::BidNotFound)?;
        self.auction_lock
            .with_lock(bid.auction_id, || self.retract_bid_for_lock(input))
            .await?
    }

    async fn retract_bid_for_lock(&self, input: RetractBidInput) -> Result<Bid, RestError> {
        let now = OffsetDateTime::now_utc();
        let mut bid = self
            .store
            .get_bid(input.bid_id)
            .await
            .ok_or(RestError::BidNotFound)?;
        let mut auction = self
            .store
            .get_auction(bid.auction_id)
            .await
            .ok_or(RestError::AuctionNotFound)?;
        self.check_retraction(&bid, &auction, input.user_id, now)?;

        bid.is_retracted = true;
        bid.retracted_at = Some(now);
        bid.retraction_reason = Some(input.reason);
        bid.is_winning = false;
        self.store.update_bid(bid.clone()).await?;

        self.restore_leader(&mut auction, &bid).await?;
        Ok(bid)
    }

    /// Recompute the winner after a retraction: the best remaining
    /// non-retracted bid takes the lead at its recorded amount, or the
    /// auction falls back to its starting price.
    async fn restore_leader(&self, auction: &mut Auction, retracted: &Bid) -> Result<(), RestError> {
        let remaining = self.store.get_bids(auction.id, false).await;
        let restored = remaining.first().cloned();
        match &restored {
            Some(leader) => {
                let mut leader = leader.clone();
                leader.is_winning = true;
                self.store.update_bid(leader.clone()).await?;
                auction.current_price = leader.amount;
            }
            None => {
                auction.current_price = auction.starting_price;
                auction.bid_count = 0;
            }
        }
        auction.refresh_reserve_met();
        self.store.update_auction(auction.clone()).await?;
        tracing::info!(
            auction_id = %auction.id,
            bid_id = %retracted.id,
            restored_leader = ?restored.as_ref().map(|bid| bid.user_id),
            "Bid retracted.",
        );

        self.broadcast(UpdateEvent::BidRetracted {
            bid:             retracted.clone(),
            auction:         auction.clone(),
            previous_winner: restored.map(|bid| bid.user_id),
        });
        Ok(())
    }

    /// Shared eligibility rules for retraction and the advisory check.
    pub(super) fn check_retraction(
        &self,
        bid: &Bid,
        auction: &Auction,
        user_id: UserId,
        now: OffsetDateTime,
    ) -> Result<(), RestError> {
        if auction.status.is_terminal() {
            return Err(RestError::InvalidState("the auction has ended".to_string()));
        }
        if bid.user_id != user_id {
            return Err(RestError::Forbidden(
                "only the bidder may retract their own bid".to_string(),
            ));
        }
        if bid.is_retracted {
            return Err(RestError::InvalidState(
                "the bid is already retracted".to_string(),
            ));
        }
        if !bid.is_winning {
            return Err(RestError::InvalidState(
                "only the winning bid can be retracted".to_string(),
            ));
        }
        if now - bid.timestamp > RETRACTION_WINDOW {
            return Err(RestError::InvalidState(
                "the retraction window has expired".to_string(),
            ));
        }
        Ok(())
    }
}
