use {
    super::Service,
    crate::{
        api::{
            ws::UpdateEvent,
            RestError,
        },
        auction::entities::{
            Auction,
            AuctionStatus,
        },
        kernel::entities::AuctionId,
    },
};

pub struct EndAuctionInput {
    pub auction_id: AuctionId,
}

impl Service {
    #[tracing::instrument(skip_all, fields(auction_id = %input.auction_id))]
    pub async fn end_auction(&self, input: EndAuctionInput) -> Result<Auction, RestError> {
        let auction_id = input.auction_id;
        self.auction_lock
            .with_lock(auction_id, || self.end_auction_for_lock(auction_id))
            .await?
    }

    /// Terminal transition; callers already holding the auction's lock (buy
    /// now resolution) use this directly. Idempotent on terminal auctions.
    pub(crate) async fn end_auction_for_lock(
        &self,
        auction_id: AuctionId,
    ) -> Result<Auction, RestError> {
        let mut auction = self
            .store
            .get_auction(auction_id)
            .await
            .ok_or(RestError::AuctionNotFound)?;
        if auction.status.is_terminal() {
            return Ok(auction);
        }
        if auction.status != AuctionStatus::Active {
            return Err(RestError::InvalidState(
                "only active auctions can be ended".to_string(),
            ));
        }

        let bids = self.store.get_bids(auction_id, false).await;
        // The list is sorted (amount DESC, timestamp ASC); the flag and the
        // head agree except after a manual winner override.
        let winner = bids
            .iter()
            .find(|bid| bid.is_winning)
            .or_else(|| bids.first());
        match winner {
            Some(winner) if auction.reserve_met => {
                auction.status = AuctionStatus::Ended;
                auction.winner_id = Some(winner.user_id);
            }
            _ => {
                auction.status = AuctionStatus::Unsold;
                auction.winner_id = None;
            }
        }
        self.store.update_auction(auction.clone()).await?;
        tracing::info!(
            auction_id = %auction.id,
            status = %auction.status,
            winner_id = ?auction.winner_id,
            final_price = auction.current_price,
            "Auction closed.",
        );

        self.broadcast(UpdateEvent::AuctionEnded {
            auction:     auction.clone(),
            winner_id:   auction.winner_id,
            final_price: auction.current_price,
        });
        Ok(auction)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::auction::service::{
            create_auction::tests::{
                base_input,
                seeded_user,
            },
            tests::new_for_test,
        },
    };

    #[tokio::test]
    async fn ending_without_bids_is_unsold() {
        let (service, _events) = new_for_test();
        let seller = seeded_user(&service, "Seller").await;
        let auction = service.create_auction(base_input(seller)).await.unwrap();

        let ended = service
            .end_auction(EndAuctionInput { auction_id: auction.id })
            .await
            .unwrap();
        assert_eq!(ended.status, AuctionStatus::Unsold);
        assert_eq!(ended.winner_id, None);
    }

    #[tokio::test]
    async fn ending_is_idempotent_on_terminal_auctions() {
        let (service, _events) = new_for_test();
        let seller = seeded_user(&service, "Seller").await;
        let auction = service.create_auction(base_input(seller)).await.unwrap();

        let first = service
            .end_auction(EndAuctionInput { auction_id: auction.id })
            .await
            .unwrap();
        let second = service
            .end_auction(EndAuctionInput { auction_id: auction.id })
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn pending_auctions_cannot_be_ended() {
        let (service, _events) = new_for_test();
        let seller = seeded_user(&service, "Seller").await;
        let mut input = base_input(seller);
        let start = time::OffsetDateTime::now_utc() + time::Duration::hours(1);
        input.start_time = Some(start);
        input.end_time = Some(start + time::Duration::days(1));
        let auction = service.create_auction(input).await.unwrap();

        let result = service
            .end_auction(EndAuctionInput { auction_id: auction.id })
            .await;
        assert!(matches!(result, Err(RestError::InvalidState(_))));
    }
}
