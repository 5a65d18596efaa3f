use {
    super::Service,
    crate::{
        api::RestError,
        auction::entities::AuctionStatus,
        kernel::entities::AuctionId,
    },
};

pub struct CancelAuctionInput {
    pub auction_id: AuctionId,
}

impl Service {
    /// Delete a bid-less auction outright. Sold auctions are history and stay.
    #[tracing::instrument(skip_all, fields(auction_id = %input.auction_id))]
    pub async fn cancel_auction(&self, input: CancelAuctionInput) -> Result<(), RestError> {
        let auction_id = input.auction_id;
        self.auction_lock
            .with_lock(auction_id, || self.cancel_auction_for_lock(auction_id))
            .await?
    }

    async fn cancel_auction_for_lock(&self, auction_id: AuctionId) -> Result<(), RestError> {
        let auction = self
            .store
            .get_auction(auction_id)
            .await
            .ok_or(RestError::AuctionNotFound)?;
        if auction.status == AuctionStatus::Ended {
            return Err(RestError::InvalidState(
                "a sold auction cannot be cancelled".to_string(),
            ));
        }
        if auction.bid_count > 0 {
            return Err(RestError::InvalidState(
                "an auction with bids cannot be cancelled".to_string(),
            ));
        }
        self.store.remove_auction(auction_id).await?;
        tracing::info!(auction_id = %auction_id, "Auction cancelled.");
        Ok(())
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
    async fn cancelling_a_fresh_auction_removes_it() {
        let (service, _events) = new_for_test();
        let seller = seeded_user(&service, "Seller").await;
        let auction = service.create_auction(base_input(seller)).await.unwrap();

        service
            .cancel_auction(CancelAuctionInput { auction_id: auction.id })
            .await
            .unwrap();
        assert!(service.store.get_auction(auction.id).await.is_none());
    }
}
