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
    time::OffsetDateTime,
};

pub struct StartAuctionInput {
    pub auction_id: AuctionId,
}

impl Service {
    #[tracing::instrument(skip_all, fields(auction_id = %input.auction_id))]
    pub async fn start_auction(&self, input: StartAuctionInput) -> Result<Auction, RestError> {
        let auction_id = input.auction_id;
        self.auction_lock
            .with_lock(auction_id, || self.start_auction_for_lock(auction_id))
            .await?
    }

    async fn start_auction_for_lock(&self, auction_id: AuctionId) -> Result<Auction, RestError> {
        let mut auction = self
            .store
            .get_auction(auction_id)
            .await
            .ok_or(RestError::AuctionNotFound)?;
        if auction.status != AuctionStatus::Pending {
            return Err(RestError::InvalidState(format!(
                "only pending auctions can be started, status is {}",
                auction.status
            )));
        }
        if OffsetDateTime::now_utc() < auction.start_time {
            return Err(RestError::InvalidState(
                "the auction start time has not been reached".to_string(),
            ));
        }
        auction.status = AuctionStatus::Active;
        self.store.update_auction(auction.clone()).await?;
        tracing::info!(auction_id = %auction.id, "Auction started.");

        self.broadcast(UpdateEvent::AuctionStarted {
            auction: auction.clone(),
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
        time::Duration,
    };

    #[tokio::test]
    async fn starts_a_due_pending_auction() {
        let (service, _events) = new_for_test();
        let seller = seeded_user(&service, "Seller").await;
        let mut input = base_input(seller);
        let start = OffsetDateTime::now_utc() + Duration::hours(1);
        input.start_time = Some(start);
        input.end_time = Some(start + Duration::days(1));
        let mut auction = service.create_auction(input).await.unwrap();
        assert_eq!(auction.status, AuctionStatus::Pending);

        // Not due yet.
        let early = service
            .start_auction(StartAuctionInput { auction_id: auction.id })
            .await;
        assert!(matches!(early, Err(RestError::InvalidState(_))));

        // Rewind the start time and try again.
        auction.start_time = OffsetDateTime::now_utc() - Duration::seconds(1);
        service.store.update_auction(auction.clone()).await.unwrap();
        let started = service
            .start_auction(StartAuctionInput { auction_id: auction.id })
            .await
            .unwrap();
        assert_eq!(started.status, AuctionStatus::Active);

        // A second start is an invalid state, not a silent success.
        let again = service
            .start_auction(StartAuctionInput { auction_id: auction.id })
            .await;
        assert!(matches!(again, Err(RestError::InvalidState(_))));
    }
}
