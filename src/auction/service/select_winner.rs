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
        kernel::entities::{
            AuctionId,
            UserId,
        },
    },
};

pub struct SelectWinnerInput {
    pub auction_id: AuctionId,
    pub winner_id:  UserId,
}

impl Service {
    /// Manual resolution: the seller picks a winner among the users holding a
    /// non-retracted bid, regardless of reserve.
    #[tracing::instrument(skip_all, fields(auction_id = %input.auction_id, winner_id = %input.winner_id))]
    pub async fn select_winner(&self, input: SelectWinnerInput) -> Result<Auction, RestError> {
        let auction_id = input.auction_id;
        self.auction_lock
            .with_lock(auction_id, || self.select_winner_for_lock(input))
            .await?
    }

    async fn select_winner_for_lock(&self, input: SelectWinnerInput) -> Result<Auction, RestError> {
        let mut auction = self
            .store
            .get_auction(input.auction_id)
            .await
            .ok_or(RestError::AuctionNotFound)?;
        if auction.status.is_terminal() {
            return Err(RestError::InvalidState(
                "the auction has already ended".to_string(),
            ));
        }

        let bids = self.store.get_bids(input.auction_id, false).await;
        // Sorted list: the first bid of the user is their best one.
        let winning_bid = bids
            .iter()
            .find(|bid| bid.user_id == input.winner_id)
            .cloned()
            .ok_or_else(|| {
                RestError::BadParameters(
                    "the selected user has no active bid on this auction".to_string(),
                )
            })?;

        for bid in bids.iter().filter(|bid| bid.is_winning && bid.id != winning_bid.id) {
            let mut cleared = bid.clone();
            cleared.is_winning = false;
            self.store.update_bid(cleared).await?;
        }
        let mut winning_bid = winning_bid;
        winning_bid.is_winning = true;
        self.store.update_bid(winning_bid.clone()).await?;

        auction.status = AuctionStatus::Ended;
        auction.winner_id = Some(input.winner_id);
        auction.current_price = auction.current_price.max(winning_bid.amount);
        auction.refresh_reserve_met();
        self.store.update_auction(auction.clone()).await?;
        tracing::info!(
            auction_id = %auction.id,
            winner_id = %input.winner_id,
            "Winner selected manually.",
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
    async fn selecting_a_non_bidder_is_rejected() {
        let (service, _events) = new_for_test();
        let seller = seeded_user(&service, "Seller").await;
        let stranger = seeded_user(&service, "Stranger").await;
        let auction = service.create_auction(base_input(seller)).await.unwrap();

        let result = service
            .select_winner(SelectWinnerInput {
                auction_id: auction.id,
                winner_id:  stranger,
            })
            .await;
        assert!(matches!(result, Err(RestError::BadParameters(_))));
    }
}
