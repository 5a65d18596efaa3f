use {
    super::{
        create_auction::validate_auction,
        Service,
    },
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
            Cents,
        },
    },
    time::OffsetDateTime,
};

/// Partial update; absent fields keep their value. Nullable prices cannot be
/// cleared through this operation.
#[derive(Default)]
pub struct UpdateAuctionInput {
    pub auction_id:            AuctionId,
    pub title:                 Option<String>,
    pub description:           Option<String>,
    pub starting_price:        Option<Cents>,
    pub minimum_bid_increment: Option<Cents>,
    pub reserve_price:         Option<Cents>,
    pub buy_now_price:         Option<Cents>,
    pub start_time:            Option<OffsetDateTime>,
    pub end_time:              Option<OffsetDateTime>,
}

impl Service {
    #[tracing::instrument(skip_all, fields(auction_id = %input.auction_id))]
    pub async fn update_auction(&self, input: UpdateAuctionInput) -> Result<Auction, RestError> {
        let auction_id = input.auction_id;
        self.auction_lock
            .with_lock(auction_id, || self.update_auction_for_lock(input))
            .await?
    }

    async fn update_auction_for_lock(
        &self,
        input: UpdateAuctionInput,
    ) -> Result<Auction, RestError> {
        let mut auction = self
            .store
            .get_auction(input.auction_id)
            .await
            .ok_or(RestError::AuctionNotFound)?;
        let editable = auction.status == AuctionStatus::Pending
            || (auction.status == AuctionStatus::Active && auction.bid_count == 0);
        if !editable {
            return Err(RestError::InvalidState(
                "only pending auctions or active auctions without bids can be edited".to_string(),
            ));
        }

        if let Some(title) = input.title {
            auction.title = title;
        }
        if let Some(description) = input.description {
            auction.description = description;
        }
        if let Some(starting_price) = input.starting_price {
            auction.starting_price = starting_price;
            // No bids exist here, so the visible price tracks the new start.
            auction.current_price = starting_price;
        }
        if let Some(minimum_bid_increment) = input.minimum_bid_increment {
            auction.minimum_bid_increment = minimum_bid_increment;
        }
        if let Some(reserve_price) = input.reserve_price {
            auction.reserve_price = Some(reserve_price);
        }
        if let Some(buy_now_price) = input.buy_now_price {
            auction.buy_now_price = Some(buy_now_price);
        }
        if let Some(start_time) = input.start_time {
            auction.start_time = start_time;
        }
        if let Some(end_time) = input.end_time {
            auction.end_time = end_time;
        }
        auction.refresh_reserve_met();
        validate_auction(&auction)?;

        self.store.update_auction(auction.clone()).await?;
        self.broadcast(UpdateEvent::AuctionUpdated {
            auction: auction.clone(),
        });
        Ok(auction)
    }
}
