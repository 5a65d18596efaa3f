use {
    super::Service,
    crate::{
        api::RestError,
        bid::entities::Bid,
        kernel::entities::AuctionId,
    },
};

pub struct GetWinningBidInput {
    pub auction_id: AuctionId,
}

impl Service {
    pub async fn get_winning_bid(
        &self,
        input: GetWinningBidInput,
    ) -> Result<Option<Bid>, RestError> {
        self.store
            .get_auction(input.auction_id)
            .await
            .ok_or(RestError::AuctionNotFound)?;
        Ok(self
            .store
            .get_bids(input.auction_id, false)
            .await
            .into_iter()
            .find(|bid| bid.is_winning))
    }
}
