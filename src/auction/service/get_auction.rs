use {
    super::Service,
    crate::{
        api::RestError,
        auction::entities::Auction,
        kernel::entities::AuctionId,
    },
};

pub struct GetAuctionInput {
    pub auction_id: AuctionId,
}

impl Service {
    pub async fn get_auction(&self, input: GetAuctionInput) -> Result<Auction, RestError> {
        self.store
            .get_auction(input.auction_id)
            .await
            .ok_or(RestError::AuctionNotFound)
    }
}
