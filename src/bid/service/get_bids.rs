use {
    super::Service,
    crate::{
        api::RestError,
        bid::entities::Bid,
        kernel::entities::AuctionId,
    },
};

pub struct GetBidsInput {
    pub auction_id: AuctionId,
}

impl Service {
    /// Non-retracted bids for an auction, newest first.
    pub async fn get_bids(&self, input: GetBidsInput) -> Result<Vec<Bid>, RestError> {
        self.store
            .get_auction(input.auction_id)
            .await
            .ok_or(RestError::AuctionNotFound)?;
        let mut bids = self.store.get_bids(input.auction_id, false).await;
        bids.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(bids)
    }
}
