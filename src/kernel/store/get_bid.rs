use {
    super::Store,
    crate::{
        bid::entities::Bid,
        kernel::entities::BidId,
    },
};

impl Store {
    pub async fn get_bid(&self, bid_id: BidId) -> Option<Bid> {
        let auction_id = *self.bid_index.read().await.get(&bid_id)?;
        self.bids
            .read()
            .await
            .get(&auction_id)?
            .iter()
            .find(|bid| bid.id == bid_id)
            .cloned()
    }
}
