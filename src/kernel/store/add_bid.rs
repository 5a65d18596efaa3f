use {
    super::{
        Store,
        StoreError,
    },
    crate::bid::entities::Bid,
};

impl Store {
    pub async fn add_bid(&self, bid: Bid) -> Result<(), StoreError> {
        if !self.auctions.read().await.contains_key(&bid.auction_id) {
            return Err(StoreError::NotFound("auction"));
        }
        let mut bid_index = self.bid_index.write().await;
        if bid_index.contains_key(&bid.id) {
            return Err(StoreError::Duplicate(format!("bid {}", bid.id)));
        }
        bid_index.insert(bid.id, bid.auction_id);
        drop(bid_index);

        let mut bids = self.bids.write().await;
        let list = bids.entry(bid.auction_id).or_default();
        Self::sorted_insert(list, bid);
        Ok(())
    }
}
