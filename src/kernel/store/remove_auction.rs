use {
    super::{
        Store,
        StoreError,
    },
    crate::kernel::entities::AuctionId,
};

impl Store {
    pub async fn remove_auction(&self, auction_id: AuctionId) -> Result<(), StoreError> {
        let mut auctions = self.auctions.write().await;
        if auctions.remove(&auction_id).is_none() {
            return Err(StoreError::NotFound("auction"));
        }
        drop(auctions);

        let removed = self.bids.write().await.remove(&auction_id);
        if let Some(removed) = removed {
            let mut bid_index = self.bid_index.write().await;
            for bid in removed {
                bid_index.remove(&bid.id);
            }
        }
        Ok(())
    }
}
