use {
    super::{
        Store,
        StoreError,
    },
    crate::bid::entities::Bid,
};

impl Store {
    /// Replace a bid by id, keeping the per-auction list ordering intact when
    /// the amount changed.
    pub async fn update_bid(&self, bid: Bid) -> Result<(), StoreError> {
        let auction_id = *self
            .bid_index
            .read()
            .await
            .get(&bid.id)
            .ok_or(StoreError::NotFound("bid"))?;

        let mut bids = self.bids.write().await;
        let list = bids
            .get_mut(&auction_id)
            .ok_or(StoreError::NotFound("bid"))?;
        let position = list
            .iter()
            .position(|existing| existing.id == bid.id)
            .ok_or(StoreError::NotFound("bid"))?;
        list.remove(position);
        Self::sorted_insert(list, bid);
        Ok(())
    }
}
