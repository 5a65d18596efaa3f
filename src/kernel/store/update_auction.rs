use {
    super::{
        Store,
        StoreError,
    },
    crate::auction::entities::Auction,
};

impl Store {
    pub async fn update_auction(&self, auction: Auction) -> Result<(), StoreError> {
        let mut auctions = self.auctions.write().await;
        match auctions.get_mut(&auction.id) {
            Some(existing) => {
                *existing = auction;
                Ok(())
            }
            None => Err(StoreError::NotFound("auction")),
        }
    }
}
