use {
    super::{
        Store,
        StoreError,
    },
    crate::auction::entities::Auction,
};

impl Store {
    pub async fn add_auction(&self, auction: Auction) -> Result<(), StoreError> {
        if auction.title.trim().is_empty() {
            return Err(StoreError::Validation("title must not be empty".to_string()));
        }
        if auction.description.trim().is_empty() {
            return Err(StoreError::Validation(
                "description must not be empty".to_string(),
            ));
        }
        let mut auctions = self.auctions.write().await;
        if auctions.contains_key(&auction.id) {
            return Err(StoreError::Duplicate(format!("auction {}", auction.id)));
        }
        auctions.insert(auction.id, auction);
        Ok(())
    }
}
