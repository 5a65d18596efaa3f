use {
    super::Store,
    crate::{
        auction::entities::Auction,
        kernel::entities::AuctionId,
    },
};

impl Store {
    pub async fn get_auction(&self, auction_id: AuctionId) -> Option<Auction> {
        self.auctions.read().await.get(&auction_id).cloned()
    }
}
