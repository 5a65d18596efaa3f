use {
    super::Store,
    crate::auction::entities::{
        Auction,
        AuctionStatus,
    },
};

impl Store {
    pub async fn get_auctions(&self) -> Vec<Auction> {
        self.auctions.read().await.values().cloned().collect()
    }

    pub async fn get_auctions_by_status(&self, status: AuctionStatus) -> Vec<Auction> {
        self.auctions
            .read()
            .await
            .values()
            .filter(|auction| auction.status == status)
            .cloned()
            .collect()
    }
}
