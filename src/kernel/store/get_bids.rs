use {
    super::Store,
    crate::{
        bid::entities::Bid,
        kernel::entities::AuctionId,
    },
};

impl Store {
    /// Bids for an auction, sorted `(amount DESC, timestamp ASC)`.
    pub async fn get_bids(&self, auction_id: AuctionId, include_retracted: bool) -> Vec<Bid> {
        self.bids
            .read()
            .await
            .get(&auction_id)
            .map(|list| {
                list.iter()
                    .filter(|bid| include_retracted || !bid.is_retracted)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}
