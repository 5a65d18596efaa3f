use {
    super::Service,
    crate::{
        auction::entities::{
            Auction,
            AuctionStatus,
        },
        kernel::entities::UserId,
    },
};

#[derive(Default)]
pub struct GetAuctionsInput {
    pub status:     Option<AuctionStatus>,
    pub created_by: Option<UserId>,
}

impl Service {
    /// Filtered listing, newest start time first.
    pub async fn get_auctions(&self, input: GetAuctionsInput) -> Vec<Auction> {
        let mut auctions: Vec<Auction> = self
            .store
            .get_auctions()
            .await
            .into_iter()
            .filter(|auction| {
                input
                    .status
                    .map(|status| auction.status == status)
                    .unwrap_or(true)
                    && input
                        .created_by
                        .map(|creator| auction.created_by == creator)
                        .unwrap_or(true)
            })
            .collect();
        auctions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        auctions
    }
}
