use {
    super::Store,
    crate::{
        bid::entities::Bid,
        kernel::entities::UserId,
    },
};

impl Store {
    pub async fn get_bids_by_user(&self, user_id: UserId) -> Vec<Bid> {
        self.bids
            .read()
            .await
            .values()
            .flatten()
            .filter(|bid| bid.user_id == user_id)
            .cloned()
            .collect()
    }
}
