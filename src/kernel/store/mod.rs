use {
    crate::{
        auction::entities::{
            Auction,
            User,
        },
        bid::entities::Bid,
        kernel::entities::{
            AuctionId,
            BidId,
            UserId,
        },
    },
    std::collections::HashMap,
    thiserror::Error,
    tokio::sync::RwLock,
};

mod add_auction;
mod add_bid;
mod add_user;
mod get_auction;
mod get_auctions;
mod get_bid;
mod get_bids;
mod get_bids_by_user;
mod get_user;
mod get_users;
mod remove_auction;
mod update_auction;
mod update_bid;

#[derive(Error, Debug, PartialEq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("duplicate {0}")]
    Duplicate(String),
    #[error("validation failed: {0}")]
    Validation(String),
}

/// Logical repository for auctions, bids and users. Each operation is atomic
/// for a single entity; cross-entity atomicity is the caller's job via the
/// per-auction keyed lock.
#[derive(Default)]
pub struct Store {
    auctions:  RwLock<HashMap<AuctionId, Auction>>,
    /// Per-auction bid lists, kept sorted by `(amount DESC, timestamp ASC)`.
    bids:      RwLock<HashMap<AuctionId, Vec<Bid>>>,
    bid_index: RwLock<HashMap<BidId, AuctionId>>,
    users:     RwLock<HashMap<UserId, User>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted_insert(list: &mut Vec<Bid>, bid: Bid) {
        let position = list.partition_point(|existing| existing.outranks(&bid));
        list.insert(position, bid);
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::auction::entities::AuctionStatus,
        time::{
            Duration,
            OffsetDateTime,
        },
        uuid::Uuid,
    };

    pub fn test_auction() -> Auction {
        let now = OffsetDateTime::now_utc();
        Auction {
            id:                    Uuid::new_v4(),
            title:                 "Test lot".to_string(),
            description:           "A test lot".to_string(),
            starting_price:        10_000,
            current_price:         10_000,
            minimum_bid_increment: 1,
            reserve_price:         None,
            buy_now_price:         None,
            reserve_met:           true,
            start_time:            now,
            end_time:              now + Duration::days(1),
            has_time_limit:        true,
            status:                AuctionStatus::Active,
            created_by:            Uuid::new_v4(),
            winner_id:             None,
            bid_count:             0,
            created_at:            now,
        }
    }

    pub fn test_bid(auction_id: AuctionId, amount: i64, at: OffsetDateTime) -> Bid {
        Bid {
            id: Uuid::new_v4(),
            auction_id,
            user_id: Uuid::new_v4(),
            amount,
            max_bid: None,
            auto_bid_step: None,
            timestamp: at,
            is_winning: false,
            is_proxy_bid: false,
            is_retracted: false,
            retracted_at: None,
            retraction_reason: None,
            is_max_bid_reached: false,
            message: None,
        }
    }

    #[tokio::test]
    async fn duplicate_auction_ids_are_rejected() {
        let store = Store::new();
        let auction = test_auction();
        store.add_auction(auction.clone()).await.unwrap();
        assert_eq!(
            store.add_auction(auction.clone()).await.unwrap_err(),
            StoreError::Duplicate(format!("auction {}", auction.id))
        );
    }

    #[tokio::test]
    async fn bids_are_kept_sorted_by_amount_then_time() {
        let store = Store::new();
        let auction = test_auction();
        let now = OffsetDateTime::now_utc();
        store.add_auction(auction.clone()).await.unwrap();

        let low = test_bid(auction.id, 11_000, now);
        let high = test_bid(auction.id, 21_000, now + Duration::seconds(2));
        let tied_late = test_bid(auction.id, 21_000, now + Duration::seconds(5));
        for bid in [low.clone(), tied_late.clone(), high.clone()] {
            store.add_bid(bid).await.unwrap();
        }

        let sorted: Vec<_> = store
            .get_bids(auction.id, true)
            .await
            .into_iter()
            .map(|bid| bid.id)
            .collect();
        assert_eq!(sorted, vec![high.id, tied_late.id, low.id]);
    }

    #[tokio::test]
    async fn update_bid_resorts_the_auction_list() {
        let store = Store::new();
        let auction = test_auction();
        let now = OffsetDateTime::now_utc();
        store.add_auction(auction.clone()).await.unwrap();

        let mut first = test_bid(auction.id, 11_000, now);
        let second = test_bid(auction.id, 12_000, now + Duration::seconds(1));
        store.add_bid(first.clone()).await.unwrap();
        store.add_bid(second.clone()).await.unwrap();

        first.amount = 13_000;
        store.update_bid(first.clone()).await.unwrap();

        let sorted: Vec<_> = store
            .get_bids(auction.id, true)
            .await
            .into_iter()
            .map(|bid| bid.id)
            .collect();
        assert_eq!(sorted, vec![first.id, second.id]);
        assert_eq!(store.get_bid(first.id).await.unwrap().amount, 13_000);
    }

    #[tokio::test]
    async fn user_emails_are_unique() {
        let store = Store::new();
        store
            .add_user(User {
                id:         Uuid::new_v4(),
                name:       "Alice".to_string(),
                email:      "alice@example.com".to_string(),
                created_at: OffsetDateTime::now_utc(),
            })
            .await
            .unwrap();
        let duplicate = store
            .add_user(User {
                id:         Uuid::new_v4(),
                name:       "Another Alice".to_string(),
                email:      "alice@example.com".to_string(),
                created_at: OffsetDateTime::now_utc(),
            })
            .await;
        assert_eq!(
            duplicate.unwrap_err(),
            StoreError::Duplicate("email alice@example.com".to_string())
        );
    }

    #[tokio::test]
    async fn removing_an_auction_drops_its_bids() {
        let store = Store::new();
        let auction = test_auction();
        store.add_auction(auction.clone()).await.unwrap();
        let bid = test_bid(auction.id, 11_000, OffsetDateTime::now_utc());
        store.add_bid(bid.clone()).await.unwrap();

        store.remove_auction(auction.id).await.unwrap();
        assert!(store.get_auction(auction.id).await.is_none());
        assert!(store.get_bid(bid.id).await.is_none());
    }
}
