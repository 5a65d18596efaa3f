use {
    crate::{
        api::ws::UpdateEvent,
        auction::{
            entities::Auction,
            service::Service as AuctionService,
        },
        bid::entities::BidLadder,
        config::Config,
        kernel::{
            entities::{
                AuctionId,
                Cents,
                UserId,
            },
            lock::KeyedLock,
            rate_limit::RateLimiter,
            store::Store,
        },
    },
    std::sync::Arc,
    tokio::sync::broadcast,
};

pub mod can_retract;
pub mod get_bids;
pub mod get_winning_bid;
pub mod handle_bid;
pub mod proxy;
pub mod retract_bid;
pub mod verification;

pub struct ServiceInner {
    store:           Arc<Store>,
    auction_lock:    Arc<KeyedLock<AuctionId>>,
    event_sender:    broadcast::Sender<UpdateEvent>,
    ladder:          Arc<BidLadder>,
    auction_service: AuctionService,
    bid_limiter:     RateLimiter<UserId>,
}

#[derive(Clone)]
pub struct Service(Arc<ServiceInner>);
impl std::ops::Deref for Service {
    type Target = ServiceInner;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Service {
    pub fn new(
        store: Arc<Store>,
        auction_lock: Arc<KeyedLock<AuctionId>>,
        event_sender: broadcast::Sender<UpdateEvent>,
        config: Config,
        ladder: Arc<BidLadder>,
        auction_service: AuctionService,
    ) -> Self {
        let bid_limiter = RateLimiter::new(config.max_bids_per_minute);
        Self(Arc::new(ServiceInner {
            store,
            auction_lock,
            event_sender,
            ladder,
            auction_service,
            bid_limiter,
        }))
    }

    /// Ladder increment with the auction's own floor applied.
    pub fn effective_increment(&self, auction: &Auction, price: Cents) -> Cents {
        self.ladder
            .increment(price)
            .max(auction.minimum_bid_increment)
    }

    pub fn min_next_bid(&self, auction: &Auction) -> Cents {
        auction.current_price + self.effective_increment(auction, auction.current_price)
    }

    pub(crate) fn broadcast(&self, event: UpdateEvent) {
        if let Err(err) = self.event_sender.send(event) {
            tracing::trace!(error = ?err, "No event subscribers.");
        }
    }
}
