use {
    crate::{
        api::ws::UpdateEvent,
        config::Config,
        kernel::{
            entities::AuctionId,
            lock::KeyedLock,
            store::Store,
        },
    },
    dashmap::DashMap,
    std::{
        sync::Arc,
        time::Instant,
    },
    tokio::sync::broadcast,
    workers::SchedulerStats,
};

pub mod cancel_auction;
pub mod create_auction;
pub mod end_auction;
pub mod get_auction;
pub mod get_auctions;
pub mod select_winner;
pub mod start_auction;
pub mod update_auction;
pub mod workers;

pub struct ServiceInner {
    store:            Arc<Store>,
    auction_lock:     Arc<KeyedLock<AuctionId>>,
    event_sender:     broadcast::Sender<UpdateEvent>,
    config:           Config,
    stats:            SchedulerStats,
    ending_soon_sent: DashMap<AuctionId, Instant>,
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
    ) -> Self {
        Self(Arc::new(ServiceInner {
            store,
            auction_lock,
            event_sender,
            config,
            stats: SchedulerStats::new(),
            ending_soon_sent: DashMap::new(),
        }))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Failures here mean no subscriber is listening; never a reason to fail
    /// the operation that produced the event.
    pub(crate) fn broadcast(&self, event: UpdateEvent) {
        if let Err(err) = self.event_sender.send(event) {
            tracing::trace!(error = ?err, "No event subscribers.");
        }
    }
}

#[cfg(test)]
pub mod tests {
    use {
        super::*,
        crate::kernel::lock::LockOptions,
        std::time::Duration,
    };

    pub fn new_for_test() -> (Service, broadcast::Receiver<UpdateEvent>) {
        let config = Config::default();
        let (event_sender, event_receiver) = broadcast::channel(256);
        let service = Service::new(
            Arc::new(Store::new()),
            Arc::new(KeyedLock::new(LockOptions {
                timeout:     Duration::from_secs(5),
                max_retries: 3,
                retry_delay: Duration::from_millis(5),
            })),
            event_sender,
            config,
        );
        (service, event_receiver)
    }
}
