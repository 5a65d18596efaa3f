use {
    crate::{
        api::ws::WsState,
        auction::service::Service as AuctionService,
        bid::service::Service as BidService,
        kernel::{
            entities::AuctionId,
            lock::KeyedLock,
            store::Store,
        },
    },
    std::sync::Arc,
};

/// Process-wide state shared with the HTTP layer. The store, lock registry
/// and event channel are singletons; both services hold handles to the same
/// instances.
pub struct ServerState {
    pub store:           Arc<Store>,
    pub auction_lock:    Arc<KeyedLock<AuctionId>>,
    pub auction_service: AuctionService,
    pub bid_service:     BidService,
    pub ws:              WsState,
}
