use {
    crate::{
        api,
        auction::service::Service as AuctionService,
        bid::service::Service as BidService,
        config::{
            Config,
            RunOptions,
        },
        kernel::{
            lock::KeyedLock,
            store::Store,
        },
        state::ServerState,
    },
    anyhow::anyhow,
    futures::Future,
    std::{
        sync::{
            atomic::{
                AtomicBool,
                AtomicUsize,
                Ordering,
            },
            Arc,
        },
        time::Duration,
    },
    tokio::time::sleep,
};

// A static exit flag to indicate to running threads that we're shutting down. This is used to
// gracefully shutdown the application.
//
// NOTE: A more idiomatic approach would be to use a tokio::sync::broadcast channel, and to send a
// shutdown signal to all running tasks. However, this is a bit more complicated to implement and
// we don't rely on global state for anything else.
pub static SHOULD_EXIT: AtomicBool = AtomicBool::new(false);
pub const EXIT_CHECK_INTERVAL: Duration = Duration::from_secs(1);

const NOTIFICATIONS_CHAN_LEN: usize = 1000;

async fn fault_tolerant_handler<F, Fut>(name: String, f: F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    Fut::Output: Send + 'static,
{
    loop {
        let res = tokio::spawn(f()).await;
        match res {
            Ok(result) => match result {
                Ok(_) => break, // This will happen on graceful shutdown
                Err(err) => {
                    tracing::error!("{} returned error: {:?}", name, err);
                    sleep(Duration::from_millis(500)).await;
                }
            },
            Err(err) => {
                tracing::error!("{} is panicked or canceled: {:?}", name, err);
                SHOULD_EXIT.store(true, Ordering::Release);
                break;
            }
        }
    }
}

pub async fn start_server(run_options: RunOptions) -> anyhow::Result<()> {
    tokio::spawn(async move {
        tracing::info!("Registered shutdown signal handler...");
        tokio::signal::ctrl_c().await.unwrap();
        tracing::info!("Shut down signal received, waiting for tasks...");
        SHOULD_EXIT.store(true, Ordering::Release);
    });

    let config = Config::load(&run_options.config.config).map_err(|err| {
        anyhow!(
            "Failed to load config from file({path}): {:?}",
            err,
            path = run_options.config.config
        )
    })?;
    let ladder = Arc::new(
        config
            .bid_ladder()
            .map_err(|err| anyhow!("Invalid bid ladder configuration: {}", err))?,
    );

    let store = Arc::new(Store::new());
    let auction_lock = Arc::new(KeyedLock::new(config.lock_options()));
    let (broadcast_sender, broadcast_receiver) =
        tokio::sync::broadcast::channel(NOTIFICATIONS_CHAN_LEN);

    let auction_service = AuctionService::new(
        store.clone(),
        auction_lock.clone(),
        broadcast_sender.clone(),
        config.clone(),
    );
    let bid_service = BidService::new(
        store.clone(),
        auction_lock.clone(),
        broadcast_sender.clone(),
        config.clone(),
        ladder,
        auction_service.clone(),
    );

    let state = Arc::new(ServerState {
        store,
        auction_lock: auction_lock.clone(),
        auction_service: auction_service.clone(),
        bid_service,
        ws: api::ws::WsState {
            subscriber_counter: AtomicUsize::new(0),
            broadcast_sender,
            broadcast_receiver,
        },
    });

    tokio::join!(
        fault_tolerant_handler("lifecycle loop".to_string(), || {
            let service = auction_service.clone();
            async move { service.run_lifecycle_loop().await }
        }),
        fault_tolerant_handler("fail-safe loop".to_string(), || {
            let service = auction_service.clone();
            async move { service.run_fail_safe_loop().await }
        }),
        fault_tolerant_handler("lock sweeper".to_string(), || {
            let lock = auction_lock.clone();
            async move { lock.run_sweep_loop().await }
        }),
        fault_tolerant_handler("api server".to_string(), || api::start_api(
            run_options.clone(),
            state.clone()
        )),
    );

    Ok(())
}
