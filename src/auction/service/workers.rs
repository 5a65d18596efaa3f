use {
    super::{
        end_auction::EndAuctionInput,
        start_auction::StartAuctionInput,
        Service,
    },
    crate::{
        api::ws::UpdateEvent,
        auction::entities::AuctionStatus,
        server::SHOULD_EXIT,
    },
    serde::Serialize,
    std::{
        sync::atomic::{
            AtomicU64,
            Ordering,
        },
        time::Instant,
    },
    time::OffsetDateTime,
    tokio::time::MissedTickBehavior,
    utoipa::ToSchema,
};

#[derive(Debug)]
pub struct SchedulerStats {
    started_at:            Instant,
    ticks:                 AtomicU64,
    auctions_started:      AtomicU64,
    auctions_ended:        AtomicU64,
    ending_soon_notices:   AtomicU64,
    fail_safe_activations: AtomicU64,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatsSnapshot {
    pub uptime_seconds:        u64,
    pub ticks:                 u64,
    pub auctions_started:      u64,
    pub auctions_ended:        u64,
    pub ending_soon_notices:   u64,
    pub fail_safe_activations: u64,
}

impl SchedulerStats {
    pub fn new() -> Self {
        Self {
            started_at:            Instant::now(),
            ticks:                 AtomicU64::new(0),
            auctions_started:      AtomicU64::new(0),
            auctions_ended:        AtomicU64::new(0),
            ending_soon_notices:   AtomicU64::new(0),
            fail_safe_activations: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> SchedulerStatsSnapshot {
        SchedulerStatsSnapshot {
            uptime_seconds:        self.started_at.elapsed().as_secs(),
            ticks:                 self.ticks.load(Ordering::Relaxed),
            auctions_started:      self.auctions_started.load(Ordering::Relaxed),
            auctions_ended:        self.auctions_ended.load(Ordering::Relaxed),
            ending_soon_notices:   self.ending_soon_notices.load(Ordering::Relaxed),
            fail_safe_activations: self.fail_safe_activations.load(Ordering::Relaxed),
        }
    }
}

impl Service {
    pub fn scheduler_stats(&self) -> SchedulerStatsSnapshot {
        self.stats.snapshot()
    }

    /// Wall-clock driver for the auction lifecycle. A tick still running when
    /// the next interval fires is skipped; the next tick covers the
    /// accumulated work.
    pub async fn run_lifecycle_loop(&self) -> anyhow::Result<()> {
        tracing::info!(
            interval_ms = self.config.scheduler_interval_ms,
            "Starting lifecycle loop...",
        );
        let mut tick_interval = tokio::time::interval(self.config.scheduler_interval());
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        while !SHOULD_EXIT.load(Ordering::Acquire) {
            tick_interval.tick().await;
            self.run_tick().await;
        }
        tracing::info!("Shutting down lifecycle loop...");
        Ok(())
    }

    /// One scheduler pass. Failures on individual auctions are logged and do
    /// not abort the tick.
    pub async fn run_tick(&self) {
        self.stats.ticks.fetch_add(1, Ordering::Relaxed);
        let now = OffsetDateTime::now_utc();

        for auction in self
            .store
            .get_auctions_by_status(AuctionStatus::Pending)
            .await
        {
            if now < auction.start_time {
                continue;
            }
            match self
                .start_auction(StartAuctionInput { auction_id: auction.id })
                .await
            {
                Ok(_) => {
                    self.stats.auctions_started.fetch_add(1, Ordering::Relaxed);
                }
                Err(err) => {
                    tracing::warn!(auction_id = %auction.id, error = %err, "Scheduler failed to start auction.");
                }
            }
        }

        for auction in self
            .store
            .get_auctions_by_status(AuctionStatus::Active)
            .await
        {
            if !auction.has_time_limit {
                continue;
            }
            if now >= auction.end_time + self.config.bid_grace_period() {
                match self
                    .end_auction(EndAuctionInput { auction_id: auction.id })
                    .await
                {
                    Ok(_) => {
                        self.stats.auctions_ended.fetch_add(1, Ordering::Relaxed);
                        self.ending_soon_sent.remove(&auction.id);
                    }
                    Err(err) => {
                        tracing::warn!(auction_id = %auction.id, error = %err, "Scheduler failed to end auction.");
                    }
                }
            } else if now < auction.end_time
                && auction.end_time - now <= self.config.ending_soon_threshold()
            {
                self.notify_ending_soon(&auction, now);
            }
        }
    }

    fn notify_ending_soon(&self, auction: &crate::auction::entities::Auction, now: OffsetDateTime) {
        let throttle = self.config.ending_soon_throttle();
        let throttled = self
            .ending_soon_sent
            .get(&auction.id)
            .map(|last_sent| last_sent.elapsed() < throttle)
            .unwrap_or(false);
        if throttled {
            return;
        }
        self.ending_soon_sent.insert(auction.id, Instant::now());

        self.stats.ending_soon_notices.fetch_add(1, Ordering::Relaxed);
        self.broadcast(UpdateEvent::AuctionEndingSoon {
            auction:        auction.clone(),
            time_remaining: (auction.end_time - now).whole_seconds(),
        });
    }

    pub async fn run_fail_safe_loop(&self) -> anyhow::Result<()> {
        let mut tick_interval = tokio::time::interval(self.config.scheduler_interval());
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        while !SHOULD_EXIT.load(Ordering::Acquire) {
            tick_interval.tick().await;
            self.run_fail_safe().await;
        }
        Ok(())
    }

    /// Out-of-band sweep covering scheduler pauses: force-close ACTIVE
    /// auctions stuck past their end time plus the grace period.
    pub async fn run_fail_safe(&self) -> usize {
        let now = OffsetDateTime::now_utc();
        let mut forced = 0;
        for auction in self
            .store
            .get_auctions_by_status(AuctionStatus::Active)
            .await
        {
            if now - auction.end_time <= self.config.grace_period() {
                continue;
            }
            tracing::warn!(
                auction_id = %auction.id,
                end_time = %auction.end_time,
                "Fail-safe closing overdue auction.",
            );
            match self
                .end_auction(EndAuctionInput { auction_id: auction.id })
                .await
            {
                Ok(_) => {
                    forced += 1;
                    self.stats.fail_safe_activations.fetch_add(1, Ordering::Relaxed);
                }
                Err(err) => {
                    tracing::warn!(auction_id = %auction.id, error = %err, "Fail-safe failed to end auction.");
                }
            }
        }
        forced
    }
}
