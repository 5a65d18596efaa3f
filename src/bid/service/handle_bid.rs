use {
    super::{
        proxy::{
            self,
            ProxyBidRequest,
        },
        Service,
    },
    crate::{
        api::{
            ws::UpdateEvent,
            RestError,
        },
        auction::entities::Auction,
        bid::entities::{
            Bid,
            BidCreate,
        },
        kernel::entities::Cents,
    },
    serde::Serialize,
    time::OffsetDateTime,
    utoipa::ToSchema,
    uuid::Uuid,
};

pub struct HandleBidInput {
    pub bid_create: BidCreate,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaceBidResult {
    pub bid:        Bid,
    pub auction:    Auction,
    pub is_winning: bool,
}

impl Service {
    /// Place a bid. Everything between reading and writing the auction state
    /// happens under the per-auction lock; event delivery happens on the
    /// subscribers' own tasks.
    #[tracing::instrument(
        skip_all,
        fields(
            auction_id = %input.bid_create.auction_id,
            user_id = %input.bid_create.user_id,
            bid_id,
        ),
        err(level = tracing::Level::TRACE)
    )]
    pub async fn handle_bid(&self, input: HandleBidInput) -> Result<PlaceBidResult, RestError> {
        let auction_id = input.bid_create.auction_id;
        let result = self
            .auction_lock
            .with_lock(auction_id, || self.handle_bid_for_lock(input.bid_create))
            .await??;
        tracing::Span::current().record("bid_id", result.bid.id.to_string());
        Ok(result)
    }

    async fn handle_bid_for_lock(&self, bid_create: BidCreate) -> Result<PlaceBidResult, RestError> {
        let now = OffsetDateTime::now_utc();
        let auction = self.verify_placement(&bid_create, now).await?;
        match bid_create.max_bid {
            Some(user_max) => self.place_proxy_bid(auction, bid_create, user_max, now).await,
            None => self.place_direct_bid(auction, bid_create, now).await,
        }
    }

    async fn place_proxy_bid(
        &self,
        mut auction: Auction,
        bid_create: BidCreate,
        user_max: Cents,
        now: OffsetDateTime,
    ) -> Result<PlaceBidResult, RestError> {
        let user_id = bid_create.user_id;
        let bids = self.store.get_bids(auction.id, false).await;
        let previous_winner = bids.iter().find(|bid| bid.is_winning).cloned();

        if let Some(own) = previous_winner
            .clone()
            .filter(|bid| bid.user_id == user_id)
        {
            return self.raise_own_ceiling(auction, own, bid_create, user_max).await;
        }

        let competing: Vec<Bid> = bids
            .iter()
            .filter(|bid| bid.user_id != user_id)
            .cloned()
            .collect();
        let decision = proxy::decide(
            &auction,
            &competing,
            &ProxyBidRequest {
                user_id,
                user_max,
                custom_step: bid_create.auto_bid_step,
            },
            &self.ladder,
        );
        let minimum = self.min_next_bid(&auction);
        if decision.user_bid_amount < minimum {
            return Err(RestError::BidTooLow { minimum });
        }

        // Competitor bookkeeping first, in the engine's emission order.
        let mut announced_autos: Vec<(Bid, bool)> = vec![];
        for auto in &decision.competitor_auto_bids {
            let Some(existing) = bids.iter().find(|bid| bid.id == auto.bid_id) else {
                continue;
            };
            let mut updated = existing.clone();
            if let Some(new_amount) = auto.new_amount {
                updated.amount = new_amount;
            }
            updated.is_max_bid_reached = auto.is_max_bid_reached;
            updated.message = auto.message.clone().or_else(|| updated.message.clone());
            self.store.update_bid(updated.clone()).await?;

            let mut announced = updated;
            announced.amount = auto.amount;
            announced_autos.push((announced, auto.new_amount.is_some()));
        }

        let bid = Bid {
            id: Uuid::new_v4(),
            auction_id: auction.id,
            user_id,
            amount: decision.user_bid_amount,
            max_bid: Some(user_max),
            auto_bid_step: bid_create.auto_bid_step,
            timestamp: now,
            is_winning: decision.would_win,
            is_proxy_bid: true,
            is_retracted: false,
            retracted_at: None,
            retraction_reason: None,
            is_max_bid_reached: decision.is_max_bid_reached,
            message: decision.message.clone(),
        };
        self.store.add_bid(bid.clone()).await?;
        if decision.would_win {
            self.clear_other_winning_flags(auction.id, bid.id).await?;
        }

        auction.current_price = auction.current_price.max(decision.new_visible_price);
        auction.bid_count += 1;
        self.apply_buy_now_rules(&mut auction);
        self.store.update_auction(auction.clone()).await?;

        for (announced, keeps_lead) in announced_autos {
            self.broadcast(UpdateEvent::BidPlaced {
                bid:                announced,
                auction:            auction.clone(),
                is_winning:         keeps_lead,
                previous_winner_id: None,
            });
        }
        self.broadcast(UpdateEvent::BidPlaced {
            bid:                bid.clone(),
            auction:            auction.clone(),
            is_winning:         decision.would_win,
            previous_winner_id: previous_winner.as_ref().map(|bid| bid.user_id),
        });
        if decision.would_win {
            if let Some(previous) = previous_winner.filter(|bid| bid.user_id != user_id) {
                self.broadcast(UpdateEvent::YouWereOutbid {
                    auction_id:      auction.id,
                    previous_amount: previous.amount,
                    new_amount:      bid.amount,
                    new_leader_id:   user_id,
                    target_user_id:  previous.user_id,
                });
            }
        }

        Ok(PlaceBidResult {
            bid,
            auction,
            is_winning: decision.would_win,
        })
    }

    /// The leader raising their own ceiling: the record keeps its amount and
    /// first timestamp, leadership and price are unchanged.
    async fn raise_own_ceiling(
        &self,
        mut auction: Auction,
        mut own: Bid,
        bid_create: BidCreate,
        user_max: Cents,
    ) -> Result<PlaceBidResult, RestError> {
        let old_max = own.max_bid.unwrap_or(own.amount);
        if user_max <= old_max {
            return Err(RestError::BadParameters(
                "maximum bid must exceed the current maximum".to_string(),
            ));
        }
        own.max_bid = Some(user_max);
        if bid_create.auto_bid_step.is_some() {
            own.auto_bid_step = bid_create.auto_bid_step;
        }
        own.is_max_bid_reached = false;
        own.message = None;
        self.store.update_bid(own.clone()).await?;

        auction.bid_count += 1;
        self.store.update_auction(auction.clone()).await?;

        self.broadcast(UpdateEvent::BidPlaced {
            bid:                own.clone(),
            auction:            auction.clone(),
            is_winning:         true,
            previous_winner_id: None,
        });
        Ok(PlaceBidResult {
            bid:        own,
            auction,
            is_winning: true,
        })
    }

    async fn place_direct_bid(
        &self,
        mut auction: Auction,
        bid_create: BidCreate,
        now: OffsetDateTime,
    ) -> Result<PlaceBidResult, RestError> {
        let user_id = bid_create.user_id;
        let amount = bid_create.amount;
        let bids = self.store.get_bids(auction.id, false).await;
        let previous_winner = bids.iter().find(|bid| bid.is_winning).cloned();

        let minimum = self.min_next_bid(&auction);
        if amount < minimum {
            return Err(RestError::BidTooLow { minimum });
        }
        let buy_now_hit = auction.buy_now_price == Some(amount);

        // Direct bids skip the proxy engine entirely; the strict comparison
        // lets an equal earlier bid keep the lead.
        let is_winning = bids
            .iter()
            .filter(|bid| bid.user_id != user_id)
            .all(|bid| amount > bid.amount);
        let bid = Bid {
            id: Uuid::new_v4(),
            auction_id: auction.id,
            user_id,
            amount,
            max_bid: None,
            auto_bid_step: None,
            timestamp: now,
            is_winning,
            is_proxy_bid: false,
            is_retracted: false,
            retracted_at: None,
            retraction_reason: None,
            is_max_bid_reached: false,
            message: None,
        };
        self.store.add_bid(bid.clone()).await?;
        if is_winning {
            self.clear_other_winning_flags(auction.id, bid.id).await?;
            auction.current_price = amount;
        }
        auction.bid_count += 1;
        self.apply_buy_now_rules(&mut auction);
        self.store.update_auction(auction.clone()).await?;

        self.broadcast(UpdateEvent::BidPlaced {
            bid:                bid.clone(),
            auction:            auction.clone(),
            is_winning,
            previous_winner_id: previous_winner.as_ref().map(|bid| bid.user_id),
        });
        if is_winning {
            if let Some(previous) = previous_winner.filter(|bid| bid.user_id != user_id) {
                self.broadcast(UpdateEvent::YouWereOutbid {
                    auction_id:      auction.id,
                    previous_amount: previous.amount,
                    new_amount:      amount,
                    new_leader_id:   user_id,
                    target_user_id:  previous.user_id,
                });
            }
        }

        if buy_now_hit && is_winning {
            // Buy Now purchase: close the lot inline under the same lock.
            auction = self.auction_service.end_auction_for_lock(auction.id).await?;
        }
        Ok(PlaceBidResult {
            bid,
            auction,
            is_winning,
        })
    }

    async fn clear_other_winning_flags(
        &self,
        auction_id: crate::kernel::entities::AuctionId,
        winning_bid_id: crate::kernel::entities::BidId,
    ) -> Result<(), RestError> {
        for other in self.store.get_bids(auction_id, false).await {
            if other.is_winning && other.id != winning_bid_id {
                let mut cleared = other;
                cleared.is_winning = false;
                self.store.update_bid(cleared).await?;
            }
        }
        Ok(())
    }

    /// Buy Now removal: the first bid clears it on an unreserved auction;
    /// meeting the reserve clears it on a reserved one.
    fn apply_buy_now_rules(&self, auction: &mut Auction) {
        let was_met = auction.reserve_met;
        auction.refresh_reserve_met();
        if auction.buy_now_price.is_none() {
            return;
        }
        let clear = match auction.reserve_price {
            None => true,
            Some(_) => !was_met && auction.reserve_met,
        };
        if clear {
            auction.buy_now_price = None;
            tracing::debug!(auction_id = %auction.id, "Buy now removed.");
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            auction::{
                entities::AuctionStatus,
                service::end_auction::EndAuctionInput,
            },
            bid::service::tests::{
                new_for_test,
                place_direct_bid,
                place_max_bid,
                seed_auction,
                seed_user,
            },
        },
    };

    async fn winning_amounts(
        service: &Service,
        auction_id: crate::kernel::entities::AuctionId,
    ) -> (Cents, usize) {
        let auction = service.store.get_auction(auction_id).await.unwrap();
        let bids = service.store.get_bids(auction_id, false).await;
        assert!(bids.iter().filter(|bid| bid.is_winning).count() <= 1);
        (auction.current_price, bids.len())
    }

    #[tokio::test]
    async fn standard_second_price_sequence() {
        // Start 10 000; A max 20 000, B max 12 000, C max 30 000.
        let (service, _events) = new_for_test();
        let auction = seed_auction(&service, 10_000, None, None).await;
        let (a, b, c) = (
            seed_user(&service, "a").await,
            seed_user(&service, "b").await,
            seed_user(&service, "c").await,
        );

        let first = place_max_bid(&service, auction.id, a, 20_000).await.unwrap();
        assert!(first.is_winning);
        assert_eq!(first.auction.current_price, 11_000);

        // B's lower ceiling loses; A defends one step over it.
        let second = place_max_bid(&service, auction.id, b, 12_000).await.unwrap();
        assert!(!second.is_winning);
        assert_eq!(second.bid.amount, 12_000);
        assert!(second.bid.is_max_bid_reached);
        assert_eq!(second.auction.current_price, 13_000);

        let third = place_max_bid(&service, auction.id, c, 30_000).await.unwrap();
        assert!(third.is_winning);
        assert_eq!(third.auction.current_price, 21_000);

        // History: one record per bidder, exactly one winner.
        let (price, history) = winning_amounts(&service, auction.id).await;
        assert_eq!(price, 21_000);
        assert_eq!(history, 3);
        let ended = service
            .auction_service
            .end_auction(EndAuctionInput { auction_id: auction.id })
            .await
            .unwrap();
        assert_eq!(ended.status, AuctionStatus::Ended);
        assert_eq!(ended.winner_id, Some(c));
        assert_eq!(service.store.get_auction(auction.id).await.unwrap().bid_count, 3);
    }

    #[tokio::test]
    async fn unmet_reserve_ends_unsold() {
        // Start 1; reserve 100 000; A max 30 000; B max 80 000.
        let (service, _events) = new_for_test();
        let auction = seed_auction(&service, 1, Some(100_000), None).await;
        let (a, b) = (seed_user(&service, "a").await, seed_user(&service, "b").await);

        place_max_bid(&service, auction.id, a, 30_000).await.unwrap();
        let second = place_max_bid(&service, auction.id, b, 80_000).await.unwrap();
        assert_eq!(second.auction.current_price, 32_500);
        assert!(!second.auction.reserve_met);

        let ended = service
            .auction_service
            .end_auction(EndAuctionInput { auction_id: auction.id })
            .await
            .unwrap();
        assert_eq!(ended.status, AuctionStatus::Unsold);
        assert_eq!(ended.winner_id, None);
        assert_eq!(ended.current_price, 32_500);
    }

    #[tokio::test]
    async fn equal_ceilings_keep_the_earlier_bidder_in_front() {
        // Start 10 000; A and B both cap at 20 000; A was first.
        let (service, _events) = new_for_test();
        let auction = seed_auction(&service, 10_000, None, None).await;
        let (a, b) = (seed_user(&service, "a").await, seed_user(&service, "b").await);

        let first = place_max_bid(&service, auction.id, a, 20_000).await.unwrap();
        let second = place_max_bid(&service, auction.id, b, 20_000).await.unwrap();

        assert!(first.is_winning);
        assert!(!second.is_winning);
        assert!(second.bid.is_max_bid_reached);
        assert_eq!(second.auction.current_price, 11_000);

        let bids = service.store.get_bids(auction.id, false).await;
        let winner = bids.iter().find(|bid| bid.is_winning).unwrap();
        assert_eq!(winner.user_id, a);
        assert_eq!(winner.amount, 11_000);
    }

    #[tokio::test]
    async fn leader_raising_their_ceiling_keeps_the_price() {
        // Start 10 000; A max 60 000; B max 55 000; A raises to 80 000.
        let (service, _events) = new_for_test();
        let auction = seed_auction(&service, 10_000, None, None).await;
        let (a, b) = (seed_user(&service, "a").await, seed_user(&service, "b").await);

        place_max_bid(&service, auction.id, a, 60_000).await.unwrap();
        let challenge = place_max_bid(&service, auction.id, b, 55_000).await.unwrap();
        assert!(!challenge.is_winning);
        assert_eq!(challenge.auction.current_price, 60_000);

        let raise = place_max_bid(&service, auction.id, a, 80_000).await.unwrap();
        assert!(raise.is_winning);
        assert_eq!(raise.auction.current_price, 60_000);
        assert_eq!(raise.bid.max_bid, Some(80_000));
        assert_eq!(raise.bid.amount, 60_000);

        // Lowering the ceiling back is rejected.
        let lower = place_max_bid(&service, auction.id, a, 70_000).await;
        assert!(matches!(lower, Err(RestError::BadParameters(_))));
    }

    #[tokio::test]
    async fn reserve_jump_lifts_the_formula_price_to_the_reserve() {
        // Start 1 000; reserve 30 000; A max 20 000; B max 40 000.
        let (service, mut events) = new_for_test();
        let auction = seed_auction(&service, 1_000, Some(30_000), Some(50_000)).await;
        let (a, b) = (seed_user(&service, "a").await, seed_user(&service, "b").await);

        let first = place_max_bid(&service, auction.id, a, 20_000).await.unwrap();
        assert_eq!(first.auction.current_price, 1_100);
        assert!(!first.auction.reserve_met);
        // Reserved auction: Buy Now survives until the reserve is met.
        assert_eq!(first.auction.buy_now_price, Some(50_000));

        let second = place_max_bid(&service, auction.id, b, 40_000).await.unwrap();
        assert!(second.is_winning);
        assert_eq!(second.auction.current_price, 30_000);
        assert!(second.auction.reserve_met);
        assert_eq!(second.auction.buy_now_price, None);

        // Outbid notice targets the displaced leader.
        let mut saw_outbid = false;
        while let Ok(event) = events.try_recv() {
            if let UpdateEvent::YouWereOutbid { target_user_id, new_leader_id, .. } = event {
                assert_eq!(target_user_id, a);
                assert_eq!(new_leader_id, b);
                saw_outbid = true;
            }
        }
        assert!(saw_outbid);
    }

    #[tokio::test]
    async fn first_bid_clears_buy_now_on_unreserved_auctions() {
        let (service, _events) = new_for_test();
        let auction = seed_auction(&service, 10_000, None, Some(50_000)).await;
        let a = seed_user(&service, "a").await;

        let placed = place_max_bid(&service, auction.id, a, 20_000).await.unwrap();
        assert_eq!(placed.auction.buy_now_price, None);
    }

    #[tokio::test]
    async fn buy_now_purchase_ends_the_auction_inline() {
        let (service, _events) = new_for_test();
        let auction = seed_auction(&service, 10_000, None, Some(50_000)).await;
        let a = seed_user(&service, "a").await;

        let placed = place_direct_bid(&service, auction.id, a, 50_000).await.unwrap();
        assert!(placed.is_winning);
        assert_eq!(placed.auction.status, AuctionStatus::Ended);
        assert_eq!(placed.auction.winner_id, Some(a));
        assert_eq!(placed.auction.current_price, 50_000);
    }

    #[tokio::test]
    async fn bids_below_the_minimum_raise_are_rejected() {
        let (service, _events) = new_for_test();
        let auction = seed_auction(&service, 10_000, None, None).await;
        let a = seed_user(&service, "a").await;

        let result = place_max_bid(&service, auction.id, a, 10_500).await;
        assert!(matches!(
            result,
            Err(RestError::BidTooLow { minimum: 11_000 })
        ));
    }

    #[tokio::test]
    async fn direct_bids_compete_on_visible_amounts_only() {
        let (service, _events) = new_for_test();
        let auction = seed_auction(&service, 10_000, None, None).await;
        let (a, b) = (seed_user(&service, "a").await, seed_user(&service, "b").await);

        place_direct_bid(&service, auction.id, a, 11_000).await.unwrap();
        let second = place_direct_bid(&service, auction.id, b, 12_000).await.unwrap();
        assert!(second.is_winning);
        assert_eq!(second.auction.current_price, 12_000);
        assert!(!second.bid.is_proxy_bid);
    }

    #[tokio::test]
    async fn current_price_is_monotonic_while_active() {
        let (service, _events) = new_for_test();
        let auction = seed_auction(&service, 10_000, None, None).await;
        let (a, b, c) = (
            seed_user(&service, "a").await,
            seed_user(&service, "b").await,
            seed_user(&service, "c").await,
        );

        let mut last = 10_000;
        for (user, max) in [(a, 15_000), (b, 26_000), (c, 45_000)] {
            let placed = place_max_bid(&service, auction.id, user, max).await.unwrap();
            assert!(placed.auction.current_price >= last);
            last = placed.auction.current_price;
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_bids_serialize_to_a_consistent_state() {
        let (service, _events) = new_for_test();
        let auction = seed_auction(&service, 10_000, None, None).await;

        let mut users = vec![];
        for index in 0..8 {
            users.push(seed_user(&service, &format!("bidder{}", index)).await);
        }
        let tasks: Vec<_> = users
            .into_iter()
            .enumerate()
            .map(|(index, user)| {
                let service = service.clone();
                let auction_id = auction.id;
                tokio::spawn(async move {
                    place_max_bid(&service, auction_id, user, 20_000 + index as Cents * 1_000)
                        .await
                })
            })
            .collect();
        let mut accepted = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => accepted += 1,
                // Contention and stale minimums are legitimate rejections;
                // partial writes are not.
                Err(RestError::Busy) | Err(RestError::BidTooLow { .. }) => {}
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }
        assert!(accepted >= 1);

        let final_auction = service.store.get_auction(auction.id).await.unwrap();
        let bids = service.store.get_bids(auction.id, false).await;
        assert_eq!(final_auction.bid_count as usize, bids.len());
        assert_eq!(bids.iter().filter(|bid| bid.is_winning).count(), 1);
        let winner = bids.iter().find(|bid| bid.is_winning).unwrap();
        assert_eq!(final_auction.current_price, winner.amount);
    }
}
