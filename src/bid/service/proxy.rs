use crate::{
    auction::entities::Auction,
    bid::entities::{
        Bid,
        BidLadder,
    },
    kernel::entities::{
        BidId,
        Cents,
        UserId,
    },
};

pub const MAX_REACHED_MESSAGE: &str = "Maximum bid reached";

pub struct ProxyBidRequest {
    pub user_id:     UserId,
    pub user_max:    Cents,
    pub custom_step: Option<Cents>,
}

/// Bookkeeping the engine asks the caller to apply to the standing leader's
/// existing bid record, and to announce as a proxy `BID_PLACED` event.
#[derive(Clone, Debug, PartialEq)]
pub struct CompetitorAutoBid {
    pub bid_id:             BidId,
    pub user_id:            UserId,
    /// Visible amount for the emitted event.
    pub amount:             Cents,
    /// When set, the leader's recorded amount is raised in place; when
    /// absent only the flags below are recorded.
    pub new_amount:         Option<Cents>,
    pub is_max_bid_reached: bool,
    pub message:            Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Decision {
    pub user_bid_amount:      Cents,
    pub would_win:            bool,
    pub competitor_auto_bids: Vec<CompetitorAutoBid>,
    pub new_visible_price:    Cents,
    pub is_max_bid_reached:   bool,
    pub message:              Option<String>,
}

/// Compute the terminal second-price outcome for an incoming maximum bid.
///
/// `competing` must hold the other users' non-retracted bids only; the
/// requesting user's own records are excluded by the caller so that a leader
/// raising their own ceiling competes against everyone else, not themselves.
/// The engine is pure: persistence and event emission stay with the caller.
pub fn decide(
    auction: &Auction,
    competing: &[Bid],
    request: &ProxyBidRequest,
    ladder: &BidLadder,
) -> Decision {
    let current_price = auction.current_price;
    let step = |at: Cents, custom: Option<Cents>| -> Cents {
        custom.unwrap_or_else(|| ladder.increment(at).max(auction.minimum_bid_increment))
    };

    // The highest competing ceiling; the earlier record keeps priority on a
    // tie. Direct bids carry no ceiling and compete through the visible
    // price alone.
    let leader = competing
        .iter()
        .filter(|bid| bid.max_bid.is_some())
        .max_by(|a, b| {
            a.max_bid
                .cmp(&b.max_bid)
                .then_with(|| b.timestamp.cmp(&a.timestamp))
        });

    let Some(leader) = leader else {
        let inc = step(current_price, request.custom_step);
        let min_next = current_price + inc;
        let user_bid_amount = request.user_max.min(min_next);
        let would_win = user_bid_amount >= min_next;
        return Decision {
            user_bid_amount,
            would_win,
            competitor_auto_bids: vec![],
            new_visible_price: if would_win { user_bid_amount } else { current_price },
            is_max_bid_reached: !would_win,
            message: (!would_win).then(|| "Maximum bid is below the minimum raise".to_string()),
        };
    };

    let leader_max = leader.max_bid.unwrap_or(leader.amount);
    if request.user_max > leader_max {
        // The incoming ceiling displaces the leader: second-price formula,
        // one step over the displaced ceiling.
        let inc = step(leader_max, request.custom_step);
        let mut user_bid_amount = request.user_max.min(leader_max + inc);
        if let Some(reserve) = auction.reserve_price {
            // Reserve jump, only when the formula lands strictly below it.
            if request.user_max >= reserve && user_bid_amount < reserve {
                user_bid_amount = reserve;
            }
        }
        // The displaced leader's ceiling becomes public; their recorded
        // amount stays where the bidding left it.
        let competitor_auto_bids = (leader.amount < leader_max)
            .then(|| CompetitorAutoBid {
                bid_id:             leader.id,
                user_id:            leader.user_id,
                amount:             leader_max,
                new_amount:         None,
                is_max_bid_reached: true,
                message:            Some(MAX_REACHED_MESSAGE.to_string()),
            })
            .into_iter()
            .collect();
        Decision {
            user_bid_amount,
            would_win: true,
            competitor_auto_bids,
            new_visible_price: user_bid_amount,
            is_max_bid_reached: user_bid_amount == request.user_max,
            message: None,
        }
    } else if request.user_max == leader_max {
        // Tie: the earlier ceiling keeps the lead and the price stands.
        Decision {
            user_bid_amount:      request.user_max,
            would_win:            false,
            competitor_auto_bids: vec![],
            new_visible_price:    current_price,
            is_max_bid_reached:   true,
            message:              Some("An equal maximum bid was placed earlier".to_string()),
        }
    } else {
        // The standing leader defends: one step over the challenger, bounded
        // by their own ceiling, using their step override if they set one.
        let inc = step(request.user_max, leader.auto_bid_step);
        let raise = leader_max.min(request.user_max + inc);
        let leader_maxed = raise == leader_max;
        let competitor_auto_bids = (raise > leader.amount)
            .then(|| CompetitorAutoBid {
                bid_id:             leader.id,
                user_id:            leader.user_id,
                amount:             raise,
                new_amount:         Some(raise),
                is_max_bid_reached: leader_maxed,
                message:            leader_maxed.then(|| MAX_REACHED_MESSAGE.to_string()),
            })
            .into_iter()
            .collect();
        Decision {
            user_bid_amount: request.user_max,
            would_win: false,
            competitor_auto_bids,
            new_visible_price: raise.max(current_price),
            is_max_bid_reached: true,
            message: Some("A competing maximum bid is higher".to_string()),
        }
    }
}
