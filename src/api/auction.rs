use {
    crate::{
        api::{
            ok_response,
            ApiResponse,
            ErrorBodyResponse,
            RestError,
        },
        auction::{
            entities::{
                Auction,
                AuctionStatus,
            },
            service::{
                cancel_auction::CancelAuctionInput,
                create_auction::CreateAuctionInput,
                end_auction::EndAuctionInput,
                get_auction::GetAuctionInput,
                get_auctions::GetAuctionsInput,
                select_winner::SelectWinnerInput,
                start_auction::StartAuctionInput,
                update_auction::UpdateAuctionInput,
            },
        },
        bid::{
            entities::Bid,
            service::{
                get_bids::GetBidsInput,
                get_winning_bid::GetWinningBidInput,
            },
        },
        kernel::entities::{
            AuctionId,
            Cents,
            UserId,
        },
        state::ServerState,
    },
    axum::{
        extract::{
            Path,
            Query,
            State,
        },
        Json,
    },
    serde::{
        Deserialize,
        Serialize,
    },
    std::sync::Arc,
    time::OffsetDateTime,
    utoipa::{
        IntoParams,
        ToSchema,
    },
};

fn default_has_time_limit() -> bool {
    true
}

#[derive(Deserialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateAuction {
    /// Listing title, at most 200 characters.
    #[schema(example = "Carved oak writing desk")]
    pub title:                 String,
    pub description:           String,
    /// All amounts are integer cents.
    #[schema(example = 10000)]
    pub starting_price:        Cents,
    /// Optional floor under the dynamic increment ladder.
    pub minimum_bid_increment: Option<Cents>,
    /// Hidden reserve; the auction ends UNSOLD below it.
    pub reserve_price:         Option<Cents>,
    pub buy_now_price:         Option<Cents>,
    /// Defaults to now, which makes the auction immediately active.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start_time:            Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end_time:              Option<OffsetDateTime>,
    #[serde(default = "default_has_time_limit")]
    pub has_time_limit:        bool,
    pub created_by:            UserId,
}

/// Create an auction.
///
/// The auction is ACTIVE right away when the start time is now or in the
/// past, PENDING otherwise.
#[utoipa::path(post, path = "/auctions", request_body = CreateAuction, responses(
    (status = 200, description = "The created auction", body = Auction),
    (status = 400, response = ErrorBodyResponse),
),)]
pub async fn post_auction(
    State(state): State<Arc<ServerState>>,
    Json(create): Json<CreateAuction>,
) -> Result<Json<ApiResponse<Auction>>, RestError> {
    let auction = state
        .auction_service
        .create_auction(CreateAuctionInput {
            title:                 create.title,
            description:           create.description,
            starting_price:        create.starting_price,
            minimum_bid_increment: create.minimum_bid_increment,
            reserve_price:         create.reserve_price,
            buy_now_price:         create.buy_now_price,
            start_time:            create.start_time,
            end_time:              create.end_time,
            has_time_limit:        create.has_time_limit,
            created_by:            create.created_by,
        })
        .await?;
    Ok(ok_response(auction))
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListAuctionsParams {
    /// Filter by lifecycle status.
    pub status:     Option<AuctionStatus>,
    /// Filter by the creating user.
    pub created_by: Option<UserId>,
}

/// List auctions, newest start time first.
#[utoipa::path(get, path = "/auctions", params(ListAuctionsParams), responses(
    (status = 200, description = "Matching auctions", body = Vec<Auction>),
),)]
pub async fn get_auctions(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<ListAuctionsParams>,
) -> Result<Json<ApiResponse<Vec<Auction>>>, RestError> {
    let auctions = state
        .auction_service
        .get_auctions(GetAuctionsInput {
            status:     params.status,
            created_by: params.created_by,
        })
        .await;
    Ok(ok_response(auctions))
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuctionDetail {
    #[serde(flatten)]
    pub auction:        Auction,
    /// Seconds until the hard close.
    pub time_remaining: i64,
    /// The smallest acceptable next bid, per the increment ladder.
    pub minimum_bid:    Cents,
    pub is_ending_soon: bool,
}

/// Auction detail with the derived bidding fields.
#[utoipa::path(get, path = "/auctions/{auction_id}", params(
    ("auction_id" = AuctionId, Path, description = "Auction id"),
), responses(
    (status = 200, description = "The auction", body = AuctionDetail),
    (status = 404, response = ErrorBodyResponse),
),)]
pub async fn get_auction(
    State(state): State<Arc<ServerState>>,
    Path(auction_id): Path<AuctionId>,
) -> Result<Json<ApiResponse<AuctionDetail>>, RestError> {
    let auction = state
        .auction_service
        .get_auction(GetAuctionInput { auction_id })
        .await?;
    let now = OffsetDateTime::now_utc();
    let time_remaining = auction.time_remaining(now);
    let is_ending_soon = auction.status == AuctionStatus::Active
        && time_remaining > time::Duration::ZERO
        && time_remaining <= state.auction_service.config().ending_soon_threshold();
    let minimum_bid = state.bid_service.min_next_bid(&auction);
    Ok(ok_response(AuctionDetail {
        time_remaining: time_remaining.whole_seconds(),
        minimum_bid,
        is_ending_soon,
        auction,
    }))
}

#[derive(Deserialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAuction {
    pub title:                 Option<String>,
    pub description:           Option<String>,
    pub starting_price:        Option<Cents>,
    pub minimum_bid_increment: Option<Cents>,
    pub reserve_price:         Option<Cents>,
    pub buy_now_price:         Option<Cents>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start_time:            Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end_time:              Option<OffsetDateTime>,
}

/// Edit an auction. Allowed while PENDING, or ACTIVE with no bids.
#[utoipa::path(put, path = "/auctions/{auction_id}", request_body = UpdateAuction, params(
    ("auction_id" = AuctionId, Path, description = "Auction id"),
), responses(
    (status = 200, description = "The updated auction", body = Auction),
    (status = 400, response = ErrorBodyResponse),
    (status = 404, response = ErrorBodyResponse),
),)]
pub async fn put_auction(
    State(state): State<Arc<ServerState>>,
    Path(auction_id): Path<AuctionId>,
    Json(update): Json<UpdateAuction>,
) -> Result<Json<ApiResponse<Auction>>, RestError> {
    let auction = state
        .auction_service
        .update_auction(UpdateAuctionInput {
            auction_id,
            title: update.title,
            description: update.description,
            starting_price: update.starting_price,
            minimum_bid_increment: update.minimum_bid_increment,
            reserve_price: update.reserve_price,
            buy_now_price: update.buy_now_price,
            start_time: update.start_time,
            end_time: update.end_time,
        })
        .await?;
    Ok(ok_response(auction))
}

/// Cancel a bid-less auction.
#[utoipa::path(delete, path = "/auctions/{auction_id}", params(
    ("auction_id" = AuctionId, Path, description = "Auction id"),
), responses(
    (status = 200, description = "The auction was removed"),
    (status = 400, response = ErrorBodyResponse),
    (status = 404, response = ErrorBodyResponse),
),)]
pub async fn delete_auction(
    State(state): State<Arc<ServerState>>,
    Path(auction_id): Path<AuctionId>,
) -> Result<Json<ApiResponse<()>>, RestError> {
    state
        .auction_service
        .cancel_auction(CancelAuctionInput { auction_id })
        .await?;
    Ok(ok_response(()))
}

/// Manually start a PENDING auction whose start time has been reached.
#[utoipa::path(post, path = "/auctions/{auction_id}/start", params(
    ("auction_id" = AuctionId, Path, description = "Auction id"),
), responses(
    (status = 200, description = "The started auction", body = Auction),
    (status = 400, response = ErrorBodyResponse),
),)]
pub async fn post_start_auction(
    State(state): State<Arc<ServerState>>,
    Path(auction_id): Path<AuctionId>,
) -> Result<Json<ApiResponse<Auction>>, RestError> {
    let auction = state
        .auction_service
        .start_auction(StartAuctionInput { auction_id })
        .await?;
    Ok(ok_response(auction))
}

/// Manually end an ACTIVE auction.
#[utoipa::path(post, path = "/auctions/{auction_id}/end", params(
    ("auction_id" = AuctionId, Path, description = "Auction id"),
), responses(
    (status = 200, description = "The closed auction", body = Auction),
    (status = 400, response = ErrorBodyResponse),
),)]
pub async fn post_end_auction(
    State(state): State<Arc<ServerState>>,
    Path(auction_id): Path<AuctionId>,
) -> Result<Json<ApiResponse<Auction>>, RestError> {
    let auction = state
        .auction_service
        .end_auction(EndAuctionInput { auction_id })
        .await?;
    Ok(ok_response(auction))
}

#[derive(Deserialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SelectWinner {
    pub winner_id: UserId,
}

/// Manually resolve the auction to a user holding a non-retracted bid.
#[utoipa::path(post, path = "/auctions/{auction_id}/select-winner", request_body = SelectWinner, params(
    ("auction_id" = AuctionId, Path, description = "Auction id"),
), responses(
    (status = 200, description = "The resolved auction", body = Auction),
    (status = 400, response = ErrorBodyResponse),
),)]
pub async fn post_select_winner(
    State(state): State<Arc<ServerState>>,
    Path(auction_id): Path<AuctionId>,
    Json(select): Json<SelectWinner>,
) -> Result<Json<ApiResponse<Auction>>, RestError> {
    let auction = state
        .auction_service
        .select_winner(SelectWinnerInput {
            auction_id,
            winner_id: select.winner_id,
        })
        .await?;
    Ok(ok_response(auction))
}

/// Non-retracted bids on the auction, newest first.
#[utoipa::path(get, path = "/auctions/{auction_id}/bids", params(
    ("auction_id" = AuctionId, Path, description = "Auction id"),
), responses(
    (status = 200, description = "Bids on the auction", body = Vec<Bid>),
    (status = 404, response = ErrorBodyResponse),
),)]
pub async fn get_auction_bids(
    State(state): State<Arc<ServerState>>,
    Path(auction_id): Path<AuctionId>,
) -> Result<Json<ApiResponse<Vec<Bid>>>, RestError> {
    let bids = state.bid_service.get_bids(GetBidsInput { auction_id }).await?;
    Ok(ok_response(bids))
}

/// The current winning bid, or null when there is none.
#[utoipa::path(get, path = "/auctions/{auction_id}/winning-bid", params(
    ("auction_id" = AuctionId, Path, description = "Auction id"),
), responses(
    (status = 200, description = "The winning bid, null when there is none", body = Bid),
    (status = 404, response = ErrorBodyResponse),
),)]
pub async fn get_auction_winning_bid(
    State(state): State<Arc<ServerState>>,
    Path(auction_id): Path<AuctionId>,
) -> Result<Json<ApiResponse<Option<Bid>>>, RestError> {
    let winning = state
        .bid_service
        .get_winning_bid(GetWinningBidInput { auction_id })
        .await?;
    Ok(ok_response(winning))
}
