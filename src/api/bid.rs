use {
    crate::{
        api::{
            ok_response,
            ApiResponse,
            ErrorBodyResponse,
            RestError,
        },
        bid::{
            entities::{
                Bid,
                BidCreate,
                RetractionReason,
            },
            service::{
                can_retract::{
                    CanRetract,
                    CanRetractInput,
                },
                handle_bid::{
                    HandleBidInput,
                    PlaceBidResult,
                },
                retract_bid::RetractBidInput,
            },
        },
        kernel::entities::{
            AuctionId,
            BidId,
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
    serde::Deserialize,
    std::sync::Arc,
    utoipa::{
        IntoParams,
        ToSchema,
    },
};

#[derive(Deserialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PostBid {
    pub auction_id:    AuctionId,
    pub user_id:       UserId,
    /// The visible bid, in cents. Ignored in favor of the proxy outcome when
    /// `maxBid` is given.
    #[schema(example = 12000)]
    pub amount:        Cents,
    /// Private ceiling for proxy bidding.
    #[serde(default)]
    pub max_bid:       Option<Cents>,
    /// Custom increment override for this bidder's proxy.
    #[serde(default)]
    pub auto_bid_step: Option<Cents>,
}

/// Place a bid.
///
/// With `maxBid` the engine bids on the user's behalf up to the ceiling and
/// the visible amount follows the second-price rule; without it the amount is
/// taken literally.
#[utoipa::path(post, path = "/bids", request_body = PostBid, responses(
    (status = 200, description = "The placed bid with the updated auction", body = PlaceBidResult),
    (status = 400, response = ErrorBodyResponse),
    (status = 404, response = ErrorBodyResponse),
    (status = 409, description = "The auction is locked by a concurrent bid", body = ErrorBodyResponse),
),)]
pub async fn post_bid(
    State(state): State<Arc<ServerState>>,
    Json(post): Json<PostBid>,
) -> Result<Json<ApiResponse<PlaceBidResult>>, RestError> {
    let result = state
        .bid_service
        .handle_bid(HandleBidInput {
            bid_create: BidCreate {
                auction_id:    post.auction_id,
                user_id:       post.user_id,
                amount:        post.amount,
                max_bid:       post.max_bid,
                auto_bid_step: post.auto_bid_step,
            },
        })
        .await?;
    Ok(ok_response(result))
}

#[derive(Deserialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RetractBid {
    pub user_id: UserId,
    pub reason:  RetractionReason,
}

/// Retract a winning bid within the retraction window.
#[utoipa::path(post, path = "/bids/{bid_id}/retract", request_body = RetractBid, params(
    ("bid_id" = BidId, Path, description = "Bid id"),
), responses(
    (status = 200, description = "The retracted bid", body = Bid),
    (status = 400, response = ErrorBodyResponse),
    (status = 403, response = ErrorBodyResponse),
    (status = 404, response = ErrorBodyResponse),
),)]
pub async fn post_retract_bid(
    State(state): State<Arc<ServerState>>,
    Path(bid_id): Path<BidId>,
    Json(retract): Json<RetractBid>,
) -> Result<Json<ApiResponse<Bid>>, RestError> {
    let bid = state
        .bid_service
        .retract_bid(RetractBidInput {
            bid_id,
            user_id: retract.user_id,
            reason: retract.reason,
        })
        .await?;
    Ok(ok_response(bid))
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct CanRetractParams {
    pub user_id: UserId,
}

/// Check whether a bid could be retracted right now, and why not otherwise.
#[utoipa::path(get, path = "/bids/{bid_id}/can-retract", params(
    ("bid_id" = BidId, Path, description = "Bid id"),
    CanRetractParams,
), responses(
    (status = 200, description = "Eligibility verdict", body = CanRetract),
    (status = 404, response = ErrorBodyResponse),
),)]
pub async fn get_can_retract(
    State(state): State<Arc<ServerState>>,
    Path(bid_id): Path<BidId>,
    Query(params): Query<CanRetractParams>,
) -> Result<Json<ApiResponse<CanRetract>>, RestError> {
    let verdict = state
        .bid_service
        .can_retract(CanRetractInput {
            bid_id,
            user_id: params.user_id,
        })
        .await?;
    Ok(ok_response(verdict))
}
