use {
    crate::{
        config::RunOptions,
        kernel::{
            entities::Cents,
            lock::LockError,
            store::StoreError,
        },
        server::{
            EXIT_CHECK_INTERVAL,
            SHOULD_EXIT,
        },
        state::ServerState,
    },
    anyhow::Result,
    axum::{
        http::StatusCode,
        response::{
            IntoResponse,
            Response,
        },
        routing::{
            get,
            post,
        },
        Json,
        Router,
    },
    clap::crate_version,
    serde::Serialize,
    serde_json::json,
    std::sync::{
        atomic::Ordering,
        Arc,
    },
    thiserror::Error,
    tower_http::cors::CorsLayer,
    utoipa::{
        OpenApi,
        ToResponse,
        ToSchema,
    },
    utoipa_swagger_ui::SwaggerUi,
};

pub mod admin;
pub mod auction;
pub mod bid;
pub mod user;
pub mod ws;

async fn root() -> String {
    format!("Auction Server API {}", crate_version!())
}

#[derive(Error, Debug, Clone, PartialEq, ToResponse, ToSchema)]
#[response(description = "An error occurred processing the request")]
pub enum RestError {
    /// The request contained invalid parameters.
    #[error("{0}")]
    BadParameters(String),
    /// The entity is in a state that does not allow the operation.
    #[error("{0}")]
    InvalidState(String),
    /// The bid does not clear the minimum next bid.
    #[error("the bid is below the minimum next bid of {minimum}")]
    BidTooLow { minimum: Cents },
    /// The auction was not found.
    #[error("auction with the specified id was not found")]
    AuctionNotFound,
    /// The bid was not found.
    #[error("bid with the specified id was not found")]
    BidNotFound,
    /// The user was not found.
    #[error("user with the specified id was not found")]
    UserNotFound,
    /// The user may not perform this operation on this entity.
    #[error("{0}")]
    Forbidden(String),
    /// The per-user bid budget is exhausted.
    #[error("too many bids, try again later")]
    TooManyBids,
    /// A concurrent operation holds the auction; the client should retry.
    #[error("the auction is busy, please retry")]
    Busy,
    /// A catch-all error for unexpected failures.
    #[error("an unknown error occurred processing the request")]
    Unknown,
}

impl RestError {
    pub fn code(&self) -> &'static str {
        match self {
            RestError::BadParameters(_) => "BAD_PARAMETERS",
            RestError::InvalidState(_) => "INVALID_STATE",
            RestError::BidTooLow { .. } => "BID_TOO_LOW",
            RestError::AuctionNotFound | RestError::BidNotFound | RestError::UserNotFound => {
                "NOT_FOUND"
            }
            RestError::Forbidden(_) => "FORBIDDEN",
            RestError::TooManyBids => "RATE_LIMITED",
            RestError::Busy => "CONTENTION",
            RestError::Unknown => "INTERNAL",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            RestError::BadParameters(_)
            | RestError::InvalidState(_)
            | RestError::BidTooLow { .. } => StatusCode::BAD_REQUEST,
            RestError::AuctionNotFound | RestError::BidNotFound | RestError::UserNotFound => {
                StatusCode::NOT_FOUND
            }
            RestError::Forbidden(_) => StatusCode::FORBIDDEN,
            RestError::TooManyBids => StatusCode::TOO_MANY_REQUESTS,
            RestError::Busy => StatusCode::CONFLICT,
            RestError::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            RestError::BidTooLow { minimum } => Some(json!({ "minimum": minimum })),
            _ => None,
        }
    }
}

impl From<LockError> for RestError {
    fn from(_: LockError) -> Self {
        RestError::Busy
    }
}

impl From<StoreError> for RestError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound("auction") => RestError::AuctionNotFound,
            StoreError::NotFound("bid") => RestError::BidNotFound,
            StoreError::NotFound("user") => RestError::UserNotFound,
            StoreError::NotFound(_) => RestError::Unknown,
            StoreError::Duplicate(what) => RestError::BadParameters(format!("duplicate {}", what)),
            StoreError::Validation(message) => RestError::BadParameters(message),
        }
    }
}

/// Success envelope: `{"success": true, "data": ...}`.
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data:    T,
}

pub fn ok_response<T>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
    })
}

#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    pub code:    String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub details: Option<serde_json::Value>,
}

/// Failure envelope: `{"success": false, "error": {...}}`.
#[derive(Serialize, ToResponse, ToSchema)]
#[response(description = "An error occurred processing the request")]
pub struct ErrorBodyResponse {
    pub success: bool,
    pub error:   ErrorBody,
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBodyResponse {
            success: false,
            error:   ErrorBody {
                code:    self.code().to_string(),
                message: self.to_string(),
                details: self.details(),
            },
        };
        (status, Json(body)).into_response()
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auction::post_auction,
        auction::get_auctions,
        auction::get_auction,
        auction::put_auction,
        auction::delete_auction,
        auction::post_start_auction,
        auction::post_end_auction,
        auction::post_select_winner,
        auction::get_auction_bids,
        auction::get_auction_winning_bid,
        bid::post_bid,
        bid::post_retract_bid,
        bid::get_can_retract,
        user::post_user,
        user::get_users,
        user::get_user,
        user::get_user_bids,
        admin::get_scheduler_stats,
        admin::get_lock_stats,
    ),
    components(
        schemas(
            crate::auction::entities::Auction,
            crate::auction::entities::AuctionStatus,
            crate::auction::entities::User,
            crate::bid::entities::Bid,
            crate::bid::entities::RetractionReason,
            crate::bid::service::handle_bid::PlaceBidResult,
            crate::bid::service::can_retract::CanRetract,
            crate::auction::service::workers::SchedulerStatsSnapshot,
            crate::kernel::lock::LockStats,
            auction::CreateAuction,
            auction::UpdateAuction,
            auction::SelectWinner,
            auction::AuctionDetail,
            bid::PostBid,
            bid::RetractBid,
            user::CreateUser,
            ErrorBody,
        ),
        responses(ErrorBodyResponse)
    ),
    tags(
        (name = "Auction House", description = "English auction server with second-price proxy bidding")
    )
)]
struct ApiDoc;

pub async fn start_api(run_options: RunOptions, state: Arc<ServerState>) -> Result<()> {
    let app: Router = Router::new()
        .merge(SwaggerUi::new("/docs").url("/docs/openapi.json", ApiDoc::openapi()))
        .route("/", get(root))
        .route(
            "/auctions",
            post(auction::post_auction).get(auction::get_auctions),
        )
        .route(
            "/auctions/:auction_id",
            get(auction::get_auction)
                .put(auction::put_auction)
                .delete(auction::delete_auction),
        )
        .route("/auctions/:auction_id/start", post(auction::post_start_auction))
        .route("/auctions/:auction_id/end", post(auction::post_end_auction))
        .route(
            "/auctions/:auction_id/select-winner",
            post(auction::post_select_winner),
        )
        .route("/auctions/:auction_id/bids", get(auction::get_auction_bids))
        .route(
            "/auctions/:auction_id/winning-bid",
            get(auction::get_auction_winning_bid),
        )
        .route("/bids", post(bid::post_bid))
        .route("/bids/:bid_id/retract", post(bid::post_retract_bid))
        .route("/bids/:bid_id/can-retract", get(bid::get_can_retract))
        .route("/users", post(user::post_user).get(user::get_users))
        .route("/users/:user_id", get(user::get_user))
        .route("/users/:user_id/bids", get(user::get_user_bids))
        .route("/admin/scheduler", get(admin::get_scheduler_stats))
        .route("/admin/locks", get(admin::get_lock_stats))
        .route("/ws", get(ws::ws_route_handler))
        .layer(CorsLayer::permissive())
        .with_state(state);

    tracing::info!(listen_addr = %run_options.server.listen_addr, "Starting API server...");
    let listener = tokio::net::TcpListener::bind(&run_options.server.listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            while !SHOULD_EXIT.load(Ordering::Acquire) {
                tokio::time::sleep(EXIT_CHECK_INTERVAL).await;
            }
            tracing::info!("Shutting down API server...");
        })
        .await?;
    Ok(())
}
