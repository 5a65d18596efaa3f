use {
    crate::{
        api::{
            ok_response,
            ApiResponse,
            ErrorBodyResponse,
            RestError,
        },
        auction::entities::User,
        bid::entities::Bid,
        kernel::entities::UserId,
        state::ServerState,
    },
    axum::{
        extract::{
            Path,
            State,
        },
        Json,
    },
    serde::Deserialize,
    std::sync::Arc,
    time::OffsetDateTime,
    utoipa::ToSchema,
    uuid::Uuid,
};

#[derive(Deserialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    #[schema(example = "Alice Lindqvist")]
    pub name:  String,
    /// Must be unique.
    #[schema(example = "alice@example.com")]
    pub email: String,
}

/// Register a user.
#[utoipa::path(post, path = "/users", request_body = CreateUser, responses(
    (status = 200, description = "The created user", body = User),
    (status = 400, response = ErrorBodyResponse),
),)]
pub async fn post_user(
    State(state): State<Arc<ServerState>>,
    Json(create): Json<CreateUser>,
) -> Result<Json<ApiResponse<User>>, RestError> {
    let user = User {
        id:         Uuid::new_v4(),
        name:       create.name,
        email:      create.email,
        created_at: OffsetDateTime::now_utc(),
    };
    state.store.add_user(user.clone()).await?;
    Ok(ok_response(user))
}

/// List all users.
#[utoipa::path(get, path = "/users", responses(
    (status = 200, description = "All users", body = Vec<User>),
),)]
pub async fn get_users(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<ApiResponse<Vec<User>>>, RestError> {
    Ok(ok_response(state.store.get_users().await))
}

/// Fetch a single user.
#[utoipa::path(get, path = "/users/{user_id}", params(
    ("user_id" = UserId, Path, description = "User id"),
), responses(
    (status = 200, description = "The user", body = User),
    (status = 404, response = ErrorBodyResponse),
),)]
pub async fn get_user(
    State(state): State<Arc<ServerState>>,
    Path(user_id): Path<UserId>,
) -> Result<Json<ApiResponse<User>>, RestError> {
    let user = state
        .store
        .get_user(user_id)
        .await
        .ok_or(RestError::UserNotFound)?;
    Ok(ok_response(user))
}

/// All bids a user has placed, retractions included, newest first.
#[utoipa::path(get, path = "/users/{user_id}/bids", params(
    ("user_id" = UserId, Path, description = "User id"),
), responses(
    (status = 200, description = "The user's bids", body = Vec<Bid>),
    (status = 404, response = ErrorBodyResponse),
),)]
pub async fn get_user_bids(
    State(state): State<Arc<ServerState>>,
    Path(user_id): Path<UserId>,
) -> Result<Json<ApiResponse<Vec<Bid>>>, RestError> {
    state
        .store
        .get_user(user_id)
        .await
        .ok_or(RestError::UserNotFound)?;
    let mut bids = state.store.get_bids_by_user(user_id).await;
    bids.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(ok_response(bids))
}
