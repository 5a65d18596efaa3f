use {
    crate::{
        api::{
            ok_response,
            ApiResponse,
            RestError,
        },
        auction::service::workers::SchedulerStatsSnapshot,
        kernel::lock::LockStats,
        state::ServerState,
    },
    axum::{
        extract::State,
        Json,
    },
    std::sync::Arc,
};

/// Scheduler counters and uptime.
#[utoipa::path(get, path = "/admin/scheduler", responses(
    (status = 200, description = "Scheduler statistics", body = SchedulerStatsSnapshot),
),)]
pub async fn get_scheduler_stats(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<ApiResponse<SchedulerStatsSnapshot>>, RestError> {
    Ok(ok_response(state.auction_service.scheduler_stats()))
}

/// Keyed-lock registry statistics.
#[utoipa::path(get, path = "/admin/locks", responses(
    (status = 200, description = "Lock statistics", body = LockStats),
),)]
pub async fn get_lock_stats(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<ApiResponse<LockStats>>, RestError> {
    Ok(ok_response(state.auction_lock.stats()))
}
