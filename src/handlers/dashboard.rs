use axum::{Json, extract::State};

use crate::{AppState, error::ApiError, models::DashboardStats, stats};

/// get_dashboard_stats
///
/// [Staff Route] Users, requests, pending requests and the fund total for the dashboard.
#[utoipa::path(
    get,
    path = "/dashboard-stats",
    responses((status = 200, description = "Stats", body = DashboardStats))
)]
pub async fn get_dashboard_stats(
    State(state): State<AppState>,
) -> Result<Json<DashboardStats>, ApiError> {
    Ok(Json(stats::dashboard_stats(state.repo.as_ref()).await?))
}
