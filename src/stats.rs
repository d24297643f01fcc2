use serde_json::json;

use crate::{
    error::ApiError,
    models::DashboardStats,
    repository::{Collection, Repository, document},
};

/// Status value of a donation request nobody has taken yet.
pub const PENDING: &str = "Pending";

/// dashboard_stats
///
/// Computes the dashboard counters straight from the store on every call. User and request
/// totals use the fast estimate; the fund total is an exact sum, zero when empty.
pub async fn dashboard_stats(repo: &dyn Repository) -> Result<DashboardStats, ApiError> {
    let total_users = repo.estimated_count(Collection::Users).await?;
    let total_requests = repo.estimated_count(Collection::DonationRequests).await?;
    let total_funds = repo.sum(Collection::Funds, "amount").await?;
    let pending_requests = repo
        .count(Collection::DonationRequests, document(json!({ "status": PENDING })))
        .await?;

    Ok(DashboardStats {
        total_users,
        total_requests,
        total_funds,
        pending_requests,
    })
}
