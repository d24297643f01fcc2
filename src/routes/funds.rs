use crate::{
    AppState,
    handlers::{dashboard, funds, payments},
};
use axum::{
    Router,
    routing::{get, post},
};

/// Funding Router Module
///
/// Contribution history, the payment intent that precedes a contribution, and the staff
/// dashboard totals built on top of both.
pub fn fund_routes() -> Router<AppState> {
    Router::new()
        .route("/funds", get(funds::list_funds).post(funds::create_fund))
        // POST /create-payment-intent
        // Returns the provider's client secret; the client completes the payment itself.
        .route(
            "/create-payment-intent",
            post(payments::create_payment_intent),
        )
        .route("/dashboard-stats", get(dashboard::get_dashboard_stats))
}
