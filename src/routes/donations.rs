use crate::{AppState, handlers::donations};
use axum::{
    Router,
    routing::{get, patch, post},
};

/// Donation Request Router Module
///
/// Pending requests are browsable anonymously; everything else needs a registered caller.
/// Edits and deletes are owner-scoped inside the handlers.
pub fn donation_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/pending-donation-requests",
            get(donations::list_pending_requests),
        )
        .route(
            "/pending-donation-requests/{id}",
            get(donations::get_pending_request),
        )
        .route("/my-donation-requests", get(donations::list_my_requests))
        // Staff view across every requester.
        .route("/all-donation-requests", get(donations::list_all_requests))
        .route("/donation-requests", post(donations::create_request))
        .route(
            "/donation-requests/{id}",
            get(donations::get_request)
                .patch(donations::update_request)
                .delete(donations::delete_request),
        )
        // PATCH /donation-requests/status/{id}
        // Lifecycle moves (Pending -> In Progress -> Done/Canceled) and donor assignment.
        .route(
            "/donation-requests/status/{id}",
            patch(donations::update_request_status),
        )
}
