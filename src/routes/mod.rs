//! Router modules, one per resource. Access control is not decided here: every route is
//! gated by the `policy::authorize` layer according to `policy::ROUTE_POLICY`, so a route
//! added below must also get an entry in that table (a missing entry is admin-only).

use axum::{Router, routing::get};

use crate::AppState;

pub mod blogs;
pub mod donations;
pub mod funds;
pub mod users;

/// Liveness endpoints.
pub fn service_routes() -> Router<AppState> {
    Router::new()
        // GET /
        .route("/", get(|| async { "Donate Your Red Drop!" }))
        // GET /health
        // Used by load balancers. Never touches the store.
        .route("/health", get(|| async { "ok" }))
}
