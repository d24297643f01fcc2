use crate::{AppState, handlers::users};
use axum::{
    Router,
    routing::{get, patch},
};

/// User Router Module
///
/// Registration and the public role/status lookups, self-service profile reads and edits,
/// donor search and the admin user management screens.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        // GET /users (admin) | POST /users (public registration)
        .route("/users", get(users::list_users).post(users::register_user))
        // PATCH /users/{id}
        // Admin edit of any profile field except role and status.
        .route("/users/{id}", patch(users::update_user_by_id))
        .route("/users/role/{id}", patch(users::update_user_role))
        .route("/users/status/{id}", patch(users::update_user_status))
        // Public lookups. Unknown emails answer `null` instead of 404.
        .route("/user-role/{email}", get(users::get_user_role))
        .route("/user-status/{email}", get(users::get_user_status))
        // Self or admin.
        .route("/user-data/{email}", get(users::get_user_data))
        .route("/update-user-data/{email}", patch(users::update_user_data))
        // GET /search-donors?bloodGroup=..&district=..&upazila=..
        .route("/search-donors", get(users::search_donors))
}
