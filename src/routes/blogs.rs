use crate::{AppState, handlers::blogs};
use axum::{
    Router,
    routing::{get, patch},
};

/// Blog Router Module
///
/// Readers only ever see published posts. Staff can list drafts; only admins write.
pub fn blog_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/blogs",
            get(blogs::list_published_blogs).post(blogs::create_blog),
        )
        .route(
            "/blogs/{id}",
            get(blogs::get_published_blog)
                .patch(blogs::update_blog)
                .delete(blogs::delete_blog),
        )
        .route("/blogs/publish/{id}", patch(blogs::publish_blog))
        .route("/blogs/unpublish/{id}", patch(blogs::unpublish_blog))
        .route("/all-blogs", get(blogs::list_all_blogs))
}
