use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::{Value, json};

use super::{id_filter, non_empty, now_rfc3339};
use crate::{
    AppState,
    error::ApiError,
    extract::{ValidJson, ValidQuery},
    models::ListQuery,
    repository::{
        Collection, DeleteResult, Document, FindOptions, ID_FIELD, InsertOneResult, UpdateResult,
        document,
    },
};

pub const DRAFT: &str = "draft";
pub const PUBLISHED: &str = "published";

async fn set_publication(
    state: &AppState,
    id: &str,
    status: &'static str,
) -> Result<Json<UpdateResult>, ApiError> {
    let result = state
        .repo
        .update_one(
            Collection::Blogs,
            id_filter(id)?,
            document(json!({ "status": status })),
        )
        .await?;
    tracing::info!(blog = %id, %status, "blog publication changed");
    Ok(Json(result))
}

/// list_published_blogs
///
/// [Public Route] Published posts, newest first.
#[utoipa::path(
    get,
    path = "/blogs",
    params(ListQuery),
    responses((status = 200, description = "Published blogs"))
)]
pub async fn list_published_blogs(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<ListQuery>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let (skip, limit) = query.window();
    let blogs = state
        .repo
        .find_many(
            Collection::Blogs,
            document(json!({ "status": PUBLISHED })),
            FindOptions::sorted_desc("createdAt").paged(skip, limit),
        )
        .await?;
    Ok(Json(blogs))
}

/// get_published_blog
///
/// [Public Route] A single post; drafts are reported as missing.
#[utoipa::path(
    get,
    path = "/blogs/{id}",
    params(("id" = String, Path, description = "Blog id")),
    responses(
        (status = 200, description = "Blog"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_published_blog(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Document>, ApiError> {
    let mut filter = id_filter(&id)?;
    filter.insert("status".to_string(), json!(PUBLISHED));
    state
        .repo
        .find_one(Collection::Blogs, filter)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// list_all_blogs
///
/// [Staff Route] Drafts and published posts, optional `status` filter.
#[utoipa::path(
    get,
    path = "/all-blogs",
    params(ListQuery),
    responses((status = 200, description = "All blogs"))
)]
pub async fn list_all_blogs(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<ListQuery>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let mut filter = Document::new();
    if let Some(status) = &query.status {
        filter.insert("status".to_string(), json!(status));
    }
    let (skip, limit) = query.window();
    let blogs = state
        .repo
        .find_many(
            Collection::Blogs,
            filter,
            FindOptions::sorted_desc("createdAt").paged(skip, limit),
        )
        .await?;
    Ok(Json(blogs))
}

/// create_blog
///
/// [Admin Route] New posts always start as drafts; `title` is required.
#[utoipa::path(
    post,
    path = "/blogs",
    request_body = Object,
    responses(
        (status = 200, description = "Created", body = InsertOneResult),
        (status = 400, description = "Missing title")
    )
)]
pub async fn create_blog(
    State(state): State<AppState>,
    ValidJson(mut body): ValidJson<Document>,
) -> Result<Json<InsertOneResult>, ApiError> {
    let has_title = body
        .get("title")
        .and_then(Value::as_str)
        .is_some_and(|title| !title.trim().is_empty());
    if !has_title {
        return Err(ApiError::validation("title is required"));
    }

    body.remove(ID_FIELD);
    body.insert("status".to_string(), json!(DRAFT));
    body.insert("createdAt".to_string(), json!(now_rfc3339()));
    Ok(Json(state.repo.insert_one(Collection::Blogs, body).await?))
}

/// update_blog
///
/// [Admin Route] Content edit. Publication state only changes through the publish routes.
#[utoipa::path(
    patch,
    path = "/blogs/{id}",
    params(("id" = String, Path, description = "Blog id")),
    request_body = Object,
    responses((status = 200, description = "Updated", body = UpdateResult))
)]
pub async fn update_blog(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidJson(mut set): ValidJson<Document>,
) -> Result<Json<UpdateResult>, ApiError> {
    let filter = id_filter(&id)?;
    set.remove("status");
    set.remove("createdAt");
    let set = non_empty(set)?;
    Ok(Json(state.repo.update_one(Collection::Blogs, filter, set).await?))
}

/// publish_blog
///
/// [Admin Route]
#[utoipa::path(
    patch,
    path = "/blogs/publish/{id}",
    params(("id" = String, Path, description = "Blog id")),
    responses((status = 200, description = "Published", body = UpdateResult))
)]
pub async fn publish_blog(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UpdateResult>, ApiError> {
    set_publication(&state, &id, PUBLISHED).await
}

/// unpublish_blog
///
/// [Admin Route]
#[utoipa::path(
    patch,
    path = "/blogs/unpublish/{id}",
    params(("id" = String, Path, description = "Blog id")),
    responses((status = 200, description = "Back to draft", body = UpdateResult))
)]
pub async fn unpublish_blog(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UpdateResult>, ApiError> {
    set_publication(&state, &id, DRAFT).await
}

/// delete_blog
///
/// [Admin Route]
#[utoipa::path(
    delete,
    path = "/blogs/{id}",
    params(("id" = String, Path, description = "Blog id")),
    responses((status = 200, description = "Deleted", body = DeleteResult))
)]
pub async fn delete_blog(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResult>, ApiError> {
    let result = state
        .repo
        .delete_one(Collection::Blogs, id_filter(&id)?)
        .await?;
    Ok(Json(result))
}
