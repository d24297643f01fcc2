use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::json;

use super::{id_filter, non_empty, now_rfc3339};
use crate::{
    AppState,
    auth::Caller,
    error::ApiError,
    extract::{ValidJson, ValidQuery},
    models::{DonationStatusPatch, ListQuery},
    repository::{
        Collection, DeleteResult, Document, FindOptions, ID_FIELD, InsertOneResult, UpdateResult,
        document,
    },
    stats::PENDING,
};

const REQUESTER_EMAIL: &str = "requesterEmail";

/// Edits and deletes are limited to the requester's own documents unless the caller is an
/// admin. The scope is folded into the store filter so the operation stays single-step.
fn scoped_filter(caller: &Caller, id: &str) -> Result<Document, ApiError> {
    let mut filter = id_filter(id)?;
    if !caller.is_admin() {
        filter.insert(REQUESTER_EMAIL.to_string(), json!(caller.email()));
    }
    Ok(filter)
}

fn with_status(mut filter: Document, status: Option<&String>) -> Document {
    if let Some(status) = status {
        filter.insert("status".to_string(), json!(status));
    }
    filter
}

/// list_pending_requests
///
/// [Public Route] Open requests (`status: Pending`), paginated.
#[utoipa::path(
    get,
    path = "/pending-donation-requests",
    params(ListQuery),
    responses((status = 200, description = "Pending donation requests"))
)]
pub async fn list_pending_requests(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<ListQuery>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let (skip, limit) = query.window();
    let requests = state
        .repo
        .find_many(
            Collection::DonationRequests,
            document(json!({ "status": PENDING })),
            FindOptions::default().paged(skip, limit),
        )
        .await?;
    Ok(Json(requests))
}

/// get_pending_request
///
/// [Public Route] A single request, visible only while it is still pending.
#[utoipa::path(
    get,
    path = "/pending-donation-requests/{id}",
    params(("id" = String, Path, description = "Donation request id")),
    responses(
        (status = 200, description = "Donation request"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_pending_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Document>, ApiError> {
    let mut filter = id_filter(&id)?;
    filter.insert("status".to_string(), json!(PENDING));
    state
        .repo
        .find_one(Collection::DonationRequests, filter)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// list_my_requests
///
/// [Authenticated Route] The caller's own requests, newest first, optional `status` filter.
#[utoipa::path(
    get,
    path = "/my-donation-requests",
    params(ListQuery),
    responses((status = 200, description = "Caller's donation requests"))
)]
pub async fn list_my_requests(
    caller: Caller,
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<ListQuery>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let filter = with_status(
        document(json!({ REQUESTER_EMAIL: caller.email() })),
        query.status.as_ref(),
    );
    let (skip, limit) = query.window();
    let requests = state
        .repo
        .find_many(
            Collection::DonationRequests,
            filter,
            FindOptions::sorted_desc("createdAt").paged(skip, limit),
        )
        .await?;
    Ok(Json(requests))
}

/// list_all_requests
///
/// [Staff Route] Every request, newest first, optional `status` filter.
#[utoipa::path(
    get,
    path = "/all-donation-requests",
    params(ListQuery),
    responses((status = 200, description = "All donation requests"))
)]
pub async fn list_all_requests(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<ListQuery>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let filter = with_status(Document::new(), query.status.as_ref());
    let (skip, limit) = query.window();
    let requests = state
        .repo
        .find_many(
            Collection::DonationRequests,
            filter,
            FindOptions::sorted_desc("createdAt").paged(skip, limit),
        )
        .await?;
    Ok(Json(requests))
}

/// create_request
///
/// [Authenticated Route] Stores the request body. `status` defaults to `Pending`.
/// `requesterEmail` is always the caller's email; only admins may file on someone's behalf.
#[utoipa::path(
    post,
    path = "/donation-requests",
    request_body = Object,
    responses((status = 200, description = "Created", body = InsertOneResult))
)]
pub async fn create_request(
    caller: Caller,
    State(state): State<AppState>,
    ValidJson(mut body): ValidJson<Document>,
) -> Result<Json<InsertOneResult>, ApiError> {
    body.remove(ID_FIELD);
    body.entry("status").or_insert_with(|| json!(PENDING));
    if caller.is_admin() {
        body.entry(REQUESTER_EMAIL)
            .or_insert_with(|| json!(caller.email()));
    } else {
        body.insert(REQUESTER_EMAIL.to_string(), json!(caller.email()));
    }
    body.insert("createdAt".to_string(), json!(now_rfc3339()));

    let result = state
        .repo
        .insert_one(Collection::DonationRequests, body)
        .await?;
    Ok(Json(result))
}

/// get_request
///
/// [Authenticated Route] Any request by id, whatever its status.
#[utoipa::path(
    get,
    path = "/donation-requests/{id}",
    params(("id" = String, Path, description = "Donation request id")),
    responses(
        (status = 200, description = "Donation request"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Document>, ApiError> {
    state
        .repo
        .find_one(Collection::DonationRequests, id_filter(&id)?)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// update_request
///
/// [Authenticated Route] Partial edit of the caller's own request (admins: any request).
/// The requester and creation time cannot be rewritten.
#[utoipa::path(
    patch,
    path = "/donation-requests/{id}",
    params(("id" = String, Path, description = "Donation request id")),
    request_body = Object,
    responses((status = 200, description = "Updated", body = UpdateResult))
)]
pub async fn update_request(
    caller: Caller,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidJson(mut set): ValidJson<Document>,
) -> Result<Json<UpdateResult>, ApiError> {
    let filter = scoped_filter(&caller, &id)?;
    set.remove(REQUESTER_EMAIL);
    set.remove("createdAt");
    let set = non_empty(set)?;

    let result = state
        .repo
        .update_one(Collection::DonationRequests, filter, set)
        .await?;
    Ok(Json(result))
}

/// update_request_status
///
/// [Authenticated Route] Moves a request through its lifecycle. A missing `status` means
/// `Pending`; `donorName`/`donorEmail` are written only when supplied, never cleared.
#[utoipa::path(
    patch,
    path = "/donation-requests/status/{id}",
    params(("id" = String, Path, description = "Donation request id")),
    request_body = DonationStatusPatch,
    responses((status = 200, description = "Updated", body = UpdateResult))
)]
pub async fn update_request_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidJson(patch): ValidJson<DonationStatusPatch>,
) -> Result<Json<UpdateResult>, ApiError> {
    let filter = id_filter(&id)?;

    let mut set = document(json!({
        "status": patch.status.unwrap_or_else(|| PENDING.to_string()),
    }));
    if let Some(donor_name) = patch.donor_name {
        set.insert("donorName".to_string(), json!(donor_name));
    }
    if let Some(donor_email) = patch.donor_email {
        set.insert("donorEmail".to_string(), json!(donor_email));
    }

    let result = state
        .repo
        .update_one(Collection::DonationRequests, filter, set)
        .await?;
    Ok(Json(result))
}

/// delete_request
///
/// [Authenticated Route] Deletes the caller's own request (admins: any request).
#[utoipa::path(
    delete,
    path = "/donation-requests/{id}",
    params(("id" = String, Path, description = "Donation request id")),
    responses((status = 200, description = "Deleted", body = DeleteResult))
)]
pub async fn delete_request(
    caller: Caller,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResult>, ApiError> {
    let filter = scoped_filter(&caller, &id)?;
    let result = state
        .repo
        .delete_one(Collection::DonationRequests, filter)
        .await?;
    if result.deleted_count > 0 {
        tracing::info!(caller = %caller.email(), request = %id, "donation request deleted");
    }
    Ok(Json(result))
}
