use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::str::FromStr;

use super::{id_filter, non_empty, now_rfc3339, to_document};
use crate::{
    AppState,
    auth::Caller,
    error::ApiError,
    extract::{ValidJson, ValidQuery},
    models::{
        AccountStatus, AlreadyRegistered, DonorSearchQuery, ListQuery, ProfilePatch,
        RegisterUserRequest, Role, RoleLookup, RoleUpdateRequest, StatusLookup,
        StatusUpdateRequest, UserProfile,
    },
    repository::{Collection, Document, FindOptions, InsertOneResult, UpdateResult, document},
    roles::parse_profile,
};

fn email_filter(email: &str) -> Document {
    document(json!({ "email": email }))
}

/// Self-service profile routes: a caller may only touch their own email unless they are an
/// admin.
fn ensure_self_or_admin(caller: &Caller, email: &str) -> Result<(), ApiError> {
    if caller.is_admin() || caller.email() == email {
        Ok(())
    } else {
        tracing::debug!(caller = %caller.email(), target = %email, "profile access denied");
        Err(ApiError::InsufficientRole)
    }
}

/// register_user
///
/// [Public Route] First-contact registration. The stored profile is always a `donor` with
/// `active` status; re-registering an existing email is answered without writing.
#[utoipa::path(
    post,
    path = "/users",
    request_body = RegisterUserRequest,
    responses(
        (status = 200, description = "Registered (or already registered)", body = InsertOneResult),
        (status = 400, description = "Missing email")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<RegisterUserRequest>,
) -> Result<Response, ApiError> {
    let email = payload
        .email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::validation("email is required"))?;

    if state
        .repo
        .find_one(Collection::Users, email_filter(&email))
        .await?
        .is_some()
    {
        return Ok(Json(AlreadyRegistered {
            message: "user already exists".to_string(),
            inserted_id: None,
        })
        .into_response());
    }

    let profile = UserProfile {
        id: None,
        email,
        role: Role::Donor,
        status: AccountStatus::Active,
        name: payload.name,
        avatar: payload.avatar,
        blood_group: payload.blood_group,
        district: payload.district,
        upazila: payload.upazila,
        created_at: Some(now_rfc3339()),
    };
    let result = state
        .repo
        .insert_one(Collection::Users, to_document(&profile)?)
        .await?;
    tracing::info!(email = %profile.email, id = %result.inserted_id, "user registered");
    Ok(Json(result).into_response())
}

/// get_user_role
///
/// [Public Route] Role lookup for UI gating. Unknown emails yield `{ "role": null }` rather
/// than an error.
#[utoipa::path(
    get,
    path = "/user-role/{email}",
    params(("email" = String, Path, description = "User email")),
    responses((status = 200, description = "Role or null", body = RoleLookup))
)]
pub async fn get_user_role(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<RoleLookup>, ApiError> {
    let role = match state.repo.find_one(Collection::Users, email_filter(&email)).await? {
        Some(doc) => Some(parse_profile(doc)?.role),
        None => None,
    };
    Ok(Json(RoleLookup { role }))
}

/// get_user_status
///
/// [Public Route] Same soft-fail contract as the role lookup.
#[utoipa::path(
    get,
    path = "/user-status/{email}",
    params(("email" = String, Path, description = "User email")),
    responses((status = 200, description = "Status or null", body = StatusLookup))
)]
pub async fn get_user_status(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<StatusLookup>, ApiError> {
    let status = match state.repo.find_one(Collection::Users, email_filter(&email)).await? {
        Some(doc) => Some(parse_profile(doc)?.status),
        None => None,
    };
    Ok(Json(StatusLookup { status }))
}

/// get_user_data
///
/// [Authenticated Route] Full profile document for the given email.
#[utoipa::path(
    get,
    path = "/user-data/{email}",
    params(("email" = String, Path, description = "User email")),
    responses(
        (status = 200, description = "Profile document"),
        (status = 403, description = "Not the caller's own profile"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_user_data(
    caller: Caller,
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Document>, ApiError> {
    ensure_self_or_admin(&caller, &email)?;
    state
        .repo
        .find_one(Collection::Users, email_filter(&email))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// update_user_data
///
/// [Authenticated Route] Partial self-update of profile fields. Role and status are not
/// reachable through this payload.
#[utoipa::path(
    patch,
    path = "/update-user-data/{email}",
    params(("email" = String, Path, description = "User email")),
    request_body = ProfilePatch,
    responses((status = 200, description = "Updated", body = UpdateResult))
)]
pub async fn update_user_data(
    caller: Caller,
    State(state): State<AppState>,
    Path(email): Path<String>,
    ValidJson(patch): ValidJson<ProfilePatch>,
) -> Result<Json<UpdateResult>, ApiError> {
    ensure_self_or_admin(&caller, &email)?;
    let set = non_empty(to_document(&patch)?)?;
    let result = state
        .repo
        .update_one(Collection::Users, email_filter(&email), set)
        .await?;
    Ok(Json(result))
}

/// search_donors
///
/// [Public Route] Active users matching the optional blood group / district / upazila.
#[utoipa::path(
    get,
    path = "/search-donors",
    params(DonorSearchQuery),
    responses((status = 200, description = "Matching donor documents"))
)]
pub async fn search_donors(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<DonorSearchQuery>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let mut filter = document(json!({ "status": AccountStatus::Active.as_str() }));
    for (field, value) in [
        ("bloodGroup", query.blood_group),
        ("district", query.district),
        ("upazila", query.upazila),
    ] {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            filter.insert(field.to_string(), json!(value));
        }
    }

    let donors = state
        .repo
        .find_many(Collection::Users, filter, FindOptions::default())
        .await?;
    Ok(Json(donors))
}

/// list_users
///
/// [Admin Route] Every user, optionally filtered by `status`, paginated.
#[utoipa::path(
    get,
    path = "/users",
    params(ListQuery),
    responses((status = 200, description = "User documents"))
)]
pub async fn list_users(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<ListQuery>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let mut filter = Document::new();
    if let Some(status) = &query.status {
        filter.insert("status".to_string(), json!(status));
    }
    let (skip, limit) = query.window();
    let users = state
        .repo
        .find_many(Collection::Users, filter, FindOptions::default().paged(skip, limit))
        .await?;
    Ok(Json(users))
}

/// update_user_role
///
/// [Admin Route] Sets a user's role. Takes effect on that user's next request.
#[utoipa::path(
    patch,
    path = "/users/role/{id}",
    params(("id" = String, Path, description = "User id")),
    request_body = RoleUpdateRequest,
    responses(
        (status = 200, description = "Updated", body = UpdateResult),
        (status = 400, description = "Unknown role")
    )
)]
pub async fn update_user_role(
    caller: Caller,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidJson(payload): ValidJson<RoleUpdateRequest>,
) -> Result<Json<UpdateResult>, ApiError> {
    let filter = id_filter(&id)?;
    let role = payload
        .role
        .as_deref()
        .ok_or_else(|| ApiError::validation("role is required"))
        .and_then(|r| Role::from_str(r).map_err(ApiError::Validation))?;

    let result = state
        .repo
        .update_one(Collection::Users, filter, document(json!({ "role": role })))
        .await?;
    tracing::info!(admin = %caller.email(), user = %id, %role, "role changed");
    Ok(Json(result))
}

/// update_user_status
///
/// [Admin Route] Blocks or re-activates a user.
#[utoipa::path(
    patch,
    path = "/users/status/{id}",
    params(("id" = String, Path, description = "User id")),
    request_body = StatusUpdateRequest,
    responses(
        (status = 200, description = "Updated", body = UpdateResult),
        (status = 400, description = "Unknown status")
    )
)]
pub async fn update_user_status(
    caller: Caller,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidJson(payload): ValidJson<StatusUpdateRequest>,
) -> Result<Json<UpdateResult>, ApiError> {
    let filter = id_filter(&id)?;
    let status = payload
        .status
        .as_deref()
        .ok_or_else(|| ApiError::validation("status is required"))
        .and_then(|s| AccountStatus::from_str(s).map_err(ApiError::Validation))?;

    let result = state
        .repo
        .update_one(
            Collection::Users,
            filter,
            document(json!({ "status": status.as_str() })),
        )
        .await?;
    tracing::info!(admin = %caller.email(), user = %id, status = status.as_str(), "status changed");
    Ok(Json(result))
}

/// update_user_by_id
///
/// [Admin Route] Partial profile update of any user.
#[utoipa::path(
    patch,
    path = "/users/{id}",
    params(("id" = String, Path, description = "User id")),
    request_body = ProfilePatch,
    responses((status = 200, description = "Updated", body = UpdateResult))
)]
pub async fn update_user_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidJson(patch): ValidJson<ProfilePatch>,
) -> Result<Json<UpdateResult>, ApiError> {
    let filter = id_filter(&id)?;
    let set = non_empty(to_document(&patch)?)?;
    Ok(Json(state.repo.update_one(Collection::Users, filter, set).await?))
}
