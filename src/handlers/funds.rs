use axum::{Json, extract::State};

use super::to_document;
use crate::{
    AppState,
    auth::Caller,
    error::ApiError,
    extract::{ValidJson, ValidQuery},
    models::{CreateFundRequest, ListQuery},
    repository::{Collection, Document, FindOptions, InsertOneResult},
};

/// Checks the mandatory fund fields before anything is written.
pub fn validate_fund(fund: &CreateFundRequest) -> Result<(), ApiError> {
    match fund.amount {
        None => return Err(ApiError::validation("amount is required")),
        Some(amount) if !amount.is_finite() || amount <= 0.0 => {
            return Err(ApiError::validation("amount must be a positive number"));
        }
        Some(_) => {}
    }
    if fund.name.as_deref().is_none_or(|name| name.trim().is_empty()) {
        return Err(ApiError::validation("payer name is required"));
    }
    if fund.date.as_deref().is_none_or(|date| date.trim().is_empty()) {
        return Err(ApiError::validation("date is required"));
    }
    Ok(())
}

/// list_funds
///
/// [Authenticated Route] Contributions, most recent `date` first.
#[utoipa::path(
    get,
    path = "/funds",
    params(ListQuery),
    responses((status = 200, description = "Fund documents"))
)]
pub async fn list_funds(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<ListQuery>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let (skip, limit) = query.window();
    let funds = state
        .repo
        .find_many(
            Collection::Funds,
            Document::new(),
            FindOptions::sorted_desc("date").paged(skip, limit),
        )
        .await?;
    Ok(Json(funds))
}

/// create_fund
///
/// [Authenticated Route] Records a contribution after the client confirmed the payment.
#[utoipa::path(
    post,
    path = "/funds",
    request_body = CreateFundRequest,
    responses(
        (status = 200, description = "Created", body = InsertOneResult),
        (status = 400, description = "Missing amount, payer or date")
    )
)]
pub async fn create_fund(
    caller: Caller,
    State(state): State<AppState>,
    ValidJson(mut fund): ValidJson<CreateFundRequest>,
) -> Result<Json<InsertOneResult>, ApiError> {
    validate_fund(&fund)?;
    if fund.email.is_none() {
        fund.email = Some(caller.email().to_string());
    }
    let result = state
        .repo
        .insert_one(Collection::Funds, to_document(&fund)?)
        .await?;
    tracing::info!(payer = %caller.email(), amount = ?fund.amount, "fund recorded");
    Ok(Json(result))
}
