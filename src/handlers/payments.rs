use axum::{Json, extract::State};

use crate::{
    AppState,
    error::ApiError,
    extract::ValidJson,
    models::{PaymentIntentRequest, PaymentIntentResponse},
};

/// Converts a major-unit amount to the provider's minor unit, rejecting non-positive and
/// non-finite values.
pub fn to_minor_units(amount: Option<f64>) -> Result<i64, ApiError> {
    let amount = amount.ok_or_else(|| ApiError::validation("amount is required"))?;
    let minor = (amount * 100.0).round();
    if !minor.is_finite() || minor < 1.0 || minor > i64::MAX as f64 {
        return Err(ApiError::validation("amount must be a positive number"));
    }
    Ok(minor as i64)
}

/// create_payment_intent
///
/// [Authenticated Route] Opens a payment intent with the provider and returns its client
/// secret. Provider failures surface as a generic 500.
#[utoipa::path(
    post,
    path = "/create-payment-intent",
    request_body = PaymentIntentRequest,
    responses(
        (status = 200, description = "Intent created", body = PaymentIntentResponse),
        (status = 400, description = "Invalid amount"),
        (status = 500, description = "Provider failure")
    )
)]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<PaymentIntentRequest>,
) -> Result<Json<PaymentIntentResponse>, ApiError> {
    let amount_minor = to_minor_units(payload.amount)?;
    let client_secret = state
        .payments
        .create_intent(amount_minor, &state.config.currency)
        .await?;
    Ok(Json(PaymentIntentResponse { client_secret }))
}
