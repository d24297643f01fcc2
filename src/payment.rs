use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

pub const STRIPE_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment provider request failed: {0}")]
    Transport(String),

    #[error("payment provider rejected the intent ({status}): {message}")]
    Rejected { status: u16, message: String },
}

// 1. PaymentProvider Contract
/// PaymentProvider
///
/// Creates a payment intent and hands back the client secret the browser needs to confirm
/// it. Swappable so tests never touch the real provider.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// # Arguments
    /// * `amount_minor`: amount in the currency's minor unit (cents for `usd`).
    /// * `currency`: lowercase ISO currency code.
    async fn create_intent(&self, amount_minor: i64, currency: &str) -> Result<String, PaymentError>;
}

// 2. The Real Implementation (Stripe)
/// StripeClient
///
/// Calls `POST /v1/payment_intents` with the secret key as a bearer token. Card is the only
/// payment method offered.
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl StripeClient {
    pub fn new(secret_key: &str) -> Self {
        Self::with_api_base(secret_key, STRIPE_API_BASE)
    }

    pub fn with_api_base(secret_key: &str, api_base: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct IntentResponse {
    client_secret: String,
}

#[derive(Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn create_intent(&self, amount_minor: i64, currency: &str) -> Result<String, PaymentError> {
        let amount = amount_minor.to_string();
        let params = [
            ("amount", amount.as_str()),
            ("currency", currency),
            ("payment_method_types[]", "card"),
        ];

        let response = self
            .http
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&params)
            .send()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<StripeErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| "no error message".to_string());
            return Err(PaymentError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<IntentResponse>()
            .await
            .map(|intent| intent.client_secret)
            .map_err(|e| PaymentError::Transport(e.to_string()))
    }
}

// 3. The Mock Implementation (For Tests)
/// MockPaymentProvider
///
/// Returns a deterministic secret that embeds the amount and currency, or fails on demand.
#[derive(Clone, Default)]
pub struct MockPaymentProvider {
    /// When true, every call returns a simulated failure.
    pub should_fail: bool,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_intent(&self, amount_minor: i64, currency: &str) -> Result<String, PaymentError> {
        if self.should_fail {
            return Err(PaymentError::Transport(
                "Mock payment error: simulation requested".to_string(),
            ));
        }
        Ok(format!("pi_mock_{amount_minor}_{currency}_secret_test"))
    }
}

/// PaymentState
///
/// The concrete type used to share the payment provider across the application state.
pub type PaymentState = Arc<dyn PaymentProvider>;
