use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header, jwk::JwkSet};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::{error::ApiError, models::UserProfile};

/// Google's published signing keys for Firebase ID tokens.
pub const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Claims
///
/// The subset of ID-token claims this service reads. Both verifiers decode into this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the identity provider's user id.
    pub sub: String,
    /// Absent for phone-only identities, which cannot be mapped to a profile.
    #[serde(default)]
    pub email: Option<String>,
    pub exp: usize,
    pub iat: usize,
}

/// Principal
///
/// An authenticated identity. Lives for one request only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub subject: String,
    pub email: String,
}

impl TryFrom<Claims> for Principal {
    type Error = VerifyError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let email = claims
            .email
            .filter(|email| !email.is_empty())
            .ok_or_else(|| VerifyError::Rejected("token carries no email claim".to_string()))?;
        Ok(Principal {
            subject: claims.sub,
            email,
        })
    }
}

#[derive(Debug, Error)]
pub enum VerifyError {
    /// The token itself is bad: expired, malformed, wrong signature, audience or issuer.
    #[error("token rejected: {0}")]
    Rejected(String),

    /// The oracle could not be consulted (e.g. the key set could not be fetched).
    #[error("identity oracle unavailable: {0}")]
    Unavailable(String),
}

impl From<jsonwebtoken::errors::Error> for VerifyError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        VerifyError::Rejected(err.to_string())
    }
}

/// IdentityVerifier
///
/// The identity oracle: turns a raw bearer token into a `Principal` or fails.
/// Implementations must not cache results.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Principal, VerifyError>;
}

pub type VerifierState = Arc<dyn IdentityVerifier>;

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header_value: Option<&str>) -> Result<&str, ApiError> {
    header_value
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(ApiError::Unauthenticated)
}

/// verify_principal
///
/// The principal-verification step of the request pipeline. A missing or malformed header
/// never reaches the oracle; any oracle failure becomes `InvalidCredential`.
pub async fn verify_principal(
    verifier: &dyn IdentityVerifier,
    header_value: Option<&str>,
) -> Result<Principal, ApiError> {
    let token = bearer_token(header_value)?;
    verifier.verify(token).await.map_err(|err| {
        match &err {
            VerifyError::Unavailable(_) => tracing::warn!(error = %err, "token verification failed"),
            VerifyError::Rejected(_) => tracing::debug!(error = %err, "token verification failed"),
        }
        ApiError::InvalidCredential
    })
}

// --- Verifier Implementations ---

/// FirebaseVerifier
///
/// Production verifier for Firebase ID tokens: RS256, key chosen by the token's `kid`,
/// audience is the project id and issuer is `https://securetoken.google.com/<project>`.
/// The key set is fetched on every call.
pub struct FirebaseVerifier {
    project_id: String,
    jwks_url: String,
    http: reqwest::Client,
}

impl FirebaseVerifier {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self::with_jwks_url(project_id, FIREBASE_JWKS_URL)
    }

    pub fn with_jwks_url(project_id: impl Into<String>, jwks_url: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            jwks_url: jwks_url.into(),
            http: reqwest::Client::new(),
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.set_issuer(&[format!("https://securetoken.google.com/{}", self.project_id)]);
        validation.validate_exp = true;
        validation
    }

    async fn fetch_keys(&self) -> Result<JwkSet, VerifyError> {
        self.http
            .get(&self.jwks_url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| VerifyError::Unavailable(e.to_string()))?
            .json::<JwkSet>()
            .await
            .map_err(|e| VerifyError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify(&self, token: &str) -> Result<Principal, VerifyError> {
        let kid = decode_header(token)?
            .kid
            .ok_or_else(|| VerifyError::Rejected("token header has no kid".to_string()))?;

        let keys = self.fetch_keys().await?;
        let jwk = keys
            .find(&kid)
            .ok_or_else(|| VerifyError::Rejected(format!("unknown signing key {kid}")))?;
        let key = DecodingKey::from_jwk(jwk)?;

        let data = decode::<Claims>(token, &key, &self.validation())?;
        Principal::try_from(data.claims)
    }
}

/// SharedSecretVerifier
///
/// Local-development verifier: HS256 tokens signed with a configured secret, same claim
/// shape as Firebase ID tokens.
pub struct SharedSecretVerifier {
    key: DecodingKey,
}

impl SharedSecretVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

#[async_trait]
impl IdentityVerifier for SharedSecretVerifier {
    async fn verify(&self, token: &str) -> Result<Principal, VerifyError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_aud = false;
        let data = decode::<Claims>(token, &self.key, &validation)?;
        Principal::try_from(data.claims)
    }
}

// --- Caller Extractor ---

/// Caller
///
/// The verified principal together with the profile snapshot the gate decided on. The
/// authorization middleware attaches it to the request; handlers extract it instead of
/// looking the user up again.
#[derive(Debug, Clone)]
pub struct Caller {
    pub principal: Principal,
    pub profile: UserProfile,
}

impl Caller {
    pub fn email(&self) -> &str {
        &self.principal.email
    }

    pub fn is_admin(&self) -> bool {
        self.profile.role == crate::models::Role::Admin
    }
}

/// Rejects with `Unauthenticated` when the middleware did not attach a caller, which only
/// happens if a handler that needs one is mounted on a public route.
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Caller>()
            .cloned()
            .ok_or(ApiError::Unauthenticated)
    }
}

/// Reads the raw `Authorization` header, if it is valid UTF-8.
pub fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}
