#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use red_drop_api::{
    AppConfig, AppState, MemoryRepository, MockPaymentProvider, SharedSecretVerifier,
    auth::{Claims, IdentityVerifier, Principal, VerifierState, VerifyError},
    create_router,
    payment::PaymentState,
    repository::{Collection, Repository, RepositoryState, document},
};
use serde_json::{Value, json};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tower::ServiceExt;

/// Matches `AppConfig::default()`.
pub const TEST_SECRET: &str = "local-test-secret";

// --- Tokens ---

pub fn claims_for(email: Option<&str>, ttl_secs: i64) -> Claims {
    let now = chrono::Utc::now().timestamp();
    Claims {
        sub: format!("uid-{}", email.unwrap_or("anonymous")),
        email: email.map(str::to_string),
        iat: now as usize,
        exp: (now + ttl_secs) as usize,
    }
}

pub fn sign(claims: &Claims, secret: &str) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("token encoding failed")
}

/// A valid HS256 token for `email`, one hour to live.
pub fn token_for(email: &str) -> String {
    sign(&claims_for(Some(email), 3600), TEST_SECRET)
}

// --- Counting verifier ---

/// Delegates to the shared-secret verifier and counts every call, so tests can assert the
/// oracle was (or was not) consulted.
pub struct CountingVerifier {
    inner: SharedSecretVerifier,
    calls: AtomicUsize,
}

impl CountingVerifier {
    pub fn new() -> Self {
        Self {
            inner: SharedSecretVerifier::new(TEST_SECRET),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityVerifier for CountingVerifier {
    async fn verify(&self, token: &str) -> Result<Principal, VerifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.verify(token).await
    }
}

// --- Test application ---

pub struct TestApp {
    pub router: Router,
    pub repo: Arc<MemoryRepository>,
    pub verifier: Arc<CountingVerifier>,
}

pub fn spawn_app() -> TestApp {
    spawn_app_with_payments(Arc::new(MockPaymentProvider::new()))
}

pub fn spawn_app_with_payments(payments: PaymentState) -> TestApp {
    let repo = Arc::new(MemoryRepository::new());
    let verifier = Arc::new(CountingVerifier::new());
    let state = AppState::new(
        repo.clone() as RepositoryState,
        verifier.clone() as VerifierState,
        payments,
        AppConfig::default(),
    );
    TestApp {
        router: create_router(state),
        repo,
        verifier,
    }
}

impl TestApp {
    /// Inserts a user profile directly into the store and returns its id.
    pub async fn seed_user(&self, email: &str, role: &str, status: &str) -> String {
        self.repo
            .insert_one(
                Collection::Users,
                document(json!({ "email": email, "role": role, "status": status })),
            )
            .await
            .expect("seeding user failed")
            .inserted_id
    }

    /// Seeds a user with the given role and returns a token for it.
    pub async fn login_as(&self, email: &str, role: &str) -> String {
        self.seed_user(email, role, "active").await;
        token_for(email)
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request build failed");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router call failed");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body read failed");

        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request("GET", uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request("POST", uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request("PATCH", uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request("DELETE", uri, token, None).await
    }
}
