use axum::{Router, extract::FromRef, http::HeaderName, middleware};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Authorization core: identity verification, role resolution, route gates.
pub mod auth;
pub mod policy;
pub mod roles;

// Resources and their collaborators.
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod payment;
pub mod repository;
pub mod stats;

pub mod routes;

// --- Public Re-exports ---

pub use auth::{FirebaseVerifier, SharedSecretVerifier, VerifierState};
pub use config::AppConfig;
pub use error::ApiError;
pub use payment::{MockPaymentProvider, PaymentState, StripeClient};
pub use policy::Gatekeeper;
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};

use handlers::{blogs, dashboard, donations, funds, payments, users};

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and schema into the OpenAPI document served
/// at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        users::register_user, users::get_user_role, users::get_user_status,
        users::get_user_data, users::update_user_data, users::search_donors,
        users::list_users, users::update_user_role, users::update_user_status,
        users::update_user_by_id,
        donations::list_pending_requests, donations::get_pending_request,
        donations::list_my_requests, donations::list_all_requests, donations::create_request,
        donations::get_request, donations::update_request, donations::update_request_status,
        donations::delete_request,
        blogs::list_published_blogs, blogs::get_published_blog, blogs::list_all_blogs,
        blogs::create_blog, blogs::update_blog, blogs::publish_blog, blogs::unpublish_blog,
        blogs::delete_blog,
        funds::list_funds, funds::create_fund,
        payments::create_payment_intent,
        dashboard::get_dashboard_stats
    ),
    components(
        schemas(
            models::Role, models::AccountStatus, models::UserProfile,
            models::RegisterUserRequest, models::ProfilePatch, models::RoleUpdateRequest,
            models::StatusUpdateRequest, models::DonationStatusPatch, models::CreateFundRequest,
            models::PaymentIntentRequest, models::PaymentIntentResponse, models::RoleLookup,
            models::StatusLookup, models::AlreadyRegistered, models::DashboardStats,
            repository::InsertOneResult, repository::UpdateResult, repository::DeleteResult,
        )
    ),
    tags(
        (name = "red-drop", description = "Red Drop blood donation API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The shared, immutable container for every collaborator a request may need. Cloning is
/// cheap: each service sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Document store for users, donation requests, blogs and funds.
    pub repo: RepositoryState,
    /// Payment provider used by `/create-payment-intent`.
    pub payments: PaymentState,
    pub config: AppConfig,
    /// Verifier plus role resolver, run by the `policy::authorize` layer.
    pub gatekeeper: Gatekeeper,
}

impl AppState {
    /// Wires the gatekeeper's role resolver to the same store the handlers use.
    pub fn new(
        repo: RepositoryState,
        verifier: VerifierState,
        payments: PaymentState,
        config: AppConfig,
    ) -> Self {
        let gatekeeper = Gatekeeper::new(verifier, roles::RoleResolver::new(repo.clone()));
        Self {
            repo,
            payments,
            config,
            gatekeeper,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for PaymentState {
    fn from_ref(app_state: &AppState) -> PaymentState {
        app_state.payments.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles every resource router behind the policy layer, then adds the documentation
/// routes (ungated) and the observability stack.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    // `route_layer` runs only for matched routes, so `MatchedPath` is always available to
    // the policy lookup and unknown paths stay plain 404s.
    let api = Router::new()
        .merge(routes::service_routes())
        .merge(routes::users::user_routes())
        .merge(routes::donations::donation_routes())
        .merge(routes::blogs::blog_routes())
        .merge(routes::funds::fund_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            policy::authorize,
        ));

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the per-request span with the method, URI and `x-request-id`, so every log line of
/// a request (including gate denials) carries the same correlation id.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
