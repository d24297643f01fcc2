use axum::{
    extract::{FromRef, MatchedPath, Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};

use crate::{
    AppState,
    auth::{Caller, VerifierState, authorization_header, verify_principal},
    error::ApiError,
    models::Role,
    roles::RoleResolver,
};

/// Gate
///
/// The access requirement attached to a route. Every non-public gate first needs a
/// verified principal with a registered profile; the role predicate is evaluated last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Public,
    Authenticated,
    AdminOrVolunteer,
    Admin,
}

impl Gate {
    pub fn requires_principal(self) -> bool {
        self != Gate::Public
    }

    /// Pure role predicate. Never touches the store.
    pub fn permits(self, role: Role) -> bool {
        match self {
            Gate::Public | Gate::Authenticated => true,
            Gate::AdminOrVolunteer => matches!(role, Role::Admin | Role::Volunteer),
            Gate::Admin => role == Role::Admin,
        }
    }

    pub fn check(self, role: Role) -> Result<(), ApiError> {
        if self.permits(role) {
            Ok(())
        } else {
            Err(ApiError::InsufficientRole)
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RoutePolicy {
    pub method: &'static str,
    pub path: &'static str,
    pub gate: Gate,
}

const fn rule(method: &'static str, path: &'static str, gate: Gate) -> RoutePolicy {
    RoutePolicy { method, path, gate }
}

/// ROUTE_POLICY
///
/// The single source of truth for who may call what. Paths are the router's patterns as
/// reported by `MatchedPath`.
pub const ROUTE_POLICY: &[RoutePolicy] = &[
    // Public
    rule("GET", "/", Gate::Public),
    rule("GET", "/health", Gate::Public),
    rule("POST", "/users", Gate::Public),
    rule("GET", "/user-role/{email}", Gate::Public),
    rule("GET", "/user-status/{email}", Gate::Public),
    rule("GET", "/search-donors", Gate::Public),
    rule("GET", "/blogs", Gate::Public),
    rule("GET", "/blogs/{id}", Gate::Public),
    rule("GET", "/pending-donation-requests", Gate::Public),
    rule("GET", "/pending-donation-requests/{id}", Gate::Public),
    // Any registered user
    rule("GET", "/user-data/{email}", Gate::Authenticated),
    rule("PATCH", "/update-user-data/{email}", Gate::Authenticated),
    rule("GET", "/my-donation-requests", Gate::Authenticated),
    rule("POST", "/donation-requests", Gate::Authenticated),
    rule("GET", "/donation-requests/{id}", Gate::Authenticated),
    rule("PATCH", "/donation-requests/{id}", Gate::Authenticated),
    rule("DELETE", "/donation-requests/{id}", Gate::Authenticated),
    rule("PATCH", "/donation-requests/status/{id}", Gate::Authenticated),
    rule("GET", "/funds", Gate::Authenticated),
    rule("POST", "/funds", Gate::Authenticated),
    rule("POST", "/create-payment-intent", Gate::Authenticated),
    // Staff
    rule("GET", "/dashboard-stats", Gate::AdminOrVolunteer),
    rule("GET", "/all-donation-requests", Gate::AdminOrVolunteer),
    rule("GET", "/all-blogs", Gate::AdminOrVolunteer),
    // Admin
    rule("GET", "/users", Gate::Admin),
    rule("PATCH", "/users/role/{id}", Gate::Admin),
    rule("PATCH", "/users/status/{id}", Gate::Admin),
    rule("PATCH", "/users/{id}", Gate::Admin),
    rule("POST", "/blogs", Gate::Admin),
    rule("PATCH", "/blogs/{id}", Gate::Admin),
    rule("PATCH", "/blogs/publish/{id}", Gate::Admin),
    rule("PATCH", "/blogs/unpublish/{id}", Gate::Admin),
    rule("DELETE", "/blogs/{id}", Gate::Admin),
];

/// Looks up the configured gate for a route, if any.
pub fn policy_for(method: &Method, path: &str) -> Option<Gate> {
    // axum answers HEAD with the GET handler, so it shares the GET gate.
    let method = if *method == Method::HEAD {
        "GET"
    } else {
        method.as_str()
    };
    ROUTE_POLICY
        .iter()
        .find(|rule| rule.method == method && rule.path == path)
        .map(|rule| rule.gate)
}

/// Like `policy_for`, but a route missing from the table is admin-only.
pub fn gate_for(method: &Method, path: &str) -> Gate {
    policy_for(method, path).unwrap_or_else(|| {
        tracing::warn!(%method, %path, "route has no access policy; requiring admin");
        Gate::Admin
    })
}

/// Gatekeeper
///
/// Runs the authorization pipeline for one request: principal verification, role
/// resolution, then the gate predicate. Built once at startup with its collaborators.
#[derive(Clone)]
pub struct Gatekeeper {
    verifier: VerifierState,
    resolver: RoleResolver,
}

impl Gatekeeper {
    pub fn new(verifier: VerifierState, resolver: RoleResolver) -> Self {
        Self { verifier, resolver }
    }

    /// Returns `None` for public gates (nothing is verified or looked up) and the resolved
    /// caller otherwise. Each step short-circuits, so a verifier failure never reaches the
    /// store and a resolver failure is returned unchanged.
    pub async fn authorize(
        &self,
        gate: Gate,
        authorization: Option<&str>,
    ) -> Result<Option<Caller>, ApiError> {
        if !gate.requires_principal() {
            return Ok(None);
        }

        let principal = verify_principal(self.verifier.as_ref(), authorization).await?;
        let profile = self.resolver.resolve(&principal.email).await?;

        if let Err(denied) = gate.check(profile.role) {
            tracing::debug!(email = %principal.email, role = %profile.role, ?gate, "role gate denied");
            return Err(denied);
        }

        Ok(Some(Caller { principal, profile }))
    }
}

impl FromRef<AppState> for Gatekeeper {
    fn from_ref(app_state: &AppState) -> Gatekeeper {
        app_state.gatekeeper.clone()
    }
}

/// authorize
///
/// Route-level middleware. Looks up the matched route in `ROUTE_POLICY`, runs the
/// gatekeeper and attaches the resulting `Caller` for the handler.
pub async fn authorize(
    State(gatekeeper): State<Gatekeeper>,
    matched: MatchedPath,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let gate = gate_for(request.method(), matched.as_str());
    let authorization = authorization_header(request.headers()).map(str::to_owned);

    if let Some(caller) = gatekeeper.authorize(gate, authorization.as_deref()).await? {
        request.extensions_mut().insert(caller);
    }

    Ok(next.run(request).await)
}
