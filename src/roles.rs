use serde_json::{Value, json};

use crate::{
    error::ApiError,
    models::UserProfile,
    repository::{Collection, Document, RepositoryState, document},
};

/// RoleResolver
///
/// Maps a verified email to the stored user profile. Exactly one lookup per call and no
/// cache, so a role change is visible on the very next request.
#[derive(Clone)]
pub struct RoleResolver {
    repo: RepositoryState,
}

impl RoleResolver {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    /// Fails with `PrincipalNotRegistered` when no profile has this email: a valid external
    /// identity is not an application user until it registers.
    pub async fn resolve(&self, email: &str) -> Result<UserProfile, ApiError> {
        let found = self
            .repo
            .find_one(Collection::Users, document(json!({ "email": email })))
            .await?;

        match found {
            Some(doc) => parse_profile(doc),
            None => {
                tracing::debug!(%email, "verified principal has no profile");
                Err(ApiError::PrincipalNotRegistered)
            }
        }
    }
}

/// Reads a stored user document as a profile. A document that does not fit the schema
/// (e.g. an unknown role string) is a store-side problem, not a client error.
pub fn parse_profile(doc: Document) -> Result<UserProfile, ApiError> {
    serde_json::from_value(Value::Object(doc))
        .map_err(|e| ApiError::Upstream(format!("unreadable user profile: {e}")))
}
