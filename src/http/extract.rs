//! Request extractors

use crate::auth::User;
use crate::error::ServiceError;
use crate::http::AppState;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

/// The caller, resolved from the trusted identity header and the user
/// directory. Rejects with `UNAUTHORIZED` when either is missing.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = state.auth.authenticate(&parts.headers).await?;
        Ok(AuthenticatedUser(user))
    }
}
