//! Identity module
//!
//! Resolves the authenticated [`User`] for a request. Session verification
//! happens upstream; this service receives the verified user id through a
//! trusted header and looks the membership tier up in the user directory.

pub mod directory;
pub mod provider;

pub use directory::UserDirectory;
pub use provider::{BoxedIdentityProvider, IdentityProvider, TrustedHeaderProvider};

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::quota::MembershipTier;
use axum::http::HeaderMap;
use std::sync::Arc;
use tracing::info;

/// An authenticated user as seen by the quota engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub membership: MembershipTier,
}

impl User {
    pub fn new(id: impl Into<String>, membership: MembershipTier) -> Self {
        Self {
            id: id.into(),
            membership,
        }
    }
}

/// Identity provider plus directory lookup
#[derive(Clone)]
pub struct Authenticator {
    provider: Arc<BoxedIdentityProvider>,
    directory: UserDirectory,
}

impl Authenticator {
    pub fn new(provider: BoxedIdentityProvider, directory: UserDirectory) -> Self {
        Self {
            provider: Arc::new(provider),
            directory,
        }
    }

    /// Resolve the user behind a request
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<User, AuthError> {
        let user_id = self.provider.user_id(headers).await?;
        self.directory.lookup(&user_id).await
    }
}

/// Create the identity provider from configuration
pub fn create_identity_provider(config: &AuthConfig) -> Result<BoxedIdentityProvider, AuthError> {
    let provider = TrustedHeaderProvider::new(&config.user_id_header)?;
    info!(
        provider = provider.provider_type(),
        header = %provider.header(),
        "Identity provider configured"
    );
    Ok(Box::new(provider))
}
