//! Identity provider trait
//!
//! Extracts the verified user id from a request. The only implementation
//! today trusts a header written by the upstream session verifier; the trait
//! keeps room for verifying session tokens in-process later.

use crate::error::AuthError;
use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderName};

/// Longest accepted user id
const MAX_USER_ID_LEN: usize = 128;

/// Identity provider trait
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The authenticated user id carried by the request
    async fn user_id(&self, headers: &HeaderMap) -> Result<String, AuthError>;

    /// Description of the mechanism (for logging)
    fn provider_type(&self) -> &'static str;
}

/// Box type alias for identity providers
pub type BoxedIdentityProvider = Box<dyn IdentityProvider>;

/// Reads the user id from a header set by a trusted upstream proxy
#[derive(Debug, Clone)]
pub struct TrustedHeaderProvider {
    header: HeaderName,
}

impl TrustedHeaderProvider {
    pub fn new(header: &str) -> Result<Self, AuthError> {
        let header = HeaderName::from_bytes(header.trim().to_ascii_lowercase().as_bytes())
            .map_err(|e| AuthError::InvalidIdentity(format!("bad header name '{}': {}", header, e)))?;
        Ok(Self { header })
    }

    pub fn header(&self) -> &HeaderName {
        &self.header
    }
}

#[async_trait]
impl IdentityProvider for TrustedHeaderProvider {
    async fn user_id(&self, headers: &HeaderMap) -> Result<String, AuthError> {
        let raw = headers
            .get(&self.header)
            .ok_or(AuthError::MissingIdentity)?
            .to_str()
            .map_err(|_| AuthError::InvalidIdentity("user id is not valid ASCII".into()))?
            .trim();

        if raw.is_empty() {
            return Err(AuthError::MissingIdentity);
        }
        if raw.len() > MAX_USER_ID_LEN || raw.contains('/') {
            return Err(AuthError::InvalidIdentity(format!(
                "user id must be at most {} characters and contain no '/'",
                MAX_USER_ID_LEN
            )));
        }
        Ok(raw.to_string())
    }

    fn provider_type(&self) -> &'static str {
        "trusted header"
    }
}
