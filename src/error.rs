//! Error types for quota-gate
//!
//! This module defines the error hierarchy used throughout the service.
//! Each layer has its own `thiserror` enum; the content service translates
//! everything it sees into [`ServiceError`], which is the taxonomy clients
//! observe and which maps to HTTP in [`http_mapper`].

pub mod http_mapper;

use crate::content::ContentType;
use crate::quota::{Limit, MembershipTier};
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Document store error: {0}")]
    Store(#[from] StoreError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {field}")]
    Missing { field: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Document store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Document store unavailable: {0}")]
    Unavailable(String),

    #[error("Document store API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// A conditional write lost against a concurrent writer
    #[error("Precondition failed for {collection}/{id}")]
    Conflict { collection: String, id: String },

    /// Optimistic retries were exhausted without a successful commit
    #[error("Usage write contention for user '{user_id}' after {attempts} attempts")]
    Contention { user_id: String, attempts: u32 },

    #[error("Malformed document {collection}/{id}: {reason}")]
    Malformed {
        collection: String,
        id: String,
        reason: String,
    },

    #[error("Invalid response from document store: {0}")]
    InvalidResponse(String),
}

impl StoreError {
    /// Build a malformed-document error
    pub fn malformed(
        collection: impl Into<String>,
        id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        StoreError::Malformed {
            collection: collection.into(),
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error is a lost conditional write
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    /// Whether the caller may sensibly retry the request later
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Request(e) => e.is_timeout() || e.is_connect(),
            StoreError::Unavailable(_) | StoreError::Contention { .. } => true,
            StoreError::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Identity resolution errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("No authenticated user on request")]
    MissingIdentity,

    #[error("Invalid user identity: {0}")]
    InvalidIdentity(String),

    #[error("No user profile for '{0}'")]
    UnknownUser(String),

    /// The user directory holds a tier this build does not know
    #[error("Unrecognized membership tier '{tier}' for user '{user_id}'")]
    UnknownTier { user_id: String, tier: String },

    #[error("User directory error: {0}")]
    Store(#[from] StoreError),
}

/// Client-facing error taxonomy
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Quota exceeded: {current_usage} of {limit} used on membership {membership_type}")]
    QuotaExceeded {
        current_usage: u32,
        limit: Limit,
        membership_type: MembershipTier,
    },

    #[error("{content_type} '{id}' not found")]
    NotFound {
        content_type: ContentType,
        id: String,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Stable machine-readable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    QuotaExceeded,
    NotFound,
    ValidationError,
    Unauthorized,
    NetworkError,
    UnknownError,
}

impl ErrorCode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::QuotaExceeded => "QUOTA_EXCEEDED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ServiceError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::QuotaExceeded { .. } => ErrorCode::QuotaExceeded,
            ServiceError::NotFound { .. } => ErrorCode::NotFound,
            ServiceError::Validation(_) => ErrorCode::ValidationError,
            ServiceError::Unauthorized(_) => ErrorCode::Unauthorized,
            ServiceError::Network(_) => ErrorCode::NetworkError,
            ServiceError::Unknown(_) => ErrorCode::UnknownError,
        }
    }

    pub fn not_found(content_type: ContentType, id: impl Into<String>) -> Self {
        ServiceError::NotFound {
            content_type,
            id: id.into(),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        if err.is_transient() {
            ServiceError::Network(err.to_string())
        } else {
            ServiceError::Unknown(err.to_string())
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingIdentity
            | AuthError::InvalidIdentity(_)
            | AuthError::UnknownUser(_) => ServiceError::Unauthorized(err.to_string()),
            AuthError::UnknownTier { .. } => {
                tracing::error!(error = %err, "Membership tier skew between user directory and service");
                ServiceError::Unknown(err.to_string())
            }
            AuthError::Store(e) => e.into(),
        }
    }
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type alias for document store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for content service operations
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
