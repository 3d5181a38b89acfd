//! HTTP error mapping.
//!
//! Maps [`ServiceError`] to an HTTP status and the JSON failure envelope
//! `{ "error": { "code", "message", "details"? } }`.
//!
//! # Strategy
//! - Policy denials and missing content are expected outcomes, logged at `info`/`debug`
//! - Store and unknown failures are faults, logged at `warn`/`error`
//!
//! Quota denials always carry `details` so a client can render an upgrade
//! prompt without a second round trip.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Value, json};

use super::{ErrorCode, ServiceError};

/// Failure envelope returned to clients
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

/// Body of the failure envelope
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// HTTP status for an error code
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::QuotaExceeded => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::NetworkError => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::UnknownError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Build the failure envelope for a service error
pub fn to_envelope(error: &ServiceError) -> ErrorEnvelope {
    let details = match error {
        ServiceError::QuotaExceeded {
            current_usage,
            limit,
            membership_type,
        } => Some(json!({
            "currentUsage": current_usage,
            "limit": limit,
            "membershipType": membership_type,
        })),
        ServiceError::NotFound { content_type, id } => Some(json!({
            "contentType": content_type,
            "id": id,
        })),
        _ => None,
    };

    let message = match error {
        ServiceError::QuotaExceeded { .. } => {
            "You have reached the content limit for your membership".to_string()
        }
        // Store internals stay in the logs
        ServiceError::Network(_) => "The service is temporarily unavailable, try again".to_string(),
        ServiceError::Unknown(_) => "An unexpected error occurred".to_string(),
        other => other.to_string(),
    };

    ErrorEnvelope {
        error: ErrorBody {
            code: error.code().as_str(),
            message,
            details,
        },
    }
}

fn log_error(error: &ServiceError) {
    match error.code() {
        ErrorCode::QuotaExceeded => tracing::info!(error = %error, "Quota denial"),
        ErrorCode::NotFound | ErrorCode::ValidationError | ErrorCode::Unauthorized => {
            tracing::debug!(error = %error, code = %error.code(), "Request rejected")
        }
        ErrorCode::NetworkError => tracing::warn!(error = %error, "Store unavailable"),
        ErrorCode::UnknownError => tracing::error!(error = %error, "Unexpected failure"),
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        log_error(&self);
        let status = status_for(self.code());
        (status, Json(to_envelope(&self))).into_response()
    }
}
