//! Detail view state machine
//!
//! What a client tracks while opening one item:
//!
//! ```text
//! loading ──► success | quota_exceeded | not_found | error
//!    ▲                        │
//!    └──────── retry ─────────┘
//! ```
//!
//! Every non-loading state is terminal until the user retries.

use crate::error::{ErrorCode, ServiceError, ServiceResult};
use crate::quota::{Limit, MembershipTier};
use crate::service::ContentWithUsage;

#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    Loading,
    Success(Box<ContentWithUsage>),
    QuotaExceeded {
        current_usage: u32,
        limit: Limit,
        membership_type: MembershipTier,
    },
    NotFound,
    Error { code: ErrorCode, message: String },
}

/// Inputs that move the state machine
#[derive(Debug)]
pub enum DetailEvent {
    /// The request finished
    Resolved(ServiceResult<ContentWithUsage>),
    /// The user asked to try again
    Retry,
}

impl DetailState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DetailState::Loading)
    }

    /// Advance the state machine
    ///
    /// Results arriving outside `Loading` are stale and ignored; retry only
    /// leaves a terminal state.
    pub fn apply(self, event: DetailEvent) -> Self {
        match (self, event) {
            (DetailState::Loading, DetailEvent::Resolved(result)) => Self::from_result(result),
            (state, DetailEvent::Retry) if state.is_terminal() => DetailState::Loading,
            (state, _) => state,
        }
    }

    fn from_result(result: ServiceResult<ContentWithUsage>) -> Self {
        match result {
            Ok(content) => DetailState::Success(Box::new(content)),
            Err(ServiceError::QuotaExceeded {
                current_usage,
                limit,
                membership_type,
            }) => DetailState::QuotaExceeded {
                current_usage,
                limit,
                membership_type,
            },
            Err(ServiceError::NotFound { .. }) => DetailState::NotFound,
            Err(other) => DetailState::Error {
                code: other.code(),
                message: other.to_string(),
            },
        }
    }
}
