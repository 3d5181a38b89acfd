//! Service module
//!
//! Request-level orchestration of the repository and the access gate, plus
//! the detail-view state machine clients mirror.

pub mod content_service;
pub mod detail_state;

pub use content_service::{
    CatalogUsage, ContentService, ContentWithUsage, ListWithUsage, PageLimits, UsageOverview,
    validate_content_id,
};
pub use detail_state::{DetailEvent, DetailState};
