//! Quota Gate
//!
//! An access-quota service for article and video catalogs. Browsing is free;
//! opening an item consumes one slot of the caller's membership allowance the
//! first time, and is free on every revisit.
//!
//! ## Membership tiers
//!
//! | Tier | Articles | Videos |
//! |------|----------|--------|
//! | A (Basic) | 3 | 3 |
//! | B (Standard) | 10 | 10 |
//! | C (Premium) | unlimited | unlimited |
//!
//! Usage is lifetime: a set of distinct content ids per user and content type.
//!
//! ## Architecture
//!
//! ```text
//! HTTP (axum) ──► ContentService ──► AccessGate ──► UsageStore ──┐
//!                       │                                        ├──► DocumentStore
//!                       └──────────► ContentRepository ──────────┘    (memory | firestore)
//! ```
//!
//! The gate decides and commits with a conditional write on the usage
//! record's revision, so concurrent requests can never push a user past
//! their limit.
//!
//! ## Example Configuration
//!
//! ```toml
//! [server]
//! port = 8787
//!
//! [store]
//! backend = "firestore"
//!
//! [store.firestore]
//! project_id = "my-project"      # or GOOGLE_CLOUD_PROJECT
//!
//! [auth]
//! user_id_header = "x-user-id"   # set by the session proxy
//! ```

pub mod auth;
pub mod config;
pub mod content;
pub mod error;
pub mod http;
pub mod metrics;
pub mod quota;
pub mod service;
pub mod store;
pub mod util;

// Re-export main types
pub use config::{AppConfig, load_config};
pub use error::{AppError, Result, ServiceError};
pub use http::{AppState, router};
pub use metrics::GateMetrics;
pub use service::ContentService;
