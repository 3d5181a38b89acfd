//! HTTP module
//!
//! The axum surface of the service: router, caller extraction and the
//! server loop.

pub mod extract;
pub mod routes;
pub mod server;
pub mod state;

pub use extract::AuthenticatedUser;
pub use routes::{DataEnvelope, router};
pub use server::{DEFAULT_HTTP_PORT, HttpConfig, run_http};
pub use state::AppState;
