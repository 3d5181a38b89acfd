//! Quota module
//!
//! The access-quota engine: tier policy, per-user usage records and the
//! gate that combines them.
//!
//! ```text
//! User ──► AccessGate ──► UsageStore (conditional writes)
//!              │
//!              └──► MembershipTier::limit_for
//! ```

pub mod gate;
pub mod tier;
pub mod usage;

pub use gate::{AccessGate, Decision, Verdict, evaluate};
pub use tier::{Limit, MembershipTier, Remaining, TierSummary, tier_table};
pub use usage::{DocumentUsageStore, UsageRecord, UsageStore, UsageSummary};
