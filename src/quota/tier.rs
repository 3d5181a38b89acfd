//! Tier policy
//!
//! The single source of truth for how many distinct items each membership
//! tier may open per catalog. UI copy and the API's tier table derive from
//! [`MembershipTier::limit_for`]; nothing else encodes the numbers.

use crate::content::ContentType;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Membership tier attached to a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MembershipTier {
    A,
    B,
    C,
}

/// Per-catalog allowance. `Unlimited` is a sentinel, never a large number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Limit {
    Finite(u32),
    Unlimited,
}

/// Remaining allowance has the same shape as the limit itself
pub type Remaining = Limit;

impl MembershipTier {
    /// Distinct items of `content_type` this tier may open
    pub const fn limit_for(&self, content_type: ContentType) -> Limit {
        match (self, content_type) {
            (MembershipTier::A, ContentType::Article | ContentType::Video) => Limit::Finite(3),
            (MembershipTier::B, ContentType::Article | ContentType::Video) => Limit::Finite(10),
            (MembershipTier::C, ContentType::Article | ContentType::Video) => Limit::Unlimited,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            MembershipTier::A => "A",
            MembershipTier::B => "B",
            MembershipTier::C => "C",
        }
    }

    /// Human-facing plan name
    pub const fn display_label(&self) -> &'static str {
        match self {
            MembershipTier::A => "Basic",
            MembershipTier::B => "Standard",
            MembershipTier::C => "Premium",
        }
    }

    pub fn try_parse(s: &str) -> Option<Self> {
        match s.trim() {
            "A" | "a" => Some(MembershipTier::A),
            "B" | "b" => Some(MembershipTier::B),
            "C" | "c" => Some(MembershipTier::C),
            _ => None,
        }
    }

    pub const fn all() -> &'static [MembershipTier] {
        &[MembershipTier::A, MembershipTier::B, MembershipTier::C]
    }
}

impl fmt::Display for MembershipTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Limit {
    /// Whether a set of `count` distinct items may grow by one
    pub fn admits(&self, count: usize) -> bool {
        match self {
            Limit::Unlimited => true,
            Limit::Finite(limit) => count < *limit as usize,
        }
    }

    /// Allowance left after `count` items, never negative
    pub fn remaining(&self, count: u32) -> Remaining {
        match self {
            Limit::Unlimited => Limit::Unlimited,
            Limit::Finite(limit) => Limit::Finite(limit.saturating_sub(count)),
        }
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, Limit::Unlimited)
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Finite(n) => write!(f, "{}", n),
            Limit::Unlimited => f.write_str("unlimited"),
        }
    }
}

/// Serialized as a number, or the string `"unlimited"`
impl Serialize for Limit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Limit::Finite(n) => serializer.serialize_u32(*n),
            Limit::Unlimited => serializer.serialize_str("unlimited"),
        }
    }
}

/// Row of the public tier table
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierSummary {
    pub tier: MembershipTier,
    pub label: &'static str,
    pub articles: Limit,
    pub videos: Limit,
}

/// The tier table as exposed to clients
pub fn tier_table() -> Vec<TierSummary> {
    MembershipTier::all()
        .iter()
        .map(|tier| TierSummary {
            tier: *tier,
            label: tier.display_label(),
            articles: tier.limit_for(ContentType::Article),
            videos: tier.limit_for(ContentType::Video),
        })
        .collect()
}
