//! Content service
//!
//! Orchestrates the repository and the access gate. Listing is always free
//! and merely annotated with the caller's accessed ids; opening an item goes
//! through the gate first and only reads the full document on a grant.
//!
//! A grant followed by a missing document is not rolled back: the slot stays
//! consumed for an item that has since been deleted.

use crate::auth::User;
use crate::content::{ContentRepository, ContentType, FullProjection, PreviewProjection};
use crate::error::{ServiceError, ServiceResult};
use crate::metrics::GateMetrics;
use crate::quota::{AccessGate, Decision, MembershipTier, UsageSummary};
use futures::future::try_join;
use regex::Regex;
use serde::Serialize;
use std::sync::{Arc, LazyLock};
use tracing::{instrument, warn};

static CONTENT_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]{1,128}$").expect("content id pattern is valid")
});

/// Page size bounds for list requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_size: usize,
    pub max_size: usize,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_size: 20,
            max_size: 100,
        }
    }
}

/// Previews of a catalog annotated with the caller's history
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListWithUsage {
    pub items: Vec<PreviewProjection>,
    pub accessed_ids: Vec<String>,
    pub usage: UsageSummary,
}

/// A granted item and the usage after the grant
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentWithUsage {
    pub item: FullProjection,
    pub usage: UsageSummary,
    /// Whether the item had been accessed before (no slot consumed)
    pub replay: bool,
}

/// One catalog in the usage overview
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogUsage {
    #[serde(flatten)]
    pub summary: UsageSummary,
    pub accessed_ids: Vec<String>,
}

/// Usage across both catalogs
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageOverview {
    pub membership_type: MembershipTier,
    pub membership_label: &'static str,
    pub articles: CatalogUsage,
    pub videos: CatalogUsage,
}

/// Quota-aware content access
#[derive(Clone)]
pub struct ContentService {
    repository: ContentRepository,
    gate: AccessGate,
    metrics: Arc<GateMetrics>,
    pages: PageLimits,
}

impl ContentService {
    pub fn new(
        repository: ContentRepository,
        gate: AccessGate,
        metrics: Arc<GateMetrics>,
        pages: PageLimits,
    ) -> Self {
        Self {
            repository,
            gate,
            metrics,
            pages,
        }
    }

    /// List previews with accessed flags; never consumes quota
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn list_with_usage(
        &self,
        user: &User,
        content_type: ContentType,
        limit: Option<usize>,
    ) -> ServiceResult<ListWithUsage> {
        let page_size = self.page_size(limit)?;

        let (items, record) = try_join(
            self.repository.list_previews(content_type, Some(page_size)),
            self.gate.usage(&user.id),
        )
        .await?;

        Ok(ListWithUsage {
            items,
            accessed_ids: record.accessed_ids(content_type),
            usage: record.summary(content_type, user.membership),
        })
    }

    /// Open one item, consuming quota if it is new to the user
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn get_one(
        &self,
        user: &User,
        content_type: ContentType,
        id: &str,
    ) -> ServiceResult<ContentWithUsage> {
        validate_content_id(id)?;

        let (usage, replay) = match self.gate.check_and_grant(user, content_type, id).await? {
            Decision::Granted { usage, replay } => (usage, replay),
            Decision::Denied {
                current_usage,
                limit,
                membership_type,
            } => {
                return Err(ServiceError::QuotaExceeded {
                    current_usage,
                    limit,
                    membership_type,
                });
            }
        };

        match self.repository.get_full(content_type, id).await? {
            Some(item) => Ok(ContentWithUsage {
                item,
                usage: usage.summary(content_type, user.membership),
                replay,
            }),
            None => {
                self.metrics.record_missing_after_grant();
                warn!(%content_type, id, replay, "Granted content has no document");
                Err(ServiceError::not_found(content_type, id))
            }
        }
    }

    /// Usage summary across both catalogs
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn usage_overview(&self, user: &User) -> ServiceResult<UsageOverview> {
        let record = self.gate.usage(&user.id).await?;
        let catalog = |content_type| CatalogUsage {
            summary: record.summary(content_type, user.membership),
            accessed_ids: record.accessed_ids(content_type),
        };

        Ok(UsageOverview {
            membership_type: user.membership,
            membership_label: user.membership.display_label(),
            articles: catalog(ContentType::Article),
            videos: catalog(ContentType::Video),
        })
    }

    fn page_size(&self, requested: Option<usize>) -> ServiceResult<usize> {
        match requested {
            None => Ok(self.pages.default_size.min(self.pages.max_size)),
            Some(n) if (1..=self.pages.max_size).contains(&n) => Ok(n),
            Some(n) => Err(ServiceError::Validation(format!(
                "limit must be between 1 and {}, got {}",
                self.pages.max_size, n
            ))),
        }
    }
}

/// Reject ids that cannot name a content document
pub fn validate_content_id(id: &str) -> ServiceResult<()> {
    if CONTENT_ID.is_match(id) {
        Ok(())
    } else {
        Err(ServiceError::Validation(format!(
            "invalid content id '{}': expected 1-128 letters, digits, '-' or '_'",
            id
        )))
    }
}
