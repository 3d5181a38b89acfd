//! Access gate
//!
//! Decides whether a user may open a content item:
//!
//! 1. read the usage record
//! 2. look up the tier limit
//! 3. already accessed → granted, nothing written
//! 4. unlimited, or fewer distinct items than the limit → record, granted
//! 5. otherwise → denied
//!
//! Steps 1–4 form one optimistic transaction. The write in step 4 is
//! conditioned on the revision read in step 1; when a concurrent request
//! commits first the gate re-reads and decides again, so the persisted count
//! can never pass the limit and one fresh id never consumes two slots.

use crate::auth::User;
use crate::content::ContentType;
use crate::error::{StoreError, StoreResult};
use crate::metrics::GateMetrics;
use crate::quota::tier::{Limit, MembershipTier};
use crate::quota::usage::{UsageRecord, UsageStore};
use crate::util::backoff_delay;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Outcome of evaluating one request against a usage snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Already in the accessed set; free
    Replay,
    /// Fresh and under the limit; consumes a slot
    Admit,
    /// Fresh and the limit is reached
    Deny,
}

/// Pure decision over a snapshot of the accessed set
pub fn evaluate(accessed: &BTreeSet<String>, limit: Limit, content_id: &str) -> Verdict {
    if accessed.contains(content_id) {
        return Verdict::Replay;
    }
    if limit.admits(accessed.len()) {
        Verdict::Admit
    } else {
        Verdict::Deny
    }
}

/// Result of a gate check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Access allowed; `usage` is the record after the decision
    Granted { usage: UsageRecord, replay: bool },
    /// Quota exhausted for this catalog
    Denied {
        current_usage: u32,
        limit: Limit,
        membership_type: MembershipTier,
    },
}

impl Decision {
    pub fn is_granted(&self) -> bool {
        matches!(self, Decision::Granted { .. })
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Decision::Denied { .. })
    }
}

/// Quota decision engine
#[derive(Clone)]
pub struct AccessGate {
    usage: Arc<dyn UsageStore>,
    metrics: Arc<GateMetrics>,
    max_attempts: u32,
    retry_base_delay: Duration,
}

impl AccessGate {
    pub fn new(
        usage: Arc<dyn UsageStore>,
        metrics: Arc<GateMetrics>,
        max_attempts: u32,
        retry_base_delay: Duration,
    ) -> Self {
        Self {
            usage,
            metrics,
            max_attempts: max_attempts.max(1),
            retry_base_delay,
        }
    }

    /// Current usage record of a user
    pub async fn usage(&self, user_id: &str) -> StoreResult<UsageRecord> {
        self.usage.get_usage(user_id).await
    }

    /// Check a request and record the access when it is granted
    #[instrument(skip(self, user), fields(user_id = %user.id, tier = %user.membership))]
    pub async fn check_and_grant(
        &self,
        user: &User,
        content_type: ContentType,
        content_id: &str,
    ) -> StoreResult<Decision> {
        let limit = user.membership.limit_for(content_type);

        for attempt in 1..=self.max_attempts {
            let record = self.usage.get_usage(&user.id).await?;

            match evaluate(record.accessed(content_type), limit, content_id) {
                Verdict::Replay => {
                    self.metrics.record_replay();
                    debug!(%content_type, content_id, "Replay of accessed content");
                    return Ok(Decision::Granted {
                        usage: record,
                        replay: true,
                    });
                }
                Verdict::Deny => {
                    self.metrics.record_denial();
                    let current_usage = record.count(content_type);
                    info!(%content_type, content_id, current_usage, %limit, "Quota exhausted");
                    return Ok(Decision::Denied {
                        current_usage,
                        limit,
                        membership_type: user.membership,
                    });
                }
                Verdict::Admit => {
                    match self
                        .usage
                        .record_access(&record, content_type, content_id)
                        .await
                    {
                        Ok(updated) => {
                            self.metrics.record_grant();
                            debug!(
                                %content_type,
                                content_id,
                                count = updated.count(content_type),
                                "Granted fresh access"
                            );
                            return Ok(Decision::Granted {
                                usage: updated,
                                replay: false,
                            });
                        }
                        Err(e) if e.is_conflict() => {
                            self.metrics.record_conflict();
                            debug!(attempt, "Usage record changed concurrently, re-deciding");
                            if attempt < self.max_attempts {
                                tokio::time::sleep(backoff_delay(self.retry_base_delay, attempt))
                                    .await;
                            }
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }

        self.metrics.record_contention_failure();
        warn!(attempts = self.max_attempts, "Gave up on contended usage record");
        Err(StoreError::Contention {
            user_id: user.id.clone(),
            attempts: self.max_attempts,
        })
    }
}
