//! Usage store
//!
//! One usage document per user holding, per catalog, the set of distinct
//! content ids ever granted. Counts are always derived from the set; the
//! stored `count` field is informational and ignored on read.
//!
//! ## Document layout
//!
//! ```json
//! {
//!   "articles": { "ids": ["a1", "a2"], "count": 2 },
//!   "videos":   { "ids": [], "count": 0 },
//!   "updatedAt": "2024-05-01T12:00:00Z"
//! }
//! ```

use crate::content::ContentType;
use crate::error::{StoreError, StoreResult};
use crate::quota::tier::{Limit, MembershipTier, Remaining};
use crate::store::{Document, Fields, Precondition, SharedStore, Version};
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeSet;
use tracing::{debug, instrument};

/// A user's access history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRecord {
    user_id: String,
    articles: BTreeSet<String>,
    videos: BTreeSet<String>,
    /// Revision the record was read at; `None` when no document exists yet
    revision: Option<Version>,
}

/// Counters for one catalog, as reported to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UsageSummary {
    pub count: u32,
    pub limit: Limit,
    pub remaining: Remaining,
}

impl UsageRecord {
    /// Record of a user with no history
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            articles: BTreeSet::new(),
            videos: BTreeSet::new(),
            revision: None,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn revision(&self) -> Option<&Version> {
        self.revision.as_ref()
    }

    /// Distinct ids accessed in a catalog
    pub fn accessed(&self, content_type: ContentType) -> &BTreeSet<String> {
        match content_type {
            ContentType::Article => &self.articles,
            ContentType::Video => &self.videos,
        }
    }

    pub fn accessed_ids(&self, content_type: ContentType) -> Vec<String> {
        self.accessed(content_type).iter().cloned().collect()
    }

    pub fn contains(&self, content_type: ContentType, content_id: &str) -> bool {
        self.accessed(content_type).contains(content_id)
    }

    /// `|set|` for a catalog
    pub fn count(&self, content_type: ContentType) -> u32 {
        u32::try_from(self.accessed(content_type).len()).unwrap_or(u32::MAX)
    }

    /// Count, limit and remaining allowance for a catalog under a tier
    pub fn summary(&self, content_type: ContentType, tier: MembershipTier) -> UsageSummary {
        let count = self.count(content_type);
        let limit = tier.limit_for(content_type);
        UsageSummary {
            count,
            limit,
            remaining: limit.remaining(count),
        }
    }

    /// Copy of this record with one more id in a catalog
    fn with_access(&self, content_type: ContentType, content_id: &str) -> Self {
        let mut next = self.clone();
        match content_type {
            ContentType::Article => next.articles.insert(content_id.to_string()),
            ContentType::Video => next.videos.insert(content_id.to_string()),
        };
        next
    }

    fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        for content_type in ContentType::all() {
            let ids = self.accessed_ids(*content_type);
            fields.insert(
                content_type.plural().to_string(),
                json!({ "ids": ids, "count": ids.len() }),
            );
        }
        fields.insert("updatedAt".to_string(), json!(Utc::now().to_rfc3339()));
        fields
    }

    fn from_document(collection: &str, doc: Document) -> StoreResult<Self> {
        let mut record = Self::empty(doc.id.clone());
        for content_type in ContentType::all() {
            let ids = read_ids(doc.fields.get(content_type.plural()))
                .map_err(|reason| StoreError::malformed(collection, &doc.id, reason))?;
            match content_type {
                ContentType::Article => record.articles = ids,
                ContentType::Video => record.videos = ids,
            }
        }
        record.revision = Some(doc.version);
        Ok(record)
    }
}

fn read_ids(section: Option<&Value>) -> Result<BTreeSet<String>, String> {
    let Some(section) = section else {
        return Ok(BTreeSet::new());
    };
    match section.get("ids") {
        None | Some(Value::Null) => Ok(BTreeSet::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| format!("content id is not a string: {}", v))
            })
            .collect(),
        Some(other) => Err(format!("ids is not an array: {}", other)),
    }
}

/// Persistence of usage records
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Current record, empty when the user has none
    async fn get_usage(&self, user_id: &str) -> StoreResult<UsageRecord>;

    /// Add `content_id` to the record's set
    ///
    /// Idempotent: an id already present returns the record unchanged without
    /// writing. Otherwise the write is conditioned on `current`'s revision and
    /// fails with [`StoreError::Conflict`] if another writer got there first.
    async fn record_access(
        &self,
        current: &UsageRecord,
        content_type: ContentType,
        content_id: &str,
    ) -> StoreResult<UsageRecord>;
}

/// Usage store backed by a document collection
#[derive(Clone)]
pub struct DocumentUsageStore {
    store: SharedStore,
    collection: String,
}

impl DocumentUsageStore {
    pub fn new(store: SharedStore, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }
}

#[async_trait]
impl UsageStore for DocumentUsageStore {
    #[instrument(skip(self))]
    async fn get_usage(&self, user_id: &str) -> StoreResult<UsageRecord> {
        match self.store.get(&self.collection, user_id).await? {
            Some(doc) => UsageRecord::from_document(&self.collection, doc),
            None => Ok(UsageRecord::empty(user_id)),
        }
    }

    #[instrument(skip(self, current), fields(user_id = current.user_id()))]
    async fn record_access(
        &self,
        current: &UsageRecord,
        content_type: ContentType,
        content_id: &str,
    ) -> StoreResult<UsageRecord> {
        if current.contains(content_type, content_id) {
            return Ok(current.clone());
        }

        let next = current.with_access(content_type, content_id);
        let precondition = match current.revision() {
            Some(version) => Precondition::MatchesVersion(version.clone()),
            None => Precondition::MustNotExist,
        };

        let doc = self
            .store
            .write(
                &self.collection,
                current.user_id(),
                next.to_fields(),
                precondition,
            )
            .await?;

        debug!(%content_type, content_id, "Recorded access");
        UsageRecord::from_document(&self.collection, doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DocumentStore, MemoryStore};
    use std::sync::Arc;

    fn usage_store() -> (Arc<MemoryStore>, DocumentUsageStore) {
        let memory = Arc::new(MemoryStore::new());
        let store = DocumentUsageStore::new(memory.clone(), "usage");
        (memory, store)
    }

    #[tokio::test]
    async fn test_absent_record_is_empty() {
        let (_, store) = usage_store();
        let record = store.get_usage("u1").await.unwrap();
        assert_eq!(record.count(ContentType::Article), 0);
        assert_eq!(record.count(ContentType::Video), 0);
        assert!(record.revision().is_none());
    }

    #[tokio::test]
    async fn test_record_access_is_idempotent() {
        let (memory, store) = usage_store();
        let empty = store.get_usage("u1").await.unwrap();

        let first = store
            .record_access(&empty, ContentType::Article, "a1")
            .await
            .unwrap();
        assert_eq!(first.count(ContentType::Article), 1);

        let again = store
            .record_access(&first, ContentType::Article, "a1")
            .await
            .unwrap();
        assert_eq!(again, first);
        assert_eq!(memory.len(), 1);

        let reread = store.get_usage("u1").await.unwrap();
        assert_eq!(reread.accessed_ids(ContentType::Article), vec!["a1"]);
        assert_eq!(reread.count(ContentType::Video), 0);
    }

    #[tokio::test]
    async fn test_stale_record_conflicts() {
        let (_, store) = usage_store();
        let stale = store.get_usage("u1").await.unwrap();

        store
            .record_access(&stale, ContentType::Video, "v1")
            .await
            .unwrap();

        let err = store
            .record_access(&stale, ContentType::Video, "v2")
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        let current = store.get_usage("u1").await.unwrap();
        assert_eq!(current.accessed_ids(ContentType::Video), vec!["v1"]);
    }

    #[tokio::test]
    async fn test_count_derived_from_set_not_stored_counter() {
        let (memory, store) = usage_store();
        memory.insert(
            "usage",
            "u1",
            json!({"articles": {"ids": ["a1", "a2"], "count": 99}})
                .as_object()
                .cloned()
                .unwrap(),
        );

        let record = store.get_usage("u1").await.unwrap();
        assert_eq!(record.count(ContentType::Article), 2);
    }

    #[tokio::test]
    async fn test_persisted_layout() {
        let (memory, store) = usage_store();
        let empty = store.get_usage("u1").await.unwrap();
        store
            .record_access(&empty, ContentType::Article, "a1")
            .await
            .unwrap();

        let doc = memory.get("usage", "u1").await.unwrap().unwrap();
        assert_eq!(doc.fields["articles"], json!({"ids": ["a1"], "count": 1}));
        assert_eq!(doc.fields["videos"], json!({"ids": [], "count": 0}));
        assert!(doc.fields["updatedAt"].is_string());
    }

    #[test]
    fn test_summary_for_tiers() {
        let record = UsageRecord::empty("u1").with_access(ContentType::Article, "a1");

        let summary = record.summary(ContentType::Article, MembershipTier::A);
        assert_eq!(summary.count, 1);
        assert_eq!(summary.limit, Limit::Finite(3));
        assert_eq!(summary.remaining, Limit::Finite(2));

        let summary = record.summary(ContentType::Article, MembershipTier::C);
        assert_eq!(summary.remaining, Limit::Unlimited);
    }

    #[test]
    fn test_malformed_ids() {
        assert!(read_ids(Some(&json!({"ids": [1, 2]}))).is_err());
        assert!(read_ids(Some(&json!({"ids": "a1"}))).is_err());
        assert!(read_ids(Some(&json!({}))).unwrap().is_empty());
    }
}
