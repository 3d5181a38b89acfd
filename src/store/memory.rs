//! In-process document store
//!
//! Thread-safe map of collections guarded by a single lock. Conditional writes
//! compare revisions while holding the write lock, which gives the same
//! compare-and-set guarantee a remote store's preconditions give.

use crate::content::timestamp;
use crate::error::{StoreError, StoreResult};
use crate::store::{
    Direction, Document, DocumentStore, Fields, ListQuery, Precondition, Version, conflict,
};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, trace};

/// In-memory document store
pub struct MemoryStore {
    data: RwLock<StoreData>,
}

#[derive(Default)]
struct StoreData {
    collections: HashMap<String, HashMap<String, StoredDocument>>,
    /// Monotonic revision counter shared by all documents
    revision: u64,
}

struct StoredDocument {
    fields: Fields,
    revision: u64,
}

impl StoredDocument {
    fn to_document(&self, id: &str) -> Document {
        Document {
            id: id.to_string(),
            fields: self.fields.clone(),
            version: Version::new(self.revision.to_string()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            data: RwLock::new(StoreData::default()),
        }
    }

    /// Create a store from a JSON seed of the form
    /// `{ "<collection>": { "<id>": { ...fields } } }`
    pub fn from_seed(seed: &Value) -> StoreResult<Self> {
        let store = Self::new();
        let collections = seed
            .as_object()
            .ok_or_else(|| StoreError::InvalidResponse("seed must be a JSON object".into()))?;

        for (collection, documents) in collections {
            let documents = documents.as_object().ok_or_else(|| {
                StoreError::InvalidResponse(format!("seed collection '{}' must be an object", collection))
            })?;
            for (id, fields) in documents {
                let fields = fields
                    .as_object()
                    .ok_or_else(|| StoreError::malformed(collection, id, "document must be an object"))?;
                store.insert(collection, id, fields.clone());
            }
        }

        Ok(store)
    }

    /// Load a JSON seed file
    pub fn from_seed_file(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Unavailable(format!("cannot read seed file {}: {}", path.display(), e))
        })?;
        let seed: Value = serde_json::from_str(&raw).map_err(|e| {
            StoreError::InvalidResponse(format!("invalid seed file {}: {}", path.display(), e))
        })?;

        let store = Self::from_seed(&seed)?;
        info!(
            path = %path.display(),
            documents = store.len(),
            "Loaded memory store seed"
        );
        Ok(store)
    }

    /// Unconditionally insert or replace a document
    pub fn insert(&self, collection: &str, id: &str, fields: Fields) -> Document {
        let mut data = self.write_data();
        data.revision += 1;
        let stored = StoredDocument {
            fields,
            revision: data.revision,
        };
        let document = stored.to_document(id);
        data.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), stored);
        document
    }

    /// Total number of documents across collections
    pub fn len(&self) -> usize {
        self.read_data().collections.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Poisoned locks are recovered: every mutation is a single insert, so the
    // map is never left half-written.

    fn write_data(&self) -> RwLockWriteGuard<'_, StoreData> {
        self.data.write().unwrap_or_else(|poisoned| {
            tracing::warn!("memory store lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn read_data(&self) -> RwLockReadGuard<'_, StoreData> {
        self.data.read().unwrap_or_else(|poisoned| {
            tracing::warn!("memory store lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let data = self.read_data();
        Ok(data
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|stored| stored.to_document(id)))
    }

    async fn list(&self, collection: &str, query: &ListQuery) -> StoreResult<Vec<Document>> {
        let mut documents: Vec<Document> = {
            let data = self.read_data();
            match data.collections.get(collection) {
                Some(docs) => docs.iter().map(|(id, s)| s.to_document(id)).collect(),
                None => Vec::new(),
            }
        };

        match &query.order_by {
            Some(order) => {
                documents.sort_by(|a, b| {
                    let ordering =
                        compare_field(a.fields.get(&order.field), b.fields.get(&order.field))
                            .then_with(|| a.id.cmp(&b.id));
                    match order.direction {
                        Direction::Ascending => ordering,
                        Direction::Descending => ordering.reverse(),
                    }
                });
            }
            None => documents.sort_by(|a, b| a.id.cmp(&b.id)),
        }

        if let Some(limit) = query.limit {
            documents.truncate(limit);
        }

        trace!(collection, count = documents.len(), "Listed documents");
        Ok(documents)
    }

    async fn write(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        precondition: Precondition,
    ) -> StoreResult<Document> {
        let mut data = self.write_data();

        let current = data
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|stored| stored.revision);

        let holds = match (&precondition, current) {
            (Precondition::MustNotExist, None) => true,
            (Precondition::MustNotExist, Some(_)) => false,
            (Precondition::MatchesVersion(expected), Some(revision)) => {
                expected.as_str() == revision.to_string()
            }
            (Precondition::MatchesVersion(_), None) => false,
        };

        if !holds {
            debug!(collection, id, ?precondition, "Precondition failed");
            return Err(conflict(collection, id));
        }

        data.revision += 1;
        let stored = StoredDocument {
            fields,
            revision: data.revision,
        };
        let document = stored.to_document(id);
        data.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), stored);

        Ok(document)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Sort key of a field value; timestamps compare chronologically whatever
/// their stored representation.
#[derive(Debug, PartialEq, PartialOrd)]
enum SortKey {
    Missing,
    Number(f64),
    Time(i64),
    Text(String),
}

fn sort_key(value: Option<&Value>) -> SortKey {
    match value {
        None | Some(Value::Null) => SortKey::Missing,
        Some(v) => {
            if let Some(ts) = timestamp::normalize(v) {
                SortKey::Time(ts.timestamp_nanos_opt().unwrap_or(i64::MAX))
            } else if let Some(n) = v.as_f64() {
                SortKey::Number(n)
            } else {
                SortKey::Text(v.to_string())
            }
        }
    }
}

fn compare_field(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    sort_key(a)
        .partial_cmp(&sort_key(b))
        .unwrap_or(Ordering::Equal)
}
