//! Document store module
//!
//! A store-agnostic view of a document database. Everything the quota engine
//! persists or reads goes through [`DocumentStore`]; the usage store depends on
//! its conditional writes for atomicity.
//!
//! ## Backends
//!
//! - [`MemoryStore`] - in-process, optionally seeded from a JSON file
//! - [`FirestoreStore`] - Firestore REST API with `currentDocument` preconditions
//!
//! ## Conditional writes
//!
//! Every write names a [`Precondition`]. A write whose precondition no longer
//! holds fails with [`StoreError::Conflict`] and leaves the document untouched.
//! Callers re-read and re-decide; the store never merges.

pub mod firestore;
pub mod firestore_value;
pub mod memory;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Field map of a document
pub type Fields = Map<String, Value>;

/// Opaque document revision assigned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version(String);

impl Version {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored document and the revision it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
    pub version: Version,
}

/// Condition a write must satisfy to be applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// The document must not exist yet
    MustNotExist,
    /// The document must still be at this revision
    MatchesVersion(Version),
}

/// Sort direction for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Ordering clause for list queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Parameters of a collection listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl ListQuery {
    /// Newest-first listing on a field
    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            order_by: Some(OrderBy {
                field: field.into(),
                direction: Direction::Descending,
            }),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

/// Document database abstraction
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a single document, `None` when it does not exist
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// List documents of a collection
    async fn list(&self, collection: &str, query: &ListQuery) -> StoreResult<Vec<Document>>;

    /// Replace a document's fields if `precondition` holds
    ///
    /// Returns the document at its new revision, or [`StoreError::Conflict`].
    async fn write(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        precondition: Precondition,
    ) -> StoreResult<Document>;

    /// Backend name (for logging and health output)
    fn backend_name(&self) -> &'static str;
}

/// Shared handle to a document store
pub type SharedStore = Arc<dyn DocumentStore>;

/// Build the configured document store
pub fn create_store(config: &StoreConfig) -> StoreResult<SharedStore> {
    let store: SharedStore = match config.backend {
        StoreBackend::Memory => match &config.memory.seed_path {
            Some(path) => Arc::new(MemoryStore::from_seed_file(path)?),
            None => Arc::new(MemoryStore::new()),
        },
        StoreBackend::Firestore => Arc::new(FirestoreStore::new(&config.firestore)?),
    };

    info!(backend = store.backend_name(), "Document store ready");
    Ok(store)
}

/// Conflict error for a collection/id pair
pub(crate) fn conflict(collection: &str, id: &str) -> StoreError {
    StoreError::Conflict {
        collection: collection.to_string(),
        id: id.to_string(),
    }
}
