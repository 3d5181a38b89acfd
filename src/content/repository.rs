//! Content repository
//!
//! Reads content documents and projects them. Redaction happens here: list
//! reads deserialize into preview types that have no protected field, so
//! callers never see `content` or `videoUrl` through a list path.

use crate::config::CollectionsConfig;
use crate::content::types::{
    Article, ArticlePreview, ContentType, FullProjection, PreviewProjection, Video, VideoPreview,
};
use crate::error::{StoreError, StoreResult};
use crate::store::{Document, ListQuery, SharedStore};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::cmp::Reverse;
use tracing::{debug, instrument, warn};

/// Read-only access to the article and video catalogs
#[derive(Clone)]
pub struct ContentRepository {
    store: SharedStore,
    collections: CollectionsConfig,
}

impl ContentRepository {
    pub fn new(store: SharedStore, collections: CollectionsConfig) -> Self {
        Self { store, collections }
    }

    /// Newest-first previews of a catalog
    ///
    /// The whole collection is read and ordered here on the normalized
    /// `publishedAt`, so undated items are listed last and `limit` cuts the
    /// chronological order rather than a backend's native one.
    #[instrument(skip(self))]
    pub async fn list_previews(
        &self,
        content_type: ContentType,
        limit: Option<usize>,
    ) -> StoreResult<Vec<PreviewProjection>> {
        let collection = self.collections.for_content(content_type);
        let documents = self.store.list(collection, &ListQuery::default()).await?;

        let mut previews = documents
            .into_iter()
            .map(|doc| match content_type {
                ContentType::Article => {
                    project::<ArticlePreview>(collection, doc).map(PreviewProjection::Article)
                }
                ContentType::Video => {
                    project::<VideoPreview>(collection, doc).map(PreviewProjection::Video)
                }
            })
            .collect::<StoreResult<Vec<_>>>()?;

        // Stable: equal dates keep the store's id order
        previews.sort_by_key(|p| Reverse(p.published_at()));
        if let Some(limit) = limit {
            previews.truncate(limit);
        }

        debug!(%content_type, count = previews.len(), "Listed previews");
        Ok(previews)
    }

    /// Full projection of one item, `None` if no document backs the id
    #[instrument(skip(self))]
    pub async fn get_full(
        &self,
        content_type: ContentType,
        id: &str,
    ) -> StoreResult<Option<FullProjection>> {
        let collection = self.collections.for_content(content_type);
        let Some(doc) = self.store.get(collection, id).await? else {
            return Ok(None);
        };

        let projection = match content_type {
            ContentType::Article => FullProjection::Article(project(collection, doc)?),
            ContentType::Video => FullProjection::Video(project(collection, doc)?),
        };
        Ok(Some(projection))
    }
}

/// Projections whose identity comes from the document key, not its fields
trait Keyed {
    fn set_id(&mut self, id: String);
}

impl Keyed for ArticlePreview {
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl Keyed for VideoPreview {
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl Keyed for Article {
    fn set_id(&mut self, id: String) {
        self.summary.id = id;
    }
}

impl Keyed for Video {
    fn set_id(&mut self, id: String) {
        self.summary.id = id;
    }
}

fn project<T: DeserializeOwned + Keyed>(collection: &str, doc: Document) -> StoreResult<T> {
    let Document { id, fields, .. } = doc;
    let mut projection: T = serde_json::from_value(Value::Object(fields)).map_err(|e| {
        warn!(collection, id = %id, error = %e, "Malformed content document");
        StoreError::malformed(collection, &id, e.to_string())
    })?;
    projection.set_id(id);
    Ok(projection)
}
