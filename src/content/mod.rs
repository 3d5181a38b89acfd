//! Content module
//!
//! The article and video catalogs: content types, preview and full
//! projections, timestamp normalization and the repository that reads them.

pub mod repository;
pub mod timestamp;
pub mod types;

pub use repository::ContentRepository;
pub use types::{
    Article, ArticlePreview, ContentType, FullProjection, PreviewProjection, Video, VideoPreview,
};
