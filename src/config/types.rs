//! Configuration types for quota-gate
//!
//! This module defines the configuration structure that can be loaded from
//! TOML files and/or environment variables.

use crate::content::ContentType;
use crate::util::SecretString;
use serde::Deserialize;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Document store settings
    pub store: StoreConfig,

    /// Caller identity settings
    pub auth: AuthConfig,

    /// Quota engine tuning
    pub quota: QuotaConfig,

    /// Content listing settings
    pub content: ContentConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,

    /// Bind port
    pub port: u16,

    /// Service name reported by `/health`
    pub name: String,

    /// Allowed CORS origins; empty disables the CORS layer
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
            name: "quota-gate".to_string(),
            cors_origins: Vec::new(),
        }
    }
}

/// Document store configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Which backend to use
    pub backend: StoreBackend,

    /// In-memory backend settings
    pub memory: MemoryStoreConfig,

    /// Firestore backend settings
    pub firestore: FirestoreConfig,

    /// Collection names
    pub collections: CollectionsConfig,
}

/// Document store backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process store (default, for development and tests)
    #[default]
    Memory,
    /// Firestore REST API or emulator
    Firestore,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "firestore" => Ok(StoreBackend::Firestore),
            other => Err(format!(
                "unknown store backend '{}', expected 'memory' or 'firestore'",
                other
            )),
        }
    }
}

/// In-memory store configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MemoryStoreConfig {
    /// JSON file of `{collection: {id: fields}}` loaded at startup
    pub seed_path: Option<PathBuf>,
}

/// Firestore connection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FirestoreConfig {
    /// API root (e.g., `https://firestore.googleapis.com` or the emulator)
    pub url: String,

    /// Google Cloud project id (prefer env var GOOGLE_CLOUD_PROJECT)
    pub project_id: Option<String>,

    /// Database id
    pub database: String,

    /// OAuth access token; not needed against the emulator
    pub access_token: Option<SecretString>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum retries for failed reads
    pub max_retries: u32,
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            url: "https://firestore.googleapis.com".to_string(),
            project_id: None,
            database: "(default)".to_string(),
            access_token: None,
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

impl FirestoreConfig {
    /// Base URL of the documents resource, if a project is configured
    pub fn documents_url(&self) -> Option<String> {
        let project = self.project_id.as_deref().filter(|p| !p.is_empty())?;
        Some(format!(
            "{}/v1/projects/{}/databases/{}/documents",
            self.url.trim_end_matches('/'),
            project,
            self.database
        ))
    }
}

/// Collection names
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectionsConfig {
    pub users: String,
    pub usage: String,
    pub articles: String,
    pub videos: String,
}

impl Default for CollectionsConfig {
    fn default() -> Self {
        Self {
            users: "users".to_string(),
            usage: "usage".to_string(),
            articles: ContentType::Article.plural().to_string(),
            videos: ContentType::Video.plural().to_string(),
        }
    }
}

impl CollectionsConfig {
    /// Collection holding a content type's documents
    pub fn for_content(&self, content_type: ContentType) -> &str {
        match content_type {
            ContentType::Article => &self.articles,
            ContentType::Video => &self.videos,
        }
    }
}

/// Caller identity configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Header carrying the authenticated user id, set by the upstream proxy
    pub user_id_header: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            user_id_header: "x-user-id".to_string(),
        }
    }
}

/// Quota engine tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    /// Attempts at committing a usage change before giving up
    pub max_commit_attempts: u32,

    /// Base delay between attempts in milliseconds (jittered)
    pub retry_base_delay_ms: u64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            max_commit_attempts: 5,
            retry_base_delay_ms: 20,
        }
    }
}

/// Content listing configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Page size when the request does not name one
    pub default_page_size: usize,

    /// Largest page size a request may ask for
    pub max_page_size: usize,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Output format (pretty, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Pretty,
    /// JSON structured output
    Json,
}
