//! Configuration loader with layered sources
//!
//! Loads configuration from multiple sources with the following precedence
//! (highest to lowest):
//! 1. Conventional Google Cloud variables (FIRESTORE_EMULATOR_HOST, GOOGLE_CLOUD_PROJECT)
//! 2. Environment variables (QUOTA_GATE_*)
//! 3. Configuration file (TOML)
//! 4. Default values

use crate::config::types::{AppConfig, StoreBackend};
use crate::error::ConfigError;
use config::{Config, Environment, File, FileFormat};
use std::path::Path;
use tracing::debug;

/// Default configuration file paths to check (in order)
const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "quota-gate.toml",
    ".quota-gate.toml",
    "~/.config/quota-gate/config.toml",
    "/etc/quota-gate/config.toml",
];

/// Load configuration from a TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from_str(toml_str, FileFormat::Toml))
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Load configuration from files and environment
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    if let Some(path) = config_path {
        // Explicit path provided - must exist
        if !Path::new(path).exists() {
            return Err(ConfigError::Load(format!(
                "Configuration file not found: {}",
                path
            )));
        }
        builder = builder.add_source(File::new(path, FileFormat::Toml));
    } else {
        // Try default paths (first existing one wins)
        for path in DEFAULT_CONFIG_PATHS {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                debug!(path = %expanded, "Using configuration file");
                builder = builder.add_source(File::new(&expanded, FileFormat::Toml));
                break;
            }
        }
    }

    // e.g., QUOTA_GATE_SERVER__PORT, QUOTA_GATE_STORE__FIRESTORE__PROJECT_ID
    builder = builder.add_source(
        Environment::with_prefix("QUOTA_GATE")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    if let Ok(project) = std::env::var("GOOGLE_CLOUD_PROJECT") {
        builder = builder
            .set_override("store.firestore.project_id", project)
            .map_err(|e| ConfigError::Load(e.to_string()))?;
    }

    let config = builder
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let mut app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    // The emulator accepts unauthenticated plain-HTTP traffic
    if let Ok(host) = std::env::var("FIRESTORE_EMULATOR_HOST")
        && !host.is_empty()
    {
        app_config.store.firestore.url = format!("http://{}", host);
        app_config.store.firestore.access_token = None;
    }

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::Invalid {
            message: "server.port must be greater than 0".to_string(),
        });
    }

    if config.store.backend == StoreBackend::Firestore {
        let firestore = &config.store.firestore;

        if firestore.project_id.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::Missing {
                field: "store.firestore.project_id (set GOOGLE_CLOUD_PROJECT environment variable)"
                    .to_string(),
            });
        }

        if !firestore.url.starts_with("http://") && !firestore.url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                message: format!(
                    "store.firestore.url must start with http:// or https://, got: {}",
                    firestore.url
                ),
            });
        }

        if firestore.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                message: "store.firestore.timeout_secs must be greater than 0".to_string(),
            });
        }
    }

    let collections = &config.store.collections;
    for (field, name) in [
        ("users", &collections.users),
        ("usage", &collections.usage),
        ("articles", &collections.articles),
        ("videos", &collections.videos),
    ] {
        if name.is_empty() || name.contains('/') {
            return Err(ConfigError::Invalid {
                message: format!(
                    "store.collections.{} must be a non-empty name without '/', got: '{}'",
                    field, name
                ),
            });
        }
    }

    if config.auth.user_id_header.trim().is_empty() {
        return Err(ConfigError::Missing {
            field: "auth.user_id_header".to_string(),
        });
    }

    if config.quota.max_commit_attempts == 0 {
        return Err(ConfigError::Invalid {
            message: "quota.max_commit_attempts must be greater than 0".to_string(),
        });
    }

    let content = &config.content;
    if content.max_page_size == 0 {
        return Err(ConfigError::Invalid {
            message: "content.max_page_size must be greater than 0".to_string(),
        });
    }
    if content.default_page_size == 0 || content.default_page_size > content.max_page_size {
        return Err(ConfigError::Invalid {
            message: format!(
                "content.default_page_size must be between 1 and {}, got: {}",
                content.max_page_size, content.default_page_size
            ),
        });
    }

    Ok(())
}
