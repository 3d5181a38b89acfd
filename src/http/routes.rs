//! HTTP routes
//!
//! | Route | Auth |
//! |---|---|
//! | `GET /health` | no |
//! | `GET /api/tiers` | no |
//! | `GET /api/stats` | no |
//! | `GET /api/usage` | yes |
//! | `GET /api/articles`, `GET /api/videos` | yes |
//! | `GET /api/articles/{id}`, `GET /api/videos/{id}` | yes |
//!
//! Successful responses use `{ data, usage?, accessedIds? }`; failures go
//! through [`ServiceError`]'s `IntoResponse`.

use crate::content::{ContentType, FullProjection, PreviewProjection};
use crate::error::{ServiceError, ServiceResult};
use crate::http::{AppState, AuthenticatedUser};
use crate::metrics::MetricsSnapshot;
use crate::quota::{TierSummary, UsageSummary, tier_table};
use crate::service::UsageOverview;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Success envelope
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataEnvelope<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accessed_ids: Option<Vec<String>>,
}

impl<T> DataEnvelope<T> {
    fn new(data: T) -> Self {
        Self {
            data,
            usage: None,
            accessed_ids: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    name: String,
    version: &'static str,
    backend: &'static str,
}

/// Build the application router
pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/api/tiers", get(tiers))
        .route("/api/stats", get(stats))
        .route("/api/usage", get(usage))
        .route("/api/articles", get(list_articles))
        .route("/api/articles/{id}", get(get_article))
        .route("/api/videos", get(list_videos))
        .route("/api/videos/{id}", get(get_video))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = cors_layer(cors_origins) {
        app = app.layer(cors);
    }

    app
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }

    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(origin, error = %e, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET])
            .allow_headers(Any),
    )
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        name: state.name.to_string(),
        version: env!("CARGO_PKG_VERSION"),
        backend: state.backend,
    })
}

async fn tiers() -> Json<DataEnvelope<Vec<TierSummary>>> {
    Json(DataEnvelope::new(tier_table()))
}

async fn stats(State(state): State<AppState>) -> Json<DataEnvelope<MetricsSnapshot>> {
    Json(DataEnvelope::new(state.metrics.snapshot()))
}

async fn usage(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> ServiceResult<Json<DataEnvelope<UsageOverview>>> {
    let overview = state.service.usage_overview(&user).await?;
    Ok(Json(DataEnvelope::new(overview)))
}

async fn list_articles(
    state: State<AppState>,
    user: AuthenticatedUser,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ServiceResult<Json<DataEnvelope<Vec<PreviewProjection>>>> {
    list_catalog(state, user, params, ContentType::Article).await
}

async fn list_videos(
    state: State<AppState>,
    user: AuthenticatedUser,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ServiceResult<Json<DataEnvelope<Vec<PreviewProjection>>>> {
    list_catalog(state, user, params, ContentType::Video).await
}

async fn get_article(
    state: State<AppState>,
    user: AuthenticatedUser,
    id: Path<String>,
) -> ServiceResult<Json<DataEnvelope<FullProjection>>> {
    open_item(state, user, id, ContentType::Article).await
}

async fn get_video(
    state: State<AppState>,
    user: AuthenticatedUser,
    id: Path<String>,
) -> ServiceResult<Json<DataEnvelope<FullProjection>>> {
    open_item(state, user, id, ContentType::Video).await
}

async fn list_catalog(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    params: Result<Query<ListParams>, QueryRejection>,
    content_type: ContentType,
) -> ServiceResult<Json<DataEnvelope<Vec<PreviewProjection>>>> {
    let Query(params) = params.map_err(|e| ServiceError::Validation(e.body_text()))?;
    let listing = state
        .service
        .list_with_usage(&user, content_type, params.limit)
        .await?;

    Ok(Json(DataEnvelope {
        data: listing.items,
        usage: Some(listing.usage),
        accessed_ids: Some(listing.accessed_ids),
    }))
}

async fn open_item(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<String>,
    content_type: ContentType,
) -> ServiceResult<Json<DataEnvelope<FullProjection>>> {
    let opened = state.service.get_one(&user, content_type, &id).await?;

    Ok(Json(DataEnvelope {
        data: opened.item,
        usage: Some(opened.usage),
        accessed_ids: None,
    }))
}
