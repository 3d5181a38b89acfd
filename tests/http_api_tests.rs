//! HTTP API tests
//!
//! Exercise the axum router end to end with `tower::ServiceExt::oneshot`.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use quota_gate::config::AppConfig;
use quota_gate::http::{AppState, router};
use quota_gate::store::{MemoryStore, SharedStore};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

fn seeded_store() -> SharedStore {
    let store = MemoryStore::from_seed(&json!({
        "users": {
            "basic": { "membershipType": "A", "displayName": "Basic Reader" },
            "premium": { "membershipType": "C" },
            "skewed": { "membershipType": "Z" }
        },
        "articles": {
            "a1": { "title": "One", "preview": "p1", "content": "body 1", "publishedAt": "2024-01-01T00:00:00Z" },
            "a2": { "title": "Two", "preview": "p2", "content": "body 2", "publishedAt": "2024-01-02T00:00:00Z" },
            "a3": { "title": "Three", "preview": "p3", "content": "body 3", "publishedAt": "2024-01-03T00:00:00Z" },
            "a4": { "title": "Four", "preview": "p4", "content": "body 4", "publishedAt": "2024-01-04T00:00:00Z" }
        },
        "videos": {
            "v1": { "title": "Clip", "description": "d", "videoUrl": "https://cdn.example.com/v1.mp4" }
        }
    }))
    .unwrap();
    Arc::new(store)
}

fn app() -> Router {
    let config = AppConfig::default();
    let state = AppState::from_config(&config, seeded_store()).unwrap();
    router(state, &config.server.cors_origins)
}

async fn get(app: &Router, uri: &str, user: Option<&str>) -> (StatusCode, Value) {
    let mut request = Request::builder().uri(uri);
    if let Some(user) = user {
        request = request.header("x-user-id", user);
    }
    let response = app
        .clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = get(&app, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["backend"], "memory");
    assert_eq!(body["name"], "quota-gate");
}

#[tokio::test]
async fn test_tier_table() {
    let app = app();
    let (status, body) = get(&app, "/api/tiers", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!([
            { "tier": "A", "label": "Basic", "articles": 3, "videos": 3 },
            { "tier": "B", "label": "Standard", "articles": 10, "videos": 10 },
            { "tier": "C", "label": "Premium", "articles": "unlimited", "videos": "unlimited" }
        ])
    );
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let app = app();

    let (status, body) = get(&app, "/api/articles", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, body) = get(&app, "/api/articles/a1", Some("stranger")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_unknown_tier_is_internal_error() {
    let app = app();
    let (status, body) = get(&app, "/api/usage", Some("skewed")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "UNKNOWN_ERROR");
}

#[tokio::test]
async fn test_list_shape() {
    let app = app();
    let (status, body) = get(&app, "/api/articles?limit=2", Some("basic")).await;

    assert_eq!(status, StatusCode::OK);
    let items = body["data"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"], "a4");
    assert!(items[0].get("content").is_none());
    assert_eq!(body["accessedIds"], json!([]));
    assert_eq!(
        body["usage"],
        json!({ "count": 0, "limit": 3, "remaining": 3 })
    );
}

#[tokio::test]
async fn test_bad_limit_is_validation_error() {
    let app = app();

    let (status, body) = get(&app, "/api/videos?limit=abc", Some("basic")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = get(&app, "/api/videos?limit=0", Some("basic")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_open_until_quota_exceeded() {
    let app = app();

    for (n, id) in ["a1", "a2", "a3"].into_iter().enumerate() {
        let (status, body) = get(&app, &format!("/api/articles/{}", id), Some("basic")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], id);
        assert!(body["data"]["content"].is_string());
        assert_eq!(body["usage"]["count"], n + 1);
    }

    let (status, body) = get(&app, "/api/articles/a4", Some("basic")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "QUOTA_EXCEEDED");
    assert_eq!(
        body["error"]["details"],
        json!({ "currentUsage": 3, "limit": 3, "membershipType": "A" })
    );

    // Replay stays allowed
    let (status, body) = get(&app, "/api/articles/a1", Some("basic")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["usage"]["count"], 3);
    assert_eq!(body["usage"]["remaining"], 0);

    let (_, stats) = get(&app, "/api/stats", None).await;
    assert_eq!(stats["data"]["granted"], 3);
    assert_eq!(stats["data"]["denied"], 1);
    assert_eq!(stats["data"]["replayed"], 1);
}

#[tokio::test]
async fn test_missing_video_is_not_found() {
    let app = app();
    let (status, body) = get(&app, "/api/videos/v404", Some("premium")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    assert_eq!(body["error"]["details"]["contentType"], "video");
    assert_eq!(body["error"]["details"]["id"], "v404");
}

#[tokio::test]
async fn test_missing_article_consumes_slot() {
    let app = app();
    let (status, _) = get(&app, "/api/articles/missing", Some("basic")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = get(&app, "/api/usage", Some("basic")).await;
    assert_eq!(body["data"]["articles"]["count"], 1);
    assert_eq!(body["data"]["articles"]["remaining"], 2);
    assert_eq!(body["data"]["articles"]["accessedIds"], json!(["missing"]));
}

#[tokio::test]
async fn test_invalid_content_id() {
    let app = app();
    let (status, body) = get(&app, "/api/videos/bad%20id", Some("premium")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_usage_overview() {
    let app = app();
    get(&app, "/api/videos/v1", Some("premium")).await;

    let (status, body) = get(&app, "/api/usage", Some("premium")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["membershipType"], "C");
    assert_eq!(body["data"]["videos"]["count"], 1);
    assert_eq!(body["data"]["videos"]["remaining"], "unlimited");
    assert_eq!(body["data"]["videos"]["accessedIds"], json!(["v1"]));
    assert_eq!(body["data"]["articles"]["count"], 0);
}
