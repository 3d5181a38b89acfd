//! Firestore REST backend tests with mock server

use quota_gate::config::{CollectionsConfig, FirestoreConfig};
use quota_gate::content::{ContentRepository, ContentType, PreviewProjection};
use quota_gate::error::StoreError;
use quota_gate::quota::{DocumentUsageStore, UsageStore};
use quota_gate::store::{DocumentStore, FirestoreStore, ListQuery, Precondition, Version};
use quota_gate::util::SecretString;
use serde_json::{Map, json};
use std::sync::Arc;
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DOCS: &str = "/v1/projects/demo/databases/(default)/documents";

/// Helper to create a store pointing to mock server
fn create_test_store(mock_server: &MockServer, token: Option<&str>) -> FirestoreStore {
    let config = FirestoreConfig {
        url: mock_server.uri(),
        project_id: Some("demo".to_string()),
        access_token: token.map(SecretString::new),
        timeout_secs: 5,
        max_retries: 0, // No retries for tests
        ..Default::default()
    };
    FirestoreStore::new(&config).unwrap()
}

fn rest_document(collection: &str, id: &str, update_time: &str, fields: serde_json::Value) -> serde_json::Value {
    json!({
        "name": format!("projects/demo/databases/(default)/documents/{}/{}", collection, id),
        "fields": fields,
        "createTime": "2024-01-01T00:00:00.000000Z",
        "updateTime": update_time
    })
}

#[tokio::test]
async fn test_get_document_decodes_typed_fields() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{}/articles/a1", DOCS)))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rest_document(
            "articles",
            "a1",
            "2024-05-01T10:00:00.000001Z",
            json!({
                "title": {"stringValue": "Hello"},
                "publishedAt": {"timestampValue": "2024-03-01T10:00:00Z"},
                "wordCount": {"integerValue": "1200"}
            }),
        )))
        .mount(&mock_server)
        .await;

    let store = create_test_store(&mock_server, Some("test-token"));
    let doc = store.get("articles", "a1").await.unwrap().unwrap();

    assert_eq!(doc.id, "a1");
    assert_eq!(doc.fields["title"], "Hello");
    assert_eq!(doc.fields["publishedAt"], "2024-03-01T10:00:00Z");
    assert_eq!(doc.fields["wordCount"], 1200);
    assert_eq!(doc.version.as_str(), "2024-05-01T10:00:00.000001Z");
}

#[tokio::test]
async fn test_get_missing_document_is_none() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{}/usage/nobody", DOCS)))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": 404, "message": "Document not found", "status": "NOT_FOUND"}
        })))
        .mount(&mock_server)
        .await;

    let store = create_test_store(&mock_server, None);
    assert!(store.get("usage", "nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_runs_structured_query() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{}:runQuery", DOCS)))
        .and(body_partial_json(json!({
            "structuredQuery": {
                "from": [{"collectionId": "videos"}],
                "orderBy": [{"field": {"fieldPath": "publishedAt"}, "direction": "DESCENDING"}],
                "limit": 2
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"document": rest_document("videos", "v2", "2024-01-02T00:00:00Z", json!({"title": {"stringValue": "Two"}})), "readTime": "2024-06-01T00:00:00Z"},
            {"document": rest_document("videos", "v1", "2024-01-01T00:00:00Z", json!({"title": {"stringValue": "One"}})), "readTime": "2024-06-01T00:00:00Z"}
        ])))
        .mount(&mock_server)
        .await;

    let store = create_test_store(&mock_server, None);
    let docs = store
        .list("videos", &ListQuery::descending("publishedAt").with_limit(Some(2)))
        .await
        .unwrap();

    let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["v2", "v1"]);
}

#[tokio::test]
async fn test_list_empty_collection() {
    let mock_server = MockServer::start().await;

    // An empty result set is a single element without a document
    Mock::given(method("POST"))
        .and(path(format!("{}:runQuery", DOCS)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"readTime": "2024-06-01T00:00:00Z"}])),
        )
        .mount(&mock_server)
        .await;

    let store = create_test_store(&mock_server, None);
    let docs = store.list("articles", &ListQuery::default()).await.unwrap();
    assert!(docs.is_empty());
}

#[tokio::test]
async fn test_previews_include_undated_and_order_mixed_encodings() {
    let mock_server = MockServer::start().await;

    // Results arrive in Firestore's type-first native order. An orderBy
    // would drop the undated document, so none may be sent.
    Mock::given(method("POST"))
        .and(path(format!("{}:runQuery", DOCS)))
        .and(body_json(json!({
            "structuredQuery": {"from": [{"collectionId": "articles"}]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"document": rest_document("articles", "old", "2024-01-01T00:00:00Z", json!({
                "title": {"stringValue": "Old"},
                "publishedAt": {"stringValue": "2023-01-01T00:00:00Z"}
            }))},
            {"document": rest_document("articles", "undated", "2024-01-01T00:00:00Z", json!({
                "title": {"stringValue": "Undated"}
            }))},
            {"document": rest_document("articles", "newest", "2024-01-01T00:00:00Z", json!({
                "title": {"stringValue": "Newest"},
                "publishedAt": {"timestampValue": "2024-06-01T00:00:00Z"}
            }))},
            {"document": rest_document("articles", "middle", "2024-01-01T00:00:00Z", json!({
                "title": {"stringValue": "Middle"},
                "publishedAt": {"timestampValue": "2023-06-01T00:00:00Z"}
            }))}
        ])))
        .expect(2)
        .mount(&mock_server)
        .await;

    let store = Arc::new(create_test_store(&mock_server, None));
    let repository = ContentRepository::new(store, CollectionsConfig::default());

    let all = repository
        .list_previews(ContentType::Article, None)
        .await
        .unwrap();
    let ids: Vec<_> = all.iter().map(PreviewProjection::id).collect();
    assert_eq!(ids, vec!["newest", "middle", "old", "undated"]);

    let page = repository
        .list_previews(ContentType::Article, Some(2))
        .await
        .unwrap();
    let ids: Vec<_> = page.iter().map(PreviewProjection::id).collect();
    assert_eq!(ids, vec!["newest", "middle"]);
}

#[tokio::test]
async fn test_create_against_missing_database_is_not_conflict() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path(format!("{}/usage/u1", DOCS)))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": 404, "message": "The database (default) does not exist for project demo", "status": "NOT_FOUND"}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = Arc::new(create_test_store(&mock_server, None));
    let usage = DocumentUsageStore::new(store, "usage");
    let empty = quota_gate::quota::UsageRecord::empty("u1");

    let err = usage
        .record_access(&empty, ContentType::Article, "a1")
        .await
        .unwrap_err();

    assert!(!err.is_conflict());
    assert!(matches!(err, StoreError::Api { status: 404, .. }));
}

#[tokio::test]
async fn test_create_sends_exists_precondition() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path(format!("{}/usage/u1", DOCS)))
        .and(query_param("currentDocument.exists", "false"))
        .and(body_partial_json(json!({
            "fields": {"articles": {"mapValue": {"fields": {
                "ids": {"arrayValue": {"values": [{"stringValue": "a1"}]}}
            }}}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(rest_document(
            "usage",
            "u1",
            "2024-05-01T10:00:00Z",
            json!({
                "articles": {"mapValue": {"fields": {
                    "ids": {"arrayValue": {"values": [{"stringValue": "a1"}]}},
                    "count": {"integerValue": "1"}
                }}}
            }),
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = Arc::new(create_test_store(&mock_server, None));
    let usage = DocumentUsageStore::new(store, "usage");
    let empty = quota_gate::quota::UsageRecord::empty("u1");

    let record = usage
        .record_access(&empty, ContentType::Article, "a1")
        .await
        .unwrap();
    assert_eq!(record.count(ContentType::Article), 1);
    assert_eq!(
        record.revision(),
        Some(&Version::new("2024-05-01T10:00:00Z"))
    );
}

#[tokio::test]
async fn test_stale_update_time_is_conflict() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path(format!("{}/usage/u1", DOCS)))
        .and(query_param("currentDocument.updateTime", "2024-05-01T10:00:00Z"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": "the stored version does not match the required base version", "status": "FAILED_PRECONDITION"}
        })))
        .mount(&mock_server)
        .await;

    let store = create_test_store(&mock_server, None);
    let err = store
        .write(
            "usage",
            "u1",
            Map::new(),
            Precondition::MatchesVersion(Version::new("2024-05-01T10:00:00Z")),
        )
        .await
        .unwrap_err();

    assert!(err.is_conflict());
}

#[tokio::test]
async fn test_existing_document_conflicts_on_create() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path(format!("{}/usage/u1", DOCS)))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": {"code": 409, "message": "Document already exists", "status": "ALREADY_EXISTS"}
        })))
        .mount(&mock_server)
        .await;

    let store = create_test_store(&mock_server, None);
    let err = store
        .write("usage", "u1", Map::new(), Precondition::MustNotExist)
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Conflict { .. }));
}

#[tokio::test]
async fn test_permission_denied_is_api_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{}/users/u1", DOCS)))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": 403, "message": "Missing or insufficient permissions.", "status": "PERMISSION_DENIED"}
        })))
        .mount(&mock_server)
        .await;

    let store = create_test_store(&mock_server, Some("expired"));
    let err = store.get("users", "u1").await.unwrap_err();

    match err {
        StoreError::Api { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "Missing or insufficient permissions.");
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_reads_retry_server_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{}/articles/a1", DOCS)))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{}/articles/a1", DOCS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(rest_document(
            "articles",
            "a1",
            "2024-05-01T10:00:00Z",
            json!({"title": {"stringValue": "Hello"}}),
        )))
        .mount(&mock_server)
        .await;

    let config = FirestoreConfig {
        url: mock_server.uri(),
        project_id: Some("demo".to_string()),
        timeout_secs: 5,
        max_retries: 2,
        ..Default::default()
    };
    let store = FirestoreStore::new(&config).unwrap();

    let doc = store.get("articles", "a1").await.unwrap().unwrap();
    assert_eq!(doc.fields["title"], "Hello");
}

#[tokio::test]
async fn test_store_without_project_fails() {
    let config = FirestoreConfig::default();
    assert!(FirestoreStore::new(&config).is_err());
}
