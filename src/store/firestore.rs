//! Firestore REST backend
//!
//! Talks to the Firestore v1 REST API (or the local emulator). Conditional
//! writes use Firestore's native `currentDocument.exists` and
//! `currentDocument.updateTime` preconditions; the document's `updateTime` is
//! its [`Version`].

use crate::config::FirestoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::store::firestore_value::{decode_fields, encode_fields};
use crate::store::{
    Direction, Document, DocumentStore, Fields, ListQuery, Precondition, Version, conflict,
};
use crate::util::{SecretString, backoff_delay};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const RETRY_BASE_DELAY: Duration = Duration::from_millis(100);

/// Firestore REST document store
pub struct FirestoreStore {
    http: Client,
    documents_url: String,
    token: Option<SecretString>,
    max_retries: u32,
}

/// Document resource as returned by the REST API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
    update_time: String,
}

/// One element of a `runQuery` response stream
#[derive(Debug, Deserialize)]
struct RunQueryItem {
    document: Option<RestDocument>,
}

/// Error payload of a failed REST call
#[derive(Debug, Deserialize)]
struct RestErrorBody {
    error: RestError,
}

#[derive(Debug, Deserialize)]
struct RestError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

impl FirestoreStore {
    /// Create a new Firestore store from configuration
    pub fn new(config: &FirestoreConfig) -> StoreResult<Self> {
        let documents_url = config.documents_url().ok_or_else(|| {
            StoreError::Unavailable("store.firestore.project_id is not configured".into())
        })?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(format!("quota-gate/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(StoreError::Request)?;

        Ok(Self {
            http,
            documents_url,
            token: config.access_token.clone(),
            max_retries: config.max_retries,
        })
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.documents_url,
            urlencoding::encode(collection),
            urlencoding::encode(id)
        )
    }

    fn authenticate(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    /// Send a read request, retrying connection failures and 5xx responses
    async fn send_read(&self, request: RequestBuilder) -> StoreResult<Response> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(backoff_delay(RETRY_BASE_DELAY, attempt)).await;
                debug!("Retrying read (attempt {})", attempt + 1);
            }

            let req = request
                .try_clone()
                .ok_or_else(|| StoreError::InvalidResponse("Cannot clone request".to_string()))?;

            let result = match req.send().await {
                Ok(response) => self.check_status(response).await,
                Err(e) => Err(StoreError::Request(e)),
            };

            match result {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() => {
                    warn!(error = %e, "Firestore read failed");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| StoreError::Unavailable("no attempts made".into())))
    }

    /// Turn non-success responses into errors; 404 passes through to callers
    async fn check_status(&self, response: Response) -> StoreResult<Response> {
        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(api_error(status, &body))
    }

    fn to_document(&self, rest: RestDocument, collection: &str) -> StoreResult<Document> {
        let id = rest
            .name
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        let fields = decode_fields(&rest.fields)
            .map_err(|reason| StoreError::malformed(collection, &id, reason))?;
        Ok(Document {
            id,
            fields,
            version: Version::new(rest.update_time),
        })
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    #[instrument(skip(self))]
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let request = self.authenticate(self.http.get(self.document_url(collection, id)));
        let response = self.send_read(request).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let rest: RestDocument = response.json().await.map_err(|e| {
            StoreError::InvalidResponse(format!("Failed to parse document: {}", e))
        })?;
        self.to_document(rest, collection).map(Some)
    }

    #[instrument(skip(self))]
    async fn list(&self, collection: &str, query: &ListQuery) -> StoreResult<Vec<Document>> {
        let mut structured = json!({ "from": [{ "collectionId": collection }] });
        if let Some(order) = &query.order_by {
            let direction = match order.direction {
                Direction::Ascending => "ASCENDING",
                Direction::Descending => "DESCENDING",
            };
            structured["orderBy"] = json!([{
                "field": { "fieldPath": order.field },
                "direction": direction,
            }]);
        }
        if let Some(limit) = query.limit {
            structured["limit"] = json!(limit);
        }

        let url = format!("{}:runQuery", self.documents_url);
        let request = self
            .authenticate(self.http.post(url))
            .json(&json!({ "structuredQuery": structured }));
        let response = self.send_read(request).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        let items: Vec<RunQueryItem> = response.json().await.map_err(|e| {
            StoreError::InvalidResponse(format!("Failed to parse query results: {}", e))
        })?;

        items
            .into_iter()
            .filter_map(|item| item.document)
            .map(|rest| self.to_document(rest, collection))
            .collect()
    }

    #[instrument(skip(self, fields))]
    async fn write(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        precondition: Precondition,
    ) -> StoreResult<Document> {
        let condition = match &precondition {
            Precondition::MustNotExist => ("currentDocument.exists", "false".to_string()),
            Precondition::MatchesVersion(version) => {
                ("currentDocument.updateTime", version.as_str().to_string())
            }
        };

        let request = self
            .authenticate(self.http.patch(self.document_url(collection, id)))
            .query(&[condition])
            .json(&json!({ "fields": encode_fields(&fields) }));

        // Writes are sent once; a lost response surfaces as an error and the
        // caller re-reads before deciding again.
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if is_precondition_failure(&precondition, status, &body) {
                debug!(collection, id, "Precondition failed");
                return Err(conflict(collection, id));
            }
            return Err(api_error(status, &body));
        }

        let rest: RestDocument = response.json().await.map_err(|e| {
            StoreError::InvalidResponse(format!("Failed to parse written document: {}", e))
        })?;
        self.to_document(rest, collection)
    }

    fn backend_name(&self) -> &'static str {
        "firestore"
    }
}

fn rest_status(body: &str) -> Option<RestError> {
    serde_json::from_str::<RestErrorBody>(body)
        .ok()
        .map(|b| b.error)
}

/// Whether a failed write lost its precondition
///
/// A document deleted between read and write fails an `updateTime`
/// precondition with 404. A create never expects the document, so a 404 there
/// means a wrong project or database and stays an API error.
fn is_precondition_failure(precondition: &Precondition, status: StatusCode, body: &str) -> bool {
    if status == StatusCode::CONFLICT || status == StatusCode::PRECONDITION_FAILED {
        return true;
    }
    if status == StatusCode::NOT_FOUND {
        return matches!(precondition, Precondition::MatchesVersion(_));
    }
    rest_status(body).is_some_and(|err| {
        matches!(
            err.status.as_str(),
            "FAILED_PRECONDITION" | "ALREADY_EXISTS" | "ABORTED"
        )
    })
}

fn api_error(status: StatusCode, body: &str) -> StoreError {
    let message = match rest_status(body) {
        Some(err) if !err.message.is_empty() => err.message,
        _ if body.is_empty() => format!("HTTP {}", status.as_u16()),
        _ => body.to_string(),
    };
    StoreError::Api {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_failure_detection() {
        let create = Precondition::MustNotExist;
        let update = Precondition::MatchesVersion(Version::new("2024-05-01T10:00:00Z"));

        assert!(is_precondition_failure(&create, StatusCode::CONFLICT, ""));
        assert!(is_precondition_failure(
            &update,
            StatusCode::BAD_REQUEST,
            r#"{"error":{"code":400,"message":"update time mismatch","status":"FAILED_PRECONDITION"}}"#
        ));
        assert!(!is_precondition_failure(
            &update,
            StatusCode::BAD_REQUEST,
            r#"{"error":{"code":400,"message":"bad field","status":"INVALID_ARGUMENT"}}"#
        ));
        assert!(!is_precondition_failure(&update, StatusCode::INTERNAL_SERVER_ERROR, ""));
    }

    #[test]
    fn test_not_found_is_conflict_only_for_updates() {
        let update = Precondition::MatchesVersion(Version::new("2024-05-01T10:00:00Z"));
        assert!(is_precondition_failure(&update, StatusCode::NOT_FOUND, ""));
        assert!(!is_precondition_failure(
            &Precondition::MustNotExist,
            StatusCode::NOT_FOUND,
            ""
        ));
    }

    #[test]
    fn test_api_error_uses_rest_message() {
        let err = api_error(
            StatusCode::FORBIDDEN,
            r#"{"error":{"code":403,"message":"Missing permissions","status":"PERMISSION_DENIED"}}"#,
        );
        assert!(matches!(err, StoreError::Api { status: 403, ref message } if message == "Missing permissions"));

        let err = api_error(StatusCode::BAD_GATEWAY, "");
        assert!(matches!(err, StoreError::Api { status: 502, .. }));
        assert!(err.is_transient());
    }
}
