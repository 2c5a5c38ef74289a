//! Cloud Firestore REST client.
//!
//! - Reads: `GET .../documents/{collection}/{id}`
//! - Writes: `POST .../documents:commit` with one write; server timestamps
//!   go in `updateTransforms`, partial updates carry an `updateMask` and an
//!   `exists: true` precondition
//! - Queries: `POST .../documents:runQuery` with a `structuredQuery`

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, instrument};
use url::Url;

use super::value::{decode_fields, encode_fields, encode_value};
use crate::backend::{
    Direction, Document, DocumentError, DocumentErrorKind, DocumentPath, DocumentStore,
    DocumentWrite, IdToken, Query,
};

/// Client for the Firestore v1 REST API.
#[derive(Clone)]
pub struct FirestoreClient {
    inner: Arc<FirestoreClientInner>,
}

struct FirestoreClientInner {
    client: reqwest::Client,
    /// Base URL ending in `/`, e.g. `https://firestore.googleapis.com/v1/`.
    base_url: String,
    /// `projects/{project}/databases/{database}/documents`
    documents_root: String,
    api_key: SecretString,
}

/// A document as returned by `GET` and `runQuery`.
#[derive(Debug, Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RunQueryEntry {
    document: Option<RawDocument>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Whether a write replaces the document or patches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Set,
    Update,
}

impl FirestoreClient {
    /// Create a client for one project database.
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        project_id: &str,
        database_id: &str,
        api_key: SecretString,
    ) -> Self {
        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            inner: Arc::new(FirestoreClientInner {
                client,
                base_url,
                documents_root: format!("projects/{project_id}/databases/{database_id}/documents"),
                api_key,
            }),
        }
    }

    /// Full resource name of a document.
    fn resource_name(&self, path: &DocumentPath) -> String {
        format!(
            "{}/{}/{}",
            self.inner.documents_root,
            path.collection(),
            path.id()
        )
    }

    /// URL of a document, with the collection and ID percent-encoded as
    /// single path segments.
    fn document_url(&self, path: &DocumentPath) -> Result<Url, DocumentError> {
        let mut url = Url::parse(&self.inner.base_url).map_err(|e| {
            DocumentError::new(
                DocumentErrorKind::Other,
                format!("invalid Firestore base URL: {e}"),
            )
        })?;
        url.path_segments_mut()
            .map_err(|()| {
                DocumentError::new(
                    DocumentErrorKind::Other,
                    "Firestore base URL cannot carry a path",
                )
            })?
            .pop_if_empty()
            .extend(self.inner.documents_root.split('/'))
            .push(path.collection())
            .push(path.id());
        Ok(url)
    }

    fn request(
        &self,
        method: reqwest::Method,
        url: impl reqwest::IntoUrl,
        auth: Option<&IdToken>,
    ) -> reqwest::RequestBuilder {
        let builder = self
            .inner
            .client
            .request(method, url)
            .query(&[("key", self.inner.api_key.expose_secret())]);
        match auth {
            Some(token) => builder.bearer_auth(token.expose()),
            None => builder,
        }
    }

    /// Send a request and return the body of a successful response.
    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<String, DocumentError> {
        let response = builder.send().await?;
        let status = response.status();
        let response_text = response.text().await?;

        if status.is_success() {
            return Ok(response_text);
        }

        Err(parse_error(status, &response_text))
    }

    async fn commit(
        &self,
        auth: Option<&IdToken>,
        path: &DocumentPath,
        write: &DocumentWrite,
        mode: WriteMode,
    ) -> Result<(), DocumentError> {
        if !path.is_addressable() {
            return Err(match mode {
                WriteMode::Set => DocumentError::invalid_path(path),
                WriteMode::Update => DocumentError::new(
                    DocumentErrorKind::NotFound,
                    format!("No document to update: {path}"),
                ),
            });
        }

        let url = format!(
            "{}{}:commit",
            self.inner.base_url, self.inner.documents_root
        );
        let body = json!({ "writes": [commit_write(&self.resource_name(path), write, mode)] });

        self.send(self.request(reqwest::Method::POST, &url, auth).json(&body))
            .await?;
        Ok(())
    }

    fn decode_raw(&self, raw: RawDocument) -> Result<Document, DocumentError> {
        let relative = raw
            .name
            .strip_prefix(&self.inner.documents_root)
            .map(|rest| rest.trim_start_matches('/'))
            .unwrap_or(raw.name.as_str());
        let (collection, id) = relative.rsplit_once('/').ok_or_else(|| {
            DocumentError::new(
                DocumentErrorKind::Decode,
                format!("unexpected document name: {}", raw.name),
            )
        })?;

        Ok(Document {
            path: DocumentPath::new(collection, id),
            fields: decode_fields(&raw.fields)?,
        })
    }
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    #[instrument(skip(self, auth), fields(path = %path))]
    async fn get(
        &self,
        auth: Option<&IdToken>,
        path: &DocumentPath,
    ) -> Result<Option<Document>, DocumentError> {
        if !path.is_addressable() {
            debug!("Document ID does not address a document");
            return Ok(None);
        }
        let url = self.document_url(path)?;

        match self.send(self.request(reqwest::Method::GET, url, auth)).await {
            Ok(body) => {
                let raw: RawDocument = serde_json::from_str(&body)
                    .map_err(|e| DocumentError::decode(path, &e))?;
                self.decode_raw(raw).map(Some)
            }
            Err(err) if err.kind == DocumentErrorKind::NotFound => {
                debug!("Document does not exist");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    #[instrument(skip(self, auth, write), fields(path = %path))]
    async fn set(
        &self,
        auth: Option<&IdToken>,
        path: &DocumentPath,
        write: &DocumentWrite,
    ) -> Result<(), DocumentError> {
        self.commit(auth, path, write, WriteMode::Set).await
    }

    #[instrument(skip(self, auth, write), fields(path = %path))]
    async fn update(
        &self,
        auth: Option<&IdToken>,
        path: &DocumentPath,
        write: &DocumentWrite,
    ) -> Result<(), DocumentError> {
        self.commit(auth, path, write, WriteMode::Update).await
    }

    #[instrument(skip(self, auth, query), fields(collection = %query.collection))]
    async fn query(
        &self,
        auth: Option<&IdToken>,
        query: &Query,
    ) -> Result<Vec<Document>, DocumentError> {
        let url = format!(
            "{}{}:runQuery",
            self.inner.base_url, self.inner.documents_root
        );
        let body = json!({ "structuredQuery": structured_query(query) });

        let response_text = self
            .send(self.request(reqwest::Method::POST, &url, auth).json(&body))
            .await?;
        let entries: Vec<RunQueryEntry> = serde_json::from_str(&response_text).map_err(|e| {
            DocumentError::new(
                DocumentErrorKind::Decode,
                format!("invalid runQuery response: {e}"),
            )
        })?;

        entries
            .into_iter()
            .filter_map(|entry| entry.document)
            .map(|raw| self.decode_raw(raw))
            .collect()
    }
}

/// One entry of a `commit` request's `writes` array.
fn commit_write(name: &str, write: &DocumentWrite, mode: WriteMode) -> Value {
    let mut entry = Map::new();
    entry.insert(
        "update".into(),
        json!({ "name": name, "fields": encode_fields(&write.fields) }),
    );

    if mode == WriteMode::Update {
        let paths: Vec<String> = write.fields.keys().map(|k| quote_field_path(k)).collect();
        entry.insert("updateMask".into(), json!({ "fieldPaths": paths }));
        entry.insert("currentDocument".into(), json!({ "exists": true }));
    }

    if !write.server_timestamps.is_empty() {
        let transforms: Vec<Value> = write
            .server_timestamps
            .iter()
            .map(|field| {
                json!({ "fieldPath": quote_field_path(field), "setToServerValue": "REQUEST_TIME" })
            })
            .collect();
        entry.insert("updateTransforms".into(), Value::Array(transforms));
    }

    Value::Object(entry)
}

/// The `structuredQuery` body for a [`Query`].
fn structured_query(query: &Query) -> Value {
    let mut structured = Map::new();
    structured.insert(
        "from".into(),
        json!([{ "collectionId": query.collection }]),
    );

    let mut filters: Vec<Value> = query
        .filters
        .iter()
        .map(|(field, value)| {
            json!({ "fieldFilter": {
                "field": { "fieldPath": quote_field_path(field) },
                "op": "EQUAL",
                "value": encode_value(value),
            }})
        })
        .collect();
    match filters.len() {
        0 => {}
        1 => {
            structured.insert("where".into(), filters.remove(0));
        }
        _ => {
            structured.insert(
                "where".into(),
                json!({ "compositeFilter": { "op": "AND", "filters": filters } }),
            );
        }
    }

    if let Some((field, direction)) = &query.order_by {
        let direction = match direction {
            Direction::Ascending => "ASCENDING",
            Direction::Descending => "DESCENDING",
        };
        structured.insert(
            "orderBy".into(),
            json!([{ "field": { "fieldPath": quote_field_path(field) }, "direction": direction }]),
        );
    }

    Value::Object(structured)
}

/// Quote a field name for use in a field path.
///
/// Simple identifiers go through as-is; anything else is wrapped in
/// backticks with `\` and `` ` `` escaped.
fn quote_field_path(field: &str) -> String {
    let mut chars = field.chars();
    let simple = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        return field.to_string();
    }
    let escaped = field.replace('\\', "\\\\").replace('`', "\\`");
    format!("`{escaped}`")
}

/// Map a failed response to a [`DocumentError`].
///
/// Single calls answer with an error object; `runQuery` wraps it in an
/// array. The array case has to be picked out first since serde will also
/// read a struct from a sequence.
fn parse_error(status: reqwest::StatusCode, body: &str) -> DocumentError {
    let envelope = match serde_json::from_str::<Value>(body) {
        Ok(Value::Array(entries)) => entries.into_iter().next(),
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
    .and_then(|value| serde_json::from_value::<GoogleErrorEnvelope>(value).ok());

    match envelope {
        Some(GoogleErrorEnvelope { error }) => {
            let status_name = if error.status.is_empty() && status == reqwest::StatusCode::NOT_FOUND
            {
                "NOT_FOUND"
            } else {
                error.status.as_str()
            };
            DocumentError::from_status(status_name, error.message)
        }
        None if status == reqwest::StatusCode::NOT_FOUND => {
            DocumentError::new(DocumentErrorKind::NotFound, "document not found")
        }
        None => {
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Firestore returned an unrecognised error body"
            );
            DocumentError::new(
                DocumentErrorKind::Other,
                format!("HTTP {status}: {}", body.chars().take(200).collect::<String>()),
            )
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::Fields;

    #[test]
    fn test_quote_field_path() {
        assert_eq!(quote_field_path("createdAt"), "createdAt");
        assert_eq!(quote_field_path("_private1"), "_private1");
        assert_eq!(quote_field_path("photoURL"), "photoURL");
        assert_eq!(quote_field_path("1st"), "`1st`");
        assert_eq!(quote_field_path("배송 메모"), "`배송 메모`");
        assert_eq!(quote_field_path("a`b"), "`a\\`b`");
    }

    #[test]
    fn test_update_write_has_mask_and_precondition() {
        let mut fields = Fields::new();
        fields.insert("status".into(), json!("paid"));
        let write = DocumentWrite::new(fields).with_server_timestamp("updatedAt");

        let entry = commit_write("projects/p/databases/(default)/documents/orders/ORD_1", &write, WriteMode::Update);

        assert_eq!(entry["updateMask"]["fieldPaths"], json!(["status"]));
        assert_eq!(entry["currentDocument"]["exists"], json!(true));
        assert_eq!(
            entry["updateTransforms"],
            json!([{ "fieldPath": "updatedAt", "setToServerValue": "REQUEST_TIME" }])
        );
        assert_eq!(entry["update"]["fields"]["status"], json!({ "stringValue": "paid" }));
    }

    #[test]
    fn test_set_write_has_no_mask() {
        let write = DocumentWrite::new(Fields::new());
        let entry = commit_write("name", &write, WriteMode::Set);

        assert!(entry.get("updateMask").is_none());
        assert!(entry.get("currentDocument").is_none());
        assert!(entry.get("updateTransforms").is_none());
    }

    #[test]
    fn test_structured_query_single_filter_and_order() {
        let query = Query::collection("orders")
            .where_eq("userId", "uid-1")
            .order_by("createdAt", Direction::Descending);

        let structured = structured_query(&query);

        assert_eq!(structured["from"], json!([{ "collectionId": "orders" }]));
        assert_eq!(
            structured["where"]["fieldFilter"]["value"],
            json!({ "stringValue": "uid-1" })
        );
        assert_eq!(structured["orderBy"][0]["direction"], json!("DESCENDING"));
    }

    #[test]
    fn test_structured_query_composite_filter() {
        let query = Query::collection("orders")
            .where_eq("userId", "uid-1")
            .where_eq("status", "paid");

        let structured = structured_query(&query);

        assert_eq!(structured["where"]["compositeFilter"]["op"], json!("AND"));
        assert!(structured.get("orderBy").is_none());
    }

    #[test]
    fn test_parse_error_from_run_query_array() {
        let body = r#"[{"error":{"code":400,"message":"The query requires an index.","status":"FAILED_PRECONDITION"}}]"#;
        let err = parse_error(reqwest::StatusCode::BAD_REQUEST, body);

        assert_eq!(err.kind, DocumentErrorKind::FailedPrecondition);
        assert_eq!(err.message, "The query requires an index.");
    }

    #[test]
    fn test_parse_error_from_single_object() {
        let body = r#"{"error":{"code":403,"message":"Missing or insufficient permissions.","status":"PERMISSION_DENIED"}}"#;
        let err = parse_error(reqwest::StatusCode::FORBIDDEN, body);

        assert_eq!(err.kind, DocumentErrorKind::PermissionDenied);
        assert_eq!(err.message, "Missing or insufficient permissions.");
    }

    #[test]
    fn test_parse_error_unrecognised_body() {
        let err = parse_error(reqwest::StatusCode::BAD_GATEWAY, "[]");
        assert_eq!(err.kind, DocumentErrorKind::Other);
        assert!(err.message.starts_with("HTTP 502"));

        let err = parse_error(reqwest::StatusCode::NOT_FOUND, "");
        assert_eq!(err.kind, DocumentErrorKind::NotFound);
    }

    fn client(base_url: &str) -> FirestoreClient {
        FirestoreClient::new(
            reqwest::Client::new(),
            base_url,
            "demo-owldoor",
            "(default)",
            SecretString::from("test-key"),
        )
    }

    #[test]
    fn test_document_url_encodes_id_as_one_segment() {
        let firestore = client("https://firestore.googleapis.com/v1");

        let url = firestore
            .document_url(&DocumentPath::new("products", "product_1?x=1#frag"))
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://firestore.googleapis.com/v1/projects/demo-owldoor/databases/(default)/documents/products/product_1%3Fx=1%23frag"
        );
        assert!(url.query().is_none());
        assert!(url.fragment().is_none());
    }
}
