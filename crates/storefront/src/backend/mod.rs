//! Backend seam: the managed identity + document service.
//!
//! The facade only ever talks to the backend through two traits:
//!
//! - [`IdentityProvider`] - create accounts, sign in (password or federated),
//!   update the profile, sign out
//! - [`DocumentStore`] - get, set, partially update, and query schemaless
//!   documents grouped into collections
//!
//! # Implementations
//!
//! - [`firebase::FirebaseBackend`] - Identity Toolkit + Cloud Firestore REST
//! - [`memory::MemoryBackend`] - in-process fake with failure injection
//!
//! Documents are plain JSON objects. Fields that must carry the server's
//! request time are listed separately on a [`DocumentWrite`] rather than
//! filled in by the caller.

mod error;
pub mod firebase;
pub mod memory;

pub use error::{DocumentError, DocumentErrorKind, IdentityError, IdentityErrorKind};

use std::cmp::Ordering;
use std::fmt;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;

use owldoor_core::UserId;

/// A document's fields.
pub type Fields = serde_json::Map<String, Value>;

// =============================================================================
// Identity
// =============================================================================

/// A signed-in user's bearer token.
///
/// Sent with document calls so security rules can see who is asking.
#[derive(Clone)]
pub struct IdToken(SecretString);

impl IdToken {
    /// Wrap a raw token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// The raw token, for building an `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for IdToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IdToken([REDACTED])")
    }
}

/// An authenticated identity as reported by the provider.
#[derive(Debug, Clone)]
pub struct IdentitySession {
    /// Provider-assigned user ID.
    pub uid: UserId,
    /// Account email, if the provider shares one.
    pub email: Option<String>,
    /// Display name, if set.
    pub display_name: Option<String>,
    /// Profile photo URL, if set.
    pub photo_url: Option<String>,
    /// Bearer token for document calls.
    pub id_token: IdToken,
    /// Whether this sign-in created the account.
    pub is_new_user: bool,
}

/// Profile fields to change on the identity record.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    /// New display name.
    pub display_name: Option<String>,
    /// New photo URL.
    pub photo_url: Option<String>,
}

/// A federated identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FederatedProvider {
    /// Google accounts.
    #[default]
    Google,
}

impl FederatedProvider {
    /// The provider ID the identity service expects.
    #[must_use]
    pub const fn provider_id(self) -> &'static str {
        match self {
            Self::Google => "google.com",
        }
    }
}

/// The provider's answer from the popup (or redirect), handed over by the
/// page.
#[derive(Clone)]
pub struct FederatedCredential {
    /// Which provider issued the credential.
    pub provider: FederatedProvider,
    /// OpenID Connect ID token, when the provider issued one.
    pub id_token: Option<String>,
    /// OAuth access token, when the provider issued one.
    pub access_token: Option<String>,
    /// The page URL the provider redirected back to.
    pub request_uri: String,
}

impl fmt::Debug for FederatedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FederatedCredential")
            .field("provider", &self.provider)
            .field("id_token", &self.id_token.as_ref().map(|_| "[REDACTED]"))
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("request_uri", &self.request_uri)
            .finish()
    }
}

/// Account operations of the identity service.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an email/password account and sign it in.
    ///
    /// The email is passed as typed; judging its format is the service's
    /// job (`INVALID_EMAIL`).
    async fn sign_up(&self, email: &str, password: &str) -> Result<IdentitySession, IdentityError>;

    /// Change profile fields of the signed-in account.
    async fn update_profile(
        &self,
        session: &IdentitySession,
        update: &ProfileUpdate,
    ) -> Result<IdentitySession, IdentityError>;

    /// Sign in with email and password.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<IdentitySession, IdentityError>;

    /// Exchange a federated provider credential for a session.
    async fn sign_in_with_idp(
        &self,
        credential: &FederatedCredential,
    ) -> Result<IdentitySession, IdentityError>;

    /// End the session on the provider side, if the provider tracks one.
    async fn sign_out(&self, token: &IdToken) -> Result<(), IdentityError>;
}

// =============================================================================
// Documents
// =============================================================================

/// `collection/id` address of a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentPath {
    collection: String,
    id: String,
}

impl DocumentPath {
    /// Address `id` inside `collection`.
    #[must_use]
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Collection name.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Document ID within the collection.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the ID names a single document directly inside the
    /// collection. Empty IDs, `.`, `..` and IDs containing `/` do not.
    #[must_use]
    pub fn is_addressable(&self) -> bool {
        !self.id.is_empty() && self.id != "." && self.id != ".." && !self.id.contains('/')
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// A stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Where the document lives.
    pub path: DocumentPath,
    /// Its fields, with server timestamps rendered as RFC 3339 strings.
    pub fields: Fields,
}

impl Document {
    /// Deserialize the fields into a model type.
    ///
    /// # Errors
    ///
    /// Returns a `Decode` error naming the document if the fields don't
    /// match `T`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, DocumentError> {
        serde_json::from_value(Value::Object(self.fields))
            .map_err(|e| DocumentError::decode(&self.path, &e))
    }
}

/// Fields to write, plus fields to stamp with the server's request time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentWrite {
    /// Field values to write.
    pub fields: Fields,
    /// Field names the server fills with its own clock.
    pub server_timestamps: Vec<String>,
}

impl DocumentWrite {
    /// Write exactly these fields.
    #[must_use]
    pub fn new(fields: Fields) -> Self {
        Self {
            fields,
            server_timestamps: Vec::new(),
        }
    }

    /// Also stamp `field` with the server's request time.
    #[must_use]
    pub fn with_server_timestamp(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        self.fields.remove(&field);
        self.server_timestamps.push(field);
        self
    }

    /// Every field path this write touches.
    #[must_use]
    pub fn field_paths(&self) -> Vec<&str> {
        self.fields
            .keys()
            .map(String::as_str)
            .chain(self.server_timestamps.iter().map(String::as_str))
            .collect()
    }
}

/// Sort direction for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// A collection query: equality filters combined with AND, and an optional
/// single-field ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Collection to scan.
    pub collection: String,
    /// `(field, value)` pairs that must all match.
    pub filters: Vec<(String, Value)>,
    /// Field and direction to sort by.
    pub order_by: Option<(String, Direction)>,
}

impl Query {
    /// Query every document in `collection`.
    #[must_use]
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filters: Vec::new(),
            order_by: None,
        }
    }

    /// Keep only documents whose `field` equals `value`.
    #[must_use]
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    /// Sort results by `field`. Documents without the field are left out.
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }
}

/// Schemaless document storage of the managed service.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read one document; `Ok(None)` when it does not exist.
    async fn get(
        &self,
        auth: Option<&IdToken>,
        path: &DocumentPath,
    ) -> Result<Option<Document>, DocumentError>;

    /// Create or fully overwrite a document.
    async fn set(
        &self,
        auth: Option<&IdToken>,
        path: &DocumentPath,
        write: &DocumentWrite,
    ) -> Result<(), DocumentError>;

    /// Change only the listed fields; fails with `NotFound` when the
    /// document does not exist.
    async fn update(
        &self,
        auth: Option<&IdToken>,
        path: &DocumentPath,
        write: &DocumentWrite,
    ) -> Result<(), DocumentError>;

    /// Run a collection query.
    async fn query(
        &self,
        auth: Option<&IdToken>,
        query: &Query,
    ) -> Result<Vec<Document>, DocumentError>;
}

/// Total order over JSON values used for query sorting.
///
/// Types sort as null < bool < number < string < array < object, the same
/// cross-type order the document service applies.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Ordering {
    const fn type_rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            match (x.as_i64(), y.as_i64()) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => {
                    let x = x.as_f64().unwrap_or(f64::NAN);
                    let y = y.as_f64().unwrap_or(f64::NAN);
                    x.total_cmp(&y)
                }
            }
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y)
            .map(|(x, y)| compare_values(x, y))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_server_timestamp_replaces_field_value() {
        let mut fields = Fields::new();
        fields.insert("status".into(), json!("pending"));
        fields.insert("createdAt".into(), json!("client clock"));

        let write = DocumentWrite::new(fields).with_server_timestamp("createdAt");

        assert!(!write.fields.contains_key("createdAt"));
        assert_eq!(write.server_timestamps, vec!["createdAt".to_string()]);
        assert_eq!(write.field_paths(), vec!["status", "createdAt"]);
    }

    #[test]
    fn test_decode_reports_path() {
        #[derive(Debug, serde::Deserialize)]
        struct Named {
            #[allow(dead_code)]
            name: String,
        }

        let doc = Document {
            path: DocumentPath::new("products", "product_9"),
            fields: Fields::new(),
        };
        let err = doc.decode::<Named>().unwrap_err();

        assert_eq!(err.kind, DocumentErrorKind::Decode);
        assert!(err.message.contains("products/product_9"));
    }

    #[test]
    fn test_addressable_ids() {
        assert!(DocumentPath::new("products", "product_1").is_addressable());
        assert!(DocumentPath::new("products", "product_1?x=1").is_addressable());
        assert!(DocumentPath::new("orders", "ORD_1_a b").is_addressable());
        assert!(!DocumentPath::new("products", "").is_addressable());
        assert!(!DocumentPath::new("products", "product_1/reviews").is_addressable());
        assert!(!DocumentPath::new("products", "..").is_addressable());
    }

    #[test]
    fn test_compare_values_orders_numbers_and_types() {
        assert_eq!(compare_values(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(compare_values(&json!(1.5), &json!(1)), Ordering::Greater);
        assert_eq!(compare_values(&json!(null), &json!(false)), Ordering::Less);
        assert_eq!(compare_values(&json!(99), &json!("1")), Ordering::Less);
        assert_eq!(
            compare_values(&json!("2024-01-02T00:00:00Z"), &json!("2024-01-01T00:00:00Z")),
            Ordering::Greater
        );
    }

    #[test]
    fn test_id_token_debug_is_redacted() {
        let token = IdToken::new("eyJhbGciOi.secret");
        assert_eq!(format!("{token:?}"), "IdToken([REDACTED])");
        assert_eq!(token.expose(), "eyJhbGciOi.secret");
    }
}
