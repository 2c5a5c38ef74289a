//! In-process implementation of both backend traits.
//!
//! Behaves like the hosted service as far as the facade can observe:
//! error codes match the identity service's, partial updates of missing
//! documents fail with `NotFound`, server timestamps are RFC 3339 strings
//! from a clock that never repeats (one value per write), and queries drop
//! documents missing the order-by field. Security rules are not modelled.
//!
//! Used by the integration tests and by the CLI's `--memory` mode.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use uuid::Uuid;

use owldoor_core::{Email, UserId};

use super::{
    Direction, Document, DocumentError, DocumentErrorKind, DocumentPath, DocumentStore,
    DocumentWrite, FederatedCredential, Fields, IdToken, IdentityError, IdentityProvider,
    IdentitySession, ProfileUpdate, Query, compare_values,
};

const MIN_PASSWORD_LENGTH: usize = 6;

/// Profile a federated provider reports for a registered token.
#[derive(Debug, Clone, Default)]
pub struct FederatedProfile {
    /// Email the provider shares.
    pub email: Option<String>,
    /// Display name on the provider account.
    pub display_name: Option<String>,
    /// Avatar URL on the provider account.
    pub photo_url: Option<String>,
}

/// In-memory backend. Cloning shares the same state.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    /// Password accounts keyed by lowercased email.
    accounts: HashMap<String, Account>,
    /// Federated accounts keyed by the provider token that identifies them.
    federated: HashMap<String, FederatedAccount>,
    /// collection -> id -> fields
    documents: BTreeMap<String, BTreeMap<String, Fields>>,
    last_timestamp_micros: i64,
    /// Failure to raise once the given number of identity calls succeed.
    identity_failure: Option<(usize, IdentityError)>,
    document_failure: Option<DocumentError>,
}

struct Account {
    uid: UserId,
    email: String,
    password: String,
    display_name: Option<String>,
    photo_url: Option<String>,
}

struct FederatedAccount {
    uid: UserId,
    profile: FederatedProfile,
    signed_in_before: bool,
}

impl MemoryBackend {
    /// An empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `token` a valid federated credential for a provider account.
    ///
    /// Returns the user ID the account will sign in as.
    pub fn register_federated(&self, token: impl Into<String>, profile: FederatedProfile) -> UserId {
        let uid = new_uid();
        self.state().federated.insert(
            token.into(),
            FederatedAccount {
                uid: uid.clone(),
                profile,
                signed_in_before: false,
            },
        );
        uid
    }

    /// Fail the next identity call with `err`.
    pub fn fail_next_identity(&self, err: IdentityError) {
        self.fail_identity_after(0, err);
    }

    /// Let `calls` identity calls succeed, then fail the one after with `err`.
    pub fn fail_identity_after(&self, calls: usize, err: IdentityError) {
        self.state().identity_failure = Some((calls, err));
    }

    /// Fail the next document call with `err`.
    pub fn fail_next_document(&self, err: DocumentError) {
        self.state().document_failure = Some(err);
    }

    /// Raw fields of a stored document.
    #[must_use]
    pub fn document(&self, path: &DocumentPath) -> Option<Fields> {
        self.state()
            .documents
            .get(path.collection())
            .and_then(|docs| docs.get(path.id()))
            .cloned()
    }

    /// Number of documents in a collection.
    #[must_use]
    pub fn collection_len(&self, collection: &str) -> usize {
        self.state()
            .documents
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    /// Store a document as-is, bypassing server timestamps.
    pub fn insert_document(&self, path: &DocumentPath, fields: Fields) {
        self.state()
            .documents
            .entry(path.collection().to_string())
            .or_default()
            .insert(path.id().to_string(), fields);
    }
}

impl MemoryState {
    fn take_identity_failure(&mut self) -> Result<(), IdentityError> {
        match self.identity_failure.take() {
            Some((0, err)) => Err(err),
            Some((calls, err)) => {
                self.identity_failure = Some((calls - 1, err));
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn take_document_failure(&mut self) -> Result<(), DocumentError> {
        self.document_failure.take().map_or(Ok(()), Err)
    }

    /// Server request time; strictly increasing within this backend.
    fn request_time(&mut self) -> Value {
        let now = Utc::now().timestamp_micros();
        let micros = now.max(self.last_timestamp_micros + 1);
        self.last_timestamp_micros = micros;
        let stamp = DateTime::from_timestamp_micros(micros).unwrap_or_else(Utc::now);
        Value::String(stamp.to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    /// Every server timestamp in one write gets the same request time.
    fn apply_timestamps(&mut self, fields: &mut Fields, write: &DocumentWrite) {
        if write.server_timestamps.is_empty() {
            return;
        }
        let stamp = self.request_time();
        for field in &write.server_timestamps {
            fields.insert(field.clone(), stamp.clone());
        }
    }

    fn collection_mut(&mut self, collection: &str) -> &mut BTreeMap<String, Fields> {
        self.documents.entry(collection.to_string()).or_default()
    }
}

/// The identity service answers a malformed address with `INVALID_EMAIL`.
fn parse_email(email: &str) -> Result<Email, IdentityError> {
    Email::parse(email).map_err(|_| IdentityError::from_code("INVALID_EMAIL"))
}

fn new_uid() -> UserId {
    let mut uid = Uuid::new_v4().simple().to_string();
    uid.truncate(28);
    UserId::new(uid)
}

fn new_token() -> IdToken {
    IdToken::new(format!("memory.{}", Uuid::new_v4().simple()))
}

fn account_session(account: &Account, is_new_user: bool) -> IdentitySession {
    IdentitySession {
        uid: account.uid.clone(),
        email: Some(account.email.clone()),
        display_name: account.display_name.clone(),
        photo_url: account.photo_url.clone(),
        id_token: new_token(),
        is_new_user,
    }
}

#[async_trait]
impl IdentityProvider for MemoryBackend {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> Result<IdentitySession, IdentityError> {
        let mut state = self.state();
        state.take_identity_failure()?;

        let email = parse_email(email)?;
        let key = email.as_str().to_lowercase();
        if state.accounts.contains_key(&key) {
            return Err(IdentityError::from_code("EMAIL_EXISTS"));
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(IdentityError::from_code(
                "WEAK_PASSWORD : Password should be at least 6 characters",
            ));
        }

        let account = Account {
            uid: new_uid(),
            email: email.as_str().to_string(),
            password: password.to_string(),
            display_name: None,
            photo_url: None,
        };
        let session = account_session(&account, true);
        state.accounts.insert(key, account);
        Ok(session)
    }

    async fn update_profile(
        &self,
        session: &IdentitySession,
        update: &ProfileUpdate,
    ) -> Result<IdentitySession, IdentityError> {
        let mut state = self.state();
        state.take_identity_failure()?;

        let (display_name, photo_url) = if let Some(account) = state
            .accounts
            .values_mut()
            .find(|a| a.uid == session.uid)
        {
            if let Some(name) = &update.display_name {
                account.display_name = Some(name.clone());
            }
            if let Some(url) = &update.photo_url {
                account.photo_url = Some(url.clone());
            }
            (account.display_name.clone(), account.photo_url.clone())
        } else if let Some(account) = state
            .federated
            .values_mut()
            .find(|a| a.uid == session.uid)
        {
            if let Some(name) = &update.display_name {
                account.profile.display_name = Some(name.clone());
            }
            if let Some(url) = &update.photo_url {
                account.profile.photo_url = Some(url.clone());
            }
            (
                account.profile.display_name.clone(),
                account.profile.photo_url.clone(),
            )
        } else {
            return Err(IdentityError::from_code("USER_NOT_FOUND"));
        };

        Ok(IdentitySession {
            display_name,
            photo_url,
            ..session.clone()
        })
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<IdentitySession, IdentityError> {
        let mut state = self.state();
        state.take_identity_failure()?;

        let email = parse_email(email)?;
        match state.accounts.get(&email.as_str().to_lowercase()) {
            Some(account) if account.password == password => Ok(account_session(account, false)),
            _ => Err(IdentityError::from_code("INVALID_LOGIN_CREDENTIALS")),
        }
    }

    async fn sign_in_with_idp(
        &self,
        credential: &FederatedCredential,
    ) -> Result<IdentitySession, IdentityError> {
        let mut state = self.state();
        state.take_identity_failure()?;

        let token = credential
            .id_token
            .as_deref()
            .or(credential.access_token.as_deref())
            .unwrap_or_default();
        let Some(account) = state.federated.get_mut(token) else {
            return Err(IdentityError::from_code(
                "INVALID_IDP_RESPONSE : the supplied auth credential is malformed or has expired",
            ));
        };

        let is_new_user = !account.signed_in_before;
        account.signed_in_before = true;
        Ok(IdentitySession {
            uid: account.uid.clone(),
            email: account.profile.email.clone(),
            display_name: account.profile.display_name.clone(),
            photo_url: account.profile.photo_url.clone(),
            id_token: new_token(),
            is_new_user,
        })
    }

    async fn sign_out(&self, _token: &IdToken) -> Result<(), IdentityError> {
        self.state().take_identity_failure()
    }
}

#[async_trait]
impl DocumentStore for MemoryBackend {
    async fn get(
        &self,
        _auth: Option<&IdToken>,
        path: &DocumentPath,
    ) -> Result<Option<Document>, DocumentError> {
        let mut state = self.state();
        state.take_document_failure()?;
        if !path.is_addressable() {
            return Ok(None);
        }

        Ok(state
            .documents
            .get(path.collection())
            .and_then(|docs| docs.get(path.id()))
            .map(|fields| Document {
                path: path.clone(),
                fields: fields.clone(),
            }))
    }

    async fn set(
        &self,
        _auth: Option<&IdToken>,
        path: &DocumentPath,
        write: &DocumentWrite,
    ) -> Result<(), DocumentError> {
        let mut state = self.state();
        state.take_document_failure()?;
        if !path.is_addressable() {
            return Err(DocumentError::invalid_path(path));
        }

        let mut fields = write.fields.clone();
        state.apply_timestamps(&mut fields, write);
        state
            .collection_mut(path.collection())
            .insert(path.id().to_string(), fields);
        Ok(())
    }

    async fn update(
        &self,
        _auth: Option<&IdToken>,
        path: &DocumentPath,
        write: &DocumentWrite,
    ) -> Result<(), DocumentError> {
        let mut state = self.state();
        state.take_document_failure()?;

        let exists = path.is_addressable()
            && state
                .documents
            .get(path.collection())
            .is_some_and(|docs| docs.contains_key(path.id()));
        if !exists {
            return Err(DocumentError::new(
                DocumentErrorKind::NotFound,
                format!("No document to update: {path}"),
            ));
        }

        let mut changes = write.fields.clone();
        state.apply_timestamps(&mut changes, write);
        if let Some(fields) = state.collection_mut(path.collection()).get_mut(path.id()) {
            fields.extend(changes);
        }
        Ok(())
    }

    async fn query(
        &self,
        _auth: Option<&IdToken>,
        query: &Query,
    ) -> Result<Vec<Document>, DocumentError> {
        let mut state = self.state();
        state.take_document_failure()?;

        let Some(docs) = state.documents.get(&query.collection) else {
            return Ok(Vec::new());
        };

        let mut matches: Vec<Document> = docs
            .iter()
            .filter(|(_, fields)| {
                query
                    .filters
                    .iter()
                    .all(|(field, value)| fields.get(field) == Some(value))
            })
            .filter(|(_, fields)| {
                query
                    .order_by
                    .as_ref()
                    .is_none_or(|(field, _)| fields.contains_key(field))
            })
            .map(|(id, fields)| Document {
                path: DocumentPath::new(&query.collection, id),
                fields: fields.clone(),
            })
            .collect();

        if let Some((field, direction)) = &query.order_by {
            matches.sort_by(|a, b| {
                let ordering = compare_values(
                    a.fields.get(field).unwrap_or(&Value::Null),
                    b.fields.get(field).unwrap_or(&Value::Null),
                );
                match direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }

        Ok(matches)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::backend::{FederatedProvider, IdentityErrorKind};

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_sign_up_rejects_duplicate_and_weak_password() {
        let backend = MemoryBackend::new();
        let email = "minsu@owldoor.kr";

        backend.sign_up(email, "secret123").await.unwrap();

        let err = backend.sign_up(email, "secret123").await.unwrap_err();
        assert_eq!(err.kind, IdentityErrorKind::EmailExists);

        let err = backend.sign_up("jiwoo@owldoor.kr", "123").await.unwrap_err();
        assert_eq!(err.kind, IdentityErrorKind::WeakPassword);
    }

    #[tokio::test]
    async fn test_password_sign_in() {
        let backend = MemoryBackend::new();
        let email = "minsu@owldoor.kr";
        let created = backend.sign_up(email, "secret123").await.unwrap();

        let session = backend
            .sign_in_with_password(email, "secret123")
            .await
            .unwrap();
        assert_eq!(session.uid, created.uid);
        assert!(!session.is_new_user);

        let err = backend
            .sign_in_with_password(email, "wrong-pass")
            .await
            .unwrap_err();
        assert_eq!(err.kind, IdentityErrorKind::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_federated_sign_in_is_new_only_once() {
        let backend = MemoryBackend::new();
        let uid = backend.register_federated(
            "google-token",
            FederatedProfile {
                email: Some("jiwoo@gmail.com".into()),
                ..FederatedProfile::default()
            },
        );
        let credential = FederatedCredential {
            provider: FederatedProvider::Google,
            id_token: Some("google-token".into()),
            access_token: None,
            request_uri: "http://localhost".into(),
        };

        let first = backend.sign_in_with_idp(&credential).await.unwrap();
        let second = backend.sign_in_with_idp(&credential).await.unwrap();

        assert_eq!(first.uid, uid);
        assert!(first.is_new_user);
        assert!(!second.is_new_user);
    }

    #[tokio::test]
    async fn test_update_missing_document_is_not_found() {
        let backend = MemoryBackend::new();
        let path = DocumentPath::new("orders", "ORD_1_missing");

        let err = backend
            .update(None, &path, &DocumentWrite::new(Fields::new()))
            .await
            .unwrap_err();

        assert_eq!(err.kind, DocumentErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_server_timestamps_share_one_request_time() {
        let backend = MemoryBackend::new();
        let write = DocumentWrite::new(Fields::new())
            .with_server_timestamp("createdAt")
            .with_server_timestamp("updatedAt");
        let path = DocumentPath::new("orders", "a");

        backend.set(None, &path, &write).await.unwrap();

        let stored = backend.document(&path).unwrap();
        let created = stored["createdAt"].as_str().unwrap().to_string();
        assert_eq!(stored["updatedAt"], json!(created));
        assert!(created.ends_with('Z'));

        let touch = DocumentWrite::new(Fields::new()).with_server_timestamp("updatedAt");
        backend.update(None, &path, &touch).await.unwrap();

        let stored = backend.document(&path).unwrap();
        assert_eq!(stored["createdAt"], json!(created));
        assert!(stored["updatedAt"].as_str().unwrap() > created.as_str());
    }

    #[tokio::test]
    async fn test_unaddressable_ids_do_not_reach_documents() {
        let backend = MemoryBackend::new();
        backend.insert_document(
            &DocumentPath::new("products", "product_1"),
            fields(json!({ "name": "프리미엄 현관중문" })),
        );

        for id in ["", "product_1/reviews", "..", "."] {
            let path = DocumentPath::new("products", id);
            assert!(backend.get(None, &path).await.unwrap().is_none(), "{id:?}");

            let write = DocumentWrite::new(fields(json!({ "name": "x" })));
            let err = backend.update(None, &path, &write).await.unwrap_err();
            assert_eq!(err.kind, DocumentErrorKind::NotFound);
            let err = backend.set(None, &path, &write).await.unwrap_err();
            assert_eq!(err.kind, DocumentErrorKind::InvalidArgument);
        }
        assert_eq!(backend.collection_len("products"), 1);
    }

    #[tokio::test]
    async fn test_identity_failure_after_successful_calls() {
        let backend = MemoryBackend::new();
        backend.fail_identity_after(
            1,
            IdentityError::new(IdentityErrorKind::Network, "error sending request"),
        );
        let email = "minsu@owldoor.kr";

        let session = backend.sign_up(email, "secret123").await.unwrap();
        let update = ProfileUpdate {
            display_name: Some("김민수".into()),
            photo_url: None,
        };
        let err = backend.update_profile(&session, &update).await.unwrap_err();
        assert_eq!(err.message, "error sending request");
        assert!(backend.update_profile(&session, &update).await.is_ok());
    }

    #[tokio::test]
    async fn test_query_filters_sorts_and_drops_missing_order_field() {
        let backend = MemoryBackend::new();
        backend.insert_document(
            &DocumentPath::new("orders", "a"),
            fields(json!({ "userId": "u1", "createdAt": "2026-01-01T00:00:00.000000Z" })),
        );
        backend.insert_document(
            &DocumentPath::new("orders", "b"),
            fields(json!({ "userId": "u1", "createdAt": "2026-02-01T00:00:00.000000Z" })),
        );
        backend.insert_document(
            &DocumentPath::new("orders", "c"),
            fields(json!({ "userId": "u2", "createdAt": "2026-03-01T00:00:00.000000Z" })),
        );
        backend.insert_document(
            &DocumentPath::new("orders", "d"),
            fields(json!({ "userId": "u1" })),
        );

        let query = Query::collection("orders")
            .where_eq("userId", "u1")
            .order_by("createdAt", Direction::Descending);
        let ids: Vec<String> = backend
            .query(None, &query)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.path.id().to_string())
            .collect();

        assert_eq!(ids, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_injected_failure_applies_once() {
        let backend = MemoryBackend::new();
        backend.fail_next_document(DocumentError::new(
            DocumentErrorKind::Unavailable,
            "The service is currently unavailable.",
        ));
        let path = DocumentPath::new("products", "product_1");

        let err = backend.get(None, &path).await.unwrap_err();
        assert_eq!(err.message, "The service is currently unavailable.");
        assert!(backend.get(None, &path).await.unwrap().is_none());
    }
}
