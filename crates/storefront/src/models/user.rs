//! `users/{uid}` documents.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::{DocumentError, DocumentWrite};

use super::to_fields;

/// Collection holding one profile per account.
pub const USERS: &str = "users";

/// A user's profile document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Account email.
    #[serde(default)]
    pub email: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Avatar URL; only federated accounts have one.
    #[serde(rename = "photoURL", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    /// Server time of creation.
    #[serde(default)]
    pub created_at: Option<String>,
    /// Point balance.
    #[serde(default)]
    pub points: i64,
    /// Coupons held by the user; their shape is owned by the page.
    #[serde(default)]
    pub coupons: Vec<Value>,
}

/// Fields of a freshly created profile.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewProfile<'a> {
    email: Option<&'a str>,
    name: Option<&'a str>,
    #[serde(rename = "photoURL", skip_serializing_if = "Option::is_none")]
    photo_url: Option<Option<&'a str>>,
    points: i64,
    coupons: [Value; 0],
}

impl UserProfile {
    /// Profile write for an email/password sign-up.
    ///
    /// # Errors
    ///
    /// Returns error if the fields fail to serialize.
    pub fn email_signup(email: &str, name: &str) -> Result<DocumentWrite, DocumentError> {
        Self::new_document(&NewProfile {
            email: Some(email),
            name: Some(name),
            photo_url: None,
            points: 0,
            coupons: [],
        })
    }

    /// Profile write for a first federated sign-in. `photoURL` is always
    /// present, `null` when the provider has no avatar.
    ///
    /// # Errors
    ///
    /// Returns error if the fields fail to serialize.
    pub fn federated(
        email: Option<&str>,
        name: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<DocumentWrite, DocumentError> {
        Self::new_document(&NewProfile {
            email,
            name,
            photo_url: Some(photo_url),
            points: 0,
            coupons: [],
        })
    }

    fn new_document(profile: &NewProfile<'_>) -> Result<DocumentWrite, DocumentError> {
        Ok(DocumentWrite::new(to_fields(profile)?).with_server_timestamp("createdAt"))
    }
}
