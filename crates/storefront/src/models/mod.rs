//! Document models.
//!
//! Field names follow the stored documents (`camelCase`, `photoURL`), so
//! these types serialize straight into the payloads the page reads.

pub mod order;
pub mod product;
pub mod user;

pub use order::Order;
pub use product::Product;
pub use user::UserProfile;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use owldoor_core::UserId;

use crate::backend::{Document, DocumentError, DocumentErrorKind, Fields};

/// Stored in `userId` when nobody is signed in.
pub const GUEST: &str = "guest";

/// Who a document belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Owner {
    /// Created without a signed-in user.
    Guest,
    /// Created by this user.
    User(UserId),
}

impl Owner {
    /// The owner of a document created by `user`, if any.
    #[must_use]
    pub fn from_user(user: Option<&UserId>) -> Self {
        user.map_or(Self::Guest, |uid| Self::User(uid.clone()))
    }

    /// The stored string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Guest => GUEST,
            Self::User(uid) => uid.as_str(),
        }
    }
}

impl From<String> for Owner {
    fn from(value: String) -> Self {
        if value == GUEST {
            Self::Guest
        } else {
            Self::User(UserId::new(value))
        }
    }
}

impl From<Owner> for String {
    fn from(owner: Owner) -> Self {
        match owner {
            Owner::Guest => GUEST.to_string(),
            Owner::User(uid) => uid.into_inner(),
        }
    }
}

/// Serialize a model into document fields.
///
/// # Errors
///
/// Returns an `InvalidArgument` error if `value` does not serialize to a
/// JSON object.
pub fn to_fields(value: &impl Serialize) -> Result<Fields, DocumentError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(DocumentError::new(
            DocumentErrorKind::InvalidArgument,
            format!("document must be an object, got {other}"),
        )),
        Err(e) => Err(DocumentError::new(
            DocumentErrorKind::InvalidArgument,
            e.to_string(),
        )),
    }
}

/// Decode a document with its ID available as an `id` field.
///
/// A stored `id` field takes precedence over the document ID.
///
/// # Errors
///
/// Returns a `Decode` error if the fields don't match `T`.
pub fn decode_with_id<T: DeserializeOwned>(mut document: Document) -> Result<T, DocumentError> {
    if !document.fields.contains_key("id") {
        let id = document.path.id().to_string();
        document.fields.insert("id".into(), Value::String(id));
    }
    document.decode()
}
