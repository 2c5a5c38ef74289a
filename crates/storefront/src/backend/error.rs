//! Errors reported by backend implementations.
//!
//! Both error types keep the backend's own message verbatim (that is what
//! the page shows) and add a coarse `kind` so callers can branch without
//! matching on strings.

use thiserror::Error;

/// Classification of an identity (authentication) failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityErrorKind {
    /// The email is already registered.
    EmailExists,
    /// The password does not meet the provider's policy.
    WeakPassword,
    /// The email is malformed.
    InvalidEmail,
    /// Wrong email/password, or unknown account.
    InvalidCredentials,
    /// The account has been disabled.
    UserDisabled,
    /// The federated provider rejected the page's domain.
    UnauthorizedDomain,
    /// The federated provider's response was not accepted.
    InvalidIdpResponse,
    /// The sign-in method is disabled for this project.
    OperationNotAllowed,
    /// Too many attempts; temporarily blocked.
    TooManyAttempts,
    /// The session token is no longer valid.
    TokenExpired,
    /// The request never got a response.
    Network,
    /// Anything else.
    Other,
}

/// An identity backend failure.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct IdentityError {
    /// Coarse classification.
    pub kind: IdentityErrorKind,
    /// The backend's message, passed through unchanged.
    pub message: String,
}

impl IdentityError {
    /// Create an error with an explicit kind.
    #[must_use]
    pub fn new(kind: IdentityErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Build an error from an Identity Toolkit error code.
    ///
    /// Codes may carry a detail suffix (`WEAK_PASSWORD : Password should be
    /// at least 6 characters`); only the leading code is used for the kind,
    /// the full text is kept as the message.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        let head = code.split([' ', ':']).next().unwrap_or_default();
        let kind = match head {
            "EMAIL_EXISTS" => IdentityErrorKind::EmailExists,
            "WEAK_PASSWORD" => IdentityErrorKind::WeakPassword,
            "INVALID_EMAIL" | "MISSING_EMAIL" => IdentityErrorKind::InvalidEmail,
            "INVALID_LOGIN_CREDENTIALS" | "INVALID_PASSWORD" | "EMAIL_NOT_FOUND"
            | "MISSING_PASSWORD" => IdentityErrorKind::InvalidCredentials,
            "USER_DISABLED" => IdentityErrorKind::UserDisabled,
            "UNAUTHORIZED_DOMAIN" | "INVALID_CONTINUE_URI" => {
                IdentityErrorKind::UnauthorizedDomain
            }
            "INVALID_IDP_RESPONSE" | "MISSING_OR_INVALID_NONCE" => {
                IdentityErrorKind::InvalidIdpResponse
            }
            "OPERATION_NOT_ALLOWED" => IdentityErrorKind::OperationNotAllowed,
            "TOO_MANY_ATTEMPTS_TRY_LATER" => IdentityErrorKind::TooManyAttempts,
            "TOKEN_EXPIRED" | "INVALID_ID_TOKEN" | "USER_NOT_FOUND" => {
                IdentityErrorKind::TokenExpired
            }
            _ => IdentityErrorKind::Other,
        };
        Self::new(kind, code)
    }
}

impl From<reqwest::Error> for IdentityError {
    fn from(err: reqwest::Error) -> Self {
        Self::new(IdentityErrorKind::Network, err.to_string())
    }
}

/// Classification of a document store failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentErrorKind {
    /// The document does not exist (partial update of a missing document).
    NotFound,
    /// Security rules rejected the call.
    PermissionDenied,
    /// The caller is not authenticated.
    Unauthenticated,
    /// Malformed request (bad field path, bad value).
    InvalidArgument,
    /// A precondition failed, e.g. a query needs an index.
    FailedPrecondition,
    /// The service is temporarily unavailable.
    Unavailable,
    /// The request never got a response.
    Network,
    /// A stored document did not match the expected shape.
    Decode,
    /// Anything else.
    Other,
}

/// A document store failure.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct DocumentError {
    /// Coarse classification.
    pub kind: DocumentErrorKind,
    /// The backend's message, passed through unchanged.
    pub message: String,
}

impl DocumentError {
    /// Create an error with an explicit kind.
    #[must_use]
    pub fn new(kind: DocumentErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Build an error from a Google API status name (`NOT_FOUND`, ...).
    #[must_use]
    pub fn from_status(status: &str, message: impl Into<String>) -> Self {
        let kind = match status {
            "NOT_FOUND" => DocumentErrorKind::NotFound,
            "PERMISSION_DENIED" => DocumentErrorKind::PermissionDenied,
            "UNAUTHENTICATED" => DocumentErrorKind::Unauthenticated,
            "INVALID_ARGUMENT" => DocumentErrorKind::InvalidArgument,
            "FAILED_PRECONDITION" => DocumentErrorKind::FailedPrecondition,
            "UNAVAILABLE" | "DEADLINE_EXCEEDED" => DocumentErrorKind::Unavailable,
            _ => DocumentErrorKind::Other,
        };
        Self::new(kind, message)
    }

    /// The path's ID does not address a single document.
    #[must_use]
    pub fn invalid_path(path: impl std::fmt::Display) -> Self {
        Self::new(
            DocumentErrorKind::InvalidArgument,
            format!("invalid document path: {path}"),
        )
    }

    /// A stored document could not be decoded into a model.
    #[must_use]
    pub fn decode(path: impl std::fmt::Display, err: &serde_json::Error) -> Self {
        Self::new(
            DocumentErrorKind::Decode,
            format!("malformed document {path}: {err}"),
        )
    }
}

impl From<reqwest::Error> for DocumentError {
    fn from(err: reqwest::Error) -> Self {
        Self::new(DocumentErrorKind::Network, err.to_string())
    }
}
