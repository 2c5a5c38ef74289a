//! Unified error handling with Sentry integration.
//!
//! Every facade operation works in `Result<T, StorefrontError>` and converts
//! to an [`Outcome`](crate::Outcome) at the very end. [`StorefrontError::report`]
//! is the single place failures are logged and sent to Sentry.

use thiserror::Error;

use crate::backend::DocumentError;
use crate::services::auth::AuthError;

/// Shown when a product ID has no document.
pub const PRODUCT_NOT_FOUND_MESSAGE: &str = "상품을 찾을 수 없습니다.";

/// Shown when a signed-in user has no profile document.
pub const PROFILE_NOT_FOUND_MESSAGE: &str = "사용자 정보를 찾을 수 없습니다.";

/// Shown when an operation needs a signed-in user and there is none.
pub const NOT_SIGNED_IN_MESSAGE: &str = "로그인이 필요합니다.";

/// Facade-level error type.
///
/// `Display` is the text that ends up in `Outcome::Failure`; backend
/// messages pass through unchanged.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Sign-up, sign-in, or sign-out failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A document write was rejected.
    #[error(transparent)]
    Write(DocumentError),

    /// A document read or query failed.
    #[error(transparent)]
    Read(DocumentError),

    /// The requested entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The operation needs a signed-in user.
    #[error("{}", NOT_SIGNED_IN_MESSAGE)]
    NotSignedIn,

    /// A status change would move an entity backwards.
    #[error("{id}: status cannot change from {from} to {to}")]
    StatusRegression {
        /// Entity whose status was being changed.
        id: String,
        /// Stored status.
        from: String,
        /// Requested status.
        to: String,
    },
}

impl StorefrontError {
    /// Log the failure of `operation`; backend failures also go to Sentry.
    pub fn report(&self, operation: &str) {
        match self {
            Self::Write(_) | Self::Read(_) | Self::StatusRegression { .. } => {
                let event_id = sentry::capture_error(self);
                tracing::error!(
                    error = %self,
                    operation,
                    sentry_event_id = %event_id,
                    "Storefront operation failed"
                );
            }
            Self::Auth(AuthError::Profile(_)) => {
                let event_id = sentry::capture_error(self);
                tracing::error!(
                    error = %self,
                    operation,
                    sentry_event_id = %event_id,
                    "Profile document write failed"
                );
            }
            Self::Auth(_) => {
                tracing::warn!(error = %self, operation, "Authentication failed");
            }
            Self::NotFound(_) | Self::NotSignedIn => {
                tracing::debug!(error = %self, operation, "Operation rejected");
            }
        }
    }
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DocumentErrorKind, IdentityError};

    #[test]
    fn test_backend_messages_pass_through() {
        let err = StorefrontError::Write(DocumentError::new(
            DocumentErrorKind::NotFound,
            "No document to update: orders/ORD_1",
        ));
        assert_eq!(err.to_string(), "No document to update: orders/ORD_1");

        let err = StorefrontError::from(AuthError::from(IdentityError::from_code("EMAIL_EXISTS")));
        assert_eq!(err.to_string(), "EMAIL_EXISTS");
    }

    #[test]
    fn test_domain_messages() {
        let err = StorefrontError::NotFound(PRODUCT_NOT_FOUND_MESSAGE.to_string());
        assert_eq!(err.to_string(), "상품을 찾을 수 없습니다.");

        let err = StorefrontError::StatusRegression {
            id: "ORD_1".into(),
            from: "shipping".into(),
            to: "paid".into(),
        };
        assert_eq!(err.to_string(), "ORD_1: status cannot change from shipping to paid");
    }

    #[test]
    fn test_report_does_not_panic_without_sentry() {
        StorefrontError::NotSignedIn.report("current_profile");
        StorefrontError::Read(DocumentError::new(DocumentErrorKind::Unavailable, "down"))
            .report("list_products");
    }
}
