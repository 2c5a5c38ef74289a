//! Authentication error types.

use thiserror::Error;

use crate::backend::{DocumentError, IdentityError};

/// Shown instead of the provider's message when federated sign-in is
/// blocked because the page's domain is not on the allow-list.
pub const UNAUTHORIZED_DOMAIN_MESSAGE: &str = "Google 로그인을 사용하려면 Firebase Console에서 현재 도메인을 승인해야 합니다.\n\n\
1. Firebase Console (console.firebase.google.com) 접속\n\
2. 프로젝트 선택 → Authentication → Settings\n\
3. Authorized domains에 \"127.0.0.1\" 또는 \"localhost\" 추가\n\n\
지금은 이메일 로그인을 사용해 주세요.";

/// Errors that can occur during authentication operations.
///
/// `Display` is the message the page shows.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The identity service refused the request.
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// Federated sign-in from a domain the provider does not allow.
    #[error("{}", UNAUTHORIZED_DOMAIN_MESSAGE)]
    UnauthorizedDomain,

    /// The account exists but its profile document could not be written.
    #[error(transparent)]
    Profile(DocumentError),
}
