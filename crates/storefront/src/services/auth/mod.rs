//! Authentication service.
//!
//! Email/password and federated (Google) sign-in against the identity
//! provider, plus the `users/{uid}` profile document that goes with each
//! account. Publishing the session is the caller's job: the identity step
//! and the profile step are separate so the caller can sign the user in
//! even when the profile write fails afterwards.

mod error;

pub use error::{AuthError, UNAUTHORIZED_DOMAIN_MESSAGE};

use tracing::{info, instrument};

use owldoor_core::UserId;

use crate::backend::{
    DocumentError, DocumentPath, DocumentStore, FederatedCredential, IdToken, IdentityErrorKind,
    IdentityProvider, IdentitySession, ProfileUpdate,
};
use crate::models::UserProfile;
use crate::models::user::USERS;

/// Authentication service.
pub struct AuthService<'a> {
    identity: &'a dyn IdentityProvider,
    documents: &'a dyn DocumentStore,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(identity: &'a dyn IdentityProvider, documents: &'a dyn DocumentStore) -> Self {
        Self {
            identity,
            documents,
        }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Create an email/password account. The account is signed in once
    /// this returns.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Identity` with the provider's message (malformed
    /// or duplicate email, weak password, ...).
    #[instrument(skip(self, password))]
    pub async fn register(&self, email: &str, password: &str) -> Result<IdentitySession, AuthError> {
        let session = self.identity.sign_up(email.trim(), password).await?;

        info!(uid = %session.uid, "Account created");
        Ok(session)
    }

    /// Set the display name of a signed-in account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Identity` if the provider rejects the update.
    pub async fn set_display_name(
        &self,
        session: &IdentitySession,
        name: &str,
    ) -> Result<IdentitySession, AuthError> {
        let update = ProfileUpdate {
            display_name: Some(name.to_string()),
            ..ProfileUpdate::default()
        };
        self.identity
            .update_profile(session, &update)
            .await
            .map_err(AuthError::Identity)
    }

    /// Write the profile document of a freshly registered account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Profile` if the write is rejected.
    pub async fn create_profile(
        &self,
        session: &IdentitySession,
        email: &str,
        name: &str,
    ) -> Result<(), AuthError> {
        let write = UserProfile::email_signup(email, name).map_err(AuthError::Profile)?;
        self.documents
            .set(Some(&session.id_token), &profile_path(session), &write)
            .await
            .map_err(AuthError::Profile)
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Identity` with the provider's message on a
    /// malformed email or bad credentials.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<IdentitySession, AuthError> {
        let session = self
            .identity
            .sign_in_with_password(email.trim(), password)
            .await?;

        info!(uid = %session.uid, "Signed in with password");
        Ok(session)
    }

    // =========================================================================
    // Federated Authentication
    // =========================================================================

    /// Exchange a credential from the provider popup for a session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnauthorizedDomain` when the provider rejects the
    /// page's domain, `AuthError::Identity` for any other refusal.
    #[instrument(skip(self, credential), fields(provider = credential.provider.provider_id()))]
    pub async fn sign_in_federated(
        &self,
        credential: &FederatedCredential,
    ) -> Result<IdentitySession, AuthError> {
        let session = self
            .identity
            .sign_in_with_idp(credential)
            .await
            .map_err(|err| {
                if err.kind == IdentityErrorKind::UnauthorizedDomain {
                    AuthError::UnauthorizedDomain
                } else {
                    AuthError::Identity(err)
                }
            })?;

        info!(uid = %session.uid, new_user = session.is_new_user, "Signed in with provider");
        Ok(session)
    }

    /// Exchange a credential from a provider redirect for a session.
    ///
    /// Unlike the popup flow, provider messages are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Identity` if the provider refuses the credential.
    #[instrument(skip(self, credential), fields(provider = credential.provider.provider_id()))]
    pub async fn complete_redirect(
        &self,
        credential: &FederatedCredential,
    ) -> Result<IdentitySession, AuthError> {
        let session = self.identity.sign_in_with_idp(credential).await?;

        info!(uid = %session.uid, new_user = session.is_new_user, "Redirect sign-in completed");
        Ok(session)
    }

    /// Create the profile document of a federated account unless it exists.
    ///
    /// Returns whether a document was written.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Profile` if the read or the write fails.
    pub async fn ensure_profile(&self, session: &IdentitySession) -> Result<bool, AuthError> {
        let path = profile_path(session);
        let token = Some(&session.id_token);

        if self
            .documents
            .get(token, &path)
            .await
            .map_err(AuthError::Profile)?
            .is_some()
        {
            return Ok(false);
        }

        let write = UserProfile::federated(
            session.email.as_deref(),
            session.display_name.as_deref(),
            session.photo_url.as_deref(),
        )
        .map_err(AuthError::Profile)?;
        self.documents
            .set(token, &path, &write)
            .await
            .map_err(AuthError::Profile)?;

        info!(uid = %session.uid, "Profile created for federated account");
        Ok(true)
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// End the session on the provider side.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Identity` if the provider call fails.
    pub async fn sign_out(&self, token: &IdToken) -> Result<(), AuthError> {
        self.identity.sign_out(token).await?;
        Ok(())
    }

    /// Read the profile document of a signed-in user.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the read fails or the document is
    /// malformed.
    pub async fn profile(
        &self,
        uid: &UserId,
        token: &IdToken,
    ) -> Result<Option<UserProfile>, DocumentError> {
        self.documents
            .get(Some(token), &DocumentPath::new(USERS, uid.as_str()))
            .await?
            .map(|document| document.decode::<UserProfile>())
            .transpose()
    }
}

fn profile_path(session: &IdentitySession) -> DocumentPath {
    DocumentPath::new(USERS, session.uid.as_str())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::backend::memory::{FederatedProfile, MemoryBackend};
    use crate::backend::{FederatedProvider, IdentityError};

    fn credential(token: &str) -> FederatedCredential {
        FederatedCredential {
            provider: FederatedProvider::Google,
            id_token: Some(token.to_string()),
            access_token: None,
            request_uri: "http://127.0.0.1:5500/login.html".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_sets_display_name() {
        let backend = MemoryBackend::new();
        let auth = AuthService::new(&backend, &backend);

        let session = auth.register("minsu@owldoor.kr", "secret123").await.unwrap();
        assert_eq!(session.display_name, None);
        let session = auth.set_display_name(&session, "김민수").await.unwrap();
        auth.create_profile(&session, "minsu@owldoor.kr", "김민수")
            .await
            .unwrap();

        assert_eq!(session.display_name.as_deref(), Some("김민수"));
        let profile = auth.profile(&session.uid, &session.id_token).await.unwrap().unwrap();
        assert_eq!(profile.points, 0);
        assert!(profile.coupons.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_email_message_comes_from_provider() {
        let backend = MemoryBackend::new();
        let auth = AuthService::new(&backend, &backend);

        let err = auth.register("minsu", "secret123").await.unwrap_err();
        assert!(matches!(err, AuthError::Identity(_)));
        assert_eq!(err.to_string(), "INVALID_EMAIL");

        let err = auth.sign_in("minsu@", "secret123").await.unwrap_err();
        assert_eq!(err.to_string(), "INVALID_EMAIL");
    }

    #[tokio::test]
    async fn test_unauthorized_domain_only_rewritten_for_popup() {
        let backend = MemoryBackend::new();
        let auth = AuthService::new(&backend, &backend);

        backend.fail_next_identity(IdentityError::from_code("UNAUTHORIZED_DOMAIN"));
        let err = auth.sign_in_federated(&credential("t")).await.unwrap_err();
        assert_eq!(err.to_string(), UNAUTHORIZED_DOMAIN_MESSAGE);

        backend.fail_next_identity(IdentityError::from_code("UNAUTHORIZED_DOMAIN"));
        let err = auth.complete_redirect(&credential("t")).await.unwrap_err();
        assert_eq!(err.to_string(), "UNAUTHORIZED_DOMAIN");
    }

    #[tokio::test]
    async fn test_ensure_profile_keeps_existing_document() {
        let backend = MemoryBackend::new();
        let auth = AuthService::new(&backend, &backend);
        let uid = backend.register_federated(
            "google-token",
            FederatedProfile {
                email: Some("jiwoo@gmail.com".into()),
                display_name: Some("이지우".into()),
                photo_url: Some("https://lh3.googleusercontent.com/a/photo".into()),
            },
        );

        let session = auth.sign_in_federated(&credential("google-token")).await.unwrap();
        assert!(auth.ensure_profile(&session).await.unwrap());

        let path = DocumentPath::new(USERS, uid.as_str());
        let mut fields = backend.document(&path).unwrap();
        assert_eq!(fields["photoURL"], json!("https://lh3.googleusercontent.com/a/photo"));
        fields.insert("points".into(), json!(1500));
        backend.insert_document(&path, fields);

        let session = auth.sign_in_federated(&credential("google-token")).await.unwrap();
        assert!(!auth.ensure_profile(&session).await.unwrap());
        assert_eq!(backend.document(&path).unwrap()["points"], json!(1500));
    }
}
