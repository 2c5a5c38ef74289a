//! Identity Toolkit REST client (Firebase Authentication).
//!
//! Uses the public `accounts:*` endpoints with the project's web API key,
//! the same calls the browser SDK makes.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use owldoor_core::UserId;

use crate::backend::{
    FederatedCredential, IdToken, IdentityError, IdentityErrorKind, IdentityProvider,
    IdentitySession, ProfileUpdate,
};

/// Client for the Identity Toolkit v1 API.
#[derive(Clone)]
pub struct IdentityToolkitClient {
    inner: Arc<IdentityToolkitClientInner>,
}

struct IdentityToolkitClientInner {
    client: reqwest::Client,
    /// Base URL ending in `/`, e.g. `https://identitytoolkit.googleapis.com/v1/`.
    base_url: String,
    api_key: SecretString,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    id_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    photo_url: Option<&'a str>,
    return_secure_token: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpRequest<'a> {
    post_body: String,
    request_uri: &'a str,
    return_secure_token: bool,
    return_idp_credential: bool,
}

/// Account payload shared by every `accounts:*` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: Option<String>,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    id_token: Option<String>,
    #[serde(default)]
    is_new_user: bool,
    /// Set instead of an HTTP error by `signInWithIdp` for some failures.
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl AccountResponse {
    fn into_session(self, previous: Option<&IdToken>) -> Result<IdentitySession, IdentityError> {
        if let Some(code) = self.error_message {
            return Err(IdentityError::from_code(&code));
        }

        let uid = self.local_id.ok_or_else(|| {
            IdentityError::new(IdentityErrorKind::Other, "response is missing localId")
        })?;
        let id_token = match (self.id_token, previous) {
            (Some(token), _) => IdToken::new(token),
            (None, Some(token)) => token.clone(),
            (None, None) => {
                return Err(IdentityError::new(
                    IdentityErrorKind::Other,
                    "response is missing idToken",
                ));
            }
        };

        Ok(IdentitySession {
            uid: UserId::new(uid),
            email: self.email,
            display_name: self.display_name.filter(|n| !n.is_empty()),
            photo_url: self.photo_url.filter(|u| !u.is_empty()),
            id_token,
            is_new_user: self.is_new_user,
        })
    }
}

impl IdentityToolkitClient {
    /// Create a client.
    ///
    /// `base_url` is the API root; a trailing `/` is added when missing.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: &str, api_key: SecretString) -> Self {
        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            inner: Arc::new(IdentityToolkitClientInner {
                client,
                base_url,
                api_key,
            }),
        }
    }

    /// POST to `accounts:{method}` and decode the JSON answer.
    async fn call<B: Serialize + Sync, R: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<R, IdentityError> {
        let url = format!("{}accounts:{method}", self.inner.base_url);

        let response = self
            .inner
            .client
            .post(&url)
            .query(&[("key", self.inner.api_key.expose_secret())])
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            return Err(
                match serde_json::from_str::<ErrorEnvelope>(&response_text) {
                    Ok(envelope) => IdentityError::from_code(&envelope.error.message),
                    Err(_) => {
                        tracing::error!(
                            status = %status,
                            body = %response_text.chars().take(500).collect::<String>(),
                            "Identity Toolkit returned an unrecognised error body"
                        );
                        IdentityError::new(
                            IdentityErrorKind::Other,
                            format!(
                                "HTTP {status}: {}",
                                response_text.chars().take(200).collect::<String>()
                            ),
                        )
                    }
                },
            );
        }

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(error = %e, method, "Failed to parse Identity Toolkit response");
            IdentityError::new(IdentityErrorKind::Other, format!("invalid response: {e}"))
        })
    }
}

#[async_trait]
impl IdentityProvider for IdentityToolkitClient {
    #[instrument(skip(self, email, password), fields(email = %email))]
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> Result<IdentitySession, IdentityError> {
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let response: AccountResponse = self.call("signUp", &body).await?;
        response.into_session(None)
    }

    #[instrument(skip(self, session, update), fields(uid = %session.uid))]
    async fn update_profile(
        &self,
        session: &IdentitySession,
        update: &ProfileUpdate,
    ) -> Result<IdentitySession, IdentityError> {
        let body = UpdateRequest {
            id_token: session.id_token.expose(),
            display_name: update.display_name.as_deref(),
            photo_url: update.photo_url.as_deref(),
            return_secure_token: true,
        };
        let response: AccountResponse = self.call("update", &body).await?;
        let mut updated = response.into_session(Some(&session.id_token))?;
        updated.is_new_user = session.is_new_user;
        Ok(updated)
    }

    #[instrument(skip(self, email, password), fields(email = %email))]
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<IdentitySession, IdentityError> {
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let response: AccountResponse = self.call("signInWithPassword", &body).await?;
        response.into_session(None)
    }

    #[instrument(skip(self, credential), fields(provider = credential.provider.provider_id()))]
    async fn sign_in_with_idp(
        &self,
        credential: &FederatedCredential,
    ) -> Result<IdentitySession, IdentityError> {
        let body = IdpRequest {
            post_body: idp_post_body(credential)?,
            request_uri: &credential.request_uri,
            return_secure_token: true,
            return_idp_credential: true,
        };
        let response: AccountResponse = self.call("signInWithIdp", &body).await?;
        response.into_session(None)
    }

    async fn sign_out(&self, _token: &IdToken) -> Result<(), IdentityError> {
        // Tokens are stateless on this API; dropping them locally ends the session.
        Ok(())
    }
}

/// Form-encoded `postBody` carrying the provider token.
fn idp_post_body(credential: &FederatedCredential) -> Result<String, IdentityError> {
    let mut form = url::form_urlencoded::Serializer::new(String::new());
    match (&credential.id_token, &credential.access_token) {
        (Some(id_token), _) => form.append_pair("id_token", id_token),
        (None, Some(access_token)) => form.append_pair("access_token", access_token),
        (None, None) => {
            return Err(IdentityError::new(
                IdentityErrorKind::InvalidIdpResponse,
                "federated credential carries no token",
            ));
        }
    };
    form.append_pair("providerId", credential.provider.provider_id());
    Ok(form.finish())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::FederatedProvider;

    #[test]
    fn test_idp_post_body_prefers_id_token() {
        let credential = FederatedCredential {
            provider: FederatedProvider::Google,
            id_token: Some("a.b+c".to_string()),
            access_token: Some("ya29".to_string()),
            request_uri: "http://localhost".to_string(),
        };
        assert_eq!(
            idp_post_body(&credential).unwrap(),
            "id_token=a.b%2Bc&providerId=google.com"
        );
    }

    #[test]
    fn test_idp_post_body_requires_a_token() {
        let credential = FederatedCredential {
            provider: FederatedProvider::Google,
            id_token: None,
            access_token: None,
            request_uri: "http://localhost".to_string(),
        };
        let err = idp_post_body(&credential).unwrap_err();
        assert_eq!(err.kind, IdentityErrorKind::InvalidIdpResponse);
    }

    #[test]
    fn test_update_response_keeps_previous_token() {
        let response: AccountResponse = serde_json::from_str(
            r#"{"localId":"uid-1","email":"a@owldoor.kr","displayName":"김민수"}"#,
        )
        .unwrap();
        let session = response
            .into_session(Some(&IdToken::new("previous")))
            .unwrap();

        assert_eq!(session.id_token.expose(), "previous");
        assert_eq!(session.display_name.as_deref(), Some("김민수"));
    }

    #[test]
    fn test_error_message_in_success_body() {
        let response: AccountResponse =
            serde_json::from_str(r#"{"errorMessage":"FEDERATED_USER_ID_ALREADY_LINKED"}"#)
                .unwrap();
        let err = response.into_session(None).unwrap_err();
        assert_eq!(err.message, "FEDERATED_USER_ID_ALREADY_LINKED");
    }
}
