//! The signed-in user and its change notifications.
//!
//! The facade owns one [`SessionState`]. Every sign-in, sign-up, and
//! sign-out overwrites it and notifies subscribers; a subscriber that
//! falls behind only ever sees the latest state.

use serde::Serialize;
use tokio::sync::watch;
use tracing::info;

use owldoor_core::UserId;

use crate::backend::{IdToken, IdentitySession};

/// The user as the page sees it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    /// Provider-assigned user ID.
    pub uid: UserId,
    /// Account email, when the provider shares one.
    pub email: Option<String>,
    /// Display name.
    pub display_name: Option<String>,
    /// Avatar URL.
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    /// Whether this sign-in created the account.
    pub is_new_user: bool,
    #[serde(skip)]
    pub(crate) id_token: IdToken,
}

impl AuthUser {
    /// Bearer token for backend calls made on this user's behalf.
    #[must_use]
    pub const fn id_token(&self) -> &IdToken {
        &self.id_token
    }
}

impl From<IdentitySession> for AuthUser {
    fn from(session: IdentitySession) -> Self {
        Self {
            uid: session.uid,
            email: session.email,
            display_name: session.display_name,
            photo_url: session.photo_url,
            is_new_user: session.is_new_user,
            id_token: session.id_token,
        }
    }
}

/// Current session, published on a watch channel.
#[derive(Debug)]
pub struct SessionState {
    tx: watch::Sender<Option<AuthUser>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    /// Start signed out.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// The signed-in user, if any.
    #[must_use]
    pub fn current(&self) -> Option<AuthUser> {
        self.tx.borrow().clone()
    }

    /// Token of the signed-in user, if any.
    #[must_use]
    pub fn token(&self) -> Option<IdToken> {
        self.tx.borrow().as_ref().map(|user| user.id_token.clone())
    }

    /// Receive every state change from now on.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.tx.subscribe()
    }

    /// Replace the state and notify subscribers.
    pub fn publish(&self, user: Option<AuthUser>) {
        match &user {
            Some(user) => info!(
                uid = %user.uid,
                email = user.email.as_deref().unwrap_or_default(),
                "Auth state changed"
            ),
            None => info!("Auth state changed: logged out"),
        }
        self.tx.send_replace(user);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user(uid: &str) -> AuthUser {
        AuthUser {
            uid: UserId::new(uid),
            email: Some(format!("{uid}@owldoor.kr")),
            display_name: None,
            photo_url: None,
            is_new_user: false,
            id_token: IdToken::new("token"),
        }
    }

    #[test]
    fn test_publish_without_subscribers() {
        let state = SessionState::new();
        state.publish(Some(user("a")));
        assert_eq!(state.current().unwrap().uid.as_str(), "a");
        assert_eq!(state.token().unwrap().expose(), "token");
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let state = SessionState::new();
        let mut rx = state.subscribe();

        state.publish(Some(user("a")));
        state.publish(Some(user("b")));
        state.publish(None);
        state.publish(Some(user("c")));

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_ref().unwrap().uid.as_str(), "c");
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_serialized_user_hides_token() {
        let json = serde_json::to_value(user("a")).unwrap();
        assert!(json.get("idToken").is_none());
        assert!(json.get("id_token").is_none());
        assert_eq!(json["photoURL"], serde_json::Value::Null);
    }
}
