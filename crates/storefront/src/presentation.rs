//! Header widget state derived from the session.
//!
//! The storefront header has three auth-related elements: the login button
//! (shows the user's name once signed in), the sign-up button (turns into a
//! sign-out button), and the account-page link (hidden until signed in).
//! [`AuthUiView`] is their state; an [`AuthUiSink`] applies it to the page.

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::session::AuthUser;

/// Localized labels of the header widgets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiLabels {
    /// Login button text while signed out.
    pub login: String,
    /// Sign-up button text while signed out.
    pub sign_up: String,
    /// Sign-up button text while signed in.
    pub sign_out: String,
    /// Appended to the user's name on the login button.
    pub honorific: String,
}

impl Default for UiLabels {
    fn default() -> Self {
        Self {
            login: "로그인".to_string(),
            sign_up: "회원가입".to_string(),
            sign_out: "로그아웃".to_string(),
            honorific: "님".to_string(),
        }
    }
}

/// What the header widgets should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUiView {
    /// Login button text.
    pub login_label: String,
    /// Sign-up button text.
    pub signup_label: String,
    /// Whether the `data-logged-in` marker is set on both buttons.
    pub logged_in: bool,
    /// Whether the account-page link is shown.
    pub account_link_visible: bool,
}

impl AuthUiView {
    /// View for a session state.
    ///
    /// The name shown is the display name, else the part of the email
    /// before `@`, else the user ID.
    #[must_use]
    pub fn for_user(user: Option<&AuthUser>, labels: &UiLabels) -> Self {
        let Some(user) = user else {
            return Self {
                login_label: labels.login.clone(),
                signup_label: labels.sign_up.clone(),
                logged_in: false,
                account_link_visible: false,
            };
        };

        let name = user
            .display_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or_else(|| {
                user.email
                    .as_deref()
                    .and_then(|email| email.split('@').next())
            })
            .unwrap_or_else(|| user.uid.as_str());

        Self {
            login_label: format!("{name}{}", labels.honorific),
            signup_label: labels.sign_out.clone(),
            logged_in: true,
            account_link_visible: true,
        }
    }
}

/// Applies a view to the page.
pub trait AuthUiSink: Send + 'static {
    /// Show `view`.
    fn render(&mut self, view: &AuthUiView);
}

impl<F> AuthUiSink for F
where
    F: FnMut(&AuthUiView) + Send + 'static,
{
    fn render(&mut self, view: &AuthUiView) {
        self(view);
    }
}

/// Render the current session state, then again after every change.
///
/// Stops when the session's sender is dropped, i.e. when the last facade
/// handle goes away.
pub fn spawn_auth_ui(
    mut session: watch::Receiver<Option<AuthUser>>,
    labels: UiLabels,
    mut sink: impl AuthUiSink,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let view = AuthUiView::for_user(session.borrow_and_update().as_ref(), &labels);
            sink.render(&view);
            if session.changed().await.is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use owldoor_core::UserId;

    use super::*;
    use crate::backend::IdToken;

    fn user(email: Option<&str>, name: Option<&str>) -> AuthUser {
        AuthUser {
            uid: UserId::new("uid-1"),
            email: email.map(String::from),
            display_name: name.map(String::from),
            photo_url: None,
            is_new_user: false,
            id_token: IdToken::new("token"),
        }
    }

    #[test]
    fn test_signed_out_view() {
        let view = AuthUiView::for_user(None, &UiLabels::default());
        assert_eq!(view.login_label, "로그인");
        assert_eq!(view.signup_label, "회원가입");
        assert!(!view.logged_in);
        assert!(!view.account_link_visible);
    }

    #[test]
    fn test_signed_in_view_prefers_display_name() {
        let labels = UiLabels::default();

        let view = AuthUiView::for_user(Some(&user(Some("minsu@owldoor.kr"), Some("김민수"))), &labels);
        assert_eq!(view.login_label, "김민수님");
        assert_eq!(view.signup_label, "로그아웃");
        assert!(view.logged_in);
        assert!(view.account_link_visible);

        let view = AuthUiView::for_user(Some(&user(Some("minsu@owldoor.kr"), None)), &labels);
        assert_eq!(view.login_label, "minsu님");

        let view = AuthUiView::for_user(Some(&user(None, None)), &labels);
        assert_eq!(view.login_label, "uid-1님");
    }

    #[tokio::test]
    async fn test_spawned_ui_follows_session_until_sender_drops() {
        let (tx, rx) = watch::channel(None);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);

        let handle = spawn_auth_ui(rx, UiLabels::default(), move |view: &AuthUiView| {
            sink_seen.lock().unwrap().push(view.login_label.clone());
        });

        tokio::task::yield_now().await;
        tx.send_replace(Some(user(Some("jiwoo@owldoor.kr"), None)));
        tokio::task::yield_now().await;
        drop(tx);
        handle.await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.first().map(String::as_str), Some("로그인"));
        assert_eq!(seen.last().map(String::as_str), Some("jiwoo님"));
    }
}
