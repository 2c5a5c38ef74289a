//! Integration tests for the header widget driven by session changes.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use owldoor_integration_tests::TestContext;
use owldoor_storefront::presentation::{AuthUiView, UiLabels, spawn_auth_ui};

async fn wait_for(views: &Mutex<Vec<AuthUiView>>, count: usize) {
    for _ in 0..100 {
        if views.lock().unwrap().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn test_widget_follows_sign_in_and_out() {
    let ctx = TestContext::new();
    let views = Arc::new(Mutex::new(Vec::new()));
    let sink_views = Arc::clone(&views);

    let _ui = spawn_auth_ui(
        ctx.storefront.subscribe(),
        UiLabels::default(),
        move |view: &AuthUiView| sink_views.lock().unwrap().push(view.clone()),
    );
    wait_for(&views, 1).await;

    ctx.storefront
        .sign_up("minsu@owldoor.kr", "secret123", "김민수")
        .await;
    wait_for(&views, 2).await;

    ctx.storefront.sign_out().await;
    wait_for(&views, 3).await;

    let views = views.lock().unwrap();
    let first = views.first().unwrap();
    assert_eq!(first.login_label, "로그인");
    assert!(!first.account_link_visible);

    let signed_in = views.iter().find(|v| v.logged_in).unwrap();
    assert_eq!(signed_in.login_label, "김민수님");
    assert_eq!(signed_in.signup_label, "로그아웃");
    assert!(signed_in.account_link_visible);

    let last = views.last().unwrap();
    assert!(!last.logged_in);
    assert_eq!(last.signup_label, "회원가입");
}

#[tokio::test]
async fn test_widget_stops_when_facade_dropped() {
    let ctx = TestContext::new();
    let ui = spawn_auth_ui(ctx.storefront.subscribe(), UiLabels::default(), |_: &AuthUiView| {});

    drop(ctx);

    tokio::time::timeout(Duration::from_secs(1), ui)
        .await
        .unwrap()
        .unwrap();
}
