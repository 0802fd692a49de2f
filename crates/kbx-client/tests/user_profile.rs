//! Integration tests for profile and account operations.

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use kbx_client::api::types::{ProfileUpdate, Registration};
use kbx_client::error::ErrorCategory;
use kbx_client::session::SessionState;

mod fixtures;
use fixtures::{harness, sign_in};

/// Test: registration signs the new user in like a login.
#[tokio::test]
async fn test_register_signs_in() {
    let h = harness().await;

    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .and(body_json(json!({
            "username": "bob",
            "email": "bob@example.com",
            "password": "pw2",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "RT",
            "user": {"id": 2, "username": "bob", "email": "bob@example.com"},
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let registration = Registration {
        username: "bob".to_string(),
        email: "bob@example.com".to_string(),
        password: "pw2".to_string(),
    };
    let session = h.manager.register(&registration).await.unwrap();

    assert_eq!(session.token.as_deref(), Some("RT"));
    assert_eq!(h.manager.state(), SessionState::Authenticated);
    assert_eq!(h.session.store().token().as_deref(), Some("RT"));
}

/// Test: fetch_profile without a token fails locally, no request sent.
#[tokio::test]
async fn test_fetch_profile_requires_token() {
    let h = harness().await;

    let err = h.manager.fetch_profile().await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::Unauthorized);
    assert!(h.server.received_requests().await.unwrap_or_default().is_empty());
}

/// Test: a Forbidden profile fetch clears the session and re-raises.
#[tokio::test]
async fn test_fetch_profile_forbidden_clears_session() {
    let h = harness().await;
    sign_in(&h, "T1").await;

    Mock::given(method("GET"))
        .and(path("/users/profile"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"message": "Access denied"})),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let err = h.manager.fetch_profile().await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::Forbidden);
    assert_eq!(h.manager.state(), SessionState::Anonymous);
    assert!(h.session.store().token().is_none());
}

/// Test: a profile update refreshes the cached and persisted user.
#[tokio::test]
async fn test_update_profile_updates_cache() {
    let h = harness().await;
    sign_in(&h, "T1").await;

    Mock::given(method("PUT"))
        .and(path("/users/profile"))
        .and(body_json(json!({"email": "new@example.com"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "username": "alice",
            "email": "new@example.com",
            "roles": ["user"],
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let update = ProfileUpdate {
        email: Some("new@example.com".to_string()),
        ..ProfileUpdate::default()
    };
    let user = h.manager.update_profile(&update).await.unwrap();
    assert_eq!(user.email.as_deref(), Some("new@example.com"));

    let cached = h.manager.snapshot().user.unwrap();
    assert_eq!(cached.email.as_deref(), Some("new@example.com"));
    assert_eq!(
        h.session.store().user().and_then(|u| u.email),
        Some("new@example.com".to_string())
    );
}

/// Test: an avatar upload patches the cached avatar reference.
#[tokio::test]
async fn test_upload_avatar_patches_reference() {
    let h = harness().await;
    sign_in(&h, "T1").await;

    Mock::given(method("POST"))
        .and(path("/users/avatar"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"avatar": "avatars/1.png"})),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let avatar = h
        .manager
        .upload_avatar("me.png", vec![0xff, 0xd8, 0xff])
        .await
        .unwrap();
    assert_eq!(avatar, "avatars/1.png");

    let cached = h.manager.snapshot().user.unwrap();
    assert_eq!(cached.avatar.as_deref(), Some("avatars/1.png"));
}

/// Test: password change posts the expected body and leaves the session
/// untouched.
#[tokio::test]
async fn test_change_password() {
    let h = harness().await;
    sign_in(&h, "T1").await;

    Mock::given(method("POST"))
        .and(path("/auth/change-password"))
        .and(body_json(json!({"oldPassword": "pw", "newPassword": "pw2"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"message": "Password updated"})),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    h.manager.change_password("pw", "pw2").await.unwrap();
    assert_eq!(h.manager.state(), SessionState::Authenticated);
}

/// Test: the stateless password-reset pair round-trips.
#[tokio::test]
async fn test_password_reset_flow() {
    let h = harness().await;

    Mock::given(method("POST"))
        .and(path("/auth/forgot-password"))
        .and(body_json(json!({"email": "alice@example.com"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Mail sent"})))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/reset-password"))
        .and(body_json(json!({"token": "reset-token", "password": "pw3"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Reset"})))
        .expect(1)
        .mount(&h.server)
        .await;

    h.manager.forgot_password("alice@example.com").await.unwrap();
    h.manager
        .reset_password("reset-token", "pw3")
        .await
        .unwrap();
    assert_eq!(h.manager.state(), SessionState::Anonymous);
}
