mod common;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use common::{config, TestApp};
use translogix::models::user::Role;

const GENERIC: &str = "If your email is registered, you will receive a password reset link.";

async fn request(app: &TestApp, email: &str) -> common::Response {
    app.send(Method::POST, "/api/auth/reset-password/request", None, Some(json!({"email": email})))
        .await
}

async fn confirm(app: &TestApp, token: &str, new_password: &str) -> common::Response {
    app.send(
        Method::POST,
        "/api/auth/reset-password/confirm",
        None,
        Some(json!({"token": token, "new_password": new_password})),
    )
    .await
}

async fn login(app: &TestApp, email: &str, password: &str) -> StatusCode {
    app.send(Method::POST, "/api/auth/login", None, Some(json!({"email": email, "password": password})))
        .await
        .status
}

#[tokio::test]
async fn known_and_unknown_emails_get_the_same_answer() {
    let app = TestApp::new().await;
    let (user, _) = app.login_as(Role::Individual).await;

    let known = request(&app, &user.email).await;
    let unknown = request(&app, "nobody@example.com").await;

    assert_eq!(known.status, StatusCode::OK);
    assert_eq!(unknown.status, StatusCode::OK);
    assert_eq!(known.body, unknown.body);
    assert_eq!(known.body, json!({"message": GENERIC}));
    assert_eq!(app.mailer.count(), 1);
}

#[tokio::test]
async fn malformed_email_is_rejected() {
    let app = TestApp::new().await;
    let res = request(&app, "not-an-email").await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn token_resets_password_exactly_once() {
    let app = TestApp::new().await;
    let (user, _) = app.login_as(Role::Company).await;

    request(&app, &user.email).await;
    let token = app.mailer.last_token_for(&user.email).unwrap();
    assert_eq!(token.len(), 64);

    let first = confirm(&app, &token, "brand-new-pass").await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["message"], "Password has been reset successfully.");

    assert_eq!(login(&app, &user.email, "brand-new-pass").await, StatusCode::OK);
    assert_eq!(login(&app, &user.email, "password123").await, StatusCode::UNAUTHORIZED);

    let replay = confirm(&app, &token, "another-pass-1").await;
    assert_eq!(replay.status, StatusCode::BAD_REQUEST);
    assert_eq!(replay.body, json!({"error": "Invalid or expired reset token."}));
}

#[tokio::test]
async fn newer_request_invalidates_older_token() {
    let app = TestApp::new().await;
    let (user, _) = app.login_as(Role::Individual).await;

    request(&app, &user.email).await;
    let old = app.mailer.last_token_for(&user.email).unwrap();
    request(&app, &user.email).await;
    let new = app.mailer.last_token_for(&user.email).unwrap();
    assert_ne!(old, new);

    assert_eq!(confirm(&app, &old, "brand-new-pass").await.status, StatusCode::BAD_REQUEST);
    assert_eq!(confirm(&app, &new, "brand-new-pass").await.status, StatusCode::OK);
}

#[tokio::test]
async fn expired_and_unknown_tokens_look_identical() {
    let app = TestApp::with_config(config(0));
    let (user, _) = app.login_as(Role::Individual).await;

    request(&app, &user.email).await;
    let expired = app.mailer.last_token_for(&user.email).unwrap();

    let expired_res = confirm(&app, &expired, "brand-new-pass").await;
    let unknown_res = confirm(&app, &"ab".repeat(32), "brand-new-pass").await;
    let short_res = confirm(&app, "abc", "brand-new-pass").await;

    let expected: Value = json!({"error": "Invalid or expired reset token."});
    for res in [&expired_res, &unknown_res, &short_res] {
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body, expected);
    }
    assert_eq!(login(&app, &user.email, "password123").await, StatusCode::OK);
}

#[tokio::test]
async fn confirm_validates_its_body() {
    let app = TestApp::new().await;

    let empty_token = confirm(&app, "", "brand-new-pass").await;
    assert_eq!(empty_token.status, StatusCode::BAD_REQUEST);

    let short_password = confirm(&app, &"ab".repeat(32), "short").await;
    assert_eq!(short_password.status, StatusCode::BAD_REQUEST);
    assert_eq!(short_password.body["error"], "Password must be at least 8 characters");
}

#[tokio::test]
async fn racing_confirmations_redeem_the_token_once() {
    let app = TestApp::new().await;
    let (user, _) = app.login_as(Role::Individual).await;
    request(&app, &user.email).await;
    let token = app.mailer.last_token_for(&user.email).unwrap();

    let (a, b) = tokio::join!(confirm(&app, &token, "first-winner-1"), confirm(&app, &token, "second-winner"));
    let mut statuses = [a.status, b.status];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::BAD_REQUEST]);

    let winner = if a.status == StatusCode::OK { "first-winner-1" } else { "second-winner" };
    assert_eq!(login(&app, &user.email, winner).await, StatusCode::OK);
}

#[tokio::test]
async fn deactivated_account_cannot_redeem_its_token() {
    let app = TestApp::new().await;
    let (_, admin) = app.login_as(Role::Admin).await;
    let (user, _) = app.login_as(Role::Company).await;
    request(&app, &user.email).await;
    let token = app.mailer.last_token_for(&user.email).unwrap();

    app.delete(&format!("/api/admin/users/{}", user.id), &admin).await;

    assert_eq!(confirm(&app, &token, "brand-new-pass").await.status, StatusCode::BAD_REQUEST);
}
