mod common;

use axum::http::{header, Method, StatusCode};
use serde_json::json;

use common::TestApp;
use translogix::models::user::Role;

fn session_cookie(res: &common::Response) -> String {
    let raw = res.headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    raw.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn first_signup_becomes_admin_and_later_ones_keep_their_role() {
    let app = TestApp::empty();

    let first = app
        .send(
            Method::POST,
            "/api/auth/signup",
            None,
            Some(json!({"email": "Founder@Example.com", "password": "password123", "name": "Founder", "role": "company"})),
        )
        .await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(first.body["user"]["role"], "ADMIN");
    assert_eq!(first.body["user"]["email"], "founder@example.com");
    assert!(first.body["user"].get("password_hash").is_none());

    let second = app
        .send(
            Method::POST,
            "/api/auth/signup",
            None,
            Some(json!({"email": "carrier@example.com", "password": "password123", "name": "Carla", "role": "Carrier"})),
        )
        .await;
    assert_eq!(second.status, StatusCode::CREATED);
    assert_eq!(second.body["user"]["role"], "CARRIER");
}

#[tokio::test]
async fn simultaneous_first_signups_elect_a_single_admin() {
    let app = TestApp::empty();
    let signup = |email: &'static str| {
        app.send(
            Method::POST,
            "/api/auth/signup",
            None,
            Some(json!({"email": email, "password": "password123", "name": "Early", "role": "individual"})),
        )
    };

    let (a, b, c) = tokio::join!(signup("a@example.com"), signup("b@example.com"), signup("c@example.com"));
    let roles: Vec<_> = [a, b, c]
        .iter()
        .map(|res| {
            assert_eq!(res.status, StatusCode::CREATED);
            res.body["user"]["role"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(roles.iter().filter(|r| *r == "ADMIN").count(), 1);
    assert_eq!(roles.iter().filter(|r| *r == "INDIVIDUAL").count(), 2);
}

#[tokio::test]
async fn signup_rejects_duplicates_and_bad_input() {
    let app = TestApp::new().await;
    let body = json!({"email": "dup@example.com", "password": "password123", "name": "Dup", "role": "individual"});

    let ok = app.send(Method::POST, "/api/auth/signup", None, Some(body.clone())).await;
    assert_eq!(ok.status, StatusCode::CREATED);

    let dup = app.send(Method::POST, "/api/auth/signup", None, Some(body)).await;
    assert_eq!(dup.status, StatusCode::CONFLICT);
    assert_eq!(dup.body["error"], "Email already registered");

    let short = app
        .send(
            Method::POST,
            "/api/auth/signup",
            None,
            Some(json!({"email": "s@example.com", "password": "short", "name": "Shorty", "role": "individual"})),
        )
        .await;
    assert_eq!(short.status, StatusCode::BAD_REQUEST);
    assert_eq!(short.body["error"], "Password must be at least 8 characters");

    let admin = app
        .send(
            Method::POST,
            "/api/auth/signup",
            None,
            Some(json!({"email": "a@example.com", "password": "password123", "name": "Sneaky", "role": "admin"})),
        )
        .await;
    assert_eq!(admin.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_sets_cookie_that_opens_protected_routes() {
    let app = TestApp::new().await;
    app.send(
        Method::POST,
        "/api/auth/signup",
        None,
        Some(json!({"email": "ops@example.com", "password": "password123", "name": "Ops", "role": "company"})),
    )
    .await;

    let login = app
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"email": "ops@example.com", "password": "password123"})),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
    assert_eq!(login.body["user"]["email"], "ops@example.com");
    assert!(login.body.get("token").is_none());

    let set_cookie = login.headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));

    let cookie = session_cookie(&login);
    let session = app.get("/api/auth/session", &cookie).await;
    assert_eq!(session.body["user"]["email"], "ops@example.com");

    let profile = app.get("/api/users/profile", &cookie).await;
    assert_eq!(profile.status, StatusCode::OK);
    assert_eq!(profile.body["user"]["role"], "COMPANY");
}

#[tokio::test]
async fn wrong_password_and_unknown_email_are_both_invalid_credentials() {
    let app = TestApp::new().await;
    let (user, _) = app.login_as(Role::Individual).await;

    let wrong = app
        .send(Method::POST, "/api/auth/login", None, Some(json!({"email": user.email, "password": "nope-nope"})))
        .await;
    let unknown = app
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"email": "ghost@example.com", "password": "password123"})),
        )
        .await;

    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body, unknown.body);
}

#[tokio::test]
async fn protected_routes_require_a_valid_session() {
    let app = TestApp::new().await;
    let (user, _) = app.login_as(Role::Admin).await;

    let missing = app.send(Method::GET, "/api/shipments", None, None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert!(missing.body["error"].is_string());

    let garbage = app.get("/api/shipments", "session=not-a-token").await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);

    let expired = app.get("/api/shipments", &app.expired_cookie_for(&user)).await;
    assert_eq!(expired.status, StatusCode::UNAUTHORIZED);

    let fine = app.get("/api/shipments", &app.cookie_for(&user)).await;
    assert_eq!(fine.status, StatusCode::OK);
}

#[tokio::test]
async fn session_for_a_missing_user_is_rejected() {
    let app = TestApp::new().await;
    let (mut ghost, _) = app.login_as(Role::Admin).await;
    ghost.id = 9_999;

    let res = app.get("/api/trucks", &app.cookie_for(&ghost)).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn session_endpoint_never_rejects() {
    let app = TestApp::new().await;

    let anonymous = app.send(Method::GET, "/api/auth/session", None, None).await;
    assert_eq!(anonymous.status, StatusCode::OK);
    assert!(anonymous.body["user"].is_null());

    let bogus = app.get("/api/auth/session", "session=bogus").await;
    assert_eq!(bogus.status, StatusCode::OK);
    assert!(bogus.body["user"].is_null());
}

#[tokio::test]
async fn logout_expires_the_cookie() {
    let app = TestApp::new().await;
    let res = app.send(Method::POST, "/api/auth/logout", None, None).await;
    assert_eq!(res.status, StatusCode::OK);
    let set_cookie = res.headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(set_cookie.starts_with("session=;"));
    assert!(set_cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn profile_update_is_partial() {
    let app = TestApp::new().await;
    let (_, cookie) = app.login_as(Role::Individual).await;

    let res = app.put("/api/users/profile", &cookie, json!({"phone": "+212611111111"})).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["user"]["phone"], "+212611111111");
    assert_eq!(res.body["user"]["name"], "Test User");

    let bad = app.put("/api/users/profile", &cookie, json!({"name": "x"})).await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
}
