mod common;

use axum::http::StatusCode;
use rstest::rstest;
use serde_json::json;

use common::TestApp;
use translogix::models::user::Role;

// An empty body is invalid everywhere, so allowed roles get 400 and
// disallowed roles must get 403 before the body is even looked at.
#[rstest]
#[case(Role::Admin, "/api/trucks", StatusCode::BAD_REQUEST)]
#[case(Role::Company, "/api/trucks", StatusCode::BAD_REQUEST)]
#[case(Role::Carrier, "/api/trucks", StatusCode::BAD_REQUEST)]
#[case(Role::Individual, "/api/trucks", StatusCode::FORBIDDEN)]
#[case(Role::Carrier, "/api/drivers", StatusCode::BAD_REQUEST)]
#[case(Role::Individual, "/api/drivers", StatusCode::FORBIDDEN)]
#[case(Role::Company, "/api/routes", StatusCode::BAD_REQUEST)]
#[case(Role::Individual, "/api/routes", StatusCode::FORBIDDEN)]
#[case(Role::Carrier, "/api/locations", StatusCode::BAD_REQUEST)]
#[case(Role::Individual, "/api/locations", StatusCode::FORBIDDEN)]
#[case(Role::Individual, "/api/shipments", StatusCode::BAD_REQUEST)]
#[case(Role::Company, "/api/shipments", StatusCode::BAD_REQUEST)]
#[case(Role::Carrier, "/api/shipments", StatusCode::FORBIDDEN)]
#[case(Role::Company, "/api/invoices", StatusCode::BAD_REQUEST)]
#[case(Role::Carrier, "/api/invoices", StatusCode::FORBIDDEN)]
#[case(Role::Individual, "/api/invoices", StatusCode::FORBIDDEN)]
#[case(Role::Carrier, "/api/maintenance", StatusCode::BAD_REQUEST)]
#[case(Role::Individual, "/api/maintenance", StatusCode::FORBIDDEN)]
#[case(Role::Individual, "/api/transactions", StatusCode::BAD_REQUEST)]
#[case(Role::Carrier, "/api/transactions", StatusCode::FORBIDDEN)]
#[tokio::test]
async fn create_endpoints_follow_allow_lists(#[case] role: Role, #[case] uri: &str, #[case] expected: StatusCode) {
    let app = TestApp::new().await;
    let (_, cookie) = app.login_as(role).await;

    let res = app.post(uri, &cookie, json!({})).await;
    assert_eq!(res.status, expected, "{role:?} POST {uri}: {}", res.body);
    if expected == StatusCode::FORBIDDEN {
        assert_eq!(res.body["error"], "Forbidden: Insufficient permissions");
    }
}

#[rstest]
#[case(Role::Individual, "/api/trucks", StatusCode::FORBIDDEN)]
#[case(Role::Carrier, "/api/trucks", StatusCode::OK)]
#[case(Role::Individual, "/api/drivers", StatusCode::FORBIDDEN)]
#[case(Role::Individual, "/api/routes", StatusCode::FORBIDDEN)]
#[case(Role::Individual, "/api/locations", StatusCode::OK)]
#[case(Role::Carrier, "/api/shipments", StatusCode::OK)]
#[case(Role::Individual, "/api/invoices", StatusCode::OK)]
#[case(Role::Company, "/api/maintenance", StatusCode::OK)]
#[case(Role::Individual, "/api/maintenance", StatusCode::FORBIDDEN)]
#[case(Role::Individual, "/api/transactions", StatusCode::OK)]
#[case(Role::Carrier, "/api/transactions", StatusCode::FORBIDDEN)]
#[case(Role::Admin, "/api/users", StatusCode::OK)]
#[case(Role::Company, "/api/users", StatusCode::FORBIDDEN)]
#[case(Role::Carrier, "/api/admin/users/1", StatusCode::FORBIDDEN)]
#[case(Role::Individual, "/api/users/profile", StatusCode::OK)]
#[tokio::test]
async fn read_endpoints_follow_allow_lists(#[case] role: Role, #[case] uri: &str, #[case] expected: StatusCode) {
    let app = TestApp::new().await;
    let (_, cookie) = app.login_as(role).await;

    let res = app.get(uri, &cookie).await;
    assert_eq!(res.status, expected, "{role:?} GET {uri}");
}

// Unknown ids: admins fall through to 404, everyone else stops at the gate.
#[rstest]
#[case(Role::Admin, StatusCode::NOT_FOUND)]
#[case(Role::Company, StatusCode::FORBIDDEN)]
#[case(Role::Carrier, StatusCode::FORBIDDEN)]
#[case(Role::Individual, StatusCode::FORBIDDEN)]
#[tokio::test]
async fn truck_and_user_edits_are_admin_only(#[case] role: Role, #[case] expected: StatusCode) {
    let app = TestApp::new().await;
    let (_, cookie) = app.login_as(role).await;

    for uri in ["/api/trucks/424242", "/api/admin/users/424242"] {
        let put = app.put(uri, &cookie, json!({"model": "X", "name": "Renamed"})).await;
        assert_eq!(put.status, expected, "{role:?} PUT {uri}: {}", put.body);
        let delete = app.delete(uri, &cookie).await;
        assert_eq!(delete.status, expected, "{role:?} DELETE {uri}: {}", delete.body);
    }
}

#[tokio::test]
async fn forbidden_wins_over_unknown_ids() {
    let app = TestApp::new().await;
    let (_, cookie) = app.login_as(Role::Individual).await;

    assert_eq!(app.delete("/api/trucks/424242", &cookie).await.status, StatusCode::FORBIDDEN);
    assert_eq!(app.put("/api/locations/424242", &cookie, json!({})).await.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unauthenticated_beats_forbidden() {
    let app = TestApp::new().await;
    let res = app
        .send(axum::http::Method::POST, "/api/trucks", None, Some(json!({})))
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}
