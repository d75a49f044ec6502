mod common;

use axum::http::StatusCode;
use chrono::Utc;
use serde_json::json;

use common::TestApp;
use translogix::models::user::Role;

#[tokio::test]
async fn scheduling_defaults_and_owner_scope() {
    let app = TestApp::new().await;
    let (_, admin) = app.login_as(Role::Admin).await;
    let (owner, carrier) = app.login_as(Role::Carrier).await;
    let (_, rival) = app.login_as(Role::Company).await;
    let truck_id = app.truck(&carrier, "MX-1").await;

    let record = app.maintenance(&carrier, truck_id, json!({"scheduled_date": "2999-01-01"})).await;
    assert_eq!(record["priority"], "MEDIUM");
    assert_eq!(record["status"], "SCHEDULED");
    assert_eq!(record["license_plate"], "MX-1");
    assert_eq!(record["owner_id"], owner.id);
    let uri = format!("/api/maintenance/{}", record["id"]);

    // A far-off job leaves the truck on the road.
    assert_eq!(app.get(&format!("/api/trucks/{truck_id}"), &carrier).await.body["status"], "AVAILABLE");

    let foreign = app
        .post(
            "/api/maintenance",
            &rival,
            json!({"truck_id": truck_id, "maintenance_type": "x", "service_type": "y", "description": "z"}),
        )
        .await;
    assert_eq!(foreign.status, StatusCode::FORBIDDEN);
    assert_eq!(foreign.body["error"], "Unauthorized to schedule maintenance for this truck");

    assert_eq!(app.get(&uri, &rival).await.status, StatusCode::FORBIDDEN);
    assert_eq!(app.get(&uri, &admin).await.status, StatusCode::OK);
    assert_eq!(app.get("/api/maintenance", &rival).await.body["pagination"]["total"], 0);
    assert_eq!(app.get("/api/maintenance", &carrier).await.body["pagination"]["total"], 1);
    assert_eq!(app.get("/api/maintenance", &admin).await.body["pagination"]["total"], 1);
}

#[tokio::test]
async fn unknown_truck_and_bad_input_are_rejected() {
    let app = TestApp::new().await;
    let (_, admin) = app.login_as(Role::Admin).await;

    let missing = app
        .post(
            "/api/maintenance",
            &admin,
            json!({"truck_id": 9_999, "maintenance_type": "x", "service_type": "y", "description": "z"}),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let truck_id = app.truck(&admin, "MX-2").await;
    let negative = app
        .post(
            "/api/maintenance",
            &admin,
            json!({"truck_id": truck_id, "maintenance_type": "x", "service_type": "y", "description": "z", "cost": -5.0}),
        )
        .await;
    assert_eq!(negative.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn urgent_or_due_work_grounds_the_truck_until_completed() {
    let app = TestApp::new().await;
    let (_, carrier) = app.login_as(Role::Carrier).await;
    let urgent_truck = app.truck(&carrier, "MX-3").await;
    let due_truck = app.truck(&carrier, "MX-4").await;

    app.maintenance(&carrier, urgent_truck, json!({"priority": "URGENT"})).await;
    let due = app.maintenance(&carrier, due_truck, json!({"scheduled_date": "2020-01-01"})).await;
    for truck_id in [urgent_truck, due_truck] {
        let truck = app.get(&format!("/api/trucks/{truck_id}"), &carrier).await;
        assert_eq!(truck.body["status"], "MAINTENANCE");
    }

    let uri = format!("/api/maintenance/{}", due["id"]);
    let done = app.put(&uri, &carrier, json!({"status": "COMPLETED", "cost": 320.0})).await;
    assert_eq!(done.status, StatusCode::OK);
    let today = Utc::now().date_naive().to_string();
    assert_eq!(done.body["completed_date"], today);
    assert_eq!(done.body["cost"], 320.0);

    let truck = app.get(&format!("/api/trucks/{due_truck}"), &carrier).await;
    assert_eq!(truck.body["status"], "AVAILABLE");
    assert_eq!(truck.body["last_maintenance_date"], today);
}

#[tokio::test]
async fn started_work_cannot_be_deleted() {
    let app = TestApp::new().await;
    let (_, carrier) = app.login_as(Role::Carrier).await;
    let truck_id = app.truck(&carrier, "MX-5").await;

    let open = app.maintenance(&carrier, truck_id, json!({})).await;
    let open_uri = format!("/api/maintenance/{}", open["id"]);
    let deleted = app.delete(&open_uri, &carrier).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["message"], "Maintenance record deleted successfully");
    assert_eq!(app.get(&open_uri, &carrier).await.status, StatusCode::NOT_FOUND);

    let started = app.maintenance(&carrier, truck_id, json!({})).await;
    let uri = format!("/api/maintenance/{}", started["id"]);
    let moved = app.put(&uri, &carrier, json!({"status": "IN_PROGRESS"})).await;
    assert_eq!(moved.body["status"], "IN_PROGRESS");
    assert_eq!(app.get(&format!("/api/trucks/{truck_id}"), &carrier).await.body["status"], "MAINTENANCE");

    let blocked = app.delete(&uri, &carrier).await;
    assert_eq!(blocked.status, StatusCode::BAD_REQUEST);
    assert_eq!(blocked.body["error"], "Cannot delete maintenance record that is in progress or completed");
}

#[tokio::test]
async fn listing_filters_and_paginates() {
    let app = TestApp::new().await;
    let (_, admin) = app.login_as(Role::Admin).await;
    let a = app.truck(&admin, "MX-6").await;
    let b = app.truck(&admin, "MX-7").await;
    app.maintenance(&admin, a, json!({"priority": "HIGH"})).await;
    app.maintenance(&admin, a, json!({"priority": "LOW"})).await;
    app.maintenance(&admin, b, json!({"priority": "HIGH"})).await;

    let by_truck = app.get(&format!("/api/maintenance?truck_id={a}"), &admin).await;
    assert_eq!(by_truck.body["pagination"]["total"], 2);

    let high = app.get("/api/maintenance?priority=HIGH&limit=1", &admin).await;
    assert_eq!(high.body["maintenance"].as_array().unwrap().len(), 1);
    assert_eq!(high.body["pagination"], json!({"page": 1, "limit": 1, "total": 2, "pages": 2}));

    let too_far = app.get("/api/maintenance?page=9223372036854775807", &admin).await;
    assert_eq!(too_far.status, StatusCode::BAD_REQUEST);
}
