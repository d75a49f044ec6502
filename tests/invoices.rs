mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};

use common::TestApp;
use translogix::models::user::Role;

async fn shipment_for(app: &TestApp, admin: &str, cookie: &str) -> i64 {
    let origin = app.location(admin, "A").await;
    let destination = app.location(admin, "B").await;
    app.shipment(cookie, origin, destination).await["id"].as_i64().unwrap()
}

fn invoice_body(shipment_id: i64) -> Value {
    json!({"shipment_id": shipment_id, "amount": 250.0, "due_date": "2030-02-28"})
}

#[tokio::test]
async fn invoice_defaults_and_conflicts() {
    let app = TestApp::new().await;
    let (_, admin) = app.login_as(Role::Admin).await;
    let (customer, company) = app.login_as(Role::Company).await;
    let shipment_id = shipment_for(&app, &admin, &company).await;

    let created = app.post("/api/invoices", &company, invoice_body(shipment_id)).await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["currency"], "MAD");
    assert_eq!(created.body["status"], "PENDING");
    assert_eq!(created.body["user_id"], customer.id);
    let number = created.body["invoice_number"].as_str().unwrap();
    assert!(number.starts_with("INV-"));
    assert!(number.contains(&format!("-{shipment_id}-")));

    let again = app.post("/api/invoices", &company, invoice_body(shipment_id)).await;
    assert_eq!(again.status, StatusCode::CONFLICT);

    let other_shipment = shipment_for(&app, &admin, &company).await;
    let taken_number = app
        .post(
            "/api/invoices",
            &company,
            json!({"shipment_id": other_shipment, "invoice_number": number, "amount": 1.0, "due_date": "2030-01-01"}),
        )
        .await;
    assert_eq!(taken_number.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn invoice_input_is_validated() {
    let app = TestApp::new().await;
    let (_, admin) = app.login_as(Role::Admin).await;

    let zero = app
        .post("/api/invoices", &admin, json!({"shipment_id": 1, "amount": 0.0, "due_date": "2030-01-01"}))
        .await;
    assert_eq!(zero.status, StatusCode::BAD_REQUEST);

    let missing = app.post("/api/invoices", &admin, invoice_body(9_999)).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_admins_only_invoice_and_see_their_own() {
    let app = TestApp::new().await;
    let (_, admin) = app.login_as(Role::Admin).await;
    let (_, owner) = app.login_as(Role::Company).await;
    let (_, rival) = app.login_as(Role::Company).await;
    let shipment_id = shipment_for(&app, &admin, &owner).await;

    assert_eq!(app.post("/api/invoices", &rival, invoice_body(shipment_id)).await.status, StatusCode::FORBIDDEN);

    let invoice = app.post("/api/invoices", &owner, invoice_body(shipment_id)).await.body;
    let uri = format!("/api/invoices/{}", invoice["id"]);

    assert_eq!(app.get(&uri, &owner).await.status, StatusCode::OK);
    assert_eq!(app.get(&uri, &rival).await.status, StatusCode::FORBIDDEN);
    assert_eq!(app.get(&uri, &admin).await.status, StatusCode::OK);

    assert_eq!(app.get("/api/invoices", &rival).await.body["pagination"]["total"], 0);
    assert_eq!(app.get("/api/invoices", &owner).await.body["pagination"]["total"], 1);
    assert_eq!(app.get("/api/invoices", &admin).await.body["pagination"]["total"], 1);

    let paid = app.put(&uri, &owner, json!({"status": "PAID", "currency": "eur"})).await;
    assert_eq!(paid.status, StatusCode::OK);
    assert_eq!(paid.body["status"], "PAID");
    assert_eq!(paid.body["currency"], "EUR");
    assert_eq!(app.put(&uri, &rival, json!({"status": "CANCELLED"})).await.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn invoice_listing_paginates() {
    let app = TestApp::new().await;
    let (_, admin) = app.login_as(Role::Admin).await;
    for _ in 0..3 {
        let shipment_id = shipment_for(&app, &admin, &admin).await;
        app.post("/api/invoices", &admin, invoice_body(shipment_id)).await;
    }

    let page = app.get("/api/invoices?page=2&limit=2", &admin).await;
    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(page.body["invoices"].as_array().unwrap().len(), 1);
    assert_eq!(page.body["pagination"], json!({"page": 2, "limit": 2, "total": 3, "pages": 2}));

    let clamped = app.get("/api/invoices?limit=1000", &admin).await;
    assert_eq!(clamped.body["pagination"]["limit"], 100);
}

#[tokio::test]
async fn page_past_the_offset_range_is_rejected() {
    let app = TestApp::new().await;
    let (_, admin) = app.login_as(Role::Admin).await;

    let res = app.get("/api/invoices?page=9223372036854775807", &admin).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "Page is out of range");

    let last_safe = app.get("/api/invoices?page=922337203685477580&limit=10", &admin).await;
    assert_eq!(last_safe.status, StatusCode::OK);
    assert!(last_safe.body["invoices"].as_array().unwrap().is_empty());
}
