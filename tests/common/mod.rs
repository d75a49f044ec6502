#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use chrono::Duration;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use translogix::app;
use translogix::config::Config;
use translogix::error::AppResult;
use translogix::mailer::Mailer;
use translogix::models::user::{NewUser, Role, User};
use translogix::state::AppState;
use translogix::store::{MemoryStore, Store};

/// Keeps every reset link so tests can pull the raw token back out.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    pub fn last_token_for(&self, email: &str) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        sent.iter()
            .rev()
            .find(|(to, _)| to == email)
            .and_then(|(_, link)| link.split("token=").nth(1).map(str::to_string))
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_password_reset(&self, to: &str, _name: &str, link: &str) -> AppResult<()> {
        self.sent.lock().unwrap().push((to.to_string(), link.to_string()));
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    seq: AtomicUsize,
}

pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub fn config(reset_ttl_minutes: i64) -> Config {
    let reset_ttl = reset_ttl_minutes.to_string();
    Config::from_lookup(|name| match name {
        "JWT_SECRET" => Some("test-secret".to_string()),
        "STORAGE_BACKEND" => Some("memory".to_string()),
        "APP_BASE_URL" => Some("http://app.test".to_string()),
        "RESET_TOKEN_TTL_MINUTES" => Some(reset_ttl.clone()),
        _ => None,
    })
    .unwrap()
}

impl TestApp {
    /// App with no users at all.
    pub fn empty() -> Self {
        Self::with_config(config(60))
    }

    pub fn with_config(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::new(store.clone(), mailer.clone(), config);
        Self { router: app(state.clone()), state, store, mailer, seq: AtomicUsize::new(0) }
    }

    /// App seeded with an admin so later signups keep the role they ask for.
    pub async fn new() -> Self {
        let app = Self::empty();
        app.user("root@example.com", Role::Admin).await;
        app
    }

    pub async fn user(&self, email: &str, role: Role) -> User {
        self.store
            .create_user(NewUser {
                email: email.to_string(),
                name: "Test User".to_string(),
                password_hash: bcrypt::hash("password123", 4).unwrap(),
                role,
                phone: None,
                company: None,
            })
            .await
            .unwrap()
    }

    pub fn cookie_for(&self, user: &User) -> String {
        format!("session={}", self.state.sessions.sign(user.id).unwrap())
    }

    pub fn expired_cookie_for(&self, user: &User) -> String {
        let token = self.state.sessions.sign_with_ttl(user.id, Duration::seconds(-60)).unwrap();
        format!("session={token}")
    }

    /// Fresh user of the given role plus a session cookie for them.
    pub async fn login_as(&self, role: Role) -> (User, String) {
        let n = self.seq.fetch_add(1, Ordering::Relaxed);
        let email = format!("{}-{n}@example.com", role.as_str().to_lowercase());
        let user = self.user(&email, role).await;
        let cookie = self.cookie_for(&user);
        (user, cookie)
    }

    pub async fn send(&self, method: Method, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let res = self.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let headers = res.headers().clone();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        Response { status, headers, body }
    }

    pub async fn get(&self, uri: &str, cookie: &str) -> Response {
        self.send(Method::GET, uri, Some(cookie), None).await
    }

    pub async fn post(&self, uri: &str, cookie: &str, body: Value) -> Response {
        self.send(Method::POST, uri, Some(cookie), Some(body)).await
    }

    pub async fn put(&self, uri: &str, cookie: &str, body: Value) -> Response {
        self.send(Method::PUT, uri, Some(cookie), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, cookie: &str) -> Response {
        self.send(Method::DELETE, uri, Some(cookie), None).await
    }

    // Fixtures, created as an admin.

    pub async fn location(&self, admin: &str, name: &str) -> i64 {
        let res = self
            .post(
                "/api/locations",
                admin,
                json!({"name": name, "address": "1 Harbour Rd", "city": "Casablanca", "country": "MA"}),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        res.body["id"].as_i64().unwrap()
    }

    pub async fn shipment(&self, cookie: &str, origin: i64, destination: i64) -> Value {
        let res = self
            .post("/api/shipments", cookie, json!({"origin_id": origin, "destination_id": destination}))
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        res.body
    }

    pub async fn driver(&self, admin: &str, user_id: i64, license: &str) -> i64 {
        let res = self
            .post(
                "/api/drivers",
                admin,
                json!({
                    "user_id": user_id,
                    "license_number": license,
                    "license_expiry_date": "2030-01-01",
                    "phone_number": "+212600000000"
                }),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        res.body["id"].as_i64().unwrap()
    }

    pub async fn truck(&self, cookie: &str, plate: &str) -> i64 {
        let res = self
            .post("/api/trucks", cookie, json!({"license_plate": plate, "model": "FH16", "year": 2020, "capacity": 18.5}))
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        res.body["id"].as_i64().unwrap()
    }

    pub async fn maintenance(&self, cookie: &str, truck_id: i64, extra: Value) -> Value {
        let mut body = json!({
            "truck_id": truck_id,
            "maintenance_type": "preventive",
            "service_type": "oil change",
            "description": "Engine oil and filters"
        });
        if let (Some(body), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
            body.extend(extra.clone());
        }
        let res = self.post("/api/maintenance", cookie, body).await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        res.body
    }

    pub async fn invoice(&self, cookie: &str, shipment_id: i64, amount: f64) -> i64 {
        let res = self
            .post("/api/invoices", cookie, json!({"shipment_id": shipment_id, "amount": amount, "due_date": "2030-06-30"}))
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        res.body["id"].as_i64().unwrap()
    }

    pub async fn route(&self, admin: &str, body: Value) -> i64 {
        let res = self.post("/api/routes", admin, body).await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        res.body["id"].as_i64().unwrap()
    }
}
