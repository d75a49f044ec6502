pub mod auth;
pub mod config;
pub mod database;
pub mod dtos;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod mailer;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;

use axum::http::{header, HeaderValue, Method};
use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Full application: every resource under `/api`, plus a health check.
pub fn app(state: AppState) -> Router {
    let api = routes::create_router(&state)
        .route("/", get(|| async { "TransLogix API" }))
        .route("/health", get(health_check));

    Router::new()
        .nest("/api", api)
        .layer(cors(&state))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors(state: &AppState) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    match state.config.cors_origin.as_deref().map(HeaderValue::from_str) {
        Some(Ok(origin)) => layer.allow_origin(origin),
        Some(Err(_)) => {
            tracing::warn!("CORS_ORIGIN is not a valid header value; cross-origin requests disabled");
            layer
        }
        None => layer,
    }
}

async fn health_check() -> &'static str {
    "OK"
}
