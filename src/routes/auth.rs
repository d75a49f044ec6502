use axum::{routing::{get, post}, Router};

use crate::handlers::auth::{login, logout, session, signup};
use crate::handlers::password_reset::{confirm_reset, request_reset};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/session", get(session))
        .route("/auth/reset-password/request", post(request_reset))
        .route("/auth/reset-password/confirm", post(confirm_reset))
}
