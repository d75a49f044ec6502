use axum::extract::{Request, State};
use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use crate::auth::cookie::{self, SESSION_COOKIE};
use crate::error::AppError;
use crate::models::user::{Role, User};
use crate::state::AppState;

/// The verified caller, available to every handler behind `require_session`.
#[derive(Clone)]
pub struct AuthContext {
    pub user: User,
}

impl AuthContext {
    pub fn user_id(&self) -> i64 {
        self.user.id
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn is_admin(&self) -> bool {
        self.user.role == Role::Admin
    }
}

/// Reads the `session` cookie from the request headers.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|header| cookie::find(header, SESSION_COOKIE))
}

/// Resolves a raw session token to an active user.
pub async fn resolve_session(state: &AppState, token: &str) -> Result<User, AppError> {
    let claims = state.sessions.verify(token)?;
    let user_id = claims
        .user_id()
        .ok_or_else(|| AppError::unauthorized("Invalid or expired session"))?;

    match state.store.find_user(user_id).await? {
        Some(user) if user.is_active => Ok(user),
        _ => {
            tracing::debug!(user_id, "session for unknown or inactive user");
            Err(AppError::unauthorized("User not found"))
        }
    }
}

pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = session_token(req.headers())
        .map(str::to_string)
        .ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let user = resolve_session(&state, &token).await?;
    req.extensions_mut().insert(AuthContext { user });

    Ok(next.run(req).await)
}
