use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{AppendHeaders, IntoResponse};
use axum::Json;

use crate::auth::cookie;
use crate::auth::password::{hash_password, verify_password};
use crate::dtos::auth::{LoginRequest, LoginResponse, MessageResponse, SessionResponse, SignupRequest};
use crate::dtos::clean;
use crate::dtos::user::{UserEnvelope, UserResponse};
use crate::error::{AppError, AppResult};
use crate::extract::ValidatedJson;
use crate::middleware::auth::{resolve_session, session_token};
use crate::models::user::{NewUser, Role};
use crate::state::AppState;

pub async fn signup(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SignupRequest>,
) -> AppResult<(StatusCode, Json<UserEnvelope>)> {
    let requested = match req.role.parse::<Role>() {
        Ok(role @ (Role::Individual | Role::Carrier | Role::Company)) => role,
        _ => return Err(AppError::validation("Role must be one of individual, carrier or company")),
    };

    let email = req.email.trim().to_lowercase();
    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::conflict("Email already registered"));
    }

    // The store promotes the very first account to ADMIN.
    let user = state
        .store
        .register_user(NewUser {
            email,
            name: req.name.trim().to_string(),
            password_hash: hash_password(&req.password)?,
            role: requested,
            phone: clean(req.phone),
            company: clean(req.company),
        })
        .await?;

    tracing::info!(user_id = user.id, role = user.role.as_str(), "user registered");
    Ok((StatusCode::CREATED, Json(UserEnvelope { user: user.into() })))
}

pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let user = state
        .store
        .find_user_by_email(req.email.trim())
        .await?
        .filter(|u| u.is_active && verify_password(&req.password, &u.password_hash))
        .ok_or_else(|| AppError::unauthorized("Invalid credentials"))?;

    let token = state.sessions.sign(user.id)?;
    let set_cookie = cookie::session(&token, state.sessions.ttl(), state.config.cookie_secure);

    tracing::info!(user_id = user.id, "user logged in");
    Ok((
        AppendHeaders([(SET_COOKIE, set_cookie)]),
        Json(LoginResponse { message: "Login successful", user: user.into() }),
    ))
}

pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        AppendHeaders([(SET_COOKIE, cookie::clear_session(state.config.cookie_secure))]),
        Json(MessageResponse { message: "Logged out successfully" }),
    )
}

/// Reports the current user, or `null`; never rejects.
pub async fn session(State(state): State<AppState>, headers: HeaderMap) -> Json<SessionResponse> {
    let user = match session_token(&headers) {
        Some(token) => resolve_session(&state, token).await.ok().map(UserResponse::from),
        None => None,
    };
    Json(SessionResponse { user })
}
