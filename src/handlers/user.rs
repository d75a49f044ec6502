use axum::extract::{Extension, Path, Query, State};
use axum::Json;

use crate::dtos::auth::MessageResponse;
use crate::dtos::clean;
use crate::dtos::user::{
    AdminUpdateUserRequest, UpdateProfileRequest, UserEnvelope, UserList, UserQuery, UserResponse,
    UserUpdatedResponse,
};
use crate::error::{AppError, AppResult};
use crate::extract::ValidatedJson;
use crate::middleware::auth::AuthContext;
use crate::models::user::{ProfileChanges, UserChanges, UserFilter};
use crate::state::AppState;

pub async fn get_profile(Extension(auth): Extension<AuthContext>) -> Json<UserEnvelope> {
    Json(UserEnvelope { user: auth.user.into() })
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> AppResult<Json<UserEnvelope>> {
    let changes = ProfileChanges {
        name: clean(req.name),
        phone: clean(req.phone),
        company: clean(req.company),
    };

    let user = state
        .store
        .update_profile(auth.user_id(), changes)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(Json(UserEnvelope { user: user.into() }))
}

/// Admin directory of every account, newest first.
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> AppResult<Json<UserList>> {
    let window = query.window();
    let offset = window.offset()?;
    let filter = UserFilter {
        role: query.role,
        is_active: query.is_active,
        search: clean(query.search),
    };

    let result = state.store.list_users(&filter, window.limit, offset).await?;
    Ok(Json(UserList {
        users: result.items.into_iter().map(UserResponse::from).collect(),
        pagination: window.pagination(result.total),
    }))
}

pub async fn get_user(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<UserEnvelope>> {
    let user = state
        .store
        .find_user(id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(UserEnvelope { user: user.into() }))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<AdminUpdateUserRequest>,
) -> AppResult<Json<UserUpdatedResponse>> {
    if id == auth.user_id() && req.is_active == Some(false) {
        return Err(AppError::validation("You cannot deactivate your own account"));
    }

    let changes = UserChanges {
        email: req.email.map(|e| e.trim().to_lowercase()),
        name: clean(req.name),
        phone: clean(req.phone),
        company: clean(req.company),
        role: req.role,
        is_active: req.is_active,
    };

    let user = state
        .store
        .update_user(id, changes)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    tracing::info!(user_id = user.id, admin_id = auth.user_id(), "user updated by admin");
    Ok(Json(UserUpdatedResponse { message: "User updated successfully", user: user.into() }))
}

/// Soft delete: the account stays for history but can no longer sign in.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    if id == auth.user_id() {
        return Err(AppError::validation("You cannot delete your own account"));
    }

    let changes = UserChanges { is_active: Some(false), ..Default::default() };
    state
        .store
        .update_user(id, changes)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    tracing::info!(user_id = id, admin_id = auth.user_id(), "user deactivated");
    Ok(Json(MessageResponse { message: "User deactivated successfully" }))
}
