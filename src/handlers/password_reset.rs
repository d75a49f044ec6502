use axum::extract::State;
use axum::Json;
use chrono::Utc;

use crate::auth::password::hash_password;
use crate::auth::reset_token;
use crate::dtos::auth::{MessageResponse, ResetConfirmRequest, ResetRequest};
use crate::error::{AppError, AppResult};
use crate::extract::ValidatedJson;
use crate::models::password_reset::NewPasswordResetToken;
use crate::state::AppState;

const REQUESTED: &str = "If your email is registered, you will receive a password reset link.";
const COMPLETED: &str = "Password has been reset successfully.";
const INVALID: &str = "Invalid or expired reset token.";

/// Same answer whether or not the email belongs to anyone.
pub async fn request_reset(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ResetRequest>,
) -> AppResult<Json<MessageResponse>> {
    let email = req.email.trim().to_lowercase();

    let Some(user) = state.store.find_user_by_email(&email).await?.filter(|u| u.is_active) else {
        tracing::debug!("reset requested for unknown email");
        return Ok(Json(MessageResponse { message: REQUESTED }));
    };

    let raw = reset_token::generate();
    let lookup_prefix = reset_token::lookup_prefix(&raw)
        .ok_or_else(|| AppError::internal("generated reset token too short"))?
        .to_string();

    state
        .store
        .replace_reset_token(NewPasswordResetToken {
            user_id: user.id,
            lookup_prefix,
            token_hash: reset_token::hash(&raw),
            expires_at: Utc::now() + state.config.reset_token_ttl,
        })
        .await?;

    let link = format!("{}/reset-password?token={raw}", state.config.app_base_url.trim_end_matches('/'));
    if let Err(e) = state.mailer.send_password_reset(&user.email, &user.name, &link).await {
        tracing::error!(user_id = user.id, error = %e, "failed to send reset email");
    }

    tracing::info!(user_id = user.id, "password reset token issued");
    Ok(Json(MessageResponse { message: REQUESTED }))
}

pub async fn confirm_reset(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ResetConfirmRequest>,
) -> AppResult<Json<MessageResponse>> {
    let now = Utc::now();
    match state.store.purge_expired_reset_tokens(now).await {
        Ok(0) => {}
        Ok(purged) => tracing::debug!(purged, "expired reset tokens removed"),
        Err(e) => tracing::warn!(error = %e, "could not purge expired reset tokens"),
    }

    let token = req.token.trim();
    let prefix = reset_token::lookup_prefix(token).ok_or_else(|| AppError::validation(INVALID))?;
    let presented = reset_token::hash(token);

    let matched = state
        .store
        .active_reset_tokens(prefix, now)
        .await?
        .into_iter()
        .find(|t| reset_token::hashes_match(&t.token_hash, &presented))
        .ok_or_else(|| AppError::validation(INVALID))?;

    let user = state
        .store
        .find_user(matched.user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::validation(INVALID))?;
    let password_hash = hash_password(&req.new_password)?;

    // Losing this race means another request already used the token.
    if !state.store.redeem_reset_token(matched.id, &password_hash).await? {
        return Err(AppError::validation(INVALID));
    }

    tracing::info!(user_id = user.id, "password reset completed");
    Ok(Json(MessageResponse { message: COMPLETED }))
}
