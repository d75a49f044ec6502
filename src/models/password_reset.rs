use chrono::{DateTime, Utc};

/// Only the hash of the raw token is persisted; `lookup_prefix` narrows the candidate scan.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PasswordResetToken {
    pub id: i64,
    pub user_id: i64,
    pub lookup_prefix: String,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

pub struct NewPasswordResetToken {
    pub user_id: i64,
    pub lookup_prefix: String,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}
