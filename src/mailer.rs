use async_trait::async_trait;

use crate::error::AppResult;

/// Outbound mail. Real delivery is left to whoever deploys the service.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_password_reset(&self, to: &str, name: &str, link: &str) -> AppResult<()>;
}

/// Logs the delivery without the link, which carries the raw token.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_password_reset(&self, to: &str, name: &str, _link: &str) -> AppResult<()> {
        tracing::info!(%to, %name, "password reset email queued");
        Ok(())
    }
}
