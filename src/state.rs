use std::sync::Arc;

use crate::auth::jwt::SessionKeys;
use crate::config::Config;
use crate::mailer::Mailer;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub sessions: SessionKeys,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, mailer: Arc<dyn Mailer>, config: Config) -> Self {
        Self {
            store,
            sessions: SessionKeys::new(&config.jwt_secret, config.session_ttl),
            mailer,
            config: Arc::new(config),
        }
    }
}
