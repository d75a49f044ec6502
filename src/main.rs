use std::net::SocketAddr;
use std::sync::Arc;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use translogix::config::{Config, StorageBackend};
use translogix::mailer::LogMailer;
use translogix::state::AppState;
use translogix::store::{MemoryStore, PgStore, Store};
use translogix::{app, database};

#[tokio::main]
async fn main() {
    // Load environment variables before the filter reads RUST_LOG
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    let store: Arc<dyn Store> = match (config.storage, config.database_url.as_deref()) {
        (StorageBackend::Postgres, Some(url)) => {
            let pool = match database::create_pool(url).await {
                Ok(pool) => pool,
                Err(e) => {
                    tracing::error!(error = %e, "failed to create database pool");
                    std::process::exit(1);
                }
            };
            if let Err(e) = database::run_migrations(&pool).await {
                tracing::error!(error = %e, "failed to run migrations");
                std::process::exit(1);
            }
            Arc::new(PgStore::new(pool))
        }
        _ => {
            tracing::warn!("using in-memory storage; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let host = config.host;
    let base_port = config.port;
    let app = app(AppState::new(store, Arc::new(LogMailer), config));

    // Try base_port..base_port+20 to avoid crash when address is in use
    let listener = {
        let mut bound = None;
        for offset in 0u16..=20 {
            let addr = SocketAddr::from((host, base_port.saturating_add(offset)));
            match TcpListener::bind(addr).await {
                Ok(l) => {
                    bound = Some((l, addr));
                    break;
                }
                Err(e) => {
                    if offset == 0 {
                        tracing::warn!(%addr, error = %e, "Port in use, trying next");
                    }
                }
            }
        }
        match bound {
            Some((l, addr)) => {
                tracing::info!("Server running on {}", addr);
                l
            }
            None => {
                tracing::error!("Failed to bind to any port starting at {} on {}", base_port, host);
                return;
            }
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "Server error");
    }
}
