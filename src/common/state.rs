// Application state shared across all modules

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::auth::session::SessionCodec;
use crate::common::config::AppConfig;
use crate::payments::PaymentGateway;

/// Immutable per-process state: datastore handle, token codec, payment gateway.
///
/// Handlers receive it as `Extension<Arc<AppState>>`; nothing in here is
/// mutated after startup.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub sessions: SessionCodec,
    pub gateway: Arc<dyn PaymentGateway>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: AppConfig, gateway: Arc<dyn PaymentGateway>) -> Self {
        let sessions = SessionCodec::new(config.jwt_secret.as_bytes(), config.session_ttl_hours);
        Self {
            db,
            config: Arc::new(config),
            sessions,
            gateway,
        }
    }
}
