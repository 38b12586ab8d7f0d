use sqlx::SqlitePool;
use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::gateway::dispatcher::Dispatcher;
use crate::relay::Relay;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub relay: Arc<Relay>,
    pub dispatcher: Arc<Dispatcher>,
    pub gateway: GatewayConfig,
    pub allowed_origins: Arc<[String]>,
}

impl AppState {
    /// Wire up fresh relay and dispatcher instances around `db`.
    pub fn new(db: SqlitePool, gateway: GatewayConfig, allowed_origins: Vec<String>) -> Self {
        Self {
            db,
            relay: Arc::new(Relay::new(gateway.max_room_members)),
            dispatcher: Arc::new(Dispatcher::new()),
            gateway,
            allowed_origins: allowed_origins.into(),
        }
    }
}
