use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::relay::events::Outbound;
use crate::rooms::ConnectionId;

/// The sending half of one connection's outbox.
#[derive(Debug)]
pub struct GatewaySession {
    pub connection_id: ConnectionId,
    pub tx: mpsc::Sender<Arc<Outbound>>,
    pub connected_at: Instant,
}
