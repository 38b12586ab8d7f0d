use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::Instant;

use super::session::GatewaySession;
use crate::relay::events::{Delivery, Outbound};
use crate::rooms::ConnectionId;

/// Outcome of one fan-out.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    /// Recipient's outbox was full; the event was dropped for that recipient.
    pub dropped_full: usize,
    /// Recipient already gone; its own disconnect path cleans up.
    pub dropped_closed: usize,
}

/// Holds every live connection's outbox and hands relay deliveries to them.
/// Delivery never waits: a slow recipient only loses its own events.
#[derive(Debug, Default)]
pub struct Dispatcher {
    sessions: DashMap<ConnectionId, GatewaySession>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bounded outbox for `connection_id` and return its receiving
    /// end. `capacity` must be non-zero.
    pub fn register(
        &self,
        connection_id: ConnectionId,
        capacity: usize,
    ) -> mpsc::Receiver<Arc<Outbound>> {
        let (tx, rx) = mpsc::channel(capacity);
        self.sessions.insert(
            connection_id.clone(),
            GatewaySession {
                connection_id,
                tx,
                connected_at: Instant::now(),
            },
        );
        rx
    }

    pub fn remove(&self, connection_id: &ConnectionId) {
        if let Some((_, session)) = self.sessions.remove(connection_id) {
            tracing::trace!(
                connection = %session.connection_id,
                connected_for = ?session.connected_at.elapsed(),
                "outbox removed"
            );
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn deliver(&self, deliveries: Vec<Delivery>) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for delivery in deliveries {
            let Some(session) = self.sessions.get(&delivery.recipient) else {
                report.dropped_closed += 1;
                continue;
            };
            match session.tx.try_send(delivery.event) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(event)) => {
                    tracing::warn!(
                        connection = %delivery.recipient,
                        event = event.kind(),
                        "outbox full, dropping event"
                    );
                    report.dropped_full += 1;
                }
                Err(TrySendError::Closed(_)) => report.dropped_closed += 1,
            }
        }
        report
    }
}
